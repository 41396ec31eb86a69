//! Device structure: translucent region blocks, terminal leads and label anchors

use crate::instance::{hex_to_linear, SCENE_OFFSET};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use transistor_physics::{Region, BLOCK_DEPTH, BLOCK_HEIGHT, HALF_HEIGHT};
use wgpu::util::DeviceExt;

const N_TYPE_BLUE: u32 = 0x3b82f6;
const P_TYPE_RED: u32 = 0xef4444;
const LEAD_GREY: u32 = 0x94a3b8;

pub const LEAD_LENGTH: f32 = 1.0;
pub const LEAD_RADIUS: f32 = 0.1;

/// Vertex of the unit cube
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CubeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// An axis-aligned box in world space
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BoxInstance {
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
    pub color: [f32; 4],
}

impl BoxInstance {
    fn new(center: Vec3, size: Vec3, hex: u32, alpha: f32) -> Self {
        Self {
            center: (center + SCENE_OFFSET).to_array(),
            half_extents: (size * 0.5).to_array(),
            color: hex_to_linear(hex, alpha),
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<BoxInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

impl CubeVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CubeVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Unit cube spanning [-1, 1] on each axis, two triangles per face
pub fn cube_vertices() -> Vec<CubeVertex> {
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut vertices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let corner = |su: f32, sv: f32| CubeVertex {
            position: (normal + u * su + v * sv).to_array(),
            normal: normal.to_array(),
        };
        vertices.extend([
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        ]);
    }
    vertices
}

/// Region blocks followed by the three terminal leads
pub fn device_boxes() -> Vec<BoxInstance> {
    let mut boxes: Vec<BoxInstance> = Region::ALL
        .iter()
        .map(|&region| {
            let (hex, alpha) = match region {
                Region::Base => (P_TYPE_RED, 0.4),
                Region::Emitter | Region::Collector => (N_TYPE_BLUE, 0.3),
            };
            BoxInstance::new(
                Vec3::new(region.center_x(), 0.0, 0.0),
                Vec3::new(region.width(), BLOCK_HEIGHT, BLOCK_DEPTH),
                hex,
                alpha,
            )
        })
        .collect();

    let thickness = LEAD_RADIUS * 2.0;
    let horizontal = Vec3::new(LEAD_LENGTH, thickness, thickness);
    let vertical = Vec3::new(thickness, LEAD_LENGTH, thickness);
    let emitter_edge = Region::Emitter.center_x() - Region::Emitter.width() / 2.0;
    let collector_edge = Region::Collector.center_x() + Region::Collector.width() / 2.0;
    let half_lead = LEAD_LENGTH / 2.0;

    boxes.extend([
        BoxInstance::new(
            Vec3::new(emitter_edge - half_lead, 0.0, 0.0),
            horizontal,
            LEAD_GREY,
            1.0,
        ),
        BoxInstance::new(
            Vec3::new(Region::Base.center_x(), -HALF_HEIGHT - half_lead, 0.0),
            vertical,
            LEAD_GREY,
            1.0,
        ),
        BoxInstance::new(
            Vec3::new(collector_edge + half_lead, 0.0, 0.0),
            horizontal,
            LEAD_GREY,
            1.0,
        ),
    ]);
    boxes
}

/// Order boxes farthest-first from `eye` for alpha blending
pub fn sort_back_to_front(boxes: &mut [BoxInstance], eye: Vec3) {
    boxes.sort_by(|a, b| {
        let da = Vec3::from(a.center).distance_squared(eye);
        let db = Vec3::from(b.center).distance_squared(eye);
        db.total_cmp(&da)
    });
}

/// A piece of overlay text pinned to a point in the scene
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionLabel {
    pub anchor: Vec3,
    pub text: &'static str,
    /// Font size in points
    pub size: f32,
    /// sRGB `0xRRGGBB`
    pub color: u32,
    /// Headings sit above their anchor, notes are centred on it
    pub heading: bool,
}

/// Region names above each block and doping notes below
pub fn region_labels() -> Vec<RegionLabel> {
    let mut labels = Vec::with_capacity(5);
    for region in Region::ALL {
        // The thin base gets its labels pushed further out
        let gap = if region == Region::Base { 0.6 } else { 0.4 };
        let x = region.center_x();
        let (heading_color, note_color, note_size) = match region {
            Region::Base => (0xf87171, 0xfca5a5, 12.0),
            Region::Emitter | Region::Collector => (0x60a5fa, LEAD_GREY, 14.0),
        };

        labels.push(RegionLabel {
            anchor: Vec3::new(x, HALF_HEIGHT + gap, 0.0) + SCENE_OFFSET,
            text: region.label(),
            size: 20.0,
            color: heading_color,
            heading: true,
        });
        if let Some(note) = region.doping_note() {
            labels.push(RegionLabel {
                anchor: Vec3::new(x, -HALF_HEIGHT - gap, 0.0) + SCENE_OFFSET,
                text: note,
                size: note_size,
                color: note_color,
                heading: false,
            });
        }
    }
    labels
}

/// Draws the device structure over the carriers already in the target
pub struct StructureRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    instance_buffer: wgpu::Buffer,
    boxes: Vec<BoxInstance>,
}

impl StructureRenderer {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        camera_buffer: &wgpu::Buffer,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Structure Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/structure.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Structure Bind Group Layout"),
            entries: &[
                // Camera (Uniform) - Binding 0
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        // The camera buffer lives as long as the renderers, so one bind group is enough
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Structure Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Structure Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Structure Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vertex"),
                buffers: &[CubeVertex::desc(), BoxInstance::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fragment"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Both faces, so the far wall shows through the near one
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: crate::renderer::DEPTH_FORMAT,
                depth_write_enabled: false, // Translucent blocks don't write depth
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertices = cube_vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let boxes = device_boxes();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Structure Instance Buffer"),
            contents: bytemuck::cast_slice(&boxes),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            pipeline,
            bind_group,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            instance_buffer,
            boxes,
        }
    }

    pub fn render(&mut self, queue: &wgpu::Queue, render_pass: &mut wgpu::RenderPass, eye: Vec3) {
        sort_back_to_front(&mut self.boxes, eye);
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.boxes));

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.draw(0..self.vertex_count, 0..self.boxes.len() as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transistor_physics::{COLLECTOR_END, EMITTER_START};

    #[test]
    fn test_cube_vertices() {
        let vertices = cube_vertices();
        assert_eq!(vertices.len(), 36);
        for v in &vertices {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            assert_eq!(p.abs().max_element(), 1.0);
            // Every vertex lies on the face its normal points to
            assert_eq!(p.dot(n), 1.0);
        }
    }

    #[test]
    fn test_blocks_match_regions() {
        let boxes = device_boxes();
        assert_eq!(boxes.len(), 6);

        for (block, region) in boxes.iter().zip(Region::ALL) {
            assert_eq!(block.center[0], region.center_x());
            assert_eq!(block.center[1], SCENE_OFFSET.y);
            assert!((block.half_extents[0] * 2.0 - region.width()).abs() < 1e-6);
            assert_eq!(block.half_extents[1], HALF_HEIGHT);
            assert!(block.color[3] < 1.0);
        }
        assert_eq!(boxes[1].color[3], 0.4);
    }

    #[test]
    fn test_leads_touch_outer_faces() {
        let boxes = device_boxes();
        let emitter_lead = boxes[3];
        let base_lead = boxes[4];
        let collector_lead = boxes[5];

        let emitter_inner = emitter_lead.center[0] + emitter_lead.half_extents[0];
        assert!((emitter_inner - EMITTER_START).abs() < 1e-5);

        let collector_inner = collector_lead.center[0] - collector_lead.half_extents[0];
        assert!((collector_inner - COLLECTOR_END).abs() < 1e-5);

        let base_top = base_lead.center[1] + base_lead.half_extents[1];
        assert!((base_top - (-HALF_HEIGHT + SCENE_OFFSET.y)).abs() < 1e-5);

        for lead in [emitter_lead, base_lead, collector_lead] {
            assert_eq!(lead.color[3], 1.0);
        }
    }

    #[test]
    fn test_sort_back_to_front() {
        let mut boxes = device_boxes();
        let eye = Vec3::new(20.0, 0.0, 0.0);
        sort_back_to_front(&mut boxes, eye);

        let distances: Vec<f32> = boxes
            .iter()
            .map(|b| Vec3::from(b.center).distance(eye))
            .collect();
        assert!(distances.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_region_labels() {
        let labels = region_labels();
        // Three headings, two doping notes
        assert_eq!(labels.len(), 5);
        assert_eq!(labels.iter().filter(|l| l.heading).count(), 3);

        let base = labels.iter().find(|l| l.text == "Base (P)").unwrap();
        assert_eq!(base.anchor.x, 0.0);
        assert!((base.anchor.y - (HALF_HEIGHT + 0.6 + SCENE_OFFSET.y)).abs() < 1e-6);

        let note = labels.iter().find(|l| l.text == "High Doping").unwrap();
        assert!(note.anchor.y < SCENE_OFFSET.y - HALF_HEIGHT);
        assert!(!labels.iter().any(|l| l.text.is_empty()));
    }
}
