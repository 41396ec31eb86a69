//! Per-carrier instance data uploaded each frame

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use transistor_physics::{Carrier, CarrierState, ELECTRON_SIZE};

/// Device geometry is drawn slightly below the orbit target
pub const SCENE_OFFSET: Vec3 = Vec3::new(0.0, -0.5, 0.0);

const ELECTRON_BLUE: u32 = 0x3b82f6;
const DIFFUSION_BLUE: u32 = 0x60a5fa;
const RECOMBINATION_YELLOW: u32 = 0xfacc15;

/// Instance data for one carrier billboard
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CarrierInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 4],
}

impl CarrierInstance {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CarrierInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // scale
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
                // color
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Display colour for a carrier state, in linear space
pub fn carrier_color(state: CarrierState) -> [f32; 4] {
    let hex = match state {
        CarrierState::Recombining => RECOMBINATION_YELLOW,
        CarrierState::BaseDiffusion => DIFFUSION_BLUE,
        CarrierState::Emitter | CarrierState::CollectorSweep | CarrierState::Hidden => {
            ELECTRON_BLUE
        }
    };
    hex_to_linear(hex, 1.0)
}

/// Convert a `0xRRGGBB` sRGB colour to linear RGBA
pub fn hex_to_linear(hex: u32, alpha: f32) -> [f32; 4] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0), alpha]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Rebuild `out` from the carrier ensemble. Reuses the allocation.
pub fn pack_instances(carriers: &[Carrier], out: &mut Vec<CarrierInstance>) {
    out.clear();
    out.extend(carriers.iter().map(|carrier| CarrierInstance {
        position: (carrier.position + SCENE_OFFSET).to_array(),
        scale: ELECTRON_SIZE,
        color: carrier_color(carrier.state),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<CarrierInstance>(), 32);
        assert_eq!(
            CarrierInstance::desc().array_stride,
            std::mem::size_of::<CarrierInstance>() as u64
        );
    }

    #[test]
    fn test_state_colors() {
        let emitter = carrier_color(CarrierState::Emitter);
        assert_eq!(emitter, carrier_color(CarrierState::CollectorSweep));
        assert_ne!(emitter, carrier_color(CarrierState::BaseDiffusion));

        // Yellow: strong red and green, little blue
        let recombining = carrier_color(CarrierState::Recombining);
        assert!(recombining[0] > 0.9 && recombining[1] > 0.5 && recombining[2] < 0.01);
    }

    #[test]
    fn test_hex_to_linear_endpoints() {
        assert_eq!(hex_to_linear(0x000000, 1.0), [0.0, 0.0, 0.0, 1.0]);
        let white = hex_to_linear(0xffffff, 0.5);
        for c in &white[..3] {
            assert!((c - 1.0).abs() < 1e-5);
        }
        assert_eq!(white[3], 0.5);
    }

    #[test]
    fn test_pack_instances_offsets_and_reuses() {
        let carrier = Carrier {
            position: Vec3::new(1.0, 0.25, -0.25),
            speed: 0.0,
            state: CarrierState::BaseDiffusion,
            recombination_target_y: -2.0,
        };

        let mut out = Vec::new();
        pack_instances(&[carrier; 3], &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].position, [1.0, -0.25, -0.25]);
        assert_eq!(out[0].scale, ELECTRON_SIZE);
        assert_eq!(out[0].color, carrier_color(CarrierState::BaseDiffusion));

        pack_instances(&[carrier], &mut out);
        assert_eq!(out.len(), 1);
    }
}
