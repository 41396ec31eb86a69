//! NPN Transistor Carrier Transport Visualization
//!
//! Electrons drift through the emitter, get injected across the base and are
//! swept into the collector, with a few recombining in the base on the way.

mod gui;

use anyhow::Context as _;
use gui::{Gui, ScreenLabel, UiState};
use rand::rngs::SmallRng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use transistor_renderer::{region_labels, Camera, CarrierRenderer, RegionLabel, StructureRenderer};
use transistor_simulation::{CarrierSimulation, SimulationConfig};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Simulated time advanced by the Step button while paused
const SINGLE_STEP_DT: f32 = 1.0 / 60.0;

/// Frames between flow summaries in the debug log
const FLOW_LOG_INTERVAL: u32 = 600;

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    sim_config: SimulationConfig,
    simulation: CarrierSimulation,
    rng: SmallRng,

    renderer: CarrierRenderer,
    structure_renderer: StructureRenderer,
    camera: Camera,
    region_labels: Vec<RegionLabel>,

    gui: Gui,
    ui_state: UiState,

    frame_times: VecDeque<f32>,
    last_frame_time: Instant,
    frame_counter: u32,
}

impl GpuState {
    async fn new(window: Arc<Window>, sim_config: SimulationConfig) -> anyhow::Result<Self> {
        sim_config
            .validate()
            .context("Invalid simulation configuration")?;

        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible GPU adapter")?;

        log::info!("✓ Using GPU: {}", adapter.get_info().name);

        // Create device and queue
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("Surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Create simulation
        let mut rng = sim_config.seeded_rng();
        let simulation = CarrierSimulation::new(sim_config.carrier_count, &mut rng);
        log::info!("✓ Simulation initialized");

        // Create renderers
        let renderer = CarrierRenderer::new(&device, &config);
        log::info!("✓ Renderer initialized");

        let structure_renderer =
            StructureRenderer::new(&device, config.format, &renderer.camera_buffer);
        log::info!("✓ Structure Renderer initialized");

        // Create camera
        let camera = Camera::new(config.width, config.height);

        // Create GUI
        let gui = Gui::new(&device, config.format, &window);
        let ui_state = UiState::default();

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sim_config,
            simulation,
            rng,
            renderer,
            structure_renderer,
            camera,
            region_labels: region_labels(),
            gui,
            ui_state,
            frame_times: VecDeque::with_capacity(100),
            last_frame_time: Instant::now(),
            frame_counter: 0,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer.resize(&self.device, &self.config);
            self.camera.resize(new_size.width, new_size.height);
        }
    }

    fn update(&mut self, frame_time: f32) {
        let dt = self.sim_config.clamp_dt(frame_time * 0.001);

        // Camera reset: smoothly return home when requested (press `C`).
        self.camera.update(dt);

        let step_dt = if !self.ui_state.is_paused {
            Some(dt)
        } else if self.ui_state.step_one_frame {
            Some(SINGLE_STEP_DT)
        } else {
            None
        };

        if let Some(step_dt) = step_dt {
            self.simulation
                .step(&self.ui_state.bias, step_dt, &mut self.rng);
            self.ui_state.step_one_frame = false;
        }

        if self.frame_counter % FLOW_LOG_INTERVAL == 0 {
            let flow = self.simulation.flow();
            log::debug!(
                "Flow: injected {:.1}/s, collected {:.1}/s, recombined {:.1}/s",
                flow.injection_rate,
                flow.collection_rate,
                flow.recombination_rate
            );
        }

        self.ui_state.carrier_count = self.simulation.carrier_count();
        self.ui_state.state_counts = self.simulation.state_counts();
        self.ui_state.flow = *self.simulation.flow();
        self.ui_state.totals = *self.simulation.totals();
        self.ui_state.elapsed = self.simulation.elapsed();

        let (width, height) = (self.config.width as f32, self.config.height as f32);
        self.ui_state.labels = self
            .region_labels
            .iter()
            .filter_map(|label| {
                self.camera
                    .project_to_screen(label.anchor, width, height)
                    .map(|position| ScreenLabel {
                        position,
                        label: *label,
                    })
            })
            .collect();
    }

    fn render(&mut self, window: &Window) -> Result<(f32, f32), wgpu::SurfaceError> {
        // Track frame time
        let now = Instant::now();
        let frame_time = (now - self.last_frame_time).as_secs_f32() * 1000.0;
        self.last_frame_time = now;

        self.frame_times.push_back(frame_time);
        if self.frame_times.len() > 100 {
            self.frame_times.pop_front();
        }

        let avg_frame_time = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        let fps = 1000.0 / avg_frame_time.max(f32::EPSILON);

        self.frame_counter = self.frame_counter.wrapping_add(1);
        self.update(frame_time);

        self.ui_state.fps = fps;
        self.ui_state.frame_time = avg_frame_time;

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.render(
            &self.device,
            &self.queue,
            &view,
            &self.camera,
            self.simulation.carriers(),
        );

        {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Structure Render Encoder"),
                });

            {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Structure Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.renderer.depth_texture,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                self.structure_renderer
                    .render(&self.queue, &mut render_pass, self.camera.position());
            }

            self.queue.submit(std::iter::once(encoder.finish()));
        }

        {
            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("GUI Encoder"),
                });

            let gui_buffers = self.gui.render(
                &self.device,
                &self.queue,
                &mut encoder,
                window,
                &view,
                &mut self.ui_state,
            );

            self.queue
                .submit(gui_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        }

        output.present();
        Ok((fps, avg_frame_time))
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    sim_config: SimulationConfig,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
}

impl App {
    fn new(sim_config: SimulationConfig) -> Self {
        Self {
            window: None,
            gpu_state: None,
            sim_config,
            mouse_pressed: false,
            last_mouse_pos: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("NPN Transistor")
            .with_inner_size(winit::dpi::LogicalSize::new(1600, 900));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );
        let gpu_state = pollster::block_on(GpuState::new(window.clone(), self.sim_config.clone()))?;

        self.window = Some(window);
        self.gpu_state = Some(gpu_state);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                log::error!("Startup failed: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(gpu_state), Some(window)) = (&mut self.gpu_state, &self.window) {
            if gpu_state.gui.handle_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyC),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.camera.begin_reset();
                    log::debug!("Camera reset requested");
                }
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Space),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.ui_state.is_paused = !gpu_state.ui_state.is_paused;
                    log::debug!("Paused: {}", gpu_state.ui_state.is_paused);
                }
            }

            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Right {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some(last_pos) = self.last_mouse_pos {
                        let delta_x = (position.x - last_pos.0) as f32;
                        let delta_y = (position.y - last_pos.1) as f32;

                        if let Some(gpu_state) = &mut self.gpu_state {
                            gpu_state.camera.rotate(-delta_x * 0.005, delta_y * 0.005);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_x, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.02,
                };

                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.camera.zoom(-scroll * 0.5);
                }
            }

            WindowEvent::RedrawRequested => {
                if let (Some(window), Some(gpu_state)) = (&self.window, &mut self.gpu_state) {
                    match gpu_state.render(window) {
                        Ok((fps, frame_time)) => {
                            window.set_title(&format!(
                                "NPN Transistor - {:.0} FPS ({:.2}ms) - {} carriers",
                                fps,
                                frame_time,
                                gpu_state.simulation.carrier_count()
                            ));
                        }
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            gpu_state.resize(window.inner_size())
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                        Err(e) => log::warn!("Render error: {e:?}"),
                    }
                }
            }

            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting NPN transistor visualization...");

    let sim_config = SimulationConfig::default();

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(sim_config);
    event_loop.run_app(&mut app).context("Event loop error")?;

    Ok(())
}
