use egui::{Align2, Color32, Context, FontId, RichText};
use egui_wgpu::Renderer;
use egui_winit::State;
use glam::Vec2;
use transistor_physics::CarrierState;
use transistor_renderer::RegionLabel;
use transistor_simulation::{BiasParams, FlowMeter, StateCounts, StepReport};
use wgpu::{Device, TextureFormat};
use winit::{event::WindowEvent, window::Window};

const CUTOFF_RED: Color32 = Color32::from_rgb(0xf8, 0x71, 0x71);
const ACTIVE_GREEN: Color32 = Color32::from_rgb(0x4a, 0xde, 0x80);
const INACTIVE_GREY: Color32 = Color32::from_rgb(0x47, 0x55, 0x69);
const HEADING_BLUE: Color32 = Color32::from_rgb(0x60, 0xa5, 0xfa);

/// A region label already projected to physical window pixels
pub struct ScreenLabel {
    pub position: Vec2,
    pub label: RegionLabel,
}

pub struct UiState {
    pub fps: f32,
    pub frame_time: f32,
    pub bias: BiasParams,
    pub is_paused: bool,
    pub step_one_frame: bool,
    pub carrier_count: u32,
    pub state_counts: StateCounts,
    pub flow: FlowMeter,
    pub totals: StepReport,
    pub elapsed: f64,
    pub labels: Vec<ScreenLabel>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time: 0.0,
            bias: BiasParams::default(),
            is_paused: false,
            step_one_frame: false,
            carrier_count: 0,
            state_counts: StateCounts::default(),
            flow: FlowMeter::default(),
            totals: StepReport::default(),
            elapsed: 0.0,
            labels: Vec::new(),
        }
    }
}

fn hex_color(hex: u32) -> Color32 {
    Color32::from_rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

fn state_color(state: CarrierState) -> Color32 {
    match state {
        CarrierState::Recombining => Color32::from_rgb(0xfa, 0xcc, 0x15),
        CarrierState::BaseDiffusion => HEADING_BLUE,
        CarrierState::Emitter | CarrierState::CollectorSweep | CarrierState::Hidden => {
            Color32::from_rgb(0x3b, 0x82, 0xf6)
        }
    }
}

pub struct Gui {
    context: Context,
    state: State,
    renderer: Renderer,
}

impl Gui {
    pub fn new(device: &Device, output_color_format: TextureFormat, window: &Window) -> Self {
        let context = Context::default();
        context.set_visuals(egui::Visuals::dark());
        let id = context.viewport_id();

        let state = State::new(
            context.clone(),
            id,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );

        let renderer = Renderer::new(
            device,
            output_color_format,
            egui_wgpu::RendererOptions::default(),
        );

        Self {
            context,
            state,
            renderer,
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);
        response.consumed
    }

    /// Record the GUI pass into `encoder`. The returned buffers must be
    /// submitted before it.
    pub fn render(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &Window,
        view: &wgpu::TextureView,
        ui_state: &mut UiState,
    ) -> Vec<wgpu::CommandBuffer> {
        let raw_input = self.state.take_egui_input(window);

        let full_output = self.context.run(raw_input, |ctx| {
            Self::ui(ctx, ui_state);
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let size = window.inner_size();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer
                .update_texture(device, queue, *id, image_delta);
        }

        let command_buffers = self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            self.renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }

        command_buffers
    }

    fn ui(ctx: &Context, state: &mut UiState) {
        Self::scene_overlay(ctx, state);

        // Circuit Controls (Bottom Right)
        egui::Window::new("Circuit Controls")
            .anchor(Align2::RIGHT_BOTTOM, [-10.0, -10.0])
            .resizable(false)
            .collapsible(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                let active = state.bias.is_active();

                ui.label(RichText::new("V_BE (Base-Emitter)").color(HEADING_BLUE));
                ui.add(
                    egui::Slider::new(&mut state.bias.vbe, BiasParams::VBE_RANGE)
                        .step_by(BiasParams::VBE_STEP)
                        .fixed_decimals(2)
                        .suffix(" V"),
                );
                ui.horizontal(|ui| {
                    ui.small("Cutoff (<0.6V)");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.small("Saturation (>0.8V)");
                    });
                });
                if !active {
                    ui.colored_label(
                        CUTOFF_RED,
                        "Transistor in Cutoff. Increase V_BE to start flow.",
                    );
                }

                ui.separator();
                ui.label(RichText::new("V_CE (Collector-Emitter)").color(ACTIVE_GREEN));
                ui.add(
                    egui::Slider::new(&mut state.bias.vce, BiasParams::VCE_RANGE)
                        .step_by(BiasParams::VCE_STEP)
                        .fixed_decimals(1)
                        .suffix(" V"),
                );
                ui.small(
                    "Controls the strength of the electric field sweeping electrons into the collector.",
                );

                ui.separator();
                egui::Grid::new("circuit_readouts")
                    .num_columns(2)
                    .spacing([24.0, 4.0])
                    .show(ui, |ui| {
                        ui.label("Estimated I_C");
                        let current = format!(
                            "{:.1} mA",
                            state.bias.estimated_collector_current_ma()
                        );
                        let color = if active { ACTIVE_GREEN } else { INACTIVE_GREY };
                        ui.label(RichText::new(current).monospace().color(color));
                        ui.end_row();

                        ui.label("Current Gain (β)");
                        ui.label(
                            RichText::new(format!("~{:.0}", BiasParams::NOMINAL_CURRENT_GAIN))
                                .monospace()
                                .color(HEADING_BLUE),
                        );
                        ui.end_row();

                        ui.label("Observed gain");
                        let observed = match state.flow.observed_gain() {
                            Some(gain) => format!("{gain:.1}"),
                            None => "n/a".to_string(),
                        };
                        ui.label(RichText::new(observed).monospace());
                        ui.end_row();
                    });

                ui.separator();
                ui.horizontal(|ui| {
                    let label = if state.is_paused { "▶ Resume" } else { "⏸ Pause" };
                    if ui.button(label).clicked() {
                        state.is_paused = !state.is_paused;
                    }
                    if ui
                        .add_enabled(state.is_paused, egui::Button::new("Step"))
                        .clicked()
                    {
                        state.step_one_frame = true;
                    }
                });
            });

        // Working Principle (Top Right)
        egui::Window::new("Working Principle")
            .anchor(Align2::RIGHT_TOP, [-10.0, 10.0])
            .resizable(false)
            .collapsible(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.strong("1. Emitter Injection (I_E)");
                ui.label(
                    "Heavily doped Emitter (N) is forward-biased. Electrons overcome the \
                     potential barrier and inject into the Base.",
                );
                ui.separator();

                ui.strong("2. Recombination (I_B)");
                ui.label(
                    "The Base (P) is very thin and lightly doped. A small % of electrons \
                     recombine with holes and exit the Base terminal (Base Current).",
                );
                ui.colored_label(
                    state_color(CarrierState::Recombining),
                    "Shown as yellow particles dropping down.",
                );
                ui.separator();

                ui.strong("3. Collection (I_C)");
                ui.label(
                    "Most electrons diffuse across the Base. The strong reverse-bias field \
                     at the BC junction sweeps them rapidly into the Collector.",
                );
            });

        // Statistics (Bottom Left)
        egui::Window::new("Statistics")
            .anchor(Align2::LEFT_BOTTOM, [10.0, -10.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                ui.label(format!("FPS: {:.1}", state.fps));
                ui.label(format!("Frame Time: {:.2} ms", state.frame_time));
                ui.label(format!("Simulated: {:.1} s", state.elapsed));
                ui.separator();

                ui.heading("Carriers");
                ui.label(format!("Total: {}", state.carrier_count));
                for carrier_state in CarrierState::REACHABLE {
                    ui.colored_label(
                        state_color(carrier_state),
                        format!(
                            "{}: {}",
                            carrier_state.label(),
                            state.state_counts.get(carrier_state)
                        ),
                    );
                }
                ui.separator();

                ui.heading("Flow (per second)");
                ui.label(format!("Injected: {:.1}", state.flow.injection_rate));
                ui.label(format!("Collected: {:.1}", state.flow.collection_rate));
                ui.label(format!("Recombined: {:.1}", state.flow.recombination_rate));
                ui.separator();

                ui.heading("Totals");
                ui.label(format!("Collected: {}", state.totals.collected));
                ui.label(format!("Recombined: {}", state.totals.recombined));
                ui.label(format!("Blocked: {}", state.totals.blocked));
            });
    }

    /// Title and region labels painted behind the windows
    fn scene_overlay(ctx: &Context, state: &UiState) {
        let painter = ctx.layer_painter(egui::LayerId::background());
        let pixels_per_point = ctx.pixels_per_point();

        painter.text(
            egui::pos2(16.0, 16.0),
            Align2::LEFT_TOP,
            "NPN Transistor  Active Region",
            FontId::proportional(24.0),
            Color32::WHITE,
        );

        for ScreenLabel { position, label } in &state.labels {
            let pos = egui::pos2(
                position.x / pixels_per_point,
                position.y / pixels_per_point,
            );
            let anchor = if label.heading {
                Align2::CENTER_BOTTOM
            } else {
                Align2::CENTER_CENTER
            };
            painter.text(
                pos,
                anchor,
                label.text,
                FontId::proportional(label.size),
                hex_color(label.color),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color(0x3b82f6), Color32::from_rgb(0x3b, 0x82, 0xf6));
    }

    #[test]
    fn test_default_ui_state_matches_default_bias() {
        let state = UiState::default();
        assert_eq!(state.bias, BiasParams::default());
        assert!(!state.is_paused);
        assert!(state.labels.is_empty());
    }
}
