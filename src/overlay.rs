// Debug overlay for TriCam

use egui::{ClippedPrimitive, TexturesDelta};
use glam::{Vec3, Vec4};
use winit::event::WindowEvent;
use winit::window::Window;

use crate::input::InputCapture;
use crate::scene::{EditableParams, Scene};

/// Per-frame numbers shown in the overlay header.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub fps: f32,
    pub width: u32,
    pub height: u32,
}

/// What the user changed in the overlay this frame. The scene applies these
/// before its own update runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayActions {
    pub edits: Vec<(usize, EditableParams)>,
    pub switch_camera: bool,
}

struct PendingPaint {
    primitives: Vec<ClippedPrimitive>,
    textures: TexturesDelta,
    pixels_per_point: f32,
}

/// Immediate-mode panel for inspecting and tweaking the scene, drawn on top of
/// the rendered frame.
pub struct DebugOverlay {
    context: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    pending: Option<PendingPaint>,
}

impl DebugOverlay {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let context = egui::Context::default();
        context.set_visuals(egui::Visuals::dark());
        let state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, None, 1);

        Self {
            context,
            state,
            renderer,
            pending: None,
        }
    }

    /// Returns true if the overlay consumed the event.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Builds this frame's panel and keeps its geometry for [`DebugOverlay::paint`].
    pub fn run<B>(&mut self, window: &Window, scene: &Scene<B>, stats: &FrameStats) -> OverlayActions {
        let raw_input = self.state.take_egui_input(window);
        let mut actions = OverlayActions::default();
        let full_output = self.context.run(raw_input, |ctx| {
            actions = build_panel(ctx, scene, stats);
        });
        self.state
            .handle_platform_output(window, full_output.platform_output);

        let primitives = self
            .context
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        self.pending = Some(PendingPaint {
            primitives,
            textures: full_output.textures_delta,
            pixels_per_point: full_output.pixels_per_point,
        });
        actions
    }

    /// Devices the overlay wants for itself, as of the last [`DebugOverlay::run`].
    pub fn capture(&self) -> InputCapture {
        InputCapture {
            keyboard: self.context.wants_keyboard_input(),
            mouse: self.context.wants_pointer_input(),
        }
    }

    /// Records the overlay draw into `encoder` on top of `view`. The returned
    /// command buffers must be submitted before `encoder`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
    ) -> Vec<wgpu::CommandBuffer> {
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: pending.pixels_per_point,
        };

        for (id, delta) in &pending.textures.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let commands = self
            .renderer
            .update_buffers(device, queue, encoder, &pending.primitives, &screen);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.renderer
                .render(&mut render_pass, &pending.primitives, &screen);
        }

        for id in &pending.textures.free {
            self.renderer.free_texture(id);
        }
        commands
    }
}

fn drag_vec3(ui: &mut egui::Ui, label: &str, value: &mut Vec3, speed: f64) -> bool {
    ui.horizontal(|ui| {
        let mut changed = false;
        for component in [&mut value.x, &mut value.y, &mut value.z] {
            changed |= ui
                .add(egui::DragValue::new(component).speed(speed))
                .changed();
        }
        ui.label(label);
        changed
    })
    .inner
}

/// Lays out the overlay window and reports what the user edited.
pub fn build_panel<B>(ctx: &egui::Context, scene: &Scene<B>, stats: &FrameStats) -> OverlayActions {
    let mut actions = OverlayActions::default();

    egui::Window::new("Window").show(ctx, |ui| {
        ui.label(format!("FPS: {:.1}", stats.fps));
        ui.label(format!("Window dimensions: {} x {}", stats.width, stats.height));

        for (index, entity) in scene.entities().iter().enumerate() {
            let Some(mut params) = scene.params(index) else {
                continue;
            };
            ui.push_id(index, |ui| {
                egui::CollapsingHeader::new(entity.name.as_str()).show(ui, |ui| {
                    let mut changed = drag_vec3(ui, "Translation", &mut params.translation, 0.01);
                    changed |= drag_vec3(ui, "Rotation", &mut params.rotation, 0.01);
                    changed |= drag_vec3(ui, "Scale", &mut params.scale, 0.01);

                    let mut rgb = [params.color.x, params.color.y, params.color.z];
                    let color_changed = ui
                        .horizontal(|ui| {
                            let response = ui.color_edit_button_rgb(&mut rgb);
                            ui.label("Color");
                            response.changed()
                        })
                        .inner;
                    if color_changed {
                        params.color = Vec4::new(rgb[0], rgb[1], rgb[2], params.color.w);
                    }

                    if changed || color_changed {
                        actions.edits.push((index, params));
                    }
                });
            });
        }

        egui::CollapsingHeader::new("Camera Settings").show(ui, |ui| {
            let cameras = scene.cameras();
            let camera = cameras.active();
            let position = camera.transform().position();
            ui.label(format!(
                "Camera {} x: {:.3} y: {:.3} z: {:.3}",
                cameras.active_index() + 1,
                position.x,
                position.y,
                position.z
            ));
            ui.label(format!("FOV: {:.4} Radians", camera.fov()));
            if ui.button("Change Camera").clicked() {
                actions.switch_camera = true;
            }
        });
    });

    actions
}
