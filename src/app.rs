// Application loop for TriCam

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::config::SceneConfig;
use crate::error::Result;
use crate::input::InputState;
use crate::overlay::{DebugOverlay, FrameStats};
use crate::renderer::{GpuMesh, Renderer};
use crate::scene::{Control, Scene};

/// Window settings taken from the command line.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

/// Frame timing: delta time per frame and a frames-per-second figure refreshed
/// once per second.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    window_start: Instant,
    window_frames: u32,
    fps: f32,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self {
            last: now,
            window_start: now,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Seconds since the previous tick.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;

        self.window_frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.window_frames as f32 / elapsed.as_secs_f32();
            self.window_frames = 0;
            self.window_start = now;
        }
        dt
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

pub struct App {
    window: Arc<Window>,
    renderer: Renderer,
    overlay: DebugOverlay,
    scene: Scene<GpuMesh>,
    input: InputState,
    clock: FrameClock,
}

impl App {
    pub async fn new(event_loop: &EventLoop<()>, options: &AppOptions, config: &SceneConfig) -> Result<Self> {
        // Create window with Arc for shared ownership
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(options.title.as_str())
                .with_inner_size(PhysicalSize::new(options.width, options.height))
                .build(event_loop)?,
        );

        let renderer = Renderer::new(window.clone(), options.vsync, config.entities.len()).await?;
        let size = renderer.size();
        let scene = Scene::from_config(&renderer, config, size.width as f32 / size.height as f32)?;
        let overlay = DebugOverlay::new(&window, renderer.device(), renderer.surface_format());
        log::info!(
            "scene ready: {} meshes, {} entities, {} cameras",
            scene.meshes().len(),
            scene.entities().len(),
            scene.cameras().len()
        );

        Ok(Self {
            window,
            renderer,
            overlay,
            scene,
            input: InputState::new(),
            clock: FrameClock::new(Instant::now()),
        })
    }

    pub fn run(mut self, event_loop: EventLoop<()>) -> Result<()> {
        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                    self.overlay.handle_event(&self.window, &event);
                    self.input.handle_event(&event);

                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::Resized(physical_size) => self.resize(physical_size),
                        WindowEvent::RedrawRequested => self.frame(target),
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    self.window.request_redraw();
                }
                _ => {}
            }
        })?;
        Ok(())
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.renderer.resize(new_size);
        self.scene.resize(new_size.width, new_size.height);
    }

    /// One full frame: overlay, update, draw, present.
    fn frame(&mut self, target: &EventLoopWindowTarget<()>) {
        let dt = self.clock.tick(Instant::now());
        let size = self.renderer.size();
        let stats = FrameStats {
            fps: self.clock.fps(),
            width: size.width,
            height: size.height,
        };

        let actions = self.overlay.run(&self.window, &self.scene, &stats);
        for (index, params) in actions.edits {
            self.scene.apply_params(index, params);
        }
        if actions.switch_camera {
            self.scene.switch_camera();
        }

        let input = self.input.snapshot(self.overlay.capture());
        self.input.begin_frame();
        if self.scene.update(&input, dt) == Control::Quit {
            log::info!("quit requested");
            target.exit();
            return;
        }

        let mut frame = self.renderer.begin_frame();
        self.scene.draw(&mut frame);

        match self.renderer.render(&frame, &mut self.overlay) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated; reconfiguring");
                self.renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory; exiting");
                target.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out; skipping frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tick_reports_delta_time() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start);
        let dt = clock.tick(start + Duration::from_millis(16));
        assert_relative_eq!(dt, 0.016, epsilon = 1e-6);
        let dt = clock.tick(start + Duration::from_millis(50));
        assert_relative_eq!(dt, 0.034, epsilon = 1e-6);
    }

    #[test]
    fn fps_refreshes_once_per_second() {
        let start = Instant::now();
        let mut clock = FrameClock::new(start);
        for frame in 1..60 {
            clock.tick(start + Duration::from_millis(frame * 16));
        }
        assert_eq!(clock.fps(), 0.0);

        // 63rd frame crosses the one-second mark.
        for frame in 60..=63 {
            clock.tick(start + Duration::from_millis(frame * 16));
        }
        assert_relative_eq!(clock.fps(), 63.0 / 1.008, epsilon = 1e-3);
    }
}
