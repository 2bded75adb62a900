// Camera module for TriCam

use glam::{Mat4, Vec2, Vec3};
use winit::keyboard::KeyCode;

use crate::input::InputSnapshot;
use crate::math::Transform;

pub const DEFAULT_NEAR: f32 = 0.01;
pub const DEFAULT_FAR: f32 = 1000.0;

/// A free-flying perspective camera.
///
/// The view and projection matrices are stored, not derived on read:
/// [`Camera::update_view_matrix`] must run after moving the transform and
/// [`Camera::update_projection_matrix`] after the output aspect ratio changes.
/// [`Camera::update`] does the former itself.
///
/// # Controls
///
/// - **W/S**: Move forward/backward
/// - **A/D**: Strafe left/right
/// - **Q/E**: Move up/down
/// - **Left mouse + drag**: Look around
#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    move_speed: f32,
    look_speed: f32,
    fov: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    /// `fov` is the vertical field of view in radians.
    pub fn new(position: Vec3, move_speed: f32, look_speed: f32, fov: f32, aspect_ratio: f32) -> Self {
        let mut transform = Transform::identity();
        transform.set_position(position);

        let mut camera = Self {
            transform,
            move_speed,
            look_speed,
            fov,
            aspect_ratio,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_view_matrix();
        camera.update_projection_matrix(aspect_ratio);
        camera
    }

    /// Replaces the clip distances. Expects `0 < near < far`.
    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self.update_projection_matrix(self.aspect_ratio);
        self
    }

    /// Applies one frame of movement and mouse look, then rebuilds the view.
    pub fn update(&mut self, input: &InputSnapshot, dt: f32) {
        let step = self.move_speed * dt;
        let moves = [
            (KeyCode::KeyW, Vec3::new(0.0, 0.0, step)),
            (KeyCode::KeyS, Vec3::new(0.0, 0.0, -step)),
            (KeyCode::KeyA, Vec3::new(-step, 0.0, 0.0)),
            (KeyCode::KeyD, Vec3::new(step, 0.0, 0.0)),
            (KeyCode::KeyQ, Vec3::new(0.0, step, 0.0)),
            (KeyCode::KeyE, Vec3::new(0.0, -step, 0.0)),
        ];
        for (key, delta) in moves {
            if input.key_down(key) {
                self.transform.move_relative(delta);
            }
        }

        if input.primary_down() {
            // Look steps are whole units before the frame-time scale.
            let scaled = input.mouse_delta() * self.look_speed;
            let delta = Vec2::new(scaled.x.trunc(), scaled.y.trunc());
            // Vertical drag drives pitch and horizontal drag drives yaw, both unnegated.
            self.transform.rotate(Vec3::new(delta.y * dt, delta.x * dt, 0.0));
        }

        self.update_view_matrix();
    }

    pub fn update_view_matrix(&mut self) {
        let position = self.transform.position();
        self.view = Mat4::look_at_lh(position, position + self.transform.forward(), Vec3::Y);
    }

    pub fn update_projection_matrix(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.projection = Mat4::perspective_lh(self.fov, aspect_ratio, self.near, self.far);
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }
}

/// The fixed set of scene cameras and which one is rendering.
#[derive(Debug, Clone)]
pub struct CameraSet {
    cameras: Vec<Camera>,
    active: usize,
}

impl CameraSet {
    /// Returns `None` for an empty list; a scene always has a camera to render from.
    pub fn new(cameras: Vec<Camera>) -> Option<Self> {
        if cameras.is_empty() {
            None
        } else {
            Some(Self { cameras, active: 0 })
        }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Camera {
        &self.cameras[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Camera {
        &mut self.cameras[self.active]
    }

    /// Switches to the next camera, wrapping after the last.
    pub fn next(&mut self) -> usize {
        self.active = (self.active + 1) % self.cameras.len();
        self.active
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Camera> {
        self.cameras.iter()
    }

    pub fn resize(&mut self, aspect_ratio: f32) {
        for camera in &mut self.cameras {
            camera.update_projection_matrix(aspect_ratio);
        }
    }
}
