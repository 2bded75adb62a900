// Scene module for TriCam

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

use crate::camera::{Camera, CameraSet};
use crate::config::{ConfigError, SceneConfig, SweepConfig};
use crate::input::InputSnapshot;
use crate::math::Transform;
use crate::mesh::{Mesh, MeshArena, MeshHandle, ObjectConstants, RenderContext, RenderDevice};

/// Scripted motion applied to an entity every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Animation {
    /// Moves by `step` per frame while the scene sweep runs forward, by `-step` backward.
    Sweep { step: [f32; 3] },
    /// Multiplies scale by `grow` per frame while the sweep runs forward, by `shrink` backward.
    Pulse { grow: [f32; 3], shrink: [f32; 3] },
    /// Adds `rate` radians per second to `(pitch, yaw, roll)`.
    Spin { rate: [f32; 3] },
}

/// Represents an object within the 3D scene.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    pub mesh: MeshHandle,
    pub animation: Option<Animation>,
}

impl Entity {
    pub fn new(name: impl Into<String>, transform: Transform, mesh: MeshHandle) -> Self {
        Self {
            name: name.into(),
            transform,
            mesh,
            animation: None,
        }
    }

    /// Uploads this entity's matrices and tint, then draws its mesh.
    pub fn draw<B, C>(&self, meshes: &MeshArena<B>, ctx: &mut C, camera: &Camera)
    where
        C: RenderContext<B>,
    {
        let Some(mesh) = meshes.get(self.mesh) else {
            log::warn!("entity '{}' refers to missing mesh {}", self.name, self.mesh.0);
            return;
        };
        let constants = ObjectConstants::new(
            self.transform.world_matrix(),
            camera.view(),
            camera.projection(),
            mesh.tint(),
        );
        ctx.write_constants(&constants);
        mesh.draw(ctx);
    }
}

/// The overlay's view of one entity: its transform fields and its mesh tint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditableParams {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub color: Vec4,
}

/// Direction of the scripted back-and-forth motion this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Forward,
    Backward,
    /// Reached the low end; nothing sweeps this frame and the next frame runs forward.
    Turning,
}

/// Back-and-forth driver shared by every sweeping and pulsing entity, steered by
/// the x position of one leader entity.
#[derive(Debug, Clone)]
pub struct Sweep {
    config: SweepConfig,
    forward: bool,
}

impl Sweep {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            forward: true,
        }
    }

    pub fn advance(&mut self, leader_x: f32) -> SweepPhase {
        if leader_x <= self.config.max_x && self.forward {
            SweepPhase::Forward
        } else if leader_x > self.config.min_x {
            self.forward = false;
            SweepPhase::Backward
        } else {
            self.forward = true;
            SweepPhase::Turning
        }
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }
}

/// Whether the frame loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Represents the entire 3D scene: meshes, entities and the camera set.
#[derive(Debug)]
pub struct Scene<B> {
    meshes: MeshArena<B>,
    entities: Vec<Entity>,
    cameras: CameraSet,
    sweep: Sweep,
}

impl<B> Scene<B> {
    /// Builds GPU meshes and entities from `config`, after validating it.
    pub fn from_config<D>(device: &D, config: &SceneConfig, aspect_ratio: f32) -> Result<Self, ConfigError>
    where
        D: RenderDevice<Buffers = B>,
    {
        config.validate()?;

        let mut meshes = MeshArena::new();
        for mesh_config in &config.meshes {
            let mut mesh = Mesh::new(device, &mesh_config.name, &mesh_config.geometry);
            mesh.set_tint(Vec4::from_array(mesh_config.tint));
            meshes.insert(mesh);
        }

        let entities = config
            .entities
            .iter()
            .map(|e| Entity {
                animation: e.animation,
                ..Entity::new(
                    e.name.clone(),
                    Transform::new(e.position.into(), e.rotation.into(), e.scale.into()),
                    MeshHandle(e.mesh),
                )
            })
            .collect();

        let cameras = config
            .cameras
            .iter()
            .map(|c| {
                Camera::new(c.position.into(), c.move_speed, c.look_speed, c.fov, aspect_ratio)
                    .with_clip_planes(c.near, c.far)
            })
            .collect();
        let cameras = CameraSet::new(cameras).ok_or(ConfigError::NoCameras)?;

        Ok(Self {
            meshes,
            entities,
            cameras,
            sweep: Sweep::new(config.sweep),
        })
    }

    /// Runs one frame of simulation: camera switching, scripted animation,
    /// then active-camera movement.
    pub fn update(&mut self, input: &InputSnapshot, dt: f32) -> Control {
        if input.key_pressed(KeyCode::KeyC) {
            self.switch_camera();
        }

        self.animate(dt);
        self.cameras.active_mut().update(input, dt);

        if input.key_down(KeyCode::Escape) {
            Control::Quit
        } else {
            Control::Continue
        }
    }

    /// Advances scripted motion. Sweep and pulse steps are per frame, so their
    /// speed follows the frame rate.
    fn animate(&mut self, dt: f32) {
        let leader_x = self
            .entities
            .get(self.sweep.config.leader)
            .map(|e| e.transform.position().x);
        let phase = leader_x.map(|x| self.sweep.advance(x));
        let forward = self.sweep.is_forward();

        for entity in &mut self.entities {
            match entity.animation {
                Some(Animation::Sweep { step }) => match phase {
                    Some(SweepPhase::Forward) => entity.transform.move_absolute(step.into()),
                    Some(SweepPhase::Backward) => entity.transform.move_absolute(-Vec3::from(step)),
                    Some(SweepPhase::Turning) | None => {}
                },
                Some(Animation::Pulse { grow, shrink }) => {
                    let factor = if forward { grow } else { shrink };
                    entity.transform.scale_by(factor.into());
                }
                Some(Animation::Spin { rate }) => entity.transform.rotate(Vec3::from(rate) * dt),
                None => {}
            }
        }
    }

    /// Draws every entity from the active camera.
    pub fn draw<C: RenderContext<B>>(&self, ctx: &mut C) {
        let camera = self.cameras.active();
        for entity in &self.entities {
            entity.draw(&self.meshes, ctx, camera);
        }
    }

    pub fn switch_camera(&mut self) -> usize {
        let index = self.cameras.next();
        log::debug!("switched to camera {}", index + 1);
        index
    }

    /// Rebuilds every camera's projection for the new output size. Zero-sized
    /// outputs (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.cameras.resize(width as f32 / height as f32);
    }

    pub fn params(&self, index: usize) -> Option<EditableParams> {
        let entity = self.entities.get(index)?;
        let color = self
            .meshes
            .get(entity.mesh)
            .map_or(Vec4::ONE, |mesh| mesh.tint());
        Some(EditableParams {
            translation: entity.transform.position(),
            rotation: entity.transform.rotation(),
            scale: entity.transform.scale(),
            color,
        })
    }

    /// Writes edited parameters back. The color lands on the entity's mesh,
    /// so entities sharing a mesh share it.
    pub fn apply_params(&mut self, index: usize, params: EditableParams) {
        let Some(entity) = self.entities.get_mut(index) else {
            return;
        };
        entity.transform.set_position(params.translation);
        entity.transform.set_rotation(params.rotation);
        entity.transform.set_scale(params.scale);
        if let Some(mesh) = self.meshes.get_mut(entity.mesh) {
            mesh.set_tint(params.color);
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn cameras(&self) -> &CameraSet {
        &self.cameras
    }

    pub fn meshes(&self) -> &MeshArena<B> {
        &self.meshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, EntityConfig, MeshConfig};
    use crate::mesh::testing::{triangle, FakeBuffers, RecordingContext, RecordingDevice};
    use approx::assert_relative_eq;
    use glam::{Mat4, Vec2};
    use std::f32::consts::FRAC_PI_2;

    fn default_scene() -> Scene<FakeBuffers> {
        Scene::from_config(&RecordingDevice::default(), &SceneConfig::default(), 16.0 / 9.0).unwrap()
    }

    fn single_triangle_config() -> SceneConfig {
        SceneConfig {
            meshes: vec![MeshConfig {
                name: "tri".into(),
                geometry: triangle(),
                tint: [1.0; 4],
            }],
            entities: vec![EntityConfig::new("tri", 0)],
            cameras: vec![CameraConfig::new([0.0, 0.0, 0.0], FRAC_PI_2)],
            sweep: SweepConfig::default(),
        }
    }

    #[test]
    fn single_triangle_produces_one_three_index_draw() {
        let scene: Scene<FakeBuffers> =
            Scene::from_config(&RecordingDevice::default(), &single_triangle_config(), 1.0).unwrap();
        let mut ctx = RecordingContext::default();
        scene.draw(&mut ctx);

        assert_eq!(ctx.draws.len(), 1);
        let draw = &ctx.draws[0];
        assert_eq!(draw.index_count, 3);
        assert_eq!(draw.buffers.vertex_count, 3);
        assert_eq!(Mat4::from_cols_array_2d(&draw.constants.world), Mat4::IDENTITY);
        assert_eq!(
            Mat4::from_cols_array_2d(&draw.constants.view),
            scene.cameras().active().view()
        );
    }

    #[test]
    fn default_scene_draws_every_entity_in_order() {
        let scene = default_scene();
        let mut ctx = RecordingContext::default();
        scene.draw(&mut ctx);

        let counts: Vec<u32> = ctx.draws.iter().map(|d| d.index_count).collect();
        assert_eq!(counts, vec![3, 6, 7, 3, 6]);
        assert_eq!(scene.meshes().len(), 5);
    }

    #[test]
    fn draws_use_the_active_camera() {
        let mut scene = default_scene();
        scene.switch_camera();
        let mut ctx = RecordingContext::default();
        scene.draw(&mut ctx);

        let expected = scene.cameras().active().projection();
        assert!(ctx
            .draws
            .iter()
            .all(|d| Mat4::from_cols_array_2d(&d.constants.projection) == expected));
    }

    #[test]
    fn c_key_cycles_cameras() {
        let mut scene = default_scene();
        let press = InputSnapshot::default().with_key_pressed(KeyCode::KeyC);
        for expected in [1, 2, 0] {
            scene.update(&press, 0.016);
            assert_eq!(scene.cameras().active_index(), expected);
        }
    }

    #[test]
    fn only_the_active_camera_moves() {
        let mut scene = default_scene();
        let idle: Vec<Vec3> = scene.cameras().iter().map(|c| c.transform().position()).collect();
        scene.update(&InputSnapshot::default().with_key_down(KeyCode::KeyW), 1.0);

        let moved: Vec<Vec3> = scene.cameras().iter().map(|c| c.transform().position()).collect();
        assert_ne!(idle[0], moved[0]);
        assert_eq!(idle[1..], moved[1..]);
    }

    #[test]
    fn escape_requests_quit() {
        let mut scene = default_scene();
        assert_eq!(scene.update(&InputSnapshot::default(), 0.016), Control::Continue);
        assert_eq!(
            scene.update(&InputSnapshot::default().with_key_down(KeyCode::Escape), 0.016),
            Control::Quit
        );
    }

    #[test]
    fn sweep_turns_around_at_the_bounds() {
        let mut sweep = Sweep::new(SweepConfig {
            leader: 0,
            min_x: 0.0,
            max_x: 1.0,
        });
        assert_eq!(sweep.advance(0.5), SweepPhase::Forward);
        assert_eq!(sweep.advance(1.0), SweepPhase::Forward);
        assert_eq!(sweep.advance(1.001), SweepPhase::Backward);
        assert_eq!(sweep.advance(0.5), SweepPhase::Backward);
        assert_eq!(sweep.advance(0.0), SweepPhase::Turning);
        assert!(sweep.is_forward());
        assert_eq!(sweep.advance(0.0), SweepPhase::Forward);
    }

    #[test]
    fn scripted_animation_moves_scales_and_spins() {
        let mut scene = default_scene();
        let idle = InputSnapshot::default();
        scene.update(&idle, 0.5);

        let e = scene.entities();
        assert_relative_eq!(e[0].transform.position().x, 0.001, epsilon = 1e-7);
        assert_relative_eq!(e[4].transform.position().y, -0.001, epsilon = 1e-7);
        assert_relative_eq!(e[2].transform.scale().x, 1.001, epsilon = 1e-7);
        assert_eq!(e[2].transform.scale().z, 1.0);
        assert_relative_eq!(e[1].transform.rotation().z, 0.5 * 10f32.to_radians(), epsilon = 1e-7);
        assert_relative_eq!(e[3].transform.rotation().z, 0.5 * 10f32.to_radians(), epsilon = 1e-7);
    }

    #[test]
    fn sweep_leader_reverses_after_reaching_max() {
        let mut scene = default_scene();
        let idle = InputSnapshot::default();
        let mut max_x = 0.0f32;
        let mut max_scale = 0.0f32;
        for _ in 0..1500 {
            scene.update(&idle, 0.016);
            max_x = max_x.max(scene.entities()[0].transform.position().x);
            max_scale = max_scale.max(scene.entities()[2].transform.scale().x);
        }
        let x = scene.entities()[0].transform.position().x;
        assert!(max_x > 1.0 && max_x < 1.01, "peak {max_x}");
        assert_relative_eq!(x, max_x - 0.499, epsilon = 0.01);
        // Pulse shrinks while the sweep runs backward.
        assert!(scene.entities()[2].transform.scale().x < max_scale);
    }

    #[test]
    fn params_round_trip_through_overlay_edits() {
        let mut scene = default_scene();
        let mut params = scene.params(1).unwrap();
        assert_eq!(params.scale, Vec3::ONE);

        params.translation = Vec3::new(1.0, 2.0, 3.0);
        params.rotation = Vec3::new(0.0, 0.0, 0.25);
        params.scale = Vec3::splat(2.0);
        params.color = Vec4::new(0.2, 0.4, 0.6, 1.0);
        scene.apply_params(1, params);

        assert_eq!(scene.params(1), Some(params));
        let mut ctx = RecordingContext::default();
        scene.draw(&mut ctx);
        assert_eq!(ctx.draws[1].constants.color_tint, [0.2, 0.4, 0.6, 1.0]);
        // Other entities keep their own meshes and tints.
        assert_eq!(ctx.draws[4].constants.color_tint, [1.0; 4]);
        assert!(scene.params(99).is_none());
    }

    #[test]
    fn resize_updates_all_projections_and_skips_zero_area() {
        let mut scene = default_scene();
        scene.resize(800, 800);
        assert!(scene.cameras().iter().all(|c| c.aspect_ratio() == 1.0));
        scene.resize(800, 0);
        assert!(scene.cameras().iter().all(|c| c.aspect_ratio() == 1.0));
    }

    #[test]
    fn mouse_look_only_while_button_held() {
        let mut scene = default_scene();
        scene.update(&InputSnapshot::default().with_mouse_drag(Vec2::new(1.0, 0.0)), 0.1);
        assert_relative_eq!(
            scene.cameras().active().transform().rotation().y,
            1.0,
            epsilon = 1e-6
        );
    }
}
