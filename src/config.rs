// Scene configuration for TriCam

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::camera::{DEFAULT_FAR, DEFAULT_NEAR};
use crate::mesh::{MeshData, Vertex};
use crate::scene::Animation;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read scene file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML scene: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON scene: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scene has no cameras")]
    NoCameras,
    #[error("entity '{entity}' uses mesh {mesh}, but only {available} meshes exist")]
    MissingMesh {
        entity: String,
        mesh: usize,
        available: usize,
    },
    #[error("mesh '{mesh}' index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },
    #[error("camera {camera} has invalid clip planes (near {near}, far {far})")]
    ClipPlanes { camera: usize, near: f32, far: f32 },
    #[error("sweep leader {leader} is out of range for {entities} entities")]
    SweepLeader { leader: usize, entities: usize },
}

/// One mesh definition; its geometry is uploaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    pub name: String,
    #[serde(flatten)]
    pub geometry: MeshData,
    #[serde(default = "white")]
    pub tint: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    /// Index into [`SceneConfig::meshes`].
    pub mesh: usize,
    #[serde(default)]
    pub position: [f32; 3],
    /// `(pitch, yaw, roll)` in radians.
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub animation: Option<Animation>,
}

impl EntityConfig {
    pub fn new(name: impl Into<String>, mesh: usize) -> Self {
        Self {
            name: name.into(),
            mesh,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: unit_scale(),
            animation: None,
        }
    }

    fn animated(mut self, animation: Animation) -> Self {
        self.animation = Some(animation);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub position: [f32; 3],
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_look_speed")]
    pub look_speed: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

impl CameraConfig {
    pub fn new(position: [f32; 3], fov: f32) -> Self {
        Self {
            position,
            move_speed: default_move_speed(),
            look_speed: default_look_speed(),
            fov,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

/// Bounds of the scripted back-and-forth motion, measured on the leader's x.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub leader: usize,
    pub min_x: f32,
    pub max_x: f32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            leader: 0,
            min_x: 0.0,
            max_x: 1.0,
        }
    }
}

/// Everything needed to build a [`crate::scene::Scene`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub meshes: Vec<MeshConfig>,
    pub entities: Vec<EntityConfig>,
    pub cameras: Vec<CameraConfig>,
    #[serde(default)]
    pub sweep: SweepConfig,
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

fn unit_scale() -> [f32; 3] {
    [1.0; 3]
}

fn default_move_speed() -> f32 {
    5.0
}

fn default_look_speed() -> f32 {
    10.0
}

fn default_near() -> f32 {
    DEFAULT_NEAR
}

fn default_far() -> f32 {
    DEFAULT_FAR
}

impl SceneConfig {
    /// Reads a scene file: `.yaml`/`.yml` as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&text)?,
            _ => Self::from_json(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cameras.is_empty() {
            return Err(ConfigError::NoCameras);
        }

        for (index, camera) in self.cameras.iter().enumerate() {
            if !(camera.near > 0.0 && camera.near < camera.far) {
                return Err(ConfigError::ClipPlanes {
                    camera: index,
                    near: camera.near,
                    far: camera.far,
                });
            }
        }

        for mesh in &self.meshes {
            let vertex_count = mesh.geometry.vertices.len();
            if let Some(&index) = mesh.geometry.indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(ConfigError::IndexOutOfRange {
                    mesh: mesh.name.clone(),
                    index,
                    vertex_count,
                });
            }
        }

        for entity in &self.entities {
            if entity.mesh >= self.meshes.len() {
                return Err(ConfigError::MissingMesh {
                    entity: entity.name.clone(),
                    mesh: entity.mesh,
                    available: self.meshes.len(),
                });
            }
        }

        if !self.entities.is_empty() && self.sweep.leader >= self.entities.len() {
            return Err(ConfigError::SweepLeader {
                leader: self.sweep.leader,
                entities: self.entities.len(),
            });
        }

        Ok(())
    }
}

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
const MAGENTA: [f32; 4] = [0.5, 0.0, 0.5, 1.0];

fn triangle() -> MeshData {
    MeshData {
        vertices: vec![
            Vertex::new([0.0, 0.5, 0.0], RED),
            Vertex::new([0.5, -0.5, 0.0], BLUE),
            Vertex::new([-0.5, -0.5, 0.0], GREEN),
        ],
        indices: vec![0, 1, 2],
    }
}

fn quad() -> MeshData {
    MeshData {
        vertices: vec![
            Vertex::new([0.5, 1.5, 0.0], RED),
            Vertex::new([1.5, 1.5, 0.0], BLUE),
            Vertex::new([1.5, 0.5, 0.0], RED),
            Vertex::new([0.5, 0.5, 0.0], BLUE),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

fn diamond() -> MeshData {
    MeshData {
        vertices: vec![
            Vertex::new([-0.5, 0.8, 0.0], RED),
            Vertex::new([-0.2, 0.5, 0.0], BLUE),
            Vertex::new([-0.8, 0.5, 0.0], GREEN),
            Vertex::new([-0.5, 0.2, 0.0], MAGENTA),
        ],
        // The trailing index is an incomplete triangle and is never rasterised.
        indices: vec![2, 0, 1, 2, 1, 3, 2],
    }
}

impl Default for SceneConfig {
    /// Three shapes drawn as five meshes (the triangle and quad appear twice),
    /// animated against each other, seen from three cameras.
    fn default() -> Self {
        let mesh = |name: &str, geometry: MeshData| MeshConfig {
            name: name.to_string(),
            geometry,
            tint: white(),
        };

        let spin = Animation::Spin {
            rate: [0.0, 0.0, 10f32.to_radians()],
        };

        Self {
            meshes: vec![
                mesh("triangle", triangle()),
                mesh("quad", quad()),
                mesh("diamond", diamond()),
                mesh("triangle copy", triangle()),
                mesh("quad copy", quad()),
            ],
            entities: vec![
                EntityConfig::new("triangle", 0).animated(Animation::Sweep {
                    step: [0.001, 0.001, 0.0],
                }),
                EntityConfig::new("quad", 1).animated(spin),
                EntityConfig::new("diamond", 2).animated(Animation::Pulse {
                    grow: [1.001, 1.001, 1.0],
                    shrink: [0.999, 0.999, 1.0],
                }),
                EntityConfig::new("spinning triangle", 3).animated(spin),
                EntityConfig::new("sliding quad", 4).animated(Animation::Sweep {
                    step: [-0.001, -0.001, 0.0],
                }),
            ],
            cameras: vec![
                CameraConfig::new([10.0, 0.0, -10.0], FRAC_PI_2),
                CameraConfig::new([0.0, 0.0, -10.0], FRAC_PI_3),
                CameraConfig::new([-10.0, 0.0, -10.0], FRAC_PI_4),
            ],
            sweep: SweepConfig::default(),
        }
    }
}
