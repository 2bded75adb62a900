// Mesh module for TriCam

use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};

/// Vertex layout shared by every mesh: position followed by an RGBA color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    pub const fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side geometry, consumed once when a [`Mesh`] is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Per-object constants uploaded before each draw.
///
/// Matrices are column-major, matching WGSL `mat4x4<f32>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectConstants {
    pub world: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub color_tint: [f32; 4],
}

impl ObjectConstants {
    pub fn new(world: Mat4, view: Mat4, projection: Mat4, tint: Vec4) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            color_tint: tint.to_array(),
        }
    }
}

/// Creates GPU buffers for mesh geometry.
pub trait RenderDevice {
    type Buffers;

    fn create_mesh_buffers(&self, label: &str, vertices: &[Vertex], indices: &[u32]) -> Self::Buffers;
}

/// Receives per-object constants and indexed draws during a frame.
pub trait RenderContext<B> {
    /// Overwrites the constant slot read by the next draw.
    fn write_constants(&mut self, constants: &ObjectConstants);

    fn draw_indexed(&mut self, buffers: &B, index_count: u32);
}

/// Geometry living on the device plus a tint multiplied into every vertex color.
///
/// Vertex and index counts are fixed at construction.
#[derive(Debug)]
pub struct Mesh<B> {
    buffers: B,
    vertex_count: u32,
    index_count: u32,
    tint: Vec4,
}

impl<B> Mesh<B> {
    pub fn new<D>(device: &D, label: &str, data: &MeshData) -> Self
    where
        D: RenderDevice<Buffers = B>,
    {
        Self {
            buffers: device.create_mesh_buffers(label, &data.vertices, &data.indices),
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
            tint: Vec4::ONE,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn tint(&self) -> Vec4 {
        self.tint
    }

    /// Each channel is expected in `0.0..=1.0`.
    pub fn set_tint(&mut self, tint: Vec4) {
        self.tint = tint;
    }

    pub fn draw<C: RenderContext<B>>(&self, ctx: &mut C) {
        ctx.draw_indexed(&self.buffers, self.index_count);
    }
}

/// Index of a mesh inside a [`MeshArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub usize);

/// Owns every mesh in the scene; entities refer to them by handle, so several
/// entities can share one set of buffers (and its tint).
#[derive(Debug)]
pub struct MeshArena<B> {
    meshes: Vec<Mesh<B>>,
}

impl<B> Default for MeshArena<B> {
    fn default() -> Self {
        Self { meshes: Vec::new() }
    }
}

impl<B> MeshArena<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: Mesh<B>) -> MeshHandle {
        self.meshes.push(mesh);
        MeshHandle(self.meshes.len() - 1)
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&Mesh<B>> {
        self.meshes.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> Option<&mut Mesh<B>> {
        self.meshes.get_mut(handle.0)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<Vertex>(), 28);
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 28);
        assert_eq!(layout.attributes[1].offset, 12);
    }

    #[test]
    fn constants_fit_uniform_rules() {
        // Uniform structs must be a multiple of 16 bytes.
        assert_eq!(std::mem::size_of::<ObjectConstants>() % 16, 0);
    }

    #[test]
    fn mesh_keeps_counts_and_draws_them() {
        let device = RecordingDevice::default();
        let mesh = Mesh::new(&device, "tri", &triangle());
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.tint(), Vec4::ONE);

        let mut ctx = RecordingContext::default();
        ctx.write_constants(&ObjectConstants::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Vec4::ONE));
        mesh.draw(&mut ctx);
        assert_eq!(ctx.draws.len(), 1);
        assert_eq!(ctx.draws[0].index_count, 3);
    }

    #[test]
    fn arena_hands_out_sequential_handles() {
        let device = RecordingDevice::default();
        let mut arena = MeshArena::new();
        let a = arena.insert(Mesh::new(&device, "a", &triangle()));
        let b = arena.insert(Mesh::new(&device, "b", &triangle()));
        assert_eq!((a, b), (MeshHandle(0), MeshHandle(1)));
        assert_eq!(device.created(), 2);

        arena.get_mut(b).unwrap().set_tint(Vec4::new(0.5, 0.0, 0.5, 1.0));
        assert_eq!(arena.get(a).unwrap().tint(), Vec4::ONE);
        assert!(arena.get(MeshHandle(2)).is_none());
    }
}
