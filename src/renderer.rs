// Renderer module for TriCam

use std::rc::Rc;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{Adapter, Buffer, RenderPipeline};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::{Error, Result};
use crate::mesh::{ObjectConstants, RenderContext, RenderDevice, Vertex};
use crate::overlay::DebugOverlay;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.4,
    g: 0.6,
    b: 0.75,
    a: 1.0,
};

/// Vertex and index buffers of one mesh. Clones share the same GPU buffers.
#[derive(Debug, Clone)]
pub struct GpuMesh {
    vertex_buffer: Rc<Buffer>,
    index_buffer: Rc<Buffer>,
}

/// One draw staged for the current frame.
#[derive(Debug, Clone)]
struct StagedDraw<B> {
    buffers: B,
    slot: u32,
    index_count: u32,
}

/// Collects a frame's object constants and draws so they can be uploaded in one
/// go and replayed inside a single render pass.
///
/// Each draw snapshots whatever was last written to the constant slot and
/// receives its own uniform offset.
#[derive(Debug)]
pub struct FrameRecorder<B> {
    slot: ObjectConstants,
    constants: Vec<ObjectConstants>,
    draws: Vec<StagedDraw<B>>,
}

impl<B> Default for FrameRecorder<B> {
    fn default() -> Self {
        Self {
            slot: bytemuck::Zeroable::zeroed(),
            constants: Vec::new(),
            draws: Vec::new(),
        }
    }
}

impl<B: Clone> RenderContext<B> for FrameRecorder<B> {
    fn write_constants(&mut self, constants: &ObjectConstants) {
        self.slot = *constants;
    }

    fn draw_indexed(&mut self, buffers: &B, index_count: u32) {
        let slot = self.constants.len() as u32;
        self.constants.push(self.slot);
        self.draws.push(StagedDraw {
            buffers: buffers.clone(),
            slot,
            index_count,
        });
    }
}

impl<B> FrameRecorder<B> {
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}

/// Picks the swap-chain present mode. Without vsync, tearing is preferred when
/// the surface allows it.
pub fn choose_present_mode(vsync: bool, supported: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| supported.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

pub struct Renderer {
    adapter: Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: RenderPipeline,
    depth_view: wgpu::TextureView,
    object_buffer: Buffer,
    object_bind_group: wgpu::BindGroup,
    object_stride: wgpu::BufferAddress,
    object_capacity: usize,
}

impl Renderer {
    /// Opens the GPU for `window`. `object_capacity` is the number of per-object
    /// constant slots, one per entity drawn each frame.
    pub async fn new(window: Arc<Window>, vsync: bool, object_capacity: usize) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(Error::NoAdapter)?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        // The scene's colors are authored for a plain UNORM back buffer.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(Error::NoSurfaceFormat)?;
        let present_mode = choose_present_mode(vsync, &surface_caps.present_modes);
        log::info!("surface format {surface_format:?}, present mode {present_mode:?}");

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let vertex_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/vertex.wgsl").into()),
        });
        let pixel_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Pixel Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/pixel.wgsl").into()),
        });

        let constants_size = std::mem::size_of::<ObjectConstants>() as wgpu::BufferAddress;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(constants_size),
                },
                count: None,
            }],
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &pixel_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                // Shapes are wound clockwise as seen from the default cameras.
                front_face: wgpu::FrontFace::Cw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let depth_view = create_depth_view(&device, config.width, config.height);

        let object_capacity = object_capacity.max(1);
        let object_stride = wgpu::util::align_to(
            constants_size,
            device.limits().min_uniform_buffer_offset_alignment as wgpu::BufferAddress,
        );
        let object_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Constants Buffer"),
            size: object_stride * object_capacity as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &object_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(constants_size),
                }),
            }],
        });

        Ok(Self {
            adapter,
            device,
            queue,
            surface,
            config,
            pipeline,
            depth_view,
            object_buffer,
            object_bind_group,
            object_stride,
            object_capacity,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        // Alpha modes can change when the window moves between outputs.
        let surface_caps = self.surface.get_capabilities(&self.adapter);
        if let Some(&alpha_mode) = surface_caps.alpha_modes.first() {
            self.config.alpha_mode = alpha_mode;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, new_size.width, new_size.height);
        log::debug!("surface resized to {}x{}", new_size.width, new_size.height);
    }

    /// Reconfigures the surface at its current size, after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        self.resize(self.size());
    }

    pub fn begin_frame(&self) -> FrameRecorder<GpuMesh> {
        FrameRecorder::default()
    }

    /// Uploads the staged constants, replays the staged draws, paints the
    /// overlay on top and presents.
    pub fn render(
        &mut self,
        frame: &FrameRecorder<GpuMesh>,
        overlay: &mut DebugOverlay,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let draws = if frame.draws.len() > self.object_capacity {
            log::warn!(
                "{} draws recorded but only {} object slots exist; dropping the rest",
                frame.draws.len(),
                self.object_capacity
            );
            &frame.draws[..self.object_capacity]
        } else {
            &frame.draws[..]
        };

        for draw in draws {
            self.queue.write_buffer(
                &self.object_buffer,
                draw.slot as wgpu::BufferAddress * self.object_stride,
                bytemuck::bytes_of(&frame.constants[draw.slot as usize]),
            );
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for draw in draws {
                let offset = (draw.slot as wgpu::BufferAddress * self.object_stride) as wgpu::DynamicOffset;
                render_pass.set_bind_group(0, &self.object_bind_group, &[offset]);
                render_pass.set_vertex_buffer(0, draw.buffers.vertex_buffer.slice(..));
                render_pass.set_index_buffer(draw.buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        let overlay_commands = overlay.paint(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            [self.config.width, self.config.height],
        );

        self.queue
            .submit(overlay_commands.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        Ok(())
    }
}

impl RenderDevice for Renderer {
    type Buffers = GpuMesh;

    fn create_mesh_buffers(&self, label: &str, vertices: &[Vertex], indices: &[u32]) -> GpuMesh {
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        GpuMesh {
            vertex_buffer: Rc::new(vertex_buffer),
            index_buffer: Rc::new(index_buffer),
        }
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::testing::{triangle, FakeBuffers, RecordingDevice};
    use glam::{Mat4, Vec4};

    fn constants(tint: f32) -> ObjectConstants {
        ObjectConstants::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Vec4::splat(tint))
    }

    #[test]
    fn each_draw_gets_its_own_slot() {
        let device = RecordingDevice::default();
        let tri = triangle();
        let buffers: FakeBuffers = device.create_mesh_buffers("tri", &tri.vertices, &tri.indices);

        let mut frame = FrameRecorder::default();
        frame.write_constants(&constants(0.25));
        frame.draw_indexed(&buffers, 3);
        frame.write_constants(&constants(0.75));
        frame.draw_indexed(&buffers, 3);
        // Drawing again without a new write reuses the last constants.
        frame.draw_indexed(&buffers, 3);

        assert_eq!(frame.draw_count(), 3);
        let slots: Vec<u32> = frame.draws.iter().map(|d| d.slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
        assert_eq!(frame.constants[0].color_tint, [0.25; 4]);
        assert_eq!(frame.constants[1].color_tint, [0.75; 4]);
        assert_eq!(frame.constants[2].color_tint, [0.75; 4]);
    }

    #[test]
    fn vsync_always_uses_fifo() {
        let all = [
            wgpu::PresentMode::Immediate,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Fifo,
        ];
        assert_eq!(choose_present_mode(true, &all), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn without_vsync_prefers_tearing() {
        let all = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Immediate,
        ];
        assert_eq!(choose_present_mode(false, &all), wgpu::PresentMode::Immediate);
        assert_eq!(
            choose_present_mode(false, &[wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox]),
            wgpu::PresentMode::Mailbox
        );
        assert_eq!(
            choose_present_mode(false, &[wgpu::PresentMode::Fifo]),
            wgpu::PresentMode::Fifo
        );
    }
}
