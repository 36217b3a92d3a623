use std::collections::HashMap;
use std::num::NonZeroU64;

use glam::Vec3;
use lumen_assets::{MeshHandle, TextureHandle};
use lumen_common::RenderTargetHandle;
use lumen_render::{
    BlendMode, Clear, DepthFunc, ProgramId, ProgramKind, RenderDevice, RenderError, UniformValue,
    Viewport,
};
use wgpu::util::DeviceExt;

use crate::pipeline::{self, DEPTH_FORMAT, PipelineKey};
use crate::primitives::Vertex;
use crate::shaders;
use crate::staging::{DrawUniforms, TextureBindings, UniformStage};

const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

#[derive(Debug, thiserror::Error)]
pub enum WgpuError {
    #[error("no compatible GPU adapter")]
    NoAdapter,
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureData { expected: usize, actual: usize },
}

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

struct DepthTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

#[derive(Debug, Clone, Copy)]
struct RasterState {
    blend: BlendMode,
    depth_func: DepthFunc,
    depth_test: bool,
    color_writes: bool,
    face_culling: bool,
    viewport: Option<Viewport>,
}

impl Default for RasterState {
    fn default() -> Self {
        Self {
            blend: BlendMode::Disabled,
            depth_func: DepthFunc::Less,
            depth_test: true,
            color_writes: true,
            face_culling: true,
            viewport: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Geometry {
    Mesh(MeshHandle),
    Fullscreen,
}

struct DrawItem {
    key: PipelineKey,
    viewport: Option<Viewport>,
    uniforms: DrawUniforms,
    textures: TextureBindings,
    geometry: Geometry,
}

struct PassRecord {
    target: Option<RenderTargetHandle>,
    clear_color: Option<Vec3>,
    clear_depth: bool,
    draws: Vec<DrawItem>,
}

impl PassRecord {
    fn new(target: Option<RenderTargetHandle>) -> Self {
        Self {
            target,
            clear_color: None,
            clear_depth: false,
            draws: Vec::new(),
        }
    }
}

/// [`RenderDevice`] backed by wgpu.
///
/// Commands are buffered per render pass and encoded by [`WgpuDevice::submit`].
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    size: (u32, u32),
    depth_view: wgpu::TextureView,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_stride: u64,
    uniform_capacity: u64,
    uniform_buffer: wgpu::Buffer,
    uniform_group: wgpu::BindGroup,

    material_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,
    white_view: wgpu::TextureView,
    empty_depth_view: wgpu::TextureView,

    modules: HashMap<ProgramKind, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    texture_groups: HashMap<TextureBindings, wgpu::BindGroup>,
    meshes: HashMap<MeshHandle, GpuMesh>,
    textures: HashMap<TextureHandle, wgpu::TextureView>,
    targets: HashMap<RenderTargetHandle, DepthTarget>,
    next_target: u32,

    state: RasterState,
    program: Option<ProgramKind>,
    stage: UniformStage,
    passes: Vec<PassRecord>,
}

fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

fn create_depth_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage,
        view_formats: &[],
    })
}

fn create_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> wgpu::TextureView {
    device
        .create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        )
        .create_view(&Default::default())
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn create_uniform_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    stride: u64,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("draw_uniform_buffer"),
        size: stride * capacity,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw_uniform_bind_group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(UNIFORM_SIZE),
            }),
        }],
    });
    (buffer, group)
}

/// Viewports arrive with a bottom-left origin; wgpu's is top-left.
fn flip_viewport(viewport: Viewport, target_height: u32) -> (f32, f32, f32, f32) {
    let top = target_height.saturating_sub(viewport.y.saturating_add(viewport.height));
    (
        viewport.x as f32,
        top as f32,
        viewport.width as f32,
        viewport.height as f32,
    )
}

impl WgpuDevice {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        color_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let filterable = wgpu::TextureSampleType::Float { filterable: true };
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_layout"),
            entries: &[
                texture_entry(0, filterable),
                texture_entry(1, filterable),
                texture_entry(2, filterable),
                texture_entry(3, filterable),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(5, wgpu::TextureSampleType::Depth),
                wgpu::BindGroupLayoutEntry {
                    binding: 6,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let uniform_stride = aligned_stride(
            UNIFORM_SIZE,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let uniform_capacity = 256;
        let (uniform_buffer, uniform_group) =
            create_uniform_buffer(&device, &uniform_layout, uniform_stride, uniform_capacity);

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let white_view = create_rgba_texture(&device, &queue, "white_texture", 1, 1, &[255; 4]);
        let empty_depth_view = create_depth_texture(
            &device,
            "empty_shadow_map",
            1,
            1,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
        .create_view(&Default::default());
        let depth_view = create_depth_texture(
            &device,
            "framebuffer_depth",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
        .create_view(&Default::default());

        Self {
            device,
            queue,
            color_format,
            size: (width.max(1), height.max(1)),
            depth_view,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            uniform_stride,
            uniform_capacity,
            uniform_buffer,
            uniform_group,
            material_sampler,
            shadow_sampler,
            white_view,
            empty_depth_view,
            modules: HashMap::new(),
            pipelines: HashMap::new(),
            texture_groups: HashMap::new(),
            meshes: HashMap::new(),
            textures: HashMap::new(),
            targets: HashMap::new(),
            next_target: 1,
            state: RasterState::default(),
            program: None,
            stage: UniformStage::default(),
            passes: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
        self.depth_view = create_depth_texture(
            &self.device,
            "framebuffer_depth",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
        .create_view(&Default::default());
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Upload indexed geometry for `handle`, replacing any previous upload.
    pub fn upload_mesh(&mut self, handle: MeshHandle, vertices: &[Vertex], indices: &[u32]) {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertex_buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_index_buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.meshes.insert(
            handle,
            GpuMesh {
                vertices: vertex_buffer,
                indices: index_buffer,
                index_count: indices.len() as u32,
            },
        );
    }

    /// Upload tightly packed RGBA8 pixels for `handle`.
    pub fn upload_texture(
        &mut self,
        handle: TextureHandle,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), WgpuError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(WgpuError::TextureData {
                expected,
                actual: rgba.len(),
            });
        }
        let view = create_rgba_texture(
            &self.device,
            &self.queue,
            "material_texture",
            width,
            height,
            rgba,
        );
        self.texture_groups
            .retain(|bindings, _| !bindings.material.contains(&Some(handle)));
        self.textures.insert(handle, view);
        Ok(())
    }

    pub fn pending_draws(&self) -> usize {
        self.passes.iter().map(|p| p.draws.len()).sum()
    }

    fn current_pass(&mut self) -> &mut PassRecord {
        if self.passes.is_empty() {
            self.passes.push(PassRecord::new(None));
        }
        let last = self.passes.len() - 1;
        &mut self.passes[last]
    }

    fn push_draw(&mut self, geometry: Geometry) {
        let Some(program) = self.program else {
            tracing::warn!("draw issued with no program bound");
            return;
        };
        let depth_only = self.current_pass().target.is_some();
        let state = self.state;
        let item = DrawItem {
            key: PipelineKey {
                program,
                blend: state.blend,
                depth_func: state.depth_func,
                depth_test: state.depth_test,
                color_writes: state.color_writes,
                face_culling: state.face_culling,
                depth_only,
            },
            viewport: state.viewport,
            uniforms: self.stage.uniforms,
            textures: self.stage.textures,
            geometry,
        };
        self.current_pass().draws.push(item);
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let device = &self.device;
        let module = self.modules.entry(key.program).or_insert_with(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{:?}_shader", key.program)),
                source: wgpu::ShaderSource::Wgsl(shaders::program_source(key.program).into()),
            })
        });
        let created = pipeline::create_pipeline(
            device,
            &self.pipeline_layout,
            module,
            self.color_format,
            key,
        );
        tracing::debug!(?key, "created render pipeline");
        self.pipelines.insert(key, created);
    }

    fn ensure_texture_group(&mut self, bindings: TextureBindings) {
        if self.texture_groups.contains_key(&bindings) {
            return;
        }
        let material: [&wgpu::TextureView; 4] = std::array::from_fn(|unit| {
            bindings.material[unit]
                .and_then(|handle| self.textures.get(&handle))
                .unwrap_or(&self.white_view)
        });
        let shadow = bindings
            .shadow
            .and_then(|target| self.targets.get(&target))
            .map_or(&self.empty_depth_view, |t| &t.view);
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(material[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(material[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(material[2]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(material[3]),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.material_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(shadow),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
            ],
        });
        self.texture_groups.insert(bindings, group);
    }

    fn ensure_uniform_capacity(&mut self, draws: u64) {
        if draws <= self.uniform_capacity {
            return;
        }
        let capacity = draws.next_power_of_two();
        let (buffer, group) = create_uniform_buffer(
            &self.device,
            &self.uniform_layout,
            self.uniform_stride,
            capacity,
        );
        tracing::debug!(capacity, "grew draw uniform buffer");
        self.uniform_capacity = capacity;
        self.uniform_buffer = buffer;
        self.uniform_group = group;
    }

    /// Encode and submit every buffered pass, rendering the framebuffer
    /// passes into `color_view`. Returns the number of draws submitted.
    pub fn submit(&mut self, color_view: &wgpu::TextureView) -> usize {
        let passes = std::mem::take(&mut self.passes);
        let draw_count = passes.iter().map(|p| p.draws.len()).sum::<usize>();

        self.ensure_uniform_capacity(draw_count as u64);
        let stride = self.uniform_stride as usize;
        let mut staging = vec![0u8; stride * draw_count];
        for (i, item) in passes.iter().flat_map(|p| &p.draws).enumerate() {
            staging[i * stride..i * stride + UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&item.uniforms));
            self.ensure_pipeline(item.key);
            self.ensure_texture_group(item.textures);
        }
        if !staging.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &staging);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        let mut slot = 0u64;
        let mut submitted = 0;
        for record in &passes {
            let first_slot = slot;
            slot += record.draws.len() as u64;

            let (depth_view, target_size) = match record.target {
                None => (&self.depth_view, self.size),
                Some(handle) => match self.targets.get(&handle) {
                    Some(target) => (&target.view, target.size),
                    None => {
                        tracing::warn!(target = handle.0, "pass targets a destroyed render target");
                        continue;
                    }
                },
            };
            let depth_ops = Some(wgpu::Operations {
                load: if record.clear_depth {
                    wgpu::LoadOp::Clear(1.0)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            });
            let color_attachment = record.target.is_none().then(|| wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: match record.clear_color {
                        Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                            r: c.x as f64,
                            g: c.y as f64,
                            b: c.z as f64,
                            a: 1.0,
                        }),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                },
            });
            let color_attachments = [color_attachment];
            let color_attachments: &[Option<wgpu::RenderPassColorAttachment>] =
                if record.target.is_none() {
                    &color_attachments
                } else {
                    &[]
                };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(if record.target.is_none() {
                    "framebuffer_pass"
                } else {
                    "depth_target_pass"
                }),
                color_attachments,
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops,
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for (i, item) in record.draws.iter().enumerate() {
                let (Some(pipeline), Some(textures)) = (
                    self.pipelines.get(&item.key),
                    self.texture_groups.get(&item.textures),
                ) else {
                    continue;
                };
                let offset = (first_slot + i as u64) * self.uniform_stride;
                let (x, y, w, h) = match item.viewport {
                    Some(vp) => flip_viewport(vp, target_size.1),
                    None => (0.0, 0.0, target_size.0 as f32, target_size.1 as f32),
                };
                let w = w.min(target_size.0 as f32 - x);
                let h = h.min(target_size.1 as f32 - y);
                if w <= 0.0 || h <= 0.0 {
                    continue;
                }
                pass.set_viewport(x, y, w, h, 0.0, 1.0);
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_group, &[offset as u32]);
                pass.set_bind_group(1, textures, &[]);
                match item.geometry {
                    Geometry::Mesh(handle) => {
                        let Some(mesh) = self.meshes.get(&handle) else {
                            tracing::trace!(mesh = handle.0, "mesh not uploaded");
                            continue;
                        };
                        pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                        pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    }
                    Geometry::Fullscreen => pass.draw(0..3, 0..1),
                }
                submitted += 1;
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        submitted
    }
}

impl RenderDevice for WgpuDevice {
    fn resolve_program(&mut self, kind: ProgramKind) -> Option<ProgramId> {
        let index = ProgramKind::ALL.iter().position(|k| *k == kind)?;
        Some(ProgramId(index as u32))
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn create_depth_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderTargetHandle, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!("exceeds max texture dimension {max}"),
            });
        }
        let texture = create_depth_texture(
            &self.device,
            "shadow_map",
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let view = texture.create_view(&Default::default());
        let handle = RenderTargetHandle(self.next_target);
        self.next_target += 1;
        self.targets.insert(
            handle,
            DepthTarget {
                texture,
                view,
                size: (width, height),
            },
        );
        tracing::debug!(target = handle.0, width, height, "created depth target");
        Ok(handle)
    }

    fn destroy_depth_target(&mut self, target: RenderTargetHandle) -> Result<(), RenderError> {
        let removed = self
            .targets
            .remove(&target)
            .ok_or(RenderError::UnknownTarget(target))?;
        self.texture_groups
            .retain(|bindings, _| bindings.shadow != Some(target));
        removed.texture.destroy();
        Ok(())
    }

    fn bind_target(&mut self, target: Option<RenderTargetHandle>) -> Result<(), RenderError> {
        if let Some(handle) = target {
            if !self.targets.contains_key(&handle) {
                return Err(RenderError::UnknownTarget(handle));
            }
        }
        self.passes.push(PassRecord::new(target));
        Ok(())
    }

    fn clear(&mut self, clear: Clear) {
        let target = self.current_pass().target;
        if !self.current_pass().draws.is_empty() {
            // wgpu clears only at pass start.
            self.passes.push(PassRecord::new(target));
        }
        let pass = self.current_pass();
        if clear.color.is_some() {
            pass.clear_color = clear.color;
        }
        pass.clear_depth |= clear.depth;
    }

    fn set_color_writes(&mut self, enabled: bool) {
        self.state.color_writes = enabled;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.state.depth_func = func;
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.state.blend = mode;
    }

    fn set_face_culling(&mut self, enabled: bool) {
        self.state.face_culling = enabled;
    }

    fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.state.viewport = viewport;
    }

    fn use_program(&mut self, program: ProgramId) {
        self.program = ProgramKind::ALL.get(program.0 as usize).copied();
        self.stage.reset();
    }

    fn set_uniform(&mut self, name: &'static str, value: UniformValue) {
        if !self.stage.apply(name, &value) {
            tracing::trace!(name, "uniform not read by any program");
        }
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, _vertex_count: u32) {
        self.push_draw(Geometry::Mesh(mesh));
    }

    fn draw_fullscreen(&mut self) {
        self.push_draw(Geometry::Fullscreen);
    }
}

/// Offscreen color target with its own device, for rendering without a window.
pub struct HeadlessTarget {
    device: WgpuDevice,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl HeadlessTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub async fn new(width: u32, height: u32) -> Result<Self, WgpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(WgpuError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("lumen_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;
        tracing::info!(adapter = ?adapter.get_info().name, "headless device ready");

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless_color"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        Ok(Self {
            device: WgpuDevice::new(device, queue, Self::FORMAT, width, height),
            texture,
            view,
        })
    }

    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut WgpuDevice {
        &mut self.device
    }

    pub fn size(&self) -> (u32, u32) {
        let size = self.texture.size();
        (size.width, size.height)
    }

    pub fn submit(&mut self) -> usize {
        self.device.submit(&self.view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(UNIFORM_SIZE, 256), 768);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(10, 0), 10);
    }

    #[test]
    fn viewport_flips_to_top_left_origin() {
        let vp = Viewport {
            x: 180,
            y: 0,
            width: 180,
            height: 180,
        };
        assert_eq!(flip_viewport(vp, 720), (180.0, 540.0, 180.0, 180.0));
    }

    #[test]
    fn oversized_viewport_clamps_to_zero_top() {
        let vp = Viewport {
            x: 0,
            y: 10,
            width: 100,
            height: 100,
        };
        assert_eq!(flip_viewport(vp, 50).1, 0.0);
    }

    #[test]
    fn default_raster_state_matches_frame_reset() {
        let state = RasterState::default();
        assert_eq!(state.blend, BlendMode::Disabled);
        assert_eq!(state.depth_func, DepthFunc::Less);
        assert!(state.depth_test && state.color_writes && state.face_culling);
    }
}
