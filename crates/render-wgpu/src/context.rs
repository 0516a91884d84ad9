use crate::convert::{align_up, sampler_descriptor, vertex_attributes};
use lumen_common::{
    MeshId, ProgramId, SamplerDesc, ShaderId, ShaderStage, TextureId, TextureImage,
    UniformLocation, UniformValue, VertexLayout,
};
use lumen_render::uniforms::{UNIFORM_BLOCK, UNIFORM_BLOCK_SIZE};
use lumen_render::{GraphicsContext, mip_chain, to_rgba};
use std::collections::HashMap;
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Draws recorded per frame; further draws are dropped with a warning.
pub const MAX_DRAWS_PER_FRAME: u32 = 1024;

struct ShaderEntry {
    stage: ShaderStage,
    source: String,
    module: Option<wgpu::ShaderModule>,
}

struct ProgramEntry {
    shaders: Vec<ShaderId>,
    pipeline: Option<wgpu::RenderPipeline>,
    /// Indices into `UNIFORM_BLOCK` read by an attached stage.
    active: Vec<usize>,
    block: [u8; UNIFORM_BLOCK_SIZE as usize],
}

struct TextureEntry {
    texture: Option<wgpu::Texture>,
    bind_group: Option<wgpu::BindGroup>,
    /// Base level kept until mipmaps are generated.
    pending_base: Option<TextureImage>,
}

struct MeshEntry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    layout: VertexLayout,
}

struct DrawCommand {
    program: ProgramId,
    texture: Option<TextureId>,
    mesh: MeshId,
    index_count: u32,
    uniform_offset: u32,
}

/// [`GraphicsContext`] backed by wgpu.
///
/// Calls are immediate-mode on the surface, but draws are only recorded; each
/// draw snapshots the bound program's uniform block into a slot of one
/// dynamic-offset buffer. [`WgpuContext::end_frame`] replays the recorded
/// draws in a single render pass.
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u32,
    fallback_bind_group: wgpu::BindGroup,

    next_id: u32,
    shaders: HashMap<ShaderId, ShaderEntry>,
    programs: HashMap<ProgramId, ProgramEntry>,
    textures: HashMap<TextureId, TextureEntry>,
    meshes: HashMap<MeshId, MeshEntry>,

    bound_program: Option<ProgramId>,
    bound_textures: HashMap<u32, TextureId>,
    bound_mesh: Option<MeshId>,

    staging: Vec<u8>,
    draws: Vec<DrawCommand>,
}

impl WgpuContext {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_stride = align_up(
            UNIFORM_BLOCK_SIZE,
            device.limits().min_uniform_buffer_offset_alignment,
        );

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(u64::from(UNIFORM_BLOCK_SIZE)),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size: u64::from(uniform_stride) * u64::from(MAX_DRAWS_PER_FRAME),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(u64::from(UNIFORM_BLOCK_SIZE)),
                }),
            }],
        });

        let fallback_bind_group = Self::create_fallback(&device, &queue, &texture_layout);
        let depth_view = Self::create_depth_texture(&device, width, height);

        Self {
            device,
            queue,
            surface_format,
            depth_view,
            uniform_layout,
            texture_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            fallback_bind_group,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            meshes: HashMap::new(),
            bound_program: None,
            bound_textures: HashMap::new(),
            bound_mesh: None,
            staging: Vec::new(),
            draws: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.depth_view = Self::create_depth_texture(&self.device, width, height);
    }

    /// Discard any draws recorded since the last submitted frame.
    pub fn begin_frame(&mut self) {
        if !self.draws.is_empty() {
            tracing::debug!("discarding {} unsubmitted draws", self.draws.len());
        }
        self.draws.clear();
        self.staging.clear();
    }

    /// Number of draws recorded for the current frame.
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Clear `view` and replay this frame's draws into it.
    pub fn end_frame(&mut self, view: &wgpu::TextureView, clear_color: wgpu::Color) {
        let draws = std::mem::take(&mut self.draws);
        if !self.staging.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &self.staging);
        }
        self.staging.clear();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color),
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
                ..Default::default()
            });

            for draw in &draws {
                // Resources deleted after the draw was recorded are skipped.
                let Some(pipeline) = self
                    .programs
                    .get(&draw.program)
                    .and_then(|p| p.pipeline.as_ref())
                else {
                    continue;
                };
                let Some(mesh) = self.meshes.get(&draw.mesh) else {
                    continue;
                };
                let texture_group = draw
                    .texture
                    .and_then(|id| self.textures.get(&id))
                    .and_then(|t| t.bind_group.as_ref())
                    .unwrap_or(&self.fallback_bind_group);

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                pass.set_bind_group(1, texture_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn issue(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run `f` inside a validation error scope and report what it raised.
    fn validated<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<String>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error.map(|e| e.to_string()))
    }

    fn build_pipeline(
        &self,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        layout: &VertexLayout,
    ) -> (wgpu::RenderPipeline, Option<String>) {
        let attributes = vertex_attributes(layout);
        self.validated(|device| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("program_layout"),
                bind_group_layouts: &[&self.uniform_layout, &self.texture_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("program_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: None,
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: u64::from(layout.stride),
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: None,
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    fn write_level(&self, texture: &wgpu::Texture, level: u32, image: &TextureImage) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Opaque black, which is what an incomplete texture samples as.
    fn create_fallback(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("fallback_texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[0, 0, 0, 255],
        );
        let view = texture.create_view(&Default::default());
        let sampler = device.create_sampler(&sampler_descriptor(&SamplerDesc::default()));
        Self::texture_bind_group(device, layout, &view, &sampler)
    }

    fn texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
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
        texture.create_view(&Default::default())
    }
}

/// Indices of the block fields a WGSL stage reads as `uniforms.<name>`.
fn read_fields(source: &str) -> impl Iterator<Item = usize> + '_ {
    UNIFORM_BLOCK.iter().enumerate().filter_map(move |(i, field)| {
        let access = format!("uniforms.{}", field.name);
        source.contains(&access).then_some(i)
    })
}

impl GraphicsContext for WgpuContext {
    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId {
        let id = ShaderId(self.issue());
        self.shaders.insert(
            id,
            ShaderEntry {
                stage,
                source: String::new(),
                module: None,
            },
        );
        id
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String> {
        let Some(stage) = self.shaders.get(&shader).map(|s| s.stage) else {
            return Err(format!("{shader} does not exist"));
        };
        let (module, error) = self.validated(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    ShaderStage::Vertex => "vertex_shader",
                    ShaderStage::Fragment => "fragment_shader",
                }),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        let Some(entry) = self.shaders.get_mut(&shader) else {
            return Err(format!("{shader} does not exist"));
        };
        entry.source = source.to_string();
        match error {
            None => {
                entry.module = Some(module);
                Ok(())
            }
            Some(log) => {
                entry.module = None;
                Err(log)
            }
        }
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.issue());
        self.programs.insert(
            id,
            ProgramEntry {
                shaders: Vec::new(),
                pipeline: None,
                active: Vec::new(),
                block: [0; UNIFORM_BLOCK_SIZE as usize],
            },
        );
        id
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if let Some(entry) = self.programs.get_mut(&program) {
            entry.shaders.push(shader);
        }
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        let Some(entry) = self.programs.get(&program) else {
            return Err(format!("{program} does not exist"));
        };
        let stage_module = |stage: ShaderStage| {
            entry
                .shaders
                .iter()
                .filter_map(|id| self.shaders.get(id))
                .find(|s| s.stage == stage)
                .ok_or_else(|| format!("no {stage} shader attached"))
        };
        let vertex = stage_module(ShaderStage::Vertex)?;
        let fragment = stage_module(ShaderStage::Fragment)?;
        let (Some(vs), Some(fs)) = (&vertex.module, &fragment.module) else {
            return Err("attached shader is not compiled".to_string());
        };

        let mut active: Vec<usize> = read_fields(&vertex.source)
            .chain(read_fields(&fragment.source))
            .collect();
        active.sort_unstable();
        active.dedup();

        let (pipeline, error) = self.build_pipeline(vs, fs, &VertexLayout::POSITION_UV);
        if let Some(log) = error {
            return Err(log);
        }
        if let Some(entry) = self.programs.get_mut(&program) {
            entry.pipeline = Some(pipeline);
            entry.active = active;
        }
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) {
        self.bound_program = Some(program);
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let entry = self.programs.get(&program)?;
        entry.pipeline.as_ref()?;
        entry
            .active
            .iter()
            .copied()
            .find(|&i| UNIFORM_BLOCK[i].name == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let Some(field) = UNIFORM_BLOCK.get(location.0 as usize) else {
            tracing::warn!("{program}: no uniform at location {}", location.0);
            return;
        };
        let Some(entry) = self.programs.get_mut(&program) else {
            return;
        };
        let bytes = value.to_bytes();
        if bytes.len() != field.size as usize {
            tracing::warn!(
                "{program}: {} expects {} bytes, got {}",
                field.name,
                field.size,
                bytes.len()
            );
            return;
        }
        let start = field.offset as usize;
        entry.block[start..start + bytes.len()].copy_from_slice(&bytes);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
    }

    fn create_texture(&mut self) -> TextureId {
        let id = TextureId(self.issue());
        self.textures.insert(
            id,
            TextureEntry {
                texture: None,
                bind_group: None,
                pending_base: None,
            },
        );
        id
    }

    fn upload_texture(&mut self, texture: TextureId, image: &TextureImage, sampler: &SamplerDesc) {
        if !self.textures.contains_key(&texture) {
            tracing::warn!("upload to unknown {texture}");
            return;
        }
        let rgba = to_rgba(image);
        let gpu_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("image_texture"),
            size: wgpu::Extent3d {
                width: rgba.width.max(1),
                height: rgba.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: rgba.mip_level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.write_level(&gpu_texture, 0, &rgba);

        let view = gpu_texture.create_view(&Default::default());
        let gpu_sampler = self.device.create_sampler(&sampler_descriptor(sampler));
        let bind_group =
            Self::texture_bind_group(&self.device, &self.texture_layout, &view, &gpu_sampler);

        if let Some(entry) = self.textures.get_mut(&texture) {
            entry.texture = Some(gpu_texture);
            entry.bind_group = Some(bind_group);
            entry.pending_base = Some(rgba);
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        let Some(base) = self
            .textures
            .get_mut(&texture)
            .and_then(|entry| entry.pending_base.take())
        else {
            return;
        };
        let Some(gpu_texture) = self.textures.get(&texture).and_then(|e| e.texture.as_ref())
        else {
            return;
        };
        let chain = mip_chain(&base);
        for (level, image) in chain.iter().enumerate() {
            self.write_level(gpu_texture, level as u32 + 1, image);
        }
        tracing::trace!("{texture}: wrote {} mip levels", chain.len());
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.bound_textures.insert(unit, texture);
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, t| *t != texture);
    }

    fn create_mesh(&mut self, layout: &VertexLayout, vertices: &[u8], indices: &[u8]) -> MeshId {
        let id = MeshId(self.issue());
        // Zero-sized buffers cannot be bound; pad to one element.
        let pad = |bytes: &[u8], min: usize| -> Vec<u8> {
            let mut v = bytes.to_vec();
            v.resize(v.len().max(min), 0);
            v
        };
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertex_buffer"),
                contents: &pad(vertices, layout.stride as usize),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_index_buffer"),
                contents: &pad(indices, 4),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.meshes.insert(
            id,
            MeshEntry {
                vertex_buffer,
                index_buffer,
                layout: *layout,
            },
        );
        id
    }

    fn bind_mesh(&mut self, mesh: MeshId) {
        self.bound_mesh = Some(mesh);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        let (Some(program), Some(mesh)) = (self.bound_program, self.bound_mesh) else {
            tracing::warn!("draw with no program or mesh bound; skipped");
            return;
        };
        if index_count == 0 {
            return;
        }
        let Some(entry) = self.programs.get(&program) else {
            return;
        };
        if entry.pipeline.is_none() {
            tracing::debug!("{program} is not linked; draw skipped");
            return;
        }
        if self
            .meshes
            .get(&mesh)
            .is_some_and(|m| m.layout != VertexLayout::POSITION_UV)
        {
            tracing::warn!("{mesh} layout does not match the program; draw skipped");
            return;
        }
        if self.draws.len() >= MAX_DRAWS_PER_FRAME as usize {
            tracing::warn!("more than {MAX_DRAWS_PER_FRAME} draws this frame; draw dropped");
            return;
        }

        let uniform_offset = self.staging.len() as u32;
        self.staging.extend_from_slice(&entry.block);
        self.staging
            .resize((uniform_offset + self.uniform_stride) as usize, 0);
        self.draws.push(DrawCommand {
            program,
            texture: self.bound_textures.get(&0).copied(),
            mesh,
            index_count,
            uniform_offset,
        });
    }

    fn delete_mesh(&mut self, mesh: MeshId) {
        self.meshes.remove(&mesh);
        if self.bound_mesh == Some(mesh) {
            self.bound_mesh = None;
        }
    }
}
