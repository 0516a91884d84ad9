use crate::context::GraphicsContext;
use crate::uniforms::UNIFORM_BLOCK;
use lumen_common::{
    MeshId, PixelFormat, ProgramId, SamplerDesc, ShaderId, ShaderStage, TextureId, TextureImage,
    UniformLocation, UniformValue, VertexLayout,
};
use std::collections::BTreeMap;
use std::fmt;

/// One call made against a [`RecordingContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateShader {
        shader: ShaderId,
        stage: ShaderStage,
    },
    CompileShader {
        shader: ShaderId,
        ok: bool,
    },
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader {
        program: ProgramId,
        shader: ShaderId,
    },
    LinkProgram {
        program: ProgramId,
        ok: bool,
    },
    UseProgram(ProgramId),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    DeleteProgram(ProgramId),
    CreateTexture(TextureId),
    UploadTexture {
        texture: TextureId,
        width: u32,
        height: u32,
        format: PixelFormat,
        sampler: SamplerDesc,
    },
    GenerateMipmaps(TextureId),
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    DeleteTexture(TextureId),
    CreateMesh {
        mesh: MeshId,
        layout: VertexLayout,
        vertex_bytes: usize,
        index_bytes: usize,
    },
    BindMesh(MeshId),
    /// A draw, together with the binding state it ran against.
    DrawIndexed {
        program: Option<ProgramId>,
        texture: Option<TextureId>,
        mesh: Option<MeshId>,
        index_count: u32,
    },
    DeleteMesh(MeshId),
}

fn opt<T: fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "none".to_string(), |v| v.to_string())
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::CreateShader { shader, stage } => write!(f, "create {stage} {shader}"),
            Call::CompileShader { shader, ok } => write!(f, "compile {shader} ok={ok}"),
            Call::DeleteShader(id) => write!(f, "delete {id}"),
            Call::CreateProgram(id) => write!(f, "create {id}"),
            Call::AttachShader { program, shader } => write!(f, "attach {shader} -> {program}"),
            Call::LinkProgram { program, ok } => write!(f, "link {program} ok={ok}"),
            Call::UseProgram(id) => write!(f, "use {id}"),
            Call::SetUniform {
                program,
                name,
                value,
            } => match value {
                UniformValue::Float(v) => write!(f, "uniform {program}.{name} = {v:.3}"),
                UniformValue::Vec3(v) => write!(
                    f,
                    "uniform {program}.{name} = ({:.3}, {:.3}, {:.3})",
                    v.x, v.y, v.z
                ),
                UniformValue::Vec4(v) => write!(
                    f,
                    "uniform {program}.{name} = ({:.3}, {:.3}, {:.3}, {:.3})",
                    v.x, v.y, v.z, v.w
                ),
                UniformValue::Mat4(m) => {
                    let t = m.w_axis;
                    write!(
                        f,
                        "uniform {program}.{name} = mat4[w=({:.3}, {:.3}, {:.3}, {:.3})]",
                        t.x, t.y, t.z, t.w
                    )
                }
            },
            Call::DeleteProgram(id) => write!(f, "delete {id}"),
            Call::CreateTexture(id) => write!(f, "create {id}"),
            Call::UploadTexture {
                texture,
                width,
                height,
                format,
                ..
            } => write!(f, "upload {texture} {width}x{height} {format:?}"),
            Call::GenerateMipmaps(id) => write!(f, "mipmaps {id}"),
            Call::BindTexture { unit, texture } => write!(f, "bind {texture} unit={unit}"),
            Call::DeleteTexture(id) => write!(f, "delete {id}"),
            Call::CreateMesh {
                mesh,
                layout,
                vertex_bytes,
                index_bytes,
            } => write!(
                f,
                "create {mesh} stride={} vertices={vertex_bytes}B indices={index_bytes}B",
                layout.stride
            ),
            Call::BindMesh(id) => write!(f, "bind {id}"),
            Call::DrawIndexed {
                program,
                texture,
                mesh,
                index_count,
            } => write!(
                f,
                "draw {index_count} indices program={} texture={} mesh={}",
                opt(program),
                opt(texture),
                opt(mesh)
            ),
            Call::DeleteMesh(id) => write!(f, "delete {id}"),
        }
    }
}

/// Headless context that records every call and tracks binding state.
///
/// Used by tests as a mock and by the CLI to trace a frame without a GPU.
/// Compilation succeeds unless the source contains the configured failure
/// marker; linking succeeds unless a shader failed or linking is set to fail.
#[derive(Debug)]
pub struct RecordingContext {
    calls: Vec<Call>,
    next_id: u32,
    uniform_names: Vec<String>,
    compile_failure_marker: Option<String>,
    fail_links: bool,
    failed_shaders: Vec<ShaderId>,
    failed_links: Vec<ProgramId>,
    attached: BTreeMap<ProgramId, Vec<ShaderId>>,
    bound_program: Option<ProgramId>,
    bound_textures: BTreeMap<u32, TextureId>,
    bound_mesh: Option<MeshId>,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            next_id: 1,
            uniform_names: UNIFORM_BLOCK.iter().map(|f| f.name.to_string()).collect(),
            compile_failure_marker: None,
            fail_links: false,
            failed_shaders: Vec::new(),
            failed_links: Vec::new(),
            attached: BTreeMap::new(),
            bound_program: None,
            bound_textures: BTreeMap::new(),
            bound_mesh: None,
        }
    }
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail compilation of any source containing `marker`.
    pub fn fail_compiles_containing(mut self, marker: impl Into<String>) -> Self {
        self.compile_failure_marker = Some(marker.into());
        self
    }

    pub fn fail_links(mut self) -> Self {
        self.fail_links = true;
        self
    }

    /// Replace the set of uniforms every linked program reports as active.
    pub fn with_uniforms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniform_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Take the recorded calls, leaving the log empty.
    pub fn drain(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn bound_program(&self) -> Option<ProgramId> {
        self.bound_program
    }

    /// The recorded calls, one per line.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for call in &self.calls {
            out.push_str(&call.to_string());
            out.push('\n');
        }
        out
    }

    fn issue(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsContext for RecordingContext {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId {
        let shader = ShaderId(self.issue());
        self.calls.push(Call::CreateShader { shader, stage });
        shader
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String> {
        let failed = self
            .compile_failure_marker
            .as_deref()
            .is_some_and(|marker| source.contains(marker));
        self.calls.push(Call::CompileShader {
            shader,
            ok: !failed,
        });
        if failed {
            self.failed_shaders.push(shader);
            return Err(format!("0:1: {shader} rejected by recording context"));
        }
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.calls.push(Call::DeleteShader(shader));
    }

    fn create_program(&mut self) -> ProgramId {
        let program = ProgramId(self.issue());
        self.calls.push(Call::CreateProgram(program));
        program
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.attached.entry(program).or_default().push(shader);
        self.calls.push(Call::AttachShader { program, shader });
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        let broken = self
            .attached
            .get(&program)
            .into_iter()
            .flatten()
            .find(|s| self.failed_shaders.contains(s))
            .copied();
        let result = match broken {
            Some(shader) => Err(format!("{shader} is not compiled")),
            None if self.fail_links => Err(format!("{program} rejected by recording context")),
            None => Ok(()),
        };
        self.calls.push(Call::LinkProgram {
            program,
            ok: result.is_ok(),
        });
        if result.is_ok() {
            self.failed_links.retain(|p| *p != program);
        } else if !self.failed_links.contains(&program) {
            self.failed_links.push(program);
        }
        result
    }

    fn use_program(&mut self, program: ProgramId) {
        self.bound_program = Some(program);
        self.calls.push(Call::UseProgram(program));
    }

    /// Programs whose last link failed have no active uniforms.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if self.failed_links.contains(&program) {
            return None;
        }
        self.uniform_names
            .iter()
            .position(|n| n == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue) {
        let name = self
            .uniform_names
            .get(location.0 as usize)
            .cloned()
            .unwrap_or_else(|| format!("#{}", location.0));
        self.calls.push(Call::SetUniform {
            program,
            name,
            value,
        });
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.attached.remove(&program);
        self.failed_links.retain(|p| *p != program);
        if self.bound_program == Some(program) {
            self.bound_program = None;
        }
        self.calls.push(Call::DeleteProgram(program));
    }

    fn create_texture(&mut self) -> TextureId {
        let texture = TextureId(self.issue());
        self.calls.push(Call::CreateTexture(texture));
        texture
    }

    fn upload_texture(&mut self, texture: TextureId, image: &TextureImage, sampler: &SamplerDesc) {
        self.calls.push(Call::UploadTexture {
            texture,
            width: image.width,
            height: image.height,
            format: image.format,
            sampler: *sampler,
        });
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        self.calls.push(Call::GenerateMipmaps(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.bound_textures.insert(unit, texture);
        self.calls.push(Call::BindTexture { unit, texture });
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.bound_textures.retain(|_, t| *t != texture);
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn create_mesh(&mut self, layout: &VertexLayout, vertices: &[u8], indices: &[u8]) -> MeshId {
        let mesh = MeshId(self.issue());
        self.calls.push(Call::CreateMesh {
            mesh,
            layout: *layout,
            vertex_bytes: vertices.len(),
            index_bytes: indices.len(),
        });
        mesh
    }

    fn bind_mesh(&mut self, mesh: MeshId) {
        self.bound_mesh = Some(mesh);
        self.calls.push(Call::BindMesh(mesh));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.calls.push(Call::DrawIndexed {
            program: self.bound_program,
            texture: self.bound_textures.get(&0).copied(),
            mesh: self.bound_mesh,
            index_count,
        });
    }

    fn delete_mesh(&mut self, mesh: MeshId) {
        if self.bound_mesh == Some(mesh) {
            self.bound_mesh = None;
        }
        self.calls.push(Call::DeleteMesh(mesh));
    }
}
