use crate::context::{SharedContext, release};
use crate::error::{Degraded, ErrorPolicy, GfxError};
use glam::{Mat4, Vec3};
use lumen_common::{ProgramId, ShaderId, ShaderStage, UniformLocation, UniformValue};
use std::fmt;

/// A compiled shader stage. Owns its handle; not `Clone`.
pub struct Shader {
    id: ShaderId,
    stage: ShaderStage,
    context: SharedContext,
}

impl Shader {
    /// Compile `source` for `stage`.
    ///
    /// On failure the compiler log is in the error and the shader handle is
    /// still allocated inside the [`Degraded`] value.
    pub fn compile(
        context: &SharedContext,
        source: &str,
        stage: ShaderStage,
    ) -> Result<Self, Degraded<Self>> {
        let (id, status) = {
            let mut ctx = context.borrow_mut();
            let id = ctx.create_shader(stage);
            (id, ctx.compile_shader(id, source))
        };
        let shader = Self {
            id,
            stage,
            context: context.clone(),
        };
        match status {
            Ok(()) => {
                tracing::debug!("compiled {stage} {id}");
                Ok(shader)
            }
            Err(log) => Err(Degraded::new(shader, GfxError::ShaderCompile { stage, log })),
        }
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("id", &self.id)
            .field("stage", &self.stage)
            .finish()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        let id = self.id;
        release(&self.context, &id, |ctx| ctx.delete_shader(id));
    }
}

/// Outcome of a uniform write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformWrite {
    Written(UniformLocation),
    /// The program has no such uniform; nothing was written.
    Skipped,
}

/// A linked program. Owns its handle; not `Clone`.
pub struct Program {
    id: ProgramId,
    policy: ErrorPolicy,
    context: SharedContext,
}

impl Program {
    /// Attach `shaders` to a new program and link it.
    pub fn link(context: &SharedContext, shaders: &[&Shader]) -> Result<Self, Degraded<Self>> {
        let (id, status) = {
            let mut ctx = context.borrow_mut();
            let id = ctx.create_program();
            for shader in shaders {
                ctx.attach_shader(id, shader.id());
            }
            (id, ctx.link_program(id))
        };
        let program = Self {
            id,
            policy: ErrorPolicy::default(),
            context: context.clone(),
        };
        match status {
            Ok(()) => {
                tracing::debug!("linked {id} from {} shaders", shaders.len());
                Ok(program)
            }
            Err(log) => Err(Degraded::new(program, GfxError::ProgramLink { log })),
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Choose how uniform lookup misses are handled.
    pub fn set_policy(&mut self, policy: ErrorPolicy) {
        self.policy = policy;
    }

    /// Make this the current program for subsequent draws.
    pub fn use_program(&self) {
        self.context.borrow_mut().use_program(self.id);
    }

    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.context.borrow().uniform_location(self.id, name)
    }

    /// Write `value` into the uniform called `name`.
    ///
    /// A missing uniform is `Ok(Skipped)` under [`ErrorPolicy::Tolerant`] and
    /// [`GfxError::UniformNotFound`] under [`ErrorPolicy::Strict`].
    pub fn set_uniform(&self, name: &str, value: UniformValue) -> Result<UniformWrite, GfxError> {
        let mut ctx = self.context.borrow_mut();
        match ctx.uniform_location(self.id, name) {
            Some(location) => {
                ctx.set_uniform(self.id, location, value);
                Ok(UniformWrite::Written(location))
            }
            None => match self.policy {
                ErrorPolicy::Tolerant => {
                    tracing::debug!("{} has no uniform '{name}'; write skipped", self.id);
                    Ok(UniformWrite::Skipped)
                }
                ErrorPolicy::Strict => Err(GfxError::UniformNotFound {
                    program: self.id,
                    name: name.to_string(),
                }),
            },
        }
    }

    pub fn set_vec3(&self, name: &str, value: Vec3) -> Result<UniformWrite, GfxError> {
        self.set_uniform(name, UniformValue::Vec3(value))
    }

    pub fn set_mat4(&self, name: &str, value: Mat4) -> Result<UniformWrite, GfxError> {
        self.set_uniform(name, UniformValue::Mat4(value))
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        let id = self.id;
        release(&self.context, &id, |ctx| ctx.delete_program(id));
    }
}

/// Compile a vertex/fragment pair and link it, applying `policy` to every
/// step. The shader objects are released once the program is linked.
pub fn build_program(
    context: &SharedContext,
    vertex_source: &str,
    fragment_source: &str,
    policy: ErrorPolicy,
) -> Result<Program, GfxError> {
    let vertex = policy.resolve(Shader::compile(context, vertex_source, ShaderStage::Vertex))?;
    let fragment = policy.resolve(Shader::compile(
        context,
        fragment_source,
        ShaderStage::Fragment,
    ))?;
    let mut program = policy.resolve(Program::link(context, &[&vertex, &fragment]))?;
    program.set_policy(policy);
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::share;
    use crate::error::tolerate;
    use crate::recording::{Call, RecordingContext};
    use crate::uniforms::MODEL_MATRIX;

    #[test]
    fn compile_reports_log_and_keeps_handle() {
        let (rec, ctx) = share(RecordingContext::new().fail_compiles_containing("oops"));
        let degraded = Shader::compile(&ctx, "oops", ShaderStage::Vertex).unwrap_err();
        assert!(matches!(
            degraded.error(),
            GfxError::ShaderCompile {
                stage: ShaderStage::Vertex,
                ..
            }
        ));
        let id = degraded.resource().id();
        assert_eq!(rec.borrow().count(|c| *c == Call::DeleteShader(id)), 0);

        drop(degraded);
        assert_eq!(rec.borrow().count(|c| *c == Call::DeleteShader(id)), 1);
    }

    #[test]
    fn link_attaches_every_shader() {
        let (rec, ctx) = share(RecordingContext::new());
        let vs = Shader::compile(&ctx, "vs", ShaderStage::Vertex).unwrap();
        let fs = Shader::compile(&ctx, "fs", ShaderStage::Fragment).unwrap();
        let program = Program::link(&ctx, &[&vs, &fs]).unwrap();

        let rec = rec.borrow();
        assert_eq!(
            rec.count(|c| matches!(c, Call::AttachShader { program: p, .. } if *p == program.id())),
            2
        );
        assert!(rec.calls().contains(&Call::LinkProgram {
            program: program.id(),
            ok: true
        }));
    }

    #[test]
    fn link_failure_is_degraded() {
        let (_rec, ctx) = share(RecordingContext::new().fail_links());
        let vs = Shader::compile(&ctx, "vs", ShaderStage::Vertex).unwrap();
        let err = Program::link(&ctx, &[&vs]).unwrap_err();
        assert!(matches!(err.error(), GfxError::ProgramLink { .. }));
    }

    #[test]
    fn tolerated_link_failure_skips_uniform_writes() {
        let (rec, ctx) = share(RecordingContext::new().fail_links());
        let program = tolerate(Program::link(&ctx, &[]));
        let write = program.set_vec3("viewPos", Vec3::ONE).unwrap();
        assert_eq!(write, UniformWrite::Skipped);
        assert_eq!(rec.borrow().count(|c| matches!(c, Call::SetUniform { .. })), 0);
    }

    #[test]
    fn tolerant_miss_is_skipped() {
        let (rec, ctx) = share(RecordingContext::new());
        let program = Program::link(&ctx, &[]).unwrap();
        let write = program.set_vec3("notAUniform", Vec3::ONE).unwrap();
        assert_eq!(write, UniformWrite::Skipped);
        assert_eq!(rec.borrow().count(|c| matches!(c, Call::SetUniform { .. })), 0);
    }

    #[test]
    fn strict_miss_is_an_error() {
        let (_rec, ctx) = share(RecordingContext::new());
        let mut program = Program::link(&ctx, &[]).unwrap();
        program.set_policy(ErrorPolicy::Strict);
        let err = program.set_vec3("notAUniform", Vec3::ONE).unwrap_err();
        assert!(matches!(err, GfxError::UniformNotFound { ref name, .. } if name == "notAUniform"));
    }

    #[test]
    fn hit_writes_under_both_policies() {
        for policy in [ErrorPolicy::Tolerant, ErrorPolicy::Strict] {
            let (rec, ctx) = share(RecordingContext::new());
            let mut program = Program::link(&ctx, &[]).unwrap();
            program.set_policy(policy);
            let write = program.set_mat4(MODEL_MATRIX, Mat4::IDENTITY).unwrap();
            assert!(matches!(write, UniformWrite::Written(_)));
            assert_eq!(rec.borrow().count(|c| matches!(c, Call::SetUniform { .. })), 1);
        }
    }

    #[test]
    fn build_program_strict_stops_at_compile_error() {
        let (rec, ctx) = share(RecordingContext::new().fail_compiles_containing("bad"));
        let err = build_program(&ctx, "good", "bad", ErrorPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            GfxError::ShaderCompile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
        assert_eq!(rec.borrow().count(|c| matches!(c, Call::CreateProgram(_))), 0);
    }

    #[test]
    fn build_program_tolerant_continues_to_link() {
        let (rec, ctx) = share(RecordingContext::new().fail_compiles_containing("bad"));
        let program = build_program(&ctx, "good", "bad", ErrorPolicy::Tolerant).unwrap();
        assert!(rec.borrow().calls().contains(&Call::LinkProgram {
            program: program.id(),
            ok: false
        }));
    }

    #[test]
    fn use_program_binds() {
        let (rec, ctx) = share(RecordingContext::new());
        let program = Program::link(&ctx, &[]).unwrap();
        program.use_program();
        assert_eq!(rec.borrow().bound_program(), Some(program.id()));
    }
}
