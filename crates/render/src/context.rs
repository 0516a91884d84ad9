use lumen_common::{
    MeshId, ProgramId, SamplerDesc, ShaderId, ShaderStage, TextureId, TextureImage,
    UniformLocation, UniformValue, VertexLayout,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Immediate-mode graphics context.
///
/// Binding state is process-wide: one program, one mesh and one texture per
/// unit are current at a time, and draws use whatever is bound. Handles are
/// issued by the context and stay valid until the matching `delete_*` call.
/// Build failures are reported as log strings and never abort; the resource
/// stays allocated either way.
pub trait GraphicsContext {
    /// Short name for logs.
    fn backend_name(&self) -> &'static str;

    fn create_shader(&mut self, stage: ShaderStage) -> ShaderId;
    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String>;
    fn delete_shader(&mut self, shader: ShaderId);

    fn create_program(&mut self) -> ProgramId;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn link_program(&mut self, program: ProgramId) -> Result<(), String>;
    fn use_program(&mut self, program: ProgramId);
    /// `None` when the linked program has no active uniform called `name`.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn set_uniform(&mut self, program: ProgramId, location: UniformLocation, value: UniformValue);
    fn delete_program(&mut self, program: ProgramId);

    fn create_texture(&mut self) -> TextureId;
    fn upload_texture(&mut self, texture: TextureId, image: &TextureImage, sampler: &SamplerDesc);
    fn generate_mipmaps(&mut self, texture: TextureId);
    fn bind_texture(&mut self, unit: u32, texture: TextureId);
    fn delete_texture(&mut self, texture: TextureId);

    /// Upload interleaved vertex bytes and `u32` index bytes described by `layout`.
    fn create_mesh(&mut self, layout: &VertexLayout, vertices: &[u8], indices: &[u8]) -> MeshId;
    fn bind_mesh(&mut self, mesh: MeshId);
    /// Draw `index_count` indices of the bound mesh as a triangle list.
    fn draw_indexed(&mut self, index_count: u32);
    fn delete_mesh(&mut self, mesh: MeshId);
}

/// Shared handle to the current context. Every resource wrapper keeps one, so
/// the context outlives all the handles it issued.
pub type SharedContext = Rc<RefCell<dyn GraphicsContext>>;

/// Wrap a concrete context for sharing, keeping the concrete handle for
/// backend-specific calls (frame submission, resize).
pub fn share<C: GraphicsContext + 'static>(context: C) -> (Rc<RefCell<C>>, SharedContext) {
    let concrete = Rc::new(RefCell::new(context));
    let shared: SharedContext = concrete.clone();
    (concrete, shared)
}

/// Release a handle from a wrapper's `Drop`, without panicking if the context
/// is mid-call.
pub(crate) fn release(
    context: &SharedContext,
    what: &dyn std::fmt::Display,
    f: impl FnOnce(&mut dyn GraphicsContext),
) {
    match context.try_borrow_mut() {
        Ok(mut ctx) => {
            f(&mut *ctx);
            tracing::trace!("released {what}");
        }
        Err(_) => tracing::error!("context busy while releasing {what}; handle leaked"),
    }
}
