//! Render layer: backend-agnostic graphics context and the resources built on it.
//!
//! Every GPU resource is a move-only wrapper that owns one handle and releases
//! it on drop. The wrappers talk to a [`GraphicsContext`] shared through
//! [`SharedContext`]; [`RecordingContext`] implements it without a GPU.
//!
//! # Invariants
//! - A handle is released exactly once, by its owning wrapper.
//! - Binding state is global to the context; the last bind wins.
//! - Build failures are returned as [`Degraded`] values, never swallowed.
//! - Uniform misses follow the program's [`ErrorPolicy`].
//! - Wrappers are move-only; none of them is `Clone`.
//!
//! ```compile_fail
//! fn duplicate<T: Clone>() {}
//! duplicate::<lumen_render::Shader>();
//! ```
//!
//! ```compile_fail
//! fn duplicate<T: Clone>() {}
//! duplicate::<lumen_render::Program>();
//! ```
//!
//! ```compile_fail
//! fn duplicate<T: Clone>() {}
//! duplicate::<lumen_render::Texture>();
//! ```
//!
//! ```compile_fail
//! fn duplicate<T: Clone>() {}
//! duplicate::<lumen_render::Mesh>();
//! ```
//!
//! ```compile_fail
//! fn duplicate<T: Clone>() {}
//! duplicate::<lumen_render::Object>();
//! ```

mod camera;
mod context;
mod decode;
mod error;
mod mesh;
mod object;
mod recording;
mod scene;
mod shader;
mod texture;
pub mod uniforms;

pub use camera::{FlyCamera, PITCH_LIMIT_DEGREES};
pub use context::{GraphicsContext, SharedContext, share};
pub use decode::{
    decode_image, flip_vertically_on_load, mip_chain, set_flip_vertically_on_load, to_rgba,
};
pub use error::{Degraded, ErrorPolicy, GfxError, tolerate};
pub use mesh::Mesh;
pub use object::Object;
pub use recording::{Call, RecordingContext};
pub use scene::{Scene, SceneObject};
pub use shader::{Program, Shader, UniformWrite, build_program};
pub use texture::Texture;

pub fn crate_info() -> &'static str {
    "lumen-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
