//! wgpu backend for the Lumen graphics context.
//!
//! [`WgpuContext`] implements `lumen_render::GraphicsContext` on a wgpu device.
//! The demo's WGSL program lives in [`shaders`].
//!
//! # Invariants
//! - Draws issued between frames are replayed in order at `end_frame`.
//! - Each draw sees the uniform values its program held when it was issued.
//! - A texture that never received an image samples as opaque black.

mod context;
mod convert;
pub mod shaders;

pub use context::{MAX_DRAWS_PER_FRAME, WgpuContext};
