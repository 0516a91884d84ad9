//! Shared value types for the lumen renderer.
//!
//! # Invariants
//! - Handle ids are issued by a graphics context and are never zero.
//! - [`Vertex`] is byte-compatible with [`VertexLayout::POSITION_UV`].

mod sampler;
mod types;
mod vertex;

pub use sampler::{MagFilter, MinFilter, PixelFormat, SamplerDesc, TextureImage, WrapMode};
pub use types::{
    MeshId, ProgramId, ShaderId, ShaderStage, TextureId, UniformLocation, UniformValue,
};
pub use vertex::{Vertex, VertexAttribute, VertexLayout};
