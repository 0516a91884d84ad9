//! Demo content: static primitive tables and the scene description.
//!
//! Geometry is configuration data, so it lives here as fixed tables rather
//! than being generated. The scene file names objects, their primitive,
//! texture and placement; the built-in [`SceneConfig::demo`] is used when no
//! file is given.

pub mod geometry;
pub mod scene;

pub use geometry::Primitive;
pub use scene::{CameraConfig, LightConfig, ObjectConfig, SceneConfig, WindowConfig};

/// Errors from loading or validating scene content.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scene: {0}")]
    InvalidScene(String),
}
