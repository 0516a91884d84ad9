//! The uniform block shared by every program in the demo.
//!
//! Backends with real uniform buffers lay the block out exactly as listed
//! here (std140-compatible: `vec3` slots are 16-byte aligned).

pub const CAMERA_MATRIX: &str = "CameraMatrix";
pub const MODEL_MATRIX: &str = "ModelMatrix";
pub const VIEW_POS: &str = "viewPos";
pub const LIGHT_POS: &str = "lightPos";
pub const LIGHT_COLOR: &str = "lightColor";
pub const OBJECT_COLOR: &str = "objectColor";

/// A named slot in the uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub name: &'static str,
    /// Byte offset inside the block.
    pub offset: u32,
    /// Bytes of payload (padding excluded).
    pub size: u32,
}

pub const UNIFORM_BLOCK: [UniformField; 6] = [
    UniformField {
        name: CAMERA_MATRIX,
        offset: 0,
        size: 64,
    },
    UniformField {
        name: MODEL_MATRIX,
        offset: 64,
        size: 64,
    },
    UniformField {
        name: VIEW_POS,
        offset: 128,
        size: 12,
    },
    UniformField {
        name: LIGHT_POS,
        offset: 144,
        size: 12,
    },
    UniformField {
        name: LIGHT_COLOR,
        offset: 160,
        size: 12,
    },
    UniformField {
        name: OBJECT_COLOR,
        offset: 176,
        size: 12,
    },
];

pub const UNIFORM_BLOCK_SIZE: u32 = 192;

/// Index of `name` in [`UNIFORM_BLOCK`].
pub fn field_index(name: &str) -> Option<usize> {
    UNIFORM_BLOCK.iter().position(|f| f.name == name)
}
