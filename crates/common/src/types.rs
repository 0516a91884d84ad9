use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle_id!(
    /// Shader object issued by a graphics context.
    ShaderId,
    "shader"
);
handle_id!(
    /// Linked program issued by a graphics context.
    ProgramId,
    "program"
);
handle_id!(
    /// 2D texture issued by a graphics context.
    TextureId,
    "texture"
);
handle_id!(
    /// Vertex + index buffer pair issued by a graphics context.
    MeshId,
    "mesh"
);

/// Pipeline stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Location of a uniform inside a linked program.
///
/// Only meaningful to the context (and program) that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A value written into a program uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    /// Tightly packed little-endian bytes of the value (column-major for matrices).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Vec3(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
            UniformValue::Vec4(v) => bytemuck::cast_slice(&v.to_array()).to_vec(),
            UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_names_the_kind() {
        assert_eq!(TextureId(3).to_string(), "texture#3");
        assert_eq!(ProgramId(1).to_string(), "program#1");
    }

    #[test]
    fn uniform_bytes_are_column_major() {
        let m = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        let bytes = UniformValue::Mat4(m).to_bytes();
        assert_eq!(bytes.len(), 64);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[12..15], &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn vec3_packs_twelve_bytes() {
        assert_eq!(UniformValue::Vec3(Vec3::ONE).to_bytes().len(), 12);
        assert_eq!(UniformValue::Float(1.0).to_bytes().len(), 4);
    }
}
