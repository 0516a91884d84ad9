use bytemuck::{Pod, Zeroable};

/// One interleaved vertex record: position followed by texture coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// A single float vertex attribute inside an interleaved record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    /// Offset from the start of the record, in bytes.
    pub offset: u32,
}

/// Interleaved float vertex layout.
///
/// There is exactly one layout in use ([`VertexLayout::POSITION_UV`]); meshes with
/// other attributes need their own creation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// Record size in bytes.
    pub stride: u32,
    pub attributes: &'static [VertexAttribute],
}

const FLOAT: u32 = std::mem::size_of::<f32>() as u32;

impl VertexLayout {
    /// Attribute 0: position (3 floats, offset 0); attribute 1: uv (2 floats, offset 3 floats).
    pub const POSITION_UV: VertexLayout = VertexLayout {
        stride: 5 * FLOAT,
        attributes: &[
            VertexAttribute {
                location: 0,
                components: 3,
                offset: 0,
            },
            VertexAttribute {
                location: 1,
                components: 2,
                offset: 3 * FLOAT,
            },
        ],
    };

    /// Stride expressed in floats.
    pub fn stride_floats(&self) -> u32 {
        self.stride / FLOAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_matches_layout_stride() {
        assert_eq!(
            std::mem::size_of::<Vertex>() as u32,
            VertexLayout::POSITION_UV.stride
        );
        assert_eq!(VertexLayout::POSITION_UV.stride_floats(), 5);
    }

    #[test]
    fn uv_follows_position() {
        let attrs = VertexLayout::POSITION_UV.attributes;
        assert_eq!(attrs.len(), 2);
        assert_eq!((attrs[0].location, attrs[0].components, attrs[0].offset), (0, 3, 0));
        assert_eq!((attrs[1].location, attrs[1].components, attrs[1].offset), (1, 2, 12));
    }

    #[test]
    fn vertices_cast_to_bytes() {
        let verts = [
            Vertex::new([0.0, 1.0, 2.0], [0.5, 1.0]),
            Vertex::new([3.0, 4.0, 5.0], [0.0, 0.0]),
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&verts);
        assert_eq!(bytes.len(), 40);
    }
}
