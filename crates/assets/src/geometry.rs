//! Vertex and index tables for the demo primitives.
//!
//! Every table uses the interleaved position + uv layout. Indices are
//! counter-clockwise when viewed from outside.

use lumen_common::Vertex;
use serde::{Deserialize, Serialize};

const fn v(x: f32, y: f32, z: f32, u: f32, t: f32) -> Vertex {
    Vertex::new([x, y, z], [u, t])
}

/// Ground plane, 20×20 units at y = -0.5, texture tiled ten times per axis.
#[rustfmt::skip]
pub static PLANE_VERTICES: [Vertex; 4] = [
    v(-10.0, -0.5,  10.0,  0.0,  0.0),
    v( 10.0, -0.5,  10.0, 10.0,  0.0),
    v( 10.0, -0.5, -10.0, 10.0, 10.0),
    v(-10.0, -0.5, -10.0,  0.0, 10.0),
];

#[rustfmt::skip]
pub static PLANE_INDICES: [u32; 6] = [
    0, 1, 2,  2, 3, 0,
];

/// Square pyramid, unit base at y = -0.5, apex at y = 0.5.
#[rustfmt::skip]
pub static PYRAMID_VERTICES: [Vertex; 16] = [
    // base
    v(-0.5, -0.5, -0.5, 0.0, 0.0),
    v( 0.5, -0.5, -0.5, 1.0, 0.0),
    v( 0.5, -0.5,  0.5, 1.0, 1.0),
    v(-0.5, -0.5,  0.5, 0.0, 1.0),
    // +Z side
    v(-0.5, -0.5,  0.5, 0.0, 0.0),
    v( 0.5, -0.5,  0.5, 1.0, 0.0),
    v( 0.0,  0.5,  0.0, 0.5, 1.0),
    // +X side
    v( 0.5, -0.5,  0.5, 0.0, 0.0),
    v( 0.5, -0.5, -0.5, 1.0, 0.0),
    v( 0.0,  0.5,  0.0, 0.5, 1.0),
    // -Z side
    v( 0.5, -0.5, -0.5, 0.0, 0.0),
    v(-0.5, -0.5, -0.5, 1.0, 0.0),
    v( 0.0,  0.5,  0.0, 0.5, 1.0),
    // -X side
    v(-0.5, -0.5, -0.5, 0.0, 0.0),
    v(-0.5, -0.5,  0.5, 1.0, 0.0),
    v( 0.0,  0.5,  0.0, 0.5, 1.0),
];

#[rustfmt::skip]
pub static PYRAMID_INDICES: [u32; 18] = [
    0, 1, 2,  2, 3, 0,
    4, 5, 6,
    7, 8, 9,
    10, 11, 12,
    13, 14, 15,
];

/// Unit cube centred on the origin, one texture per face.
#[rustfmt::skip]
pub static CUBE_VERTICES: [Vertex; 24] = [
    // +Z
    v(-0.5, -0.5,  0.5, 0.0, 0.0),
    v( 0.5, -0.5,  0.5, 1.0, 0.0),
    v( 0.5,  0.5,  0.5, 1.0, 1.0),
    v(-0.5,  0.5,  0.5, 0.0, 1.0),
    // -Z
    v( 0.5, -0.5, -0.5, 0.0, 0.0),
    v(-0.5, -0.5, -0.5, 1.0, 0.0),
    v(-0.5,  0.5, -0.5, 1.0, 1.0),
    v( 0.5,  0.5, -0.5, 0.0, 1.0),
    // +X
    v( 0.5, -0.5,  0.5, 0.0, 0.0),
    v( 0.5, -0.5, -0.5, 1.0, 0.0),
    v( 0.5,  0.5, -0.5, 1.0, 1.0),
    v( 0.5,  0.5,  0.5, 0.0, 1.0),
    // -X
    v(-0.5, -0.5, -0.5, 0.0, 0.0),
    v(-0.5, -0.5,  0.5, 1.0, 0.0),
    v(-0.5,  0.5,  0.5, 1.0, 1.0),
    v(-0.5,  0.5, -0.5, 0.0, 1.0),
    // +Y
    v(-0.5,  0.5,  0.5, 0.0, 0.0),
    v( 0.5,  0.5,  0.5, 1.0, 0.0),
    v( 0.5,  0.5, -0.5, 1.0, 1.0),
    v(-0.5,  0.5, -0.5, 0.0, 1.0),
    // -Y
    v(-0.5, -0.5, -0.5, 0.0, 0.0),
    v( 0.5, -0.5, -0.5, 1.0, 0.0),
    v( 0.5, -0.5,  0.5, 1.0, 1.0),
    v(-0.5, -0.5,  0.5, 0.0, 1.0),
];

#[rustfmt::skip]
pub static CUBE_INDICES: [u32; 36] = [
    0, 1, 2,  2, 3, 0,       // +Z
    4, 5, 6,  6, 7, 4,       // -Z
    8, 9, 10,  10, 11, 8,    // +X
    12, 13, 14,  14, 15, 12, // -X
    16, 17, 18,  18, 19, 16, // +Y
    20, 21, 22,  22, 23, 20, // -Y
];

/// Light marker: a 0.2-unit cube sharing the cube's face order.
#[rustfmt::skip]
pub static SMALL_CUBE_VERTICES: [Vertex; 24] = [
    // +Z
    v(-0.1, -0.1,  0.1, 0.0, 0.0),
    v( 0.1, -0.1,  0.1, 1.0, 0.0),
    v( 0.1,  0.1,  0.1, 1.0, 1.0),
    v(-0.1,  0.1,  0.1, 0.0, 1.0),
    // -Z
    v( 0.1, -0.1, -0.1, 0.0, 0.0),
    v(-0.1, -0.1, -0.1, 1.0, 0.0),
    v(-0.1,  0.1, -0.1, 1.0, 1.0),
    v( 0.1,  0.1, -0.1, 0.0, 1.0),
    // +X
    v( 0.1, -0.1,  0.1, 0.0, 0.0),
    v( 0.1, -0.1, -0.1, 1.0, 0.0),
    v( 0.1,  0.1, -0.1, 1.0, 1.0),
    v( 0.1,  0.1,  0.1, 0.0, 1.0),
    // -X
    v(-0.1, -0.1, -0.1, 0.0, 0.0),
    v(-0.1, -0.1,  0.1, 1.0, 0.0),
    v(-0.1,  0.1,  0.1, 1.0, 1.0),
    v(-0.1,  0.1, -0.1, 0.0, 1.0),
    // +Y
    v(-0.1,  0.1,  0.1, 0.0, 0.0),
    v( 0.1,  0.1,  0.1, 1.0, 0.0),
    v( 0.1,  0.1, -0.1, 1.0, 1.0),
    v(-0.1,  0.1, -0.1, 0.0, 1.0),
    // -Y
    v(-0.1, -0.1, -0.1, 0.0, 0.0),
    v( 0.1, -0.1, -0.1, 1.0, 0.0),
    v( 0.1, -0.1,  0.1, 1.0, 1.0),
    v(-0.1, -0.1,  0.1, 0.0, 1.0),
];

/// The primitives a scene can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Plane,
    Pyramid,
    Cube,
    SmallCube,
}

impl Primitive {
    pub const ALL: [Primitive; 4] = [
        Primitive::Plane,
        Primitive::Pyramid,
        Primitive::Cube,
        Primitive::SmallCube,
    ];

    pub fn vertices(self) -> &'static [Vertex] {
        match self {
            Primitive::Plane => &PLANE_VERTICES,
            Primitive::Pyramid => &PYRAMID_VERTICES,
            Primitive::Cube => &CUBE_VERTICES,
            Primitive::SmallCube => &SMALL_CUBE_VERTICES,
        }
    }

    /// The small cube reuses the cube's index table.
    pub fn indices(self) -> &'static [u32] {
        match self {
            Primitive::Plane => &PLANE_INDICES,
            Primitive::Pyramid => &PYRAMID_INDICES,
            Primitive::Cube | Primitive::SmallCube => &CUBE_INDICES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_stay_in_range() {
        for p in Primitive::ALL {
            let n = p.vertices().len() as u32;
            assert!(p.indices().iter().all(|&i| i < n), "{p:?}");
        }
    }

    #[test]
    fn tables_are_triangle_lists() {
        for p in Primitive::ALL {
            assert_eq!(p.indices().len() % 3, 0, "{p:?}");
        }
    }

    #[test]
    fn small_cube_is_a_scaled_cube() {
        for (small, big) in SMALL_CUBE_VERTICES.iter().zip(CUBE_VERTICES.iter()) {
            for axis in 0..3 {
                assert!((small.position[axis] - big.position[axis] * 0.2).abs() < 1e-6);
            }
            assert_eq!(small.uv, big.uv);
        }
    }

    #[test]
    fn primitive_names_in_json() {
        let p: Primitive = serde_json::from_str(r#""small_cube""#).unwrap();
        assert_eq!(p, Primitive::SmallCube);
    }
}
