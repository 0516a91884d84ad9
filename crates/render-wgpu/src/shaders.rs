//! WGSL sources for the demo program.
//!
//! Vertex and fragment stages are separate modules, compiled and linked
//! through the graphics context like any other shader pair. Both declare the
//! same uniform block, laid out as `lumen_render::uniforms::UNIFORM_BLOCK`.

/// Vertex stage: transforms by `ModelMatrix` then `CameraMatrix`.
pub const VERTEX_SHADER: &str = r#"
struct Uniforms {
    CameraMatrix: mat4x4<f32>,
    ModelMatrix: mat4x4<f32>,
    viewPos: vec3<f32>,
    lightPos: vec3<f32>,
    lightColor: vec3<f32>,
    objectColor: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) world_position: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = uniforms.ModelMatrix * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.CameraMatrix * world;
    out.uv = vertex.uv;
    out.world_position = world.xyz;
    return out;
}
"#;

/// Fragment stage: texture colour tinted by `objectColor`, lit by a point
/// light that falls off with distance. No normals are available, so there is
/// no diffuse term.
pub const FRAGMENT_SHADER: &str = r#"
struct Uniforms {
    CameraMatrix: mat4x4<f32>,
    ModelMatrix: mat4x4<f32>,
    viewPos: vec3<f32>,
    lightPos: vec3<f32>,
    lightColor: vec3<f32>,
    objectColor: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@group(1) @binding(0)
var base_texture: texture_2d<f32>;
@group(1) @binding(1)
var base_sampler: sampler;

struct FragmentInput {
    @location(0) uv: vec2<f32>,
    @location(1) world_position: vec3<f32>,
};

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let texel = textureSample(base_texture, base_sampler, in.uv);

    let ambient = 0.25;
    let distance = length(uniforms.lightPos - in.world_position);
    let attenuation = 1.0 / (1.0 + 0.09 * distance + 0.032 * distance * distance);
    let view_distance = length(uniforms.viewPos - in.world_position);
    let fog = clamp(1.0 - view_distance / 100.0, 0.0, 1.0);

    let lighting = (ambient + attenuation) * uniforms.lightColor;
    let color = texel.rgb * uniforms.objectColor * lighting * fog;
    return vec4<f32>(color, texel.a);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_render::uniforms::UNIFORM_BLOCK;

    #[test]
    fn both_stages_declare_every_block_field() {
        for field in UNIFORM_BLOCK {
            let decl = format!("{}:", field.name);
            assert!(VERTEX_SHADER.contains(&decl), "vertex missing {}", field.name);
            assert!(FRAGMENT_SHADER.contains(&decl), "fragment missing {}", field.name);
        }
    }

    #[test]
    fn one_entry_point_per_stage() {
        assert_eq!(VERTEX_SHADER.matches("@vertex").count(), 1);
        assert_eq!(VERTEX_SHADER.matches("@fragment").count(), 0);
        assert_eq!(FRAGMENT_SHADER.matches("@fragment").count(), 1);
        assert_eq!(FRAGMENT_SHADER.matches("@vertex").count(), 0);
    }
}
