use crate::context::SharedContext;
use crate::error::{Degraded, GfxError};
use crate::mesh::Mesh;
use crate::shader::Program;
use crate::texture::Texture;
use crate::uniforms::MODEL_MATRIX;
use glam::{Mat4, Vec3};
use lumen_common::{PixelFormat, SamplerDesc, Vertex};
use std::path::Path;

/// A textured mesh with a model transform.
#[derive(Debug)]
pub struct Object {
    mesh: Mesh,
    texture: Texture,
    model: Mat4,
}

impl Object {
    pub fn new(mesh: Mesh, texture: Texture) -> Self {
        Self {
            mesh,
            texture,
            model: Mat4::IDENTITY,
        }
    }

    /// Upload geometry tables and load the texture at `texture_path`.
    ///
    /// A texture that fails to decode degrades the whole object; the mesh is
    /// uploaded regardless.
    pub fn from_geometry(
        context: &SharedContext,
        vertices: &[Vertex],
        indices: &[u32],
        texture_path: impl AsRef<Path>,
        format: PixelFormat,
        sampler: SamplerDesc,
    ) -> Result<Self, Degraded<Self>> {
        let mesh = Mesh::new(context, vertices, indices);
        match Texture::load(context, texture_path, format, sampler) {
            Ok(texture) => Ok(Self::new(mesh, texture)),
            Err(degraded) => Err(degraded.map(|texture| Self::new(mesh, texture))),
        }
    }

    /// Replace the model transform.
    pub fn set_model_matrix(&mut self, model: Mat4) {
        self.model = model;
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// Translation part of the model matrix.
    pub fn position(&self) -> Vec3 {
        self.model.w_axis.truncate()
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Draw through the currently bound program: model matrix, texture on
    /// unit 0, mesh, then the indexed draw.
    pub fn draw(&self, program: &Program) -> Result<(), GfxError> {
        program.set_mat4(MODEL_MATRIX, self.model)?;
        self.texture.bind(0);
        self.mesh.bind();
        self.mesh.draw_indexed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::share;
    use crate::error::ErrorPolicy;
    use crate::recording::{Call, RecordingContext};
    use lumen_assets::Primitive;
    use lumen_common::TextureImage;

    fn white(ctx: &SharedContext) -> Texture {
        let image = TextureImage {
            width: 1,
            height: 1,
            format: PixelFormat::Rgb,
            pixels: vec![255; 3],
        };
        Texture::from_image(ctx, &image, SamplerDesc::default())
    }

    fn cube(ctx: &SharedContext) -> Object {
        let mesh = Mesh::new(ctx, Primitive::Cube.vertices(), Primitive::Cube.indices());
        Object::new(mesh, white(ctx))
    }

    #[test]
    fn position_is_the_translation_column() {
        let (_rec, ctx) = share(RecordingContext::new());
        let mut obj = cube(&ctx);
        obj.set_model_matrix(Mat4::from_translation(Vec3::new(4.0, 0.0, 0.0)));
        assert_eq!(obj.position(), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn set_model_matrix_replaces() {
        let (_rec, ctx) = share(RecordingContext::new());
        let mut obj = cube(&ctx);
        obj.set_model_matrix(Mat4::from_translation(Vec3::X));
        obj.set_model_matrix(Mat4::from_translation(Vec3::Y));
        assert_eq!(obj.position(), Vec3::Y);
    }

    #[test]
    fn position_ignores_scale_and_rotation() {
        let (_rec, ctx) = share(RecordingContext::new());
        let mut obj = cube(&ctx);
        obj.set_model_matrix(Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            glam::Quat::from_rotation_y(1.0),
            Vec3::new(1.0, 2.0, 3.0),
        ));
        assert!(obj.position().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn draw_order_is_uniform_texture_mesh_draw() {
        let (rec, ctx) = share(RecordingContext::new());
        let program = Program::link(&ctx, &[]).unwrap();
        program.use_program();
        let mut obj = cube(&ctx);
        let model = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        obj.set_model_matrix(model);
        rec.borrow_mut().drain();

        obj.draw(&program).unwrap();

        assert_eq!(
            rec.borrow().calls(),
            &[
                Call::SetUniform {
                    program: program.id(),
                    name: MODEL_MATRIX.into(),
                    value: lumen_common::UniformValue::Mat4(model),
                },
                Call::BindTexture {
                    unit: 0,
                    texture: obj.texture().id(),
                },
                Call::BindMesh(obj.mesh().id()),
                Call::DrawIndexed {
                    program: Some(program.id()),
                    texture: Some(obj.texture().id()),
                    mesh: Some(obj.mesh().id()),
                    index_count: 36,
                },
            ]
        );
    }

    #[test]
    fn strict_program_without_model_matrix_draws_nothing() {
        let (rec, ctx) = share(RecordingContext::new().with_uniforms(["CameraMatrix"]));
        let mut program = Program::link(&ctx, &[]).unwrap();
        program.set_policy(ErrorPolicy::Strict);
        let obj = cube(&ctx);
        rec.borrow_mut().drain();

        assert!(matches!(
            obj.draw(&program),
            Err(GfxError::UniformNotFound { .. })
        ));
        assert!(rec.borrow().calls().is_empty());
    }

    #[test]
    fn from_geometry_with_missing_texture_still_uploads_mesh() {
        let (rec, ctx) = share(RecordingContext::new());
        let degraded = Object::from_geometry(
            &ctx,
            Primitive::Plane.vertices(),
            Primitive::Plane.indices(),
            "nowhere/green.jpg",
            PixelFormat::Rgb,
            SamplerDesc::default(),
        )
        .unwrap_err();
        let obj = degraded.into_resource();
        assert_eq!(obj.mesh().index_count(), 6);
        assert!(!obj.texture().is_loaded());
        assert_eq!(rec.borrow().count(|c| matches!(c, Call::CreateMesh { .. })), 1);
    }

    #[test]
    fn dropping_object_releases_mesh_and_texture() {
        let (rec, ctx) = share(RecordingContext::new());
        let obj = cube(&ctx);
        let (mesh, texture) = (obj.mesh().id(), obj.texture().id());
        drop(obj);
        let rec = rec.borrow();
        assert_eq!(rec.count(|c| *c == Call::DeleteMesh(mesh)), 1);
        assert_eq!(rec.count(|c| *c == Call::DeleteTexture(texture)), 1);
    }
}
