use crate::camera::FlyCamera;
use crate::context::SharedContext;
use crate::error::{ErrorPolicy, GfxError};
use crate::mesh::Mesh;
use crate::object::Object;
use crate::shader::Program;
use crate::texture::Texture;
use crate::uniforms::{CAMERA_MATRIX, LIGHT_COLOR, LIGHT_POS, OBJECT_COLOR, VIEW_POS};
use glam::{Mat4, Vec3};
use lumen_assets::{AssetError, SceneConfig};
use std::path::Path;

/// A named object in draw order.
#[derive(Debug)]
pub struct SceneObject {
    pub name: String,
    pub object: Object,
}

/// The demo's objects plus the lighting parameters drawn with them.
#[derive(Debug)]
pub struct Scene {
    objects: Vec<SceneObject>,
    light: usize,
    light_color: Vec3,
    object_color: Vec3,
}

impl Scene {
    /// Upload every object of `config`, loading textures from `asset_dir`.
    ///
    /// Under [`ErrorPolicy::Tolerant`] an object whose texture fails to load
    /// is kept with an empty texture; under [`ErrorPolicy::Strict`] the first
    /// failure aborts.
    pub fn build(
        context: &SharedContext,
        config: &SceneConfig,
        asset_dir: &Path,
        policy: ErrorPolicy,
    ) -> Result<Self, GfxError> {
        config.validate()?;
        let light = config.light_index().ok_or_else(|| {
            AssetError::InvalidScene(format!("no object named '{}'", config.light.object))
        })?;

        let mut objects = Vec::with_capacity(config.objects.len());
        for entry in &config.objects {
            let mesh = Mesh::new(
                context,
                entry.primitive.vertices(),
                entry.primitive.indices(),
            );
            let texture = policy.resolve(Texture::load(
                context,
                asset_dir.join(&entry.texture),
                config.texture_format,
                entry.sampler,
            ))?;
            let mut object = Object::new(mesh, texture);
            object.set_model_matrix(Mat4::from_translation(entry.translation));
            objects.push(SceneObject {
                name: entry.name.clone(),
                object,
            });
        }
        tracing::info!(
            objects = objects.len(),
            light = %config.light.object,
            "scene uploaded"
        );

        Ok(Self {
            objects,
            light,
            light_color: config.light.color,
            object_color: config.object_color,
        })
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut Object> {
        self.objects
            .iter_mut()
            .find(|o| o.name == name)
            .map(|o| &mut o.object)
    }

    /// World position of the light-source object.
    pub fn light_position(&self) -> Vec3 {
        self.objects[self.light].object.position()
    }

    /// Issue one frame: lighting uniforms, program bind, camera matrix, then
    /// every object in order.
    pub fn draw_frame(&self, program: &Program, camera: &FlyCamera) -> Result<(), GfxError> {
        program.set_vec3(VIEW_POS, camera.position)?;
        program.set_vec3(LIGHT_POS, self.light_position())?;
        program.set_vec3(LIGHT_COLOR, self.light_color)?;
        program.set_vec3(OBJECT_COLOR, self.object_color)?;
        program.use_program();

        camera.upload_matrix(program, camera.fov, camera.near, camera.far, CAMERA_MATRIX)?;

        for entry in &self.objects {
            entry.object.draw(program)?;
        }
        Ok(())
    }
}
