use crate::AssetError;
use crate::geometry::Primitive;
use glam::Vec3;
use lumen_common::{PixelFormat, SamplerDesc};
use lumen_input::KeyBindings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Lumen".into(),
            width: 800,
            height: 600,
        }
    }
}

/// Starting pose and tuning of the fly-through camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub speed: f32,
    pub sprint_multiplier: f32,
    /// Degrees of rotation for a cursor sweep across the full viewport.
    pub sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 4.0),
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            speed: 6.0,
            sprint_multiplier: 4.0,
            sensitivity: 100.0,
        }
    }
}

/// One drawable placed in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    pub primitive: Primitive,
    /// Image file, relative to the asset directory.
    pub texture: PathBuf,
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub sampler: SamplerDesc,
}

impl ObjectConfig {
    fn new(name: &str, primitive: Primitive, texture: &str, translation: Vec3) -> Self {
        Self {
            name: name.into(),
            primitive,
            texture: texture.into(),
            translation,
            sampler: SamplerDesc::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    /// Name of the object whose position is the light position.
    pub object: String,
    pub color: Vec3,
}

/// Everything the demo needs to build its frame: window, camera, bindings and
/// the object list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub bindings: KeyBindings,
    pub texture_format: PixelFormat,
    pub clear_color: [f32; 4],
    pub object_color: Vec3,
    pub light: LightConfig,
    pub objects: Vec<ObjectConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::demo()
    }
}

impl SceneConfig {
    /// The built-in scene: a floor, a pyramid, four cubes and a light marker.
    pub fn demo() -> Self {
        let objects = vec![
            ObjectConfig::new("floor", Primitive::Plane, "green.jpg", Vec3::ZERO),
            ObjectConfig::new(
                "pyramid",
                Primitive::Pyramid,
                "chill.jpg",
                Vec3::new(4.0, 0.0, 0.0),
            ),
            ObjectConfig::new(
                "red_cube",
                Primitive::Cube,
                "red.jpg",
                Vec3::new(0.0, 1.0, 0.0),
            ),
            ObjectConfig::new(
                "light",
                Primitive::SmallCube,
                "yellow.jpg",
                Vec3::new(0.0, 0.5, 0.0),
            ),
            ObjectConfig::new(
                "purple_cube",
                Primitive::Cube,
                "purple.jpg",
                Vec3::new(1.0, 0.0, 0.0),
            ),
            ObjectConfig::new(
                "blue_cube",
                Primitive::Cube,
                "blue.jpg",
                Vec3::new(0.0, 0.0, 1.0),
            ),
            ObjectConfig::new(
                "purple_cube_2",
                Primitive::Cube,
                "purple.jpg",
                Vec3::new(1.0, 1.0, 1.0),
            ),
        ];

        Self {
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            bindings: KeyBindings::default(),
            texture_format: PixelFormat::Rgb,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            object_color: Vec3::ONE,
            light: LightConfig {
                object: "light".into(),
                color: Vec3::ONE,
            },
            objects,
        }
    }

    /// Check the scene for values that would make the demo misbehave.
    pub fn validate(&self) -> Result<(), AssetError> {
        let invalid =
            |msg: String| -> Result<(), AssetError> { Err(AssetError::InvalidScene(msg)) };

        if self.window.width == 0 || self.window.height == 0 {
            return invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            ));
        }
        let cam = &self.camera;
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return invalid(format!("fov must be in (0, 180), got {}", cam.fov_degrees));
        }
        if !(cam.near > 0.0 && cam.near < cam.far) {
            return invalid(format!(
                "clip planes must satisfy 0 < near < far, got near={} far={}",
                cam.near, cam.far
            ));
        }
        if self.objects.is_empty() {
            return invalid("scene has no objects".into());
        }

        let mut names = BTreeSet::new();
        for obj in &self.objects {
            if !names.insert(obj.name.as_str()) {
                return invalid(format!("duplicate object name '{}'", obj.name));
            }
        }
        if !names.contains(self.light.object.as_str()) {
            return invalid(format!(
                "light refers to unknown object '{}'",
                self.light.object
            ));
        }
        Ok(())
    }

    /// Index of the object acting as the light source.
    pub fn light_index(&self) -> Option<usize> {
        self.objects.iter().position(|o| o.name == self.light.object)
    }

    /// Distinct texture files the scene references, in first-use order.
    pub fn texture_files(&self) -> Vec<&Path> {
        let mut seen = BTreeSet::new();
        self.objects
            .iter()
            .map(|o| o.texture.as_path())
            .filter(|p| seen.insert(*p))
            .collect()
    }

    /// Load and validate a scene from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let scene: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        scene.validate()?;
        tracing::debug!(
            path = %path.display(),
            objects = scene.objects.len(),
            "scene loaded"
        );
        Ok(scene)
    }

    /// Save the scene as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scene_is_valid() {
        let scene = SceneConfig::demo();
        scene.validate().unwrap();
        assert_eq!(scene.objects.len(), 7);
        assert_eq!(scene.light_index(), Some(3));
        assert_eq!(scene.camera.position, Vec3::new(0.0, 1.0, 4.0));
    }

    #[test]
    fn texture_files_are_deduplicated() {
        let scene = SceneConfig::demo();
        let files = scene.texture_files();
        assert_eq!(files.len(), 6);
        assert_eq!(files[0], Path::new("green.jpg"));
    }

    #[test]
    fn rejects_unknown_light() {
        let mut scene = SceneConfig::demo();
        scene.light.object = "sun".into();
        assert!(matches!(scene.validate(), Err(AssetError::InvalidScene(_))));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut scene = SceneConfig::demo();
        scene.objects[1].name = "floor".into();
        assert!(matches!(scene.validate(), Err(AssetError::InvalidScene(_))));
    }

    #[test]
    fn rejects_inverted_clip_planes() {
        let mut scene = SceneConfig::demo();
        scene.camera.near = 200.0;
        assert!(matches!(scene.validate(), Err(AssetError::InvalidScene(_))));
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let scene = SceneConfig::demo();
        scene.save(tmp.path()).unwrap();

        let loaded = SceneConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded, scene);
    }

    #[test]
    fn sparse_file_takes_defaults() {
        let json = r#"{
            "light": { "object": "box", "color": [1.0, 0.5, 0.0] },
            "objects": [
                { "name": "box", "primitive": "cube", "texture": "box.png" }
            ]
        }"#;
        let scene: SceneConfig = serde_json::from_str(json).unwrap();
        scene.validate().unwrap();
        assert_eq!(scene.window.width, 800);
        assert_eq!(scene.objects[0].translation, Vec3::ZERO);
        assert_eq!(scene.bindings, KeyBindings::default());
    }

    #[test]
    fn load_rejects_malformed_json() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "{ not json").unwrap();
        assert!(matches!(
            SceneConfig::load(tmp.path()),
            Err(AssetError::Json(_))
        ));
    }
}
