use crate::context::{SharedContext, release};
use crate::decode::decode_image;
use crate::error::Degraded;
use lumen_common::{PixelFormat, SamplerDesc, TextureId, TextureImage};
use std::fmt;
use std::path::Path;

/// A sampled 2D texture. Owns its handle; not `Clone`.
pub struct Texture {
    id: TextureId,
    size: Option<(u32, u32)>,
    context: SharedContext,
}

impl Texture {
    /// Decode `path` and upload it with `sampler`, then build mipmaps.
    ///
    /// If decoding fails the texture handle is still allocated but holds no
    /// image; it comes back inside the [`Degraded`] error.
    pub fn load(
        context: &SharedContext,
        path: impl AsRef<Path>,
        format: PixelFormat,
        sampler: SamplerDesc,
    ) -> Result<Self, Degraded<Self>> {
        let path = path.as_ref();
        let id = context.borrow_mut().create_texture();
        let mut texture = Self {
            id,
            size: None,
            context: context.clone(),
        };
        match decode_image(path, format) {
            Ok(image) => {
                texture.upload(&image, &sampler);
                tracing::debug!("loaded {id} from {}", path.display());
                Ok(texture)
            }
            Err(err) => Err(Degraded::new(texture, err)),
        }
    }

    /// Upload already-decoded pixels.
    pub fn from_image(context: &SharedContext, image: &TextureImage, sampler: SamplerDesc) -> Self {
        let id = context.borrow_mut().create_texture();
        let mut texture = Self {
            id,
            size: None,
            context: context.clone(),
        };
        texture.upload(image, &sampler);
        texture
    }

    fn upload(&mut self, image: &TextureImage, sampler: &SamplerDesc) {
        let mut ctx = self.context.borrow_mut();
        ctx.upload_texture(self.id, image, sampler);
        ctx.generate_mipmaps(self.id);
        self.size = Some((image.width, image.height));
    }

    /// Bind as the sampler input of texture `unit`.
    pub fn bind(&self, unit: u32) {
        self.context.borrow_mut().bind_texture(unit, self.id);
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Whether an image was uploaded.
    pub fn is_loaded(&self) -> bool {
        self.size.is_some()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let id = self.id;
        release(&self.context, &id, |ctx| ctx.delete_texture(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::share;
    use crate::error::GfxError;
    use crate::recording::{Call, RecordingContext};
    use image::{ImageBuffer, Rgb};
    use lumen_common::{MagFilter, WrapMode};

    #[test]
    fn failed_decode_keeps_an_empty_handle() {
        let (rec, ctx) = share(RecordingContext::new());
        let degraded = Texture::load(
            &ctx,
            "missing/green.jpg",
            PixelFormat::Rgb,
            SamplerDesc::default(),
        )
        .unwrap_err();
        assert!(matches!(degraded.error(), GfxError::ImageDecode { .. }));

        let texture = degraded.into_resource();
        assert!(!texture.is_loaded());
        let rec = rec.borrow();
        assert_eq!(rec.calls(), &[Call::CreateTexture(texture.id())]);
    }

    #[test]
    fn load_uploads_then_builds_mipmaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        ImageBuffer::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255u8, 255, 255])
            } else {
                Rgb([0u8, 0, 0])
            }
        })
        .save(&path)
        .unwrap();

        let sampler = SamplerDesc {
            wrap_s: WrapMode::ClampToEdge,
            mag_filter: MagFilter::Linear,
            ..SamplerDesc::default()
        };
        let (rec, ctx) = share(RecordingContext::new());
        let texture = Texture::load(&ctx, &path, PixelFormat::Rgb, sampler).unwrap();
        assert_eq!(texture.size(), Some((4, 4)));

        let id = texture.id();
        assert_eq!(
            rec.borrow().calls(),
            &[
                Call::CreateTexture(id),
                Call::UploadTexture {
                    texture: id,
                    width: 4,
                    height: 4,
                    format: PixelFormat::Rgb,
                    sampler,
                },
                Call::GenerateMipmaps(id),
            ]
        );
    }

    #[test]
    fn moved_texture_is_released_once() {
        let (rec, ctx) = share(RecordingContext::new());
        let image = TextureImage {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba,
            pixels: vec![255; 4],
        };
        let texture = Texture::from_image(&ctx, &image, SamplerDesc::default());
        let id = texture.id();

        let moved = texture;
        let holder = vec![moved];
        drop(holder);

        assert_eq!(rec.borrow().count(|c| *c == Call::DeleteTexture(id)), 1);
    }

    #[test]
    fn bind_targets_the_unit() {
        let (rec, ctx) = share(RecordingContext::new());
        let image = TextureImage {
            width: 1,
            height: 1,
            format: PixelFormat::Rgb,
            pixels: vec![0; 3],
        };
        let texture = Texture::from_image(&ctx, &image, SamplerDesc::default());
        texture.bind(2);
        assert_eq!(
            rec.borrow().calls().last(),
            Some(&Call::BindTexture {
                unit: 2,
                texture: texture.id()
            })
        );
    }
}
