//! Image decoding for texture uploads.

use crate::error::GfxError;
use image::imageops::{FilterType, resize};
use image::{ImageBuffer, Rgb, Rgba};
use lumen_common::{PixelFormat, TextureImage};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static FLIP_VERTICALLY_ON_LOAD: AtomicBool = AtomicBool::new(true);

/// Set whether decoded images are flipped so the first row is the bottom
/// row. Applies to every subsequent decode; on by default.
pub fn set_flip_vertically_on_load(flip: bool) {
    FLIP_VERTICALLY_ON_LOAD.store(flip, Ordering::Relaxed);
}

pub fn flip_vertically_on_load() -> bool {
    FLIP_VERTICALLY_ON_LOAD.load(Ordering::Relaxed)
}

/// Decode the image at `path` into 8-bit pixels of `format`.
pub fn decode_image(path: &Path, format: PixelFormat) -> Result<TextureImage, GfxError> {
    let decoded = image::open(path).map_err(|e| GfxError::ImageDecode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let decoded = if flip_vertically_on_load() {
        decoded.flipv()
    } else {
        decoded
    };

    let (width, height) = (decoded.width(), decoded.height());
    let pixels = match format {
        PixelFormat::Rgb => decoded.to_rgb8().into_raw(),
        PixelFormat::Rgba => decoded.to_rgba8().into_raw(),
    };
    tracing::debug!(
        path = %path.display(),
        width,
        height,
        channels = format.channels(),
        "decoded image"
    );
    Ok(TextureImage {
        width,
        height,
        format,
        pixels,
    })
}

/// Expand to four channels, filling alpha with 255.
pub fn to_rgba(image: &TextureImage) -> TextureImage {
    let pixels = match image.format {
        PixelFormat::Rgba => image.pixels.clone(),
        PixelFormat::Rgb => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
    };
    TextureImage {
        width: image.width,
        height: image.height,
        format: PixelFormat::Rgba,
        pixels,
    }
}

/// Levels 1.. of the mip chain for `base`, each half the size of the
/// previous one (never below 1×1), resampled from the base level with a
/// triangle filter.
pub fn mip_chain(base: &TextureImage) -> Vec<TextureImage> {
    let levels = base.mip_level_count();
    let mut chain = Vec::with_capacity(levels.saturating_sub(1) as usize);
    for level in 1..levels {
        let width = (base.width >> level).max(1);
        let height = (base.height >> level).max(1);
        let pixels = match base.format {
            PixelFormat::Rgb => {
                ImageBuffer::<Rgb<u8>, _>::from_raw(base.width, base.height, base.pixels.as_slice())
                    .map(|buf| resize(&buf, width, height, FilterType::Triangle).into_raw())
            }
            PixelFormat::Rgba => {
                let pixels = base.pixels.as_slice();
                ImageBuffer::<Rgba<u8>, _>::from_raw(base.width, base.height, pixels)
                    .map(|buf| resize(&buf, width, height, FilterType::Triangle).into_raw())
            }
        };
        let Some(pixels) = pixels else {
            tracing::warn!(
                "pixel buffer does not match {}x{}; mip chain truncated",
                base.width,
                base.height
            );
            break;
        };
        chain.push(TextureImage {
            width,
            height,
            format: base.format,
            pixels,
        });
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path) {
        // Top row red, bottom row blue.
        let img = ImageBuffer::from_fn(2, 2, |_, y| {
            if y == 0 {
                Rgba([255u8, 0, 0, 255])
            } else {
                Rgba([0u8, 0, 255, 255])
            }
        });
        img.save(path).unwrap();
    }

    #[test]
    fn decode_converts_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stripes.png");
        write_png(&path);

        let rgb = decode_image(&path, PixelFormat::Rgb).unwrap();
        assert_eq!((rgb.width, rgb.height), (2, 2));
        assert_eq!(rgb.pixels.len(), 12);

        let rgba = decode_image(&path, PixelFormat::Rgba).unwrap();
        assert_eq!(rgba.pixels.len(), 16);
    }

    // The flag is process-wide, so both settings are exercised in one test.
    #[test]
    fn flip_setting_controls_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stripes.png");
        write_png(&path);

        set_flip_vertically_on_load(false);
        let upright = decode_image(&path, PixelFormat::Rgb);
        set_flip_vertically_on_load(true);
        let flipped = decode_image(&path, PixelFormat::Rgb);

        assert_eq!(&upright.unwrap().pixels[0..3], &[255, 0, 0]);
        // First row in memory is the bottom row of the file.
        assert_eq!(&flipped.unwrap().pixels[0..3], &[0, 0, 255]);
        assert!(flip_vertically_on_load());
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = decode_image(Path::new("does/not/exist.jpg"), PixelFormat::Rgb).unwrap_err();
        assert!(matches!(err, GfxError::ImageDecode { .. }));
    }

    #[test]
    fn rgb_expands_to_rgba() {
        let img = TextureImage {
            width: 1,
            height: 2,
            format: PixelFormat::Rgb,
            pixels: vec![1, 2, 3, 4, 5, 6],
        };
        let rgba = to_rgba(&img);
        assert_eq!(rgba.pixels, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn mip_chain_halves_to_one_pixel() {
        let img = TextureImage {
            width: 8,
            height: 2,
            format: PixelFormat::Rgba,
            pixels: vec![128; 8 * 2 * 4],
        };
        let chain = mip_chain(&img);
        let sizes: Vec<_> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(4, 1), (2, 1), (1, 1)]);
        assert!(chain.iter().all(|l| l.pixels.len() == (l.width * l.height * 4) as usize));
    }

    #[test]
    fn mismatched_buffer_yields_no_levels() {
        let img = TextureImage {
            width: 4,
            height: 4,
            format: PixelFormat::Rgb,
            pixels: vec![0; 5],
        };
        assert!(mip_chain(&img).is_empty());
    }
}
