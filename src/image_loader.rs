use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use tracing::debug;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// A decoded image ready to join a session.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub source: Option<PathBuf>,
    /// xxh3 of the encoded file bytes, or of the raw pixels for in-memory images.
    pub fingerprint: u64,
    pub image: DynamicImage,
}

impl LoadedImage {
    /// Wraps an already decoded image, fingerprinting its pixels.
    pub fn from_image(image: DynamicImage, source: Option<PathBuf>) -> Self {
        let (width, height) = image.dimensions();
        let mut hasher = Xxh3::new();
        hasher.update(&width.to_le_bytes());
        hasher.update(&height.to_le_bytes());
        hasher.update(image.as_bytes());
        Self {
            source,
            fingerprint: hasher.digest(),
            image,
        }
    }
}

/// Reads, fingerprints and decodes an image file.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let bytes = read_file(path)?;
    let fingerprint = xxh3_64(&bytes);
    let image = decode(bytes).with_context(|| format!("Failed to decode image: {:?}", path))?;
    debug!(?path, fingerprint, "Loaded image");
    Ok(LoadedImage {
        source: Some(path.to_path_buf()),
        fingerprint,
        image,
    })
}

/// Decodes an image file without fingerprinting it, e.g. a logo.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    decode(read_file(path)?).with_context(|| format!("Failed to decode image: {:?}", path))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))
}

fn decode(bytes: Vec<u8>) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    match reader.format() {
        // Animated GIFs contribute their first frame.
        Some(ImageFormat::Gif) => first_gif_frame(reader.into_inner()),
        Some(_) => Ok(reader.decode()?),
        None => bail!("unrecognized image format"),
    }
}

fn first_gif_frame(source: Cursor<Vec<u8>>) -> Result<DynamicImage> {
    let frame = GifDecoder::new(source)?
        .into_frames()
        .next()
        .ok_or_else(|| anyhow!("GIF has no frames"))??;
    Ok(DynamicImage::ImageRgba8(frame.into_buffer()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_load_png_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("red.png");
        solid(4, 3, [255, 0, 0, 255]).save(&path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.image.dimensions(), (4, 3));
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));

        let again = load_image(&path).unwrap();
        assert_eq!(loaded.fingerprint, again.fingerprint);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_image(&dir.path().join("nope.png")).unwrap_err();
        assert!(err.to_string().contains("Failed to read image"));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(open_image(&path).is_err());
    }

    #[test]
    fn test_pixel_fingerprint() {
        let a = LoadedImage::from_image(solid(2, 2, [1, 2, 3, 255]), None);
        let b = LoadedImage::from_image(solid(2, 2, [1, 2, 3, 255]), None);
        let c = LoadedImage::from_image(solid(2, 2, [9, 2, 3, 255]), None);
        // Same bytes, different shape.
        let d = LoadedImage::from_image(solid(4, 1, [1, 2, 3, 255]), None);
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
        assert_ne!(a.fingerprint, d.fingerprint);
    }

    #[test]
    fn test_gif_decodes_first_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("still.gif");
        solid(5, 2, [0, 255, 0, 255]).save(&path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.image.dimensions(), (5, 2));
        assert_eq!(open_image(&path).unwrap().dimensions(), (5, 2));
    }
}
