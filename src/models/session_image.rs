use std::fmt;
use std::path::PathBuf;

use image::{DynamicImage, GenericImageView};

use crate::image_loader::LoadedImage;

/// Stable identity of an image within one session, independent of its grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
pub struct SessionImage {
    pub id: ImageId,
    pub source: Option<PathBuf>,
    pub fingerprint: u64,
    pub pixels: DynamicImage,
    pub watermarked: bool,
}

impl SessionImage {
    pub fn from_loaded(id: ImageId, loaded: LoadedImage) -> Self {
        Self {
            id,
            source: loaded.source,
            fingerprint: loaded.fingerprint,
            pixels: loaded.image,
            watermarked: false,
        }
    }

    /// Copy of this image carrying new pixels with the watermark applied.
    pub fn with_watermark(&self, pixels: DynamicImage) -> Self {
        Self {
            id: self.id,
            source: self.source.clone(),
            fingerprint: self.fingerprint,
            pixels,
            watermarked: true,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Short label for status lines: the file name, or the id for in-memory images.
    pub fn display_name(&self) -> String {
        self.source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.to_string())
    }
}

impl fmt::Debug for SessionImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("SessionImage")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint))
            .field("width", &width)
            .field("height", &height)
            .field("watermarked", &self.watermarked)
            .finish()
    }
}
