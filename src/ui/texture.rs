// Texture conversion and caching for session images
// Grid cells use downscaled previews; the full-image dialog uses a larger decode

use gdk4::{MemoryFormat, MemoryTexture, Texture};
use gtk4::prelude::*;
use gtk4::glib;
use image::{DynamicImage, GenericImageView};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

use crate::models::{ImageId, SessionImage};

/// Longest side of grid cell previews.
pub const CELL_PREVIEW_SIZE: u32 = 384;
/// Longest side of the full-image dialog texture.
pub const FULL_PREVIEW_SIZE: u32 = 2048;

const CACHE_ENTRIES: usize = 64;

pub fn texture_from_image(image: &DynamicImage, max_side: u32) -> Texture {
    let (width, height) = image.dimensions();
    let rgba = if width.max(height) > max_side {
        image.thumbnail(max_side, max_side).to_rgba8()
    } else {
        image.to_rgba8()
    };
    let (width, height) = rgba.dimensions();
    let bytes = glib::Bytes::from_owned(rgba.into_raw());
    MemoryTexture::new(
        width as i32,
        height as i32,
        MemoryFormat::R8g8b8a8,
        &bytes,
        width as usize * 4,
    )
    .upcast()
}

// Dark gray tile shown while a slot has nothing bound
pub fn placeholder_texture() -> &'static Texture {
    static PLACEHOLDER: OnceLock<Texture> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        let side = 64usize;
        let mut pixels = vec![0u8; side * side * 4];
        for chunk in pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[0x1a, 0x1a, 0x1a, 0xff]);
        }
        let bytes = glib::Bytes::from_owned(pixels);
        MemoryTexture::new(
            side as i32,
            side as i32,
            MemoryFormat::R8g8b8a8,
            &bytes,
            side * 4,
        )
        .upcast()
    })
}

/// Cell preview textures keyed by image identity and watermark state.
pub struct TextureCache {
    cache: RefCell<LruCache<(ImageId, bool), Texture>>,
}

impl TextureCache {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn cell_texture(&self, image: &SessionImage) -> Texture {
        let key = (image.id, image.watermarked);
        if let Some(texture) = self.cache.borrow_mut().get(&key) {
            return texture.clone();
        }
        let texture = texture_from_image(&image.pixels, CELL_PREVIEW_SIZE);
        self.cache.borrow_mut().put(key, texture.clone());
        texture
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}
