//! Authoritative image sequence behind the grid.
//!
//! The session owns the images the grid shows, enforces the image limit and
//! duplicate rule, and carries out the removals, replacements and watermark
//! passes that the grid only requests.

use std::rc::Rc;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};
use crate::image_loader::LoadedImage;
use crate::models::{ImageId, SessionImage};
use crate::watermark::{apply_watermark, MarkerPosition, WatermarkSettings};

/// Default cap on images held by one session.
pub const DEFAULT_MAX_IMAGES: usize = 10;

/// Outcome of [`ImageSession::add_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddSummary {
    pub added: usize,
    pub duplicates: usize,
    /// Images dropped because the session was full.
    pub over_limit: usize,
}

pub struct ImageSession {
    images: Vec<Rc<SessionImage>>,
    max_images: usize,
    next_id: u64,
    pending_replace: Option<ImageId>,
}

impl ImageSession {
    pub fn new(max_images: usize) -> Self {
        Self {
            images: Vec::new(),
            max_images: max_images.max(1),
            next_id: 1,
            pending_replace: None,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    /// Free slots left before the limit.
    pub fn remaining(&self) -> usize {
        self.max_images.saturating_sub(self.images.len())
    }

    pub fn get(&self, index: usize) -> Option<&Rc<SessionImage>> {
        self.images.get(index)
    }

    pub fn images(&self) -> &[Rc<SessionImage>] {
        &self.images
    }

    /// Shares the current sequence with the grid.
    pub fn snapshot(&self) -> Vec<Rc<SessionImage>> {
        self.images.clone()
    }

    pub fn position_of(&self, id: ImageId) -> Option<usize> {
        self.images.iter().position(|img| img.id == id)
    }

    /// Appends one image and returns its index.
    pub fn add(&mut self, loaded: LoadedImage) -> SessionResult<usize> {
        self.check_duplicate(&loaded, None)?;
        if self.images.len() >= self.max_images {
            return Err(SessionError::LimitReached {
                max: self.max_images,
            });
        }

        let id = self.allocate_id();
        let image = SessionImage::from_loaded(id, loaded);
        debug!(%id, source = ?image.source, "Image added");
        self.images.push(Rc::new(image));
        Ok(self.images.len() - 1)
    }

    /// Appends images until the limit, skipping duplicates.
    pub fn add_batch<I>(&mut self, batch: I) -> AddSummary
    where
        I: IntoIterator<Item = LoadedImage>,
    {
        let mut summary = AddSummary::default();
        for loaded in batch {
            match self.add(loaded) {
                Ok(_) => summary.added += 1,
                Err(SessionError::Duplicate { .. }) => summary.duplicates += 1,
                Err(_) => summary.over_limit += 1,
            }
        }
        info!(
            added = summary.added,
            duplicates = summary.duplicates,
            over_limit = summary.over_limit,
            "Batch added"
        );
        summary
    }

    pub fn remove(&mut self, index: usize) -> SessionResult<Rc<SessionImage>> {
        self.check_index(index)?;
        let removed = self.images.remove(index);
        debug!(index, id = %removed.id, "Image removed");
        Ok(removed)
    }

    /// Marks the image at `index` as waiting for a replacement chosen by the user.
    pub fn request_replace(&mut self, index: usize) -> SessionResult<ImageId> {
        self.check_index(index)?;
        let id = self.images[index].id;
        self.pending_replace = Some(id);
        debug!(index, %id, "Replacement requested");
        Ok(id)
    }

    /// Current index of the image awaiting replacement.
    pub fn pending_replace(&self) -> Option<usize> {
        self.pending_replace.and_then(|id| self.position_of(id))
    }

    pub fn cancel_replace(&mut self) {
        self.pending_replace = None;
    }

    /// Swaps in the replacement wherever the requested image now sits.
    ///
    /// The new image starts without a watermark.
    pub fn complete_replace(&mut self, loaded: LoadedImage) -> SessionResult<usize> {
        let id = self.pending_replace.ok_or(SessionError::NoPendingReplace)?;
        let Some(index) = self.position_of(id) else {
            self.pending_replace = None;
            return Err(SessionError::StaleReplace);
        };
        self.check_duplicate(&loaded, Some(index))?;

        let new_id = self.allocate_id();
        let image = SessionImage::from_loaded(new_id, loaded);
        debug!(index, old = %id, new = %new_id, "Image replaced");
        self.images[index] = Rc::new(image);
        self.pending_replace = None;
        Ok(index)
    }

    /// Stamps `mark` onto every image that is not watermarked yet.
    ///
    /// Returns how many images were stamped.
    pub fn apply_watermark(
        &mut self,
        mark: &DynamicImage,
        position: MarkerPosition,
        settings: &WatermarkSettings,
    ) -> SessionResult<usize> {
        let mut stamped = 0;
        for slot in self.images.iter_mut().filter(|img| !img.watermarked) {
            let pixels = apply_watermark(&slot.pixels, mark, position, settings);
            *slot = Rc::new(slot.with_watermark(pixels));
            stamped += 1;
        }
        if stamped == 0 {
            return Err(SessionError::NothingToWatermark);
        }
        info!(stamped, ?position, "Watermark applied");
        Ok(stamped)
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.pending_replace = None;
    }

    /// Drops the images whose ids are in `ids`, keeping any added or replaced
    /// since those ids were taken. Returns how many were dropped.
    pub fn remove_ids(&mut self, ids: &[ImageId]) -> usize {
        let before = self.images.len();
        self.images.retain(|img| !ids.contains(&img.id));
        let removed = before - self.images.len();
        debug!(removed, kept = self.images.len(), "Images removed by id");
        removed
    }

    fn allocate_id(&mut self) -> ImageId {
        let id = ImageId(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_index(&self, index: usize) -> SessionResult<()> {
        if index < self.images.len() {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfRange {
                index,
                len: self.images.len(),
            })
        }
    }

    fn check_duplicate(&self, loaded: &LoadedImage, skip: Option<usize>) -> SessionResult<()> {
        let clash = self.images.iter().enumerate().any(|(i, img)| {
            Some(i) != skip
                && (img.fingerprint == loaded.fingerprint
                    || (loaded.source.is_some() && img.source == loaded.source))
        });
        if clash {
            Err(SessionError::Duplicate {
                path: loaded.source.clone(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for ImageSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{FullImagePresenter, GridBinder, GridCallbacks, Presentation};
    use image::{GenericImageView, Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::path::PathBuf;

    fn make_loaded(seed: u8) -> LoadedImage {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([seed, 0, 0, 255])));
        LoadedImage::from_image(image, Some(PathBuf::from(format!("{}.png", seed))))
    }

    fn filled(n: u8) -> ImageSession {
        let mut session = ImageSession::default();
        for seed in 0..n {
            session.add(make_loaded(seed)).unwrap();
        }
        session
    }

    #[test]
    fn test_add_assigns_indices_in_order() {
        let mut session = ImageSession::default();
        assert_eq!(session.add(make_loaded(1)).unwrap(), 0);
        assert_eq!(session.add(make_loaded(2)).unwrap(), 1);
        assert_eq!(session.len(), 2);
        assert_ne!(session.images()[0].id, session.images()[1].id);
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut session = filled(1);
        let by_path = LoadedImage {
            fingerprint: 42,
            ..make_loaded(0)
        };
        assert!(matches!(session.add(by_path), Err(SessionError::Duplicate { .. })));

        let by_pixels = LoadedImage {
            source: Some(PathBuf::from("copy-of-0.png")),
            ..make_loaded(0)
        };
        assert!(matches!(session.add(by_pixels), Err(SessionError::Duplicate { .. })));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_limit() {
        let mut session = ImageSession::new(3);
        let summary = session.add_batch((0..5).map(make_loaded).chain([make_loaded(0)]));
        assert_eq!(
            summary,
            AddSummary {
                added: 3,
                duplicates: 1,
                over_limit: 2,
            }
        );
        assert_eq!(session.remaining(), 0);
        assert_eq!(
            session.add(make_loaded(9)),
            Err(SessionError::LimitReached { max: 3 })
        );
    }

    #[test]
    fn test_remove_shifts_following_images() {
        let mut session = filled(4);
        let third = session.images()[2].clone();
        let removed = session.remove(1).unwrap();
        assert_eq!(removed.source.as_deref(), Some(PathBuf::from("1.png").as_path()));
        assert!(Rc::ptr_eq(&session.images()[1], &third));
        assert_eq!(
            session.remove(3).unwrap_err(),
            SessionError::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_replace_flow() {
        let mut session = filled(3);
        assert_eq!(
            session.complete_replace(make_loaded(7)),
            Err(SessionError::NoPendingReplace)
        );

        session.request_replace(2).unwrap();
        // An earlier image disappears while the user is still choosing.
        session.remove(0).unwrap();
        assert_eq!(session.pending_replace(), Some(1));

        let index = session.complete_replace(make_loaded(7)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(session.len(), 2);
        assert_eq!(session.images()[1].source.as_deref(), Some(PathBuf::from("7.png").as_path()));
        assert_eq!(session.pending_replace(), None);
    }

    #[test]
    fn test_replace_target_removed() {
        let mut session = filled(2);
        session.request_replace(1).unwrap();
        session.remove(1).unwrap();
        assert_eq!(session.pending_replace(), None);
        assert_eq!(
            session.complete_replace(make_loaded(5)),
            Err(SessionError::StaleReplace)
        );
        assert_eq!(
            session.complete_replace(make_loaded(5)),
            Err(SessionError::NoPendingReplace)
        );
    }

    #[test]
    fn test_replace_with_duplicate_keeps_request() {
        let mut session = filled(2);
        session.request_replace(0).unwrap();
        assert!(matches!(
            session.complete_replace(make_loaded(1)),
            Err(SessionError::Duplicate { .. })
        ));
        assert_eq!(session.pending_replace(), Some(0));
        // Replacing an image with itself is allowed.
        assert_eq!(session.complete_replace(make_loaded(0)), Ok(0));
    }

    #[test]
    fn test_apply_watermark_once() {
        let mut session = filled(2);
        let before = session.images()[0].clone();
        let mark = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])));
        let settings = WatermarkSettings {
            scale: 0.5,
            margin_px: 0,
        };

        let stamped = session
            .apply_watermark(&mark, MarkerPosition::TopLeft, &settings)
            .unwrap();
        assert_eq!(stamped, 2);
        let after = &session.images()[0];
        assert!(after.watermarked);
        assert_eq!(after.id, before.id);
        assert_eq!(after.pixels.dimensions(), (8, 8));
        assert!(!Rc::ptr_eq(after, &before));

        assert_eq!(
            session.apply_watermark(&mark, MarkerPosition::TopLeft, &settings),
            Err(SessionError::NothingToWatermark)
        );

        session.add(make_loaded(9)).unwrap();
        assert_eq!(
            session.apply_watermark(&mark, MarkerPosition::Center, &settings),
            Ok(1)
        );
    }

    #[test]
    fn test_clear() {
        let mut session = filled(3);
        session.request_replace(0).unwrap();
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.pending_replace(), None);
    }

    #[test]
    fn test_remove_ids_keeps_later_changes() {
        let mut session = filled(3);
        let taken: Vec<ImageId> = session.images().iter().map(|img| img.id).collect();

        session.request_replace(1).unwrap();
        session.complete_replace(make_loaded(7)).unwrap();
        session.add(make_loaded(8)).unwrap();

        assert_eq!(session.remove_ids(&taken), 2);
        let left: Vec<_> = session
            .images()
            .iter()
            .map(|img| img.source.clone().unwrap())
            .collect();
        assert_eq!(left, vec![PathBuf::from("7.png"), PathBuf::from("8.png")]);
        assert_eq!(session.remove_ids(&taken), 0);
    }

    struct NullPresenter;

    impl FullImagePresenter<SessionImage> for NullPresenter {
        fn present(&self, _image: Rc<SessionImage>, presentation: Presentation) {
            presentation.resolve(crate::grid::PresentationOutcome::Confirm);
        }
    }

    #[test]
    fn test_grid_long_press_removes_from_session() {
        let session = Rc::new(RefCell::new(filled(7)));
        let host = session.clone();
        let callbacks = GridCallbacks::new(
            move |index| {
                host.borrow_mut().remove(index).unwrap();
            },
            |_| {},
        );
        let mut binder = GridBinder::new(
            session.borrow().snapshot(),
            callbacks,
            Rc::new(NullPresenter),
        );
        let removed = session.borrow().images()[3].clone();

        binder.long_activate(3).unwrap();
        binder.refresh(session.borrow().snapshot());

        assert_eq!(binder.row_count(), 2);
        assert!(binder
            .rows()
            .flat_map(|row| row.cells.into_iter())
            .filter_map(|cell| cell.image().cloned())
            .all(|image| !Rc::ptr_eq(&image, &removed)));
    }
}
