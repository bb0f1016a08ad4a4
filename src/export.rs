//! Saving watermarked images as JPEG files.
//!
//! - `export_images` writes synchronously and stops at the first failure
//! - existing `watermarked_{n}.jpg` files are skipped, never overwritten
//! - `ExportJob` writes on a worker thread and streams per-image events over flume

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::{debug, info, warn};

/// Export file name for slot `n`.
pub fn export_file_name(n: usize) -> String {
    format!("watermarked_{}.jpg", n)
}

/// Creates the first `watermarked_{n}.jpg` in `dir`, starting at `*next`, that
/// does not exist yet. Existing exports are never opened for writing.
fn create_unique(dir: &Path, next: &mut usize) -> Result<(File, PathBuf)> {
    loop {
        let path = dir.join(export_file_name(*next));
        *next += 1;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!(?path, "Export name taken");
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to create export file: {:?}", path));
            }
        }
    }
}

/// Encodes one image as JPEG into `file`. Alpha is dropped; JPEG has no alpha channel.
fn write_jpeg(image: &DynamicImage, file: File, path: &Path, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(file);
    let rgb = image.to_rgb8();
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(&rgb)
        .with_context(|| format!("Failed to encode JPEG: {:?}", path))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write export file: {:?}", path))?;
    Ok(())
}

/// Saves `image` under the next free export name and returns its path.
fn save_next(image: &DynamicImage, dir: &Path, next: &mut usize, quality: u8) -> Result<PathBuf> {
    let (file, path) = create_unique(dir, next)?;
    if let Err(err) = write_jpeg(image, file, &path, quality) {
        // Do not leave a truncated JPEG behind.
        let _ = std::fs::remove_file(&path);
        return Err(err);
    }
    Ok(path)
}

/// Writes every image into `dir` as `watermarked_{n}.jpg`, skipping names
/// already taken by earlier exports.
pub fn export_images(images: &[DynamicImage], dir: &Path, quality: u8) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {:?}", dir))?;

    let mut next = 0;
    let mut written = Vec::with_capacity(images.len());
    for image in images {
        written.push(save_next(image, dir, &mut next, quality)?);
    }
    info!(count = written.len(), ?dir, "Exported images");
    Ok(written)
}

/// Progress reported by an [`ExportJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    Saved { index: usize, path: PathBuf },
    Failed { index: usize, error: String },
    /// Always the last event.
    Finished { saved: usize, failed: usize },
}

/// Background export of a batch of images.
pub struct ExportJob {
    events: Receiver<ExportEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ExportJob {
    pub fn spawn(images: Vec<DynamicImage>, dir: PathBuf, quality: u8) -> Self {
        let (tx, rx) = flume::unbounded();
        let handle = thread::spawn(move || run_export(images, &dir, quality, &tx));
        Self {
            events: rx,
            handle: Some(handle),
        }
    }

    pub fn events(&self) -> &Receiver<ExportEvent> {
        &self.events
    }

    /// Blocks until the job ends and returns every event it produced.
    pub fn wait(mut self) -> Vec<ExportEvent> {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Export worker panicked");
            }
        }
        self.events.drain().collect()
    }
}

fn run_export(images: Vec<DynamicImage>, dir: &Path, quality: u8, tx: &Sender<ExportEvent>) {
    let mut saved = 0;
    let mut failed = 0;

    let dir_result = std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {:?}", dir));

    let mut next = 0;
    for (index, image) in images.iter().enumerate() {
        let result = match &dir_result {
            Ok(()) => save_next(image, dir, &mut next, quality),
            Err(err) => Err(anyhow::anyhow!("{:#}", err)),
        };
        let event = match result {
            Ok(path) => {
                saved += 1;
                ExportEvent::Saved { index, path }
            }
            Err(err) => {
                warn!(index, error = ?err, "Failed to export image");
                failed += 1;
                ExportEvent::Failed {
                    index,
                    error: format!("{:#}", err),
                }
            }
        };
        // The receiver may have been dropped; the files are still written.
        let _ = tx.send(event);
    }

    info!(saved, failed, ?dir, "Export finished");
    let _ = tx.send(ExportEvent::Finished { saved, failed });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 128])))
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name(0), "watermarked_0.jpg");
        assert_eq!(export_file_name(9), "watermarked_9.jpg");
    }

    #[test]
    fn test_export_images_writes_jpegs() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let written = export_images(&[solid(8, 6), solid(3, 3)], &out, 90).unwrap();

        assert_eq!(written, vec![out.join("watermarked_0.jpg"), out.join("watermarked_1.jpg")]);
        let decoded = image::open(&written[0]).unwrap();
        assert_eq!(decoded.dimensions(), (8, 6));
    }

    #[test]
    fn test_export_job_reports_each_image() {
        let dir = tempdir().unwrap();
        let job = ExportJob::spawn(vec![solid(4, 4), solid(5, 5)], dir.path().to_path_buf(), 80);
        let events = job.wait();

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ExportEvent::Saved { index: 0, .. }));
        assert!(matches!(events[1], ExportEvent::Saved { index: 1, .. }));
        assert_eq!(events[2], ExportEvent::Finished { saved: 2, failed: 0 });
        assert!(dir.path().join("watermarked_1.jpg").exists());
    }

    #[test]
    fn test_export_job_unwritable_directory() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let job = ExportJob::spawn(vec![solid(2, 2)], blocker.join("sub"), 80);
        let events = job.wait();
        assert!(matches!(events[0], ExportEvent::Failed { index: 0, .. }));
        assert_eq!(events[1], ExportEvent::Finished { saved: 0, failed: 1 });
    }

    #[test]
    fn test_second_export_keeps_first_batch() {
        let dir = tempdir().unwrap();
        let red = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255])));
        let blue = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255])));

        let first = export_images(&[red], dir.path(), 90).unwrap();
        let second = export_images(&[blue], dir.path(), 90).unwrap();

        assert_eq!(first, vec![dir.path().join("watermarked_0.jpg")]);
        assert_eq!(second, vec![dir.path().join("watermarked_1.jpg")]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
        assert_eq!(image::open(&first[0]).unwrap().dimensions(), (8, 8));
        assert_eq!(image::open(&second[0]).unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_export_job_skips_taken_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("watermarked_0.jpg"), b"earlier export").unwrap();
        std::fs::write(dir.path().join("watermarked_2.jpg"), b"earlier export").unwrap();

        let job = ExportJob::spawn(vec![solid(3, 3), solid(2, 2)], dir.path().to_path_buf(), 80);
        let events = job.wait();

        assert_eq!(
            events[0],
            ExportEvent::Saved { index: 0, path: dir.path().join("watermarked_1.jpg") }
        );
        assert_eq!(
            events[1],
            ExportEvent::Saved { index: 1, path: dir.path().join("watermarked_3.jpg") }
        );
        assert_eq!(std::fs::read(dir.path().join("watermarked_0.jpg")).unwrap(), b"earlier export");
    }
}
