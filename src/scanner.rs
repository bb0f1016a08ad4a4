//! Discovery of image files from user-supplied paths.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::warn;
use walkdir::WalkDir;

/// Whether the extension names a format the loader can decode.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            matches!(
                e.to_ascii_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "tif"
            )
        })
        .unwrap_or(false)
}

/// Image files under `dir`, sorted by path.
pub fn discover_images(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Not a directory: {:?}", dir);
    }

    let mut walker = WalkDir::new(dir).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut paths = Vec::new();
    for entry in walker.into_iter() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && is_image_path(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Expands a mix of files and directories into image paths, keeping input order.
///
/// Directories are listed non-recursively. Files are kept as given so the
/// loader can report a decode error for them.
pub fn expand_inputs<P: AsRef<Path>>(inputs: &[P]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if path.is_dir() {
            match discover_images(path, false) {
                Ok(found) => out.extend(found),
                Err(err) => warn!(error = ?err, "Failed to list directory"),
            }
        } else {
            out.push(path.to_path_buf());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("a.JPG")));
        assert!(is_image_path(Path::new("dir/b.webp")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("no_extension")));
    }

    #[test]
    fn test_discover_images_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("b.png")).unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(dir.path().join("readme.md")).unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        File::create(nested.join("c.gif")).unwrap();

        let flat = discover_images(dir.path(), false).unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);

        let deep = discover_images(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_discover_images_rejects_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x.png");
        File::create(&file).unwrap();
        assert!(discover_images(&file, false).is_err());
    }

    #[test]
    fn test_expand_inputs() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("one.png")).unwrap();
        File::create(dir.path().join("two.png")).unwrap();
        let loose = dir.path().join("loose.bmp");

        let expanded = expand_inputs(&[loose.clone(), dir.path().to_path_buf()]);
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0], loose);
    }
}
