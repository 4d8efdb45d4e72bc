use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::PhotosConfig;

/// The directory daily photos are stored in.
pub struct PhotoLibrary {
    directory: PathBuf,
}

impl PhotoLibrary {
    pub fn new(config: &PhotosConfig) -> Self {
        Self::at(config.directory.clone())
    }

    pub fn at(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.directory.exists() {
            fs::create_dir_all(&self.directory)
                .context("Failed to create photo directory")?;
        }
        Ok(())
    }

    /// A free path for a photo taken at `taken`, e.g. `IMG_20240101_103000.jpg`.
    /// A numeric suffix is added when several photos land on the same second.
    pub fn new_photo_path(&self, taken: NaiveDateTime, extension: &str) -> Result<PathBuf> {
        self.ensure_dir()?;

        let stem = format!("IMG_{}", taken.format("%Y%m%d_%H%M%S"));
        let mut candidate = self.directory.join(format!("{stem}.{extension}"));
        let mut seq = 1;
        while candidate.exists() {
            candidate = self.directory.join(format!("{stem}_{seq}.{extension}"));
            seq += 1;
        }
        Ok(candidate)
    }

    /// Copy an existing picture into the library.
    pub fn import(&self, source: &Path, taken: NaiveDateTime) -> Result<PathBuf> {
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "jpg".to_string());
        let target = self.new_photo_path(taken, &extension)?;

        fs::copy(source, &target)
            .with_context(|| format!("Failed to copy {:?} into the photo library", source))?;
        info!(?source, ?target, "Photo imported");
        Ok(target)
    }

    /// Delete a photo file. Only success or failure matters to callers.
    pub fn delete(&self, path: &Path) -> bool {
        match fs::remove_file(path) {
            Ok(()) => {
                info!(?path, "Photo file deleted");
                true
            }
            Err(e) => {
                warn!(?path, error = %e, "Failed to delete photo file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::timestamp::parse_db;
    use tempfile::TempDir;

    #[test]
    fn test_new_photo_path_is_unique() {
        let dir = TempDir::new().unwrap();
        let library = PhotoLibrary::at(dir.path().join("photos"));
        let taken = parse_db("20240101103000").unwrap();

        let first = library.new_photo_path(taken, "jpg").unwrap();
        assert_eq!(first.file_name().unwrap(), "IMG_20240101_103000.jpg");
        fs::write(&first, b"x").unwrap();

        let second = library.new_photo_path(taken, "jpg").unwrap();
        assert_eq!(second.file_name().unwrap(), "IMG_20240101_103000_1.jpg");
    }

    #[test]
    fn test_import_and_delete() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("camera.PNG");
        fs::write(&source, b"pixels").unwrap();
        let library = PhotoLibrary::at(dir.path().join("photos"));

        let imported = library
            .import(&source, parse_db("20240101103000").unwrap())
            .unwrap();
        assert_eq!(imported.extension().unwrap(), "png");
        assert_eq!(fs::read(&imported).unwrap(), b"pixels");
        assert!(source.exists());

        assert!(library.delete(&imported));
        assert!(!imported.exists());
        assert!(!library.delete(&imported));
    }
}
