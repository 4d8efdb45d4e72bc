//! User-level diary actions.
//!
//! Each action returns a [`Notice`], the short confirmation shown to the user
//! once the action has been carried out (or refused).

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::db::{DiaryStore, StoreError, StoreResult};
use crate::imaging::ImageCache;
use crate::photos::PhotoLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    MessageSaved { entry_id: i64 },
    MessageNotSaved,
    MessageDeleted,
    PhotoSaved { day_id: i64 },
    PhotoDeleted,
    PhotoNotDeleted,
    GracePeriodEnded,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MessageSaved { .. } => write!(f, "Message saved"),
            Notice::MessageNotSaved => write!(f, "Message not saved"),
            Notice::MessageDeleted => write!(f, "Message deleted"),
            Notice::PhotoSaved { .. } => write!(f, "Photo saved"),
            Notice::PhotoDeleted => write!(f, "Photo deleted"),
            Notice::PhotoNotDeleted => write!(f, "Photo not deleted"),
            Notice::GracePeriodEnded => write!(f, "Grace period has ended, changes are locked"),
        }
    }
}

pub struct Journal {
    store: DiaryStore,
    photos: PhotoLibrary,
    cache: ImageCache,
}

impl Journal {
    pub fn new(store: DiaryStore, photos: PhotoLibrary, cache: ImageCache) -> Self {
        Self {
            store,
            photos,
            cache,
        }
    }

    pub fn store(&self) -> &DiaryStore {
        &self.store
    }

    pub fn photos(&self) -> &PhotoLibrary {
        &self.photos
    }

    pub fn into_store(self) -> DiaryStore {
        self.store
    }

    pub fn new_entry(&self, message: &str) -> StoreResult<Notice> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(Notice::MessageNotSaved);
        }
        let entry_id = self.store.add_entry(message, None)?;
        Ok(Notice::MessageSaved { entry_id })
    }

    pub fn edit_message(&self, entry_id: i64, message: &str) -> StoreResult<Notice> {
        if !self.store.is_editable_entry(entry_id)? {
            return Ok(Notice::GracePeriodEnded);
        }
        let message = message.trim();
        if message.is_empty() {
            return Ok(Notice::MessageNotSaved);
        }
        self.store.update_message(entry_id, message)?;
        Ok(Notice::MessageSaved { entry_id })
    }

    /// An empty mood clears it.
    pub fn set_mood(&self, entry_id: i64, mood: Option<&str>) -> StoreResult<Notice> {
        if !self.store.is_editable_entry(entry_id)? {
            return Ok(Notice::GracePeriodEnded);
        }
        let mood = mood.map(str::trim).filter(|m| !m.is_empty());
        self.store.update_mood(entry_id, mood)?;
        Ok(Notice::MessageSaved { entry_id })
    }

    pub fn delete_entry(&self, entry_id: i64) -> StoreResult<Notice> {
        self.store.delete_entry_by_id(entry_id)?;
        Ok(Notice::MessageDeleted)
    }

    /// Record `path` as today's photo.
    pub fn save_photo(&self, path: &Path) -> StoreResult<Notice> {
        let filename = path.to_string_lossy();
        let day_id = self.store.add_photo(&filename)?;
        self.cache.invalidate_path(&filename);
        Ok(Notice::PhotoSaved { day_id })
    }

    /// Copy a picture into the photo directory and make it today's photo.
    pub fn import_photo(&self, source: &Path) -> anyhow::Result<Notice> {
        let target = self.photos.import(source, self.store.now())?;
        Ok(self.save_photo(&target)?)
    }

    /// Remove a day's photo. The record is only touched once the file is gone.
    pub fn delete_photo(&self, day_id: i64) -> StoreResult<Notice> {
        if !self.store.is_editable_day(day_id)? {
            return Ok(Notice::GracePeriodEnded);
        }
        let day = self
            .store
            .get_day_by_id(day_id)?
            .ok_or(StoreError::DayNotFound(day_id))?;
        if !day.has_photo() {
            debug!(day_id, "Day has no photo");
            return Ok(Notice::PhotoNotDeleted);
        }

        if !self.photos.delete(Path::new(&day.filename)) {
            return Ok(Notice::PhotoNotDeleted);
        }
        self.store.delete_photo(day_id)?;
        self.cache.invalidate_path(&day.filename);
        info!(day_id, "Photo removed from diary");
        Ok(Notice::PhotoDeleted)
    }

    pub fn new_photo_path(&self) -> anyhow::Result<PathBuf> {
        self.photos.new_photo_path(self.store.now(), "jpg")
    }
}
