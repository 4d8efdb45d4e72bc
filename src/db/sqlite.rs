//! SQLite-backed diary store.

use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info, warn};

use super::schema::{SCHEMA, SCHEMA_VERSION};
use super::timestamp::{self, date_key};
use super::{Clock, Day, Entry, GracePeriod, StoreError, StoreResult, SystemClock};

/// Owns persistence of days and entries and enforces their consistency rules.
///
/// A connection is not shared across threads: every access path opens its
/// own store and drops (or [`close`](Self::close)s) it when done.
pub struct DiaryStore {
    conn: Connection,
    grace_period: GracePeriod,
    clock: Box<dyn Clock>,
}

const ENTRY_COLUMNS: &str = "_id, day_id, message, mood, created";
const DAY_COLUMNS: &str = "_id, filename, created";

fn entry_from_row(row: &Row) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        day_id: row.get(1)?,
        message: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        mood: row.get(3)?,
        created: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}

fn day_from_row(row: &Row) -> rusqlite::Result<Day> {
    Ok(Day {
        id: row.get(0)?,
        filename: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        created: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
    })
}

impl DiaryStore {
    pub fn open(path: &Path, grace_period: GracePeriod) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(?path, "Opened diary database");
        Ok(Self {
            conn,
            grace_period,
            clock: Box::new(SystemClock),
        })
    }

    pub fn open_in_memory(grace_period: GracePeriod) -> StoreResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            grace_period,
            clock: Box::new(SystemClock),
        })
    }

    /// Replace the clock used for timestamps and editability checks.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Release the connection, reporting any failure to close it.
    pub fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Storage(e))
    }

    pub fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    pub fn grace_period(&self) -> GracePeriod {
        self.grace_period
    }

    pub fn set_grace_period(&mut self, grace_period: GracePeriod) {
        self.grace_period = grace_period;
    }

    /// Current time as seen by the store's clock.
    pub fn now(&self) -> chrono::NaiveDateTime {
        self.clock.now()
    }

    fn now_stamp(&self) -> String {
        timestamp::format_db(self.clock.now())
    }

    // ========================================================================
    // Entry operations
    // ========================================================================

    pub fn get_entry_by_id(&self, id: i64) -> StoreResult<Option<Entry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE _id = ?1 LIMIT 1"),
                [id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Entries of a day, newest first.
    pub fn get_entries_by_day(&self, day_id: i64) -> StoreResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE day_id = ?1 ORDER BY _id DESC"
        ))?;
        let entries = stmt
            .query_map([day_id], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count_entries(&self, day_id: i64) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE day_id = ?1",
            [day_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Add an entry to today's day, creating the day if needed.
    /// Returns the new entry id.
    pub fn add_entry(&self, message: &str, mood: Option<&str>) -> StoreResult<i64> {
        let now = self.now_stamp();
        let day_id = match self.get_photo_by_day(date_key(&now))? {
            Some(day) => day.id,
            None => self.insert_day("", &now)?,
        };

        self.conn.execute(
            "INSERT INTO entries (message, mood, day_id, created) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![message, mood, day_id, now],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(entry_id = id, day_id, "Entry added");
        Ok(id)
    }

    /// Delete an entry. If it was the last entry of a day without a photo,
    /// the day goes with it.
    pub fn delete_entry_by_id(&self, id: i64) -> StoreResult<()> {
        // Counts must be read before the entry row disappears.
        let entry = self.get_entry_by_id(id)?.ok_or(StoreError::EntryNotFound(id))?;
        let day = self
            .get_day_by_id(entry.day_id)?
            .ok_or(StoreError::DayNotFound(entry.day_id))?;
        let count = self.count_entries(day.id)?;

        let tx = self.conn.unchecked_transaction()?;
        if !day.has_photo() && count <= 1 {
            self.delete_day(day.id, false)?;
        }
        tx.execute("DELETE FROM entries WHERE _id = ?1", [id])?;
        tx.commit()?;

        info!(entry_id = id, day_id = day.id, "Entry deleted");
        Ok(())
    }

    /// Unconditional write; check [`is_editable_entry`](Self::is_editable_entry) first.
    pub fn update_mood(&self, entry_id: i64, mood: Option<&str>) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE entries SET mood = ?1 WHERE _id = ?2",
            rusqlite::params![mood, entry_id],
        )?;
        Ok(())
    }

    /// Unconditional write; check [`is_editable_entry`](Self::is_editable_entry) first.
    pub fn update_message(&self, entry_id: i64, message: &str) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE entries SET message = ?1 WHERE _id = ?2",
            rusqlite::params![message, entry_id],
        )?;
        Ok(())
    }

    /// Whether the entry is still inside its grace period.
    /// An unparseable creation time counts as not editable.
    pub fn is_editable_entry(&self, entry_id: i64) -> StoreResult<bool> {
        let entry = self
            .get_entry_by_id(entry_id)?
            .ok_or(StoreError::EntryNotFound(entry_id))?;

        let created = match timestamp::parse_db(&entry.created) {
            Ok(created) => created,
            Err(e) => {
                warn!(entry_id, created = %entry.created, error = %e, "Bad entry timestamp");
                return Ok(false);
            }
        };

        Ok(self.clock.now() - created < self.grace_period.window())
    }

    fn next_entry_id(&self, current: i64, backwards: bool) -> StoreResult<Option<i64>> {
        let sql = if backwards {
            "SELECT _id FROM entries WHERE _id < ?1 ORDER BY _id DESC LIMIT 1"
        } else {
            "SELECT _id FROM entries WHERE _id > ?1 ORDER BY _id ASC LIMIT 1"
        };
        let id = self.conn.query_row(sql, [current], |row| row.get(0)).optional()?;
        Ok(id)
    }

    /// The neighbouring entry, or the current one when there is none.
    pub fn get_next_entry(&self, current: i64, backwards: bool) -> StoreResult<Entry> {
        let id = self.next_entry_id(current, backwards)?.unwrap_or(current);
        self.get_entry_by_id(id)?.ok_or(StoreError::EntryNotFound(id))
    }

    pub fn has_next_entry(&self, current: i64, backwards: bool) -> StoreResult<bool> {
        Ok(self.next_entry_id(current, backwards)?.is_some())
    }

    // ========================================================================
    // Day operations
    // ========================================================================

    fn insert_day(&self, filename: &str, created: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO days (filename, created) VALUES (?1, ?2)",
            rusqlite::params![filename, created],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(day_id = id, "Day created");
        Ok(id)
    }

    pub fn get_day_by_id(&self, id: i64) -> StoreResult<Option<Day>> {
        let day = self
            .conn
            .query_row(
                &format!("SELECT {DAY_COLUMNS} FROM days WHERE _id = ?1 LIMIT 1"),
                [id],
                day_from_row,
            )
            .optional()?;
        Ok(day)
    }

    pub fn get_day_by_entry(&self, entry_id: i64) -> StoreResult<Day> {
        let entry = self
            .get_entry_by_id(entry_id)?
            .ok_or(StoreError::EntryNotFound(entry_id))?;
        self.get_day_by_id(entry.day_id)?
            .ok_or(StoreError::DayNotFound(entry.day_id))
    }

    /// The day row for a calendar date given as `yyyyMMdd`.
    pub fn get_photo_by_day(&self, date: &str) -> StoreResult<Option<Day>> {
        let day = self
            .conn
            .query_row(
                &format!(
                    "SELECT {DAY_COLUMNS} FROM days WHERE substr(created, 1, 8) = ?1 \
                     ORDER BY _id ASC LIMIT 1"
                ),
                [date],
                day_from_row,
            )
            .optional()?;
        Ok(day)
    }

    /// All days, newest first.
    pub fn get_all_days(&self) -> StoreResult<Vec<Day>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {DAY_COLUMNS} FROM days ORDER BY _id DESC"))?;
        let days = stmt
            .query_map([], day_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
    }

    /// Days that have a photo, newest first.
    pub fn get_all_photos(&self) -> StoreResult<Vec<Day>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAY_COLUMNS} FROM days WHERE filename <> '' ORDER BY _id DESC"
        ))?;
        let days = stmt
            .query_map([], day_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(days)
    }

    /// Set today's photo, creating today's day if needed. Returns the day id.
    pub fn add_photo(&self, filename: &str) -> StoreResult<i64> {
        let now = self.now_stamp();
        let day_id = match self.get_photo_by_day(date_key(&now))? {
            Some(day) => {
                self.conn.execute(
                    "UPDATE days SET filename = ?1 WHERE _id = ?2",
                    rusqlite::params![filename, day.id],
                )?;
                day.id
            }
            None => self.insert_day(filename, &now)?,
        };
        info!(day_id, filename, "Photo set");
        Ok(day_id)
    }

    /// Delete a day.
    ///
    /// With `consistency` set, a day that still has entries is left alone.
    /// Either way the number of entries the day had is returned, so a zero
    /// means the day was removed.
    pub fn delete_day(&self, id: i64, consistency: bool) -> StoreResult<usize> {
        let count = self.count_entries(id)?;
        if count == 0 || !consistency {
            self.conn.execute("DELETE FROM days WHERE _id = ?1", [id])?;
            info!(day_id = id, entries = count, "Day deleted");
        }
        Ok(count)
    }

    /// Forget a day's photo: the day is removed when it has no entries,
    /// otherwise only its filename is cleared.
    pub fn delete_photo(&self, id: i64) -> StoreResult<()> {
        let entries = self.delete_day(id, true)?;
        if entries > 0 {
            self.conn
                .execute("UPDATE days SET filename = '' WHERE _id = ?1", [id])?;
            info!(day_id = id, "Photo cleared");
        }
        Ok(())
    }

    /// Only today's day can be changed.
    pub fn is_editable_day(&self, day_id: i64) -> StoreResult<bool> {
        let day = self.get_day_by_id(day_id)?.ok_or(StoreError::DayNotFound(day_id))?;
        Ok(day.date_key() == date_key(&self.now_stamp()))
    }

    fn next_day_id(&self, current: i64, backwards: bool) -> StoreResult<Option<i64>> {
        let sql = if backwards {
            "SELECT _id FROM days WHERE _id < ?1 AND filename <> '' ORDER BY _id DESC LIMIT 1"
        } else {
            "SELECT _id FROM days WHERE _id > ?1 AND filename <> '' ORDER BY _id ASC LIMIT 1"
        };
        let id = self.conn.query_row(sql, [current], |row| row.get(0)).optional()?;
        Ok(id)
    }

    /// The neighbouring day with a photo, or the current one when there is none.
    pub fn get_next_day(&self, current: i64, backwards: bool) -> StoreResult<Day> {
        let id = self.next_day_id(current, backwards)?.unwrap_or(current);
        self.get_day_by_id(id)?.ok_or(StoreError::DayNotFound(id))
    }

    pub fn has_next_day(&self, current: i64, backwards: bool) -> StoreResult<bool> {
        Ok(self.next_day_id(current, backwards)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ManualClock;
    use chrono::{Duration, NaiveDateTime};

    fn at(stamp: &str) -> NaiveDateTime {
        timestamp::parse_db(stamp).unwrap()
    }

    fn store_at(stamp: &str) -> (DiaryStore, ManualClock) {
        let clock = ManualClock::new(at(stamp));
        let store = DiaryStore::open_in_memory(GracePeriod::default())
            .unwrap()
            .with_clock(clock.clone());
        store.initialize().unwrap();
        (store, clock)
    }

    fn day_count(store: &DiaryStore) -> usize {
        store.get_all_days().unwrap().len()
    }

    #[test]
    fn test_add_entry_creates_day() {
        let (store, _clock) = store_at("20240101100000");

        let id = store.add_entry("Hello", None).unwrap();
        let entry = store.get_entry_by_id(id).unwrap().unwrap();
        let day = store.get_day_by_id(entry.day_id).unwrap().unwrap();

        assert_eq!(entry.message, "Hello");
        assert_eq!(entry.mood, None);
        assert_eq!(entry.created, "20240101100000");
        assert_eq!(day.created, "20240101100000");
        assert_eq!(day.filename, "");
    }

    #[test]
    fn test_entry_round_trip() {
        let (store, _clock) = store_at("20240101100000");
        let message = "  spaces kept, 'quotes' too; DROP TABLE days; --";

        let id = store.add_entry(message, Some("mood_happy")).unwrap();
        let entry = store.get_entry_by_id(id).unwrap().unwrap();

        assert_eq!(entry.message, message);
        assert_eq!(entry.mood.as_deref(), Some("mood_happy"));
        assert_eq!(day_count(&store), 1);
    }

    #[test]
    fn test_same_date_reuses_day() {
        let (store, clock) = store_at("20240101080000");

        let first = store.add_entry("morning", None).unwrap();
        clock.advance(Duration::hours(10));
        let second = store.add_entry("evening", None).unwrap();
        let photo_day = store.add_photo("/photos/a.jpg").unwrap();

        let first_day = store.get_day_by_entry(first).unwrap();
        let second_day = store.get_day_by_entry(second).unwrap();
        assert_eq!(first_day.id, second_day.id);
        assert_eq!(first_day.id, photo_day);
        assert_eq!(day_count(&store), 1);

        clock.advance(Duration::hours(6));
        let tomorrow = store.add_entry("next day", None).unwrap();
        assert_ne!(store.get_day_by_entry(tomorrow).unwrap().id, first_day.id);
        assert_eq!(day_count(&store), 2);
    }

    #[test]
    fn test_add_photo_twice_overwrites() {
        let (store, _clock) = store_at("20240101100000");

        let first = store.add_photo("/photos/a.jpg").unwrap();
        let second = store.add_photo("/photos/b.jpg").unwrap();

        assert_eq!(first, second);
        assert_eq!(day_count(&store), 1);
        assert_eq!(store.get_day_by_id(first).unwrap().unwrap().filename, "/photos/b.jpg");
    }

    #[test]
    fn test_entries_by_day_newest_first() {
        let (store, _clock) = store_at("20240101100000");
        let a = store.add_entry("a", None).unwrap();
        let b = store.add_entry("b", None).unwrap();
        let day = store.get_day_by_entry(a).unwrap();

        let ids: Vec<i64> = store
            .get_entries_by_day(day.id)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(store.count_entries(day.id).unwrap(), 2);
    }

    #[test]
    fn test_delete_last_entry_prunes_empty_day() {
        let (store, _clock) = store_at("20240101100000");
        let id = store.add_entry("only", None).unwrap();
        let day = store.get_day_by_entry(id).unwrap();

        store.delete_entry_by_id(id).unwrap();

        assert!(store.get_entry_by_id(id).unwrap().is_none());
        assert!(store.get_day_by_id(day.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_entry_keeps_day_with_photo() {
        let (store, _clock) = store_at("20240101100000");
        let id = store.add_entry("only", None).unwrap();
        let day_id = store.add_photo("/photos/a.jpg").unwrap();

        store.delete_entry_by_id(id).unwrap();

        assert!(store.get_day_by_id(day_id).unwrap().is_some());
    }

    #[test]
    fn test_delete_entry_keeps_day_with_other_entries() {
        let (store, _clock) = store_at("20240101100000");
        let a = store.add_entry("a", None).unwrap();
        let b = store.add_entry("b", None).unwrap();
        let day = store.get_day_by_entry(a).unwrap();

        store.delete_entry_by_id(a).unwrap();
        assert!(store.get_day_by_id(day.id).unwrap().is_some());

        store.delete_entry_by_id(b).unwrap();
        assert!(store.get_day_by_id(day.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_entry_is_an_error() {
        let (store, _clock) = store_at("20240101100000");
        assert!(matches!(
            store.delete_entry_by_id(42),
            Err(StoreError::EntryNotFound(42))
        ));
    }

    #[test]
    fn test_delete_entry_with_missing_day_is_an_error() {
        let (store, _clock) = store_at("20240101100000");
        let id = store.add_entry("orphan", None).unwrap();
        let day = store.get_day_by_entry(id).unwrap();
        store.delete_day(day.id, false).unwrap();

        assert!(matches!(
            store.delete_entry_by_id(id),
            Err(StoreError::DayNotFound(_))
        ));
    }

    #[test]
    fn test_delete_day_consistency() {
        let (store, _clock) = store_at("20240101100000");
        let id = store.add_entry("keep me", None).unwrap();
        let day = store.get_day_by_entry(id).unwrap();

        assert_eq!(store.delete_day(day.id, true).unwrap(), 1);
        assert!(store.get_day_by_id(day.id).unwrap().is_some());

        assert_eq!(store.delete_day(day.id, false).unwrap(), 1);
        assert!(store.get_day_by_id(day.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_photo_without_entries_removes_day() {
        let (store, _clock) = store_at("20240101100000");
        let day_id = store.add_photo("/photos/a.jpg").unwrap();

        store.delete_photo(day_id).unwrap();

        assert!(store.get_day_by_id(day_id).unwrap().is_none());
    }

    #[test]
    fn test_delete_photo_with_entries_clears_filename() {
        let (store, _clock) = store_at("20240101100000");
        store.add_entry("still here", None).unwrap();
        let day_id = store.add_photo("/photos/a.jpg").unwrap();

        store.delete_photo(day_id).unwrap();

        let day = store.get_day_by_id(day_id).unwrap().unwrap();
        assert_eq!(day.filename, "");
        assert_eq!(store.count_entries(day_id).unwrap(), 1);
    }

    #[test]
    fn test_entry_editable_within_grace_period() {
        let (store, clock) = store_at("20240101100000");
        let id = store.add_entry("Hello", None).unwrap();

        clock.advance(Duration::minutes(59));
        assert!(store.is_editable_entry(id).unwrap());

        clock.advance(Duration::minutes(1));
        assert!(!store.is_editable_entry(id).unwrap());

        clock.advance(Duration::hours(1));
        assert!(!store.is_editable_entry(id).unwrap());
    }

    #[test]
    fn test_grace_period_is_configurable() {
        let (mut store, clock) = store_at("20240101100000");
        let id = store.add_entry("Hello", None).unwrap();

        store.set_grace_period(GracePeriod::new(0).unwrap());
        assert!(!store.is_editable_entry(id).unwrap());

        store.set_grace_period(GracePeriod::new(168).unwrap());
        clock.advance(Duration::days(6));
        assert!(store.is_editable_entry(id).unwrap());
        clock.advance(Duration::days(1));
        assert!(!store.is_editable_entry(id).unwrap());
    }

    #[test]
    fn test_unparseable_timestamp_is_not_editable() {
        let (store, _clock) = store_at("20240101100000");
        let id = store.add_entry("Hello", None).unwrap();
        store
            .conn
            .execute("UPDATE entries SET created = 'garbage' WHERE _id = ?1", [id])
            .unwrap();

        assert!(!store.is_editable_entry(id).unwrap());
    }

    #[test]
    fn test_editable_missing_entry_is_an_error() {
        let (store, _clock) = store_at("20240101100000");
        assert!(matches!(
            store.is_editable_entry(7),
            Err(StoreError::EntryNotFound(7))
        ));
    }

    #[test]
    fn test_day_editable_only_today() {
        let (store, clock) = store_at("20240101235000");
        let day_id = store.add_photo("/photos/a.jpg").unwrap();
        assert!(store.is_editable_day(day_id).unwrap());

        clock.advance(Duration::minutes(20));
        assert!(!store.is_editable_day(day_id).unwrap());
    }

    #[test]
    fn test_entry_navigation() {
        let (store, _clock) = store_at("20240101100000");
        let a = store.add_entry("a", None).unwrap();
        let b = store.add_entry("b", None).unwrap();
        let c = store.add_entry("c", None).unwrap();

        assert_eq!(store.get_next_entry(a, false).unwrap().id, b);
        assert_eq!(store.get_next_entry(c, true).unwrap().id, b);

        assert!(!store.has_next_entry(c, false).unwrap());
        assert_eq!(store.get_next_entry(c, false).unwrap().id, c);
        assert!(!store.has_next_entry(a, true).unwrap());
        assert_eq!(store.get_next_entry(a, true).unwrap().id, a);

        store.delete_entry_by_id(b).unwrap();
        assert_eq!(store.get_next_entry(a, false).unwrap().id, c);
    }

    #[test]
    fn test_day_navigation_skips_days_without_photo() {
        let (store, clock) = store_at("20240101100000");
        let first = store.add_photo("/photos/1.jpg").unwrap();
        clock.advance(Duration::days(1));
        store.add_entry("no photo today", None).unwrap();
        clock.advance(Duration::days(1));
        let third = store.add_photo("/photos/3.jpg").unwrap();

        assert_eq!(store.get_next_day(first, false).unwrap().id, third);
        assert_eq!(store.get_next_day(third, true).unwrap().id, first);
        assert!(!store.has_next_day(third, false).unwrap());
        assert_eq!(store.get_next_day(third, false).unwrap().id, third);
    }

    #[test]
    fn test_all_photos_filters_and_orders() {
        let (store, clock) = store_at("20240101100000");
        let first = store.add_photo("/photos/1.jpg").unwrap();
        clock.advance(Duration::days(1));
        store.add_entry("text only", None).unwrap();
        clock.advance(Duration::days(1));
        let third = store.add_photo("/photos/3.jpg").unwrap();

        let photos: Vec<i64> = store.get_all_photos().unwrap().iter().map(|d| d.id).collect();
        assert_eq!(photos, vec![third, first]);
        assert_eq!(store.get_all_days().unwrap().len(), 3);
        assert_eq!(store.get_photo_by_day("20240102").unwrap().unwrap().filename, "");
        assert!(store.get_photo_by_day("20240104").unwrap().is_none());
    }

    #[test]
    fn test_update_message_and_mood() {
        let (store, _clock) = store_at("20240101100000");
        let id = store.add_entry("draft", None).unwrap();

        store.update_message(id, "final").unwrap();
        store.update_mood(id, Some("mood_sad")).unwrap();

        let entry = store.get_entry_by_id(id).unwrap().unwrap();
        assert_eq!(entry.message, "final");
        assert_eq!(entry.mood.as_deref(), Some("mood_sad"));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (store, _clock) = store_at("20240101100000");
        store.add_entry("survives", None).unwrap();
        store.initialize().unwrap();

        let version: i32 = store
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert_eq!(day_count(&store), 1);
    }

    #[test]
    fn test_open_file_and_close() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data").join("wordiary.db");

        let store = DiaryStore::open(&path, GracePeriod::default()).unwrap();
        store.initialize().unwrap();
        let id = store.add_entry("persisted", None).unwrap();
        store.close().unwrap();

        let store = DiaryStore::open(&path, GracePeriod::default()).unwrap();
        assert_eq!(store.get_entry_by_id(id).unwrap().unwrap().message, "persisted");
    }
}
