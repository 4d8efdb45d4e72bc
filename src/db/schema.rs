/// Schema version recorded in `PRAGMA user_version`. There are no upgrades.
pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA: &str = r#"
-- Entries: one journal note each, owned by a day
CREATE TABLE IF NOT EXISTS entries (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    day_id INTEGER,
    message TEXT,
    mood TEXT,
    created TEXT            -- yyyyMMddHHmmss
);

-- Days: one row per calendar date, with an optional photo
CREATE TABLE IF NOT EXISTS days (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT,          -- '' means no photo
    created TEXT            -- yyyyMMddHHmmss
);
"#;
