//! SQLite capsule store.
//!
//! Single `capsules` table carrying the flattened record columns;
//! `content_blocks` and `activities` are stored as JSON array columns.
//! WAL mode, foreign keys, and busy timeout are mandatory; the schema
//! version lives in `PRAGMA user_version` and migrations are forward-only.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use keepsake_types::{BlockRecord, Capsule, CapsuleId, CapsuleRecord};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::{
    new_capsule_id, CapsuleStore, CapsuleUpdate, ChangeEvent, ChangeFeed, ChangeKind, Result,
    StoreError,
};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete schema for the capsule store.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS capsules (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    order_index INTEGER NOT NULL DEFAULT 0,

    unlock_type TEXT NOT NULL,
    unlock_date TEXT,
    unlock_time TEXT,
    required_key TEXT,
    depends_on_id TEXT,

    is_unlocked INTEGER NOT NULL DEFAULT 0,
    unlocked_at TEXT,
    edit_secret TEXT,
    celebrate_on_unlock INTEGER NOT NULL DEFAULT 0,

    content_type TEXT NOT NULL,
    content_title TEXT NOT NULL,
    content_description TEXT NOT NULL,
    body TEXT,
    image_url TEXT,
    video_url TEXT,
    event_date TEXT,
    place_name TEXT,
    map_url TEXT,
    lat REAL,
    lon REAL,
    activities TEXT,
    content_blocks TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_capsules_order ON capsules(order_index);
"#;

const SELECT_COLUMNS: &str = "id, title, order_index, unlock_type, unlock_date, unlock_time,
     required_key, depends_on_id, is_unlocked, unlocked_at, edit_secret,
     celebrate_on_unlock, content_type, content_title, content_description,
     body, image_url, video_url, event_date, place_name, map_url, lat, lon,
     activities, content_blocks";

/// rusqlite-backed capsule store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        configure(&conn)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: ChangeFeed::default(),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            feed: ChangeFeed::default(),
        })
    }
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Run pending migrations.
fn migrate(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current == 0 {
        tracing::info!("Initializing capsule schema v{SCHEMA_VERSION}");
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if current > SCHEMA_VERSION {
        return Err(StoreError::Serialization(format!(
            "database version {current} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

/// A capsule row with date/JSON columns still in their stored text form.
struct RawRow {
    id: String,
    title: String,
    order_index: i64,
    unlock_type: String,
    unlock_date: Option<String>,
    unlock_time: Option<String>,
    required_key: Option<String>,
    depends_on_id: Option<String>,
    is_unlocked: bool,
    unlocked_at: Option<String>,
    edit_secret: Option<String>,
    celebrate_on_unlock: bool,
    content_type: String,
    content_title: String,
    content_description: String,
    body: Option<String>,
    image_url: Option<String>,
    video_url: Option<String>,
    event_date: Option<String>,
    place_name: Option<String>,
    map_url: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    activities: Option<String>,
    content_blocks: String,
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        title: row.get(1)?,
        order_index: row.get(2)?,
        unlock_type: row.get(3)?,
        unlock_date: row.get(4)?,
        unlock_time: row.get(5)?,
        required_key: row.get(6)?,
        depends_on_id: row.get(7)?,
        is_unlocked: row.get(8)?,
        unlocked_at: row.get(9)?,
        edit_secret: row.get(10)?,
        celebrate_on_unlock: row.get(11)?,
        content_type: row.get(12)?,
        content_title: row.get(13)?,
        content_description: row.get(14)?,
        body: row.get(15)?,
        image_url: row.get(16)?,
        video_url: row.get(17)?,
        event_date: row.get(18)?,
        place_name: row.get(19)?,
        map_url: row.get(20)?,
        lat: row.get(21)?,
        lon: row.get(22)?,
        activities: row.get(23)?,
        content_blocks: row.get(24)?,
    })
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| StoreError::Serialization(format!("bad date `{text}`: {e}")))
}

fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .map_err(|e| StoreError::Serialization(format!("bad time `{text}`: {e}")))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp `{text}`: {e}")))
}

fn raw_to_record(raw: RawRow) -> Result<CapsuleRecord> {
    let blocks: Vec<BlockRecord> = serde_json::from_str(&raw.content_blocks)
        .map_err(|e| StoreError::Serialization(format!("bad content_blocks: {e}")))?;
    let activities: Option<Vec<String>> = match raw.activities.as_deref() {
        Some(json) => Some(
            serde_json::from_str(json)
                .map_err(|e| StoreError::Serialization(format!("bad activities: {e}")))?,
        ),
        None => None,
    };

    Ok(CapsuleRecord {
        id: raw.id,
        title: raw.title,
        order_index: raw.order_index,
        unlock_type: raw.unlock_type,
        unlock_date: raw.unlock_date.as_deref().map(parse_date).transpose()?,
        unlock_time: raw.unlock_time.as_deref().map(parse_time).transpose()?,
        required_key: raw.required_key,
        depends_on_id: raw.depends_on_id,
        is_unlocked: raw.is_unlocked,
        unlocked_at: raw.unlocked_at.as_deref().map(parse_timestamp).transpose()?,
        edit_secret: raw.edit_secret,
        celebrate_on_unlock: raw.celebrate_on_unlock,
        content_type: raw.content_type,
        content_title: raw.content_title,
        content_description: raw.content_description,
        body: raw.body,
        image_url: raw.image_url,
        video_url: raw.video_url,
        event_date: raw.event_date.as_deref().map(parse_date).transpose()?,
        place_name: raw.place_name,
        map_url: raw.map_url,
        lat: raw.lat,
        lon: raw.lon,
        activities,
        content_blocks: blocks,
    })
}

fn write_record(conn: &Connection, record: &CapsuleRecord) -> Result<()> {
    let blocks_json = serde_json::to_string(&record.content_blocks)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let activities_json = match &record.activities {
        Some(activities) => Some(
            serde_json::to_string(activities)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
        ),
        None => None,
    };

    conn.execute(
        "INSERT INTO capsules
         (id, title, order_index, unlock_type, unlock_date, unlock_time,
          required_key, depends_on_id, is_unlocked, unlocked_at, edit_secret,
          celebrate_on_unlock, content_type, content_title, content_description,
          body, image_url, video_url, event_date, place_name, map_url, lat, lon,
          activities, content_blocks)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                 ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)
         ON CONFLICT(id) DO UPDATE SET
           title = excluded.title,
           order_index = excluded.order_index,
           unlock_type = excluded.unlock_type,
           unlock_date = excluded.unlock_date,
           unlock_time = excluded.unlock_time,
           required_key = excluded.required_key,
           depends_on_id = excluded.depends_on_id,
           is_unlocked = excluded.is_unlocked,
           unlocked_at = excluded.unlocked_at,
           edit_secret = excluded.edit_secret,
           celebrate_on_unlock = excluded.celebrate_on_unlock,
           content_type = excluded.content_type,
           content_title = excluded.content_title,
           content_description = excluded.content_description,
           body = excluded.body,
           image_url = excluded.image_url,
           video_url = excluded.video_url,
           event_date = excluded.event_date,
           place_name = excluded.place_name,
           map_url = excluded.map_url,
           lat = excluded.lat,
           lon = excluded.lon,
           activities = excluded.activities,
           content_blocks = excluded.content_blocks",
        rusqlite::params![
            record.id,
            record.title,
            record.order_index,
            record.unlock_type,
            record.unlock_date.map(|d| d.format("%Y-%m-%d").to_string()),
            record.unlock_time.map(|t| t.format("%H:%M:%S").to_string()),
            record.required_key,
            record.depends_on_id,
            record.is_unlocked,
            record.unlocked_at.map(|at| at.to_rfc3339()),
            record.edit_secret,
            record.celebrate_on_unlock,
            record.content_type,
            record.content_title,
            record.content_description,
            record.body,
            record.image_url,
            record.video_url,
            record.event_date.map(|d| d.format("%Y-%m-%d").to_string()),
            record.place_name,
            record.map_url,
            record.lat,
            record.lon,
            activities_json,
            blocks_json,
        ],
    )?;
    Ok(())
}

#[async_trait::async_trait]
impl CapsuleStore for SqliteStore {
    async fn load_all(&self) -> Result<Vec<CapsuleRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM capsules ORDER BY order_index ASC, id ASC"
        ))?;
        let raws = stmt
            .query_map([], read_raw)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(raw_to_record).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<CapsuleRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM capsules WHERE id = ?1"))?;
        let mut rows = stmt.query_map([id], read_raw)?;
        match rows.next() {
            Some(raw) => Ok(Some(raw_to_record(raw?)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, mut record: CapsuleRecord) -> Result<CapsuleId> {
        if record.id.is_empty() {
            record.id = new_capsule_id();
        }
        let id = record.id.clone();
        {
            let conn = self.conn.lock().await;
            write_record(&conn, &record)?;
        }
        self.feed.emit(ChangeEvent {
            kind: ChangeKind::Inserted,
            capsule_id: id.clone(),
        });
        Ok(id)
    }

    async fn update(&self, id: &str, update: CapsuleUpdate) -> Result<()> {
        {
            let conn = self.conn.lock().await;
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM capsules WHERE id = ?1"))?;
            let mut rows = stmt.query_map([id], read_raw)?;
            let raw = match rows.next() {
                Some(raw) => raw?,
                None => return Err(StoreError::NotFound(id.to_string())),
            };
            drop(rows);
            drop(stmt);

            let record = raw_to_record(raw)?;
            let mut capsule = Capsule::try_from(record)?;
            update.apply(&mut capsule);
            write_record(&conn, &CapsuleRecord::from(&capsule))?;
        }
        self.feed.emit(ChangeEvent {
            kind: ChangeKind::Updated,
            capsule_id: id.to_string(),
        });
        Ok(())
    }

    fn change_feed(&self) -> &ChangeFeed {
        &self.feed
    }
}
