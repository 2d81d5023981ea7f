//! SQLite-backed torrent store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::{InsertOutcome, StoreError, TorrentStore};
use crate::torrent::{DeliveryState, Destination, Torrent};

/// Columns selected for every record read, in `row_to_torrent` order.
const SELECT_COLUMNS: &str =
    "id, name, magnet, category, size, date, delivered_transmission, delivered_aria2";

const INSERT_SQL: &str = "INSERT OR IGNORE INTO torrents (id, name, magnet, category, size, date)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed torrent store.
pub struct SqliteTorrentStore {
    conn: Mutex<Connection>,
}

impl SqliteTorrentStore {
    /// Open or create the database at `path` and make sure the schema exists.
    ///
    /// Safe to call repeatedly on the same file.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::init)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(StoreError::init)?;
        Self::initialize_schema(&conn)?;
        info!(path = %path.display(), "Torrent store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::init)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS torrents (
                id INTEGER PRIMARY KEY,
                name TEXT,
                magnet TEXT,
                category TEXT,
                size TEXT,
                date TEXT,
                delivered_transmission BOOLEAN NOT NULL DEFAULT 0,
                delivered_aria2 BOOLEAN NOT NULL DEFAULT 0
            );
            "#,
        )
        .map_err(StoreError::init)?;

        Self::migrate_delivery_columns(conn)?;

        conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_torrents_name ON torrents(name);
            CREATE INDEX IF NOT EXISTS idx_torrents_category ON torrents(category);
            CREATE INDEX IF NOT EXISTS idx_torrents_date ON torrents(date);
            "#,
        )
        .map_err(StoreError::init)?;

        Ok(())
    }

    /// Bring the delivery flag columns up to date.
    ///
    /// Older databases call them `pushed_to_<destination>`; those are renamed.
    /// Destinations with no column at all get one.
    fn migrate_delivery_columns(conn: &Connection) -> Result<(), StoreError> {
        let existing = Self::table_columns(conn)?;

        for destination in Destination::ALL {
            if existing.iter().any(|c| c == destination.column()) {
                continue;
            }

            let sql = if existing.iter().any(|c| c == destination.legacy_column()) {
                warn!(
                    from = destination.legacy_column(),
                    to = destination.column(),
                    "Renaming legacy delivery column"
                );
                format!(
                    "ALTER TABLE torrents RENAME COLUMN {} TO {}",
                    destination.legacy_column(),
                    destination.column()
                )
            } else {
                info!(column = destination.column(), "Adding delivery column");
                format!(
                    "ALTER TABLE torrents ADD COLUMN {} BOOLEAN NOT NULL DEFAULT 0",
                    destination.column()
                )
            };

            conn.execute_batch(&sql).map_err(StoreError::init)?;
        }

        Ok(())
    }

    fn table_columns(conn: &Connection) -> Result<Vec<String>, StoreError> {
        let mut stmt = conn
            .prepare("PRAGMA table_info(torrents)")
            .map_err(StoreError::init)?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(StoreError::init)?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.map_err(StoreError::init)?);
        }
        Ok(columns)
    }

    /// Lock the connection. A panic in another holder cannot leave a
    /// transaction open, so a poisoned lock is still usable.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_to_torrent(row: &rusqlite::Row) -> rusqlite::Result<Torrent> {
        let id: i64 = row.get(0)?;
        let id = u64::try_from(id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(e))
        })?;
        Ok(Torrent {
            id,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            magnet: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            category: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            size: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            date: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            delivered: DeliveryState {
                transmission: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
                aria2: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
            },
        })
    }

    fn query_torrents(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Torrent>, StoreError> {
        let mut stmt = conn.prepare(sql).map_err(StoreError::read)?;
        let rows = stmt
            .query_map(params, Self::row_to_torrent)
            .map_err(StoreError::read)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(StoreError::read)?);
        }
        Ok(results)
    }

    fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<u64, StoreError> {
        let count: i64 = conn
            .query_row(sql, params, |row| row.get(0))
            .map_err(StoreError::read)?;
        u64::try_from(count).map_err(StoreError::read)
    }
}

/// The SQLite key for `id`, or `None` if it cannot have been stored.
fn row_key(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

/// Build an unanchored LIKE pattern that treats `%` and `_` literally.
fn like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    escaped.push('%');
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl TorrentStore for SqliteTorrentStore {
    fn insert_one(&self, torrent: &Torrent) -> Result<bool, StoreError> {
        if !torrent.is_valid() {
            warn!(name = %torrent.name, "Refusing to store record without a valid id");
            return Ok(false);
        }

        let key = i64::try_from(torrent.id).map_err(StoreError::write)?;
        let conn = self.conn();
        let changed = conn
            .execute(
                INSERT_SQL,
                params![
                    key,
                    &torrent.name,
                    &torrent.magnet,
                    &torrent.category,
                    &torrent.size,
                    &torrent.date,
                ],
            )
            .map_err(StoreError::write)?;

        Ok(changed > 0)
    }

    fn insert_batch(&self, torrents: &[Torrent]) -> Result<InsertOutcome, StoreError> {
        let mut outcome = InsertOutcome::default();
        if torrents.is_empty() {
            return Ok(outcome);
        }

        let mut conn = self.conn();
        let tx = conn.transaction().map_err(StoreError::write)?;
        {
            let mut stmt = tx.prepare_cached(INSERT_SQL).map_err(StoreError::write)?;
            for torrent in torrents {
                if !torrent.is_valid() {
                    outcome.rejected += 1;
                    continue;
                }

                let key = i64::try_from(torrent.id).map_err(StoreError::write)?;
                let changed = stmt
                    .execute(params![
                        key,
                        &torrent.name,
                        &torrent.magnet,
                        &torrent.category,
                        &torrent.size,
                        &torrent.date,
                    ])
                    .map_err(StoreError::write)?;

                if changed > 0 {
                    outcome.inserted.push(torrent.id);
                } else {
                    outcome.duplicates += 1;
                }
            }
        }
        tx.commit().map_err(StoreError::write)?;

        debug!(
            inserted = outcome.inserted_count(),
            duplicates = outcome.duplicates,
            rejected = outcome.rejected,
            "Batch insert committed"
        );
        Ok(outcome)
    }

    fn get(&self, id: u64) -> Result<Option<Torrent>, StoreError> {
        let Some(key) = row_key(id) else {
            return Ok(None);
        };
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM torrents WHERE id = ?1", SELECT_COLUMNS),
            params![key],
            Self::row_to_torrent,
        )
        .optional()
        .map_err(StoreError::read)
    }

    fn query_by_name(&self, pattern: &str, limit: u32) -> Result<Vec<Torrent>, StoreError> {
        let conn = self.conn();
        Self::query_torrents(
            &conn,
            &format!(
                "SELECT {} FROM torrents WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id DESC LIMIT ?2",
                SELECT_COLUMNS
            ),
            params![like_pattern(pattern), limit],
        )
    }

    fn query_latest(&self, limit: u32) -> Result<Vec<Torrent>, StoreError> {
        let conn = self.conn();
        Self::query_torrents(
            &conn,
            &format!(
                "SELECT {} FROM torrents ORDER BY id DESC LIMIT ?1",
                SELECT_COLUMNS
            ),
            params![limit],
        )
    }

    fn pending_delivery(
        &self,
        destination: Destination,
        limit: u32,
    ) -> Result<Vec<Torrent>, StoreError> {
        let conn = self.conn();
        Self::query_torrents(
            &conn,
            &format!(
                "SELECT {} FROM torrents
                 WHERE magnet IS NOT NULL AND magnet != '' AND {} = 0
                 ORDER BY id DESC LIMIT ?1",
                SELECT_COLUMNS,
                destination.column()
            ),
            params![limit],
        )
    }

    fn count_all(&self) -> Result<u64, StoreError> {
        let conn = self.conn();
        Self::count(&conn, "SELECT COUNT(*) FROM torrents", [])
    }

    fn count_with_magnet(&self) -> Result<u64, StoreError> {
        let conn = self.conn();
        Self::count(
            &conn,
            "SELECT COUNT(*) FROM torrents WHERE magnet IS NOT NULL AND magnet != ''",
            [],
        )
    }

    fn count_matching(&self, pattern: &str) -> Result<u64, StoreError> {
        let conn = self.conn();
        Self::count(
            &conn,
            "SELECT COUNT(*) FROM torrents WHERE name LIKE ?1 ESCAPE '\\'",
            params![like_pattern(pattern)],
        )
    }

    fn mark_delivered(&self, id: u64, destination: Destination) -> Result<bool, StoreError> {
        let Some(key) = row_key(id) else {
            debug!(id, destination = %destination, "No record to mark as delivered");
            return Ok(false);
        };
        let conn = self.conn();
        let changed = conn
            .execute(
                &format!("UPDATE torrents SET {} = 1 WHERE id = ?1", destination.column()),
                params![key],
            )
            .map_err(StoreError::write)?;

        if changed == 0 {
            debug!(id, destination = %destination, "No record to mark as delivered");
        }
        Ok(changed > 0)
    }
}
