use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::StoreError;

/// One scraped price sample, as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub url: String,
    pub title: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Append-only observation store keyed by product URL.
pub trait PriceStore: Send + Sync {
    fn insert(&self, obs: &Observation) -> Result<(), StoreError>;

    /// Up to `limit` observations for `url`, newest first.
    fn query_recent(&self, url: &str, limit: usize) -> Result<Vec<Observation>, StoreError>;
}

fn check_price(obs: &Observation) -> Result<(), StoreError> {
    if obs.price > 0.0 {
        Ok(())
    } else {
        Err(StoreError::NonPositivePrice(obs.price))
    }
}

// ── SQLite ──

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            // rusqlite will report the real failure if this doesn't work out
            let _ = std::fs::create_dir_all(dir);
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Every tracked URL with its latest title and price, most recently seen first.
    pub fn tracked_products(&self) -> Result<Vec<ProductSummary>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT p.url, COUNT(*), MAX(p.observed_at),
                    (SELECT title FROM price_history l WHERE l.url = p.url
                     ORDER BY l.observed_at DESC, l.id DESC LIMIT 1),
                    (SELECT price FROM price_history l WHERE l.url = p.url
                     ORDER BY l.observed_at DESC, l.id DESC LIMIT 1)
             FROM price_history p
             GROUP BY p.url
             ORDER BY MAX(p.observed_at) DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProductSummary {
                    url: row.get(0)?,
                    observations: row.get(1)?,
                    last_seen: row.get(2)?,
                    title: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    latest_price: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS price_history (
            id          INTEGER PRIMARY KEY,
            url         TEXT NOT NULL,
            title       TEXT,
            price       REAL NOT NULL CHECK(price > 0),
            observed_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_history_url_time ON price_history(url, observed_at);
        ",
    )?;
    Ok(())
}

impl PriceStore for SqliteStore {
    fn insert(&self, obs: &Observation) -> Result<(), StoreError> {
        check_price(obs)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO price_history (url, title, price, observed_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![obs.url, obs.title, obs.price, obs.observed_at],
        )?;
        Ok(())
    }

    fn query_recent(&self, url: &str, limit: usize) -> Result<Vec<Observation>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, COALESCE(title, ''), price, observed_at
             FROM price_history
             WHERE url = ?1
             ORDER BY observed_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![url, limit as i64], |row| {
                Ok(Observation {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    price: row.get(2)?,
                    observed_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub url: String,
    pub title: String,
    pub latest_price: f64,
    pub observations: i64,
    pub last_seen: DateTime<Utc>,
}

// ── In-memory fake ──

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Observation>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl PriceStore for MemoryStore {
    fn insert(&self, obs: &Observation) -> Result<(), StoreError> {
        check_price(obs)?;
        self.rows.lock().map_err(|_| StoreError::Poisoned)?.push(obs.clone());
        Ok(())
    }

    fn query_recent(&self, url: &str, limit: usize) -> Result<Vec<Observation>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        // later inserts win ties, matching the SQLite id tie-break
        let mut matching: Vec<Observation> =
            rows.iter().rev().filter(|o| o.url == url).cloned().collect();
        matching.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        matching.truncate(limit);
        Ok(matching)
    }
}
