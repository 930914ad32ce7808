// SQLite-backed signing key store and startup seeding

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::{JwksError, Result};
use crate::key_management::KeyGenerator;
use crate::types::{KeyRecord, Validity};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS);

/// Durable record store mapping kid -> (PKCS#1 PEM, expiry).
///
/// Every operation opens its own connection, so clones can be handed to
/// concurrent readers freely. Writes are serialized by SQLite; the busy
/// timeout bounds how long any call waits for a lock.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl KeyStore {
    /// Create/open the database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        };

        let conn = store.connection()?;
        // WAL lets readers proceed while an insert is in flight
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS keys(
                kid INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                exp INTEGER NOT NULL
            )",
            [],
        )?;

        debug!(path = %store.path.display(), "Opened key store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Append a record and return the kid assigned to it.
    pub fn insert(&self, private_key_pem: &str, expires_at: i64) -> Result<i64> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO keys (key, exp) VALUES (?1, ?2)",
            params![private_key_pem, expires_at],
        )?;
        let kid = conn.last_insert_rowid();
        info!(kid, exp = expires_at, "Stored signing key");
        Ok(kid)
    }

    /// Fetch one record satisfying `validity` at `now`; the lowest kid wins.
    pub fn find_one(&self, validity: Validity, now: i64) -> Result<Option<KeyRecord>> {
        let conn = self.connection()?;
        let sql = format!(
            "SELECT kid, key, exp FROM keys WHERE {} ORDER BY kid LIMIT 1",
            validity.sql_condition()
        );
        let record = conn
            .query_row(&sql, params![now], record_from_row)
            .optional()?;
        debug!(%validity, now, kid = record.as_ref().map(|r| r.kid), "Selected signing key");
        Ok(record)
    }

    /// Fetch every record satisfying `validity` at `now`, ordered by kid.
    pub fn find_all(&self, validity: Validity, now: i64) -> Result<Vec<KeyRecord>> {
        let conn = self.connection()?;
        let sql = format!(
            "SELECT kid, key, exp FROM keys WHERE {} ORDER BY kid",
            validity.sql_condition()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![now], record_from_row)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Fetch all currently valid records
    pub fn find_all_valid(&self, now: i64) -> Result<Vec<KeyRecord>> {
        self.find_all(Validity::Valid, now)
    }

    pub fn count(&self, validity: Validity, now: i64) -> Result<i64> {
        let conn = self.connection()?;
        let sql = format!("SELECT COUNT(*) FROM keys WHERE {}", validity.sql_condition());
        let count = conn.query_row(&sql, params![now], |row| row.get(0))?;
        Ok(count)
    }

    /// Ensure at least one expired and one valid key are present.
    ///
    /// Missing keys are generated with `exp = now - lifetime` and
    /// `exp = now + lifetime` respectively. Returns the kids inserted,
    /// which is empty when the store was already seeded. A lifetime that
    /// is not positive or pushes either expiry out of `i64` range is a
    /// `Config` error and leaves the store untouched.
    pub fn seed(&self, generator: &KeyGenerator, now: i64, lifetime_secs: i64) -> Result<Vec<i64>> {
        let out_of_range = || {
            JwksError::Config(format!(
                "key lifetime {lifetime_secs}s cannot be applied at {now}"
            ))
        };
        if lifetime_secs <= 0 {
            return Err(out_of_range());
        }
        let expired_at = now.checked_sub(lifetime_secs).ok_or_else(out_of_range)?;
        let valid_until = now.checked_add(lifetime_secs).ok_or_else(out_of_range)?;

        let mut inserted = Vec::new();

        if self.count(Validity::Expired, now)? == 0 {
            let pem = generator.generate()?;
            inserted.push(self.insert(&pem, expired_at)?);
        }

        if self.count(Validity::Valid, now)? == 0 {
            let pem = generator.generate()?;
            inserted.push(self.insert(&pem, valid_until)?);
        }

        info!(inserted = inserted.len(), "Seeded key store");
        Ok(inserted)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<KeyRecord> {
    Ok(KeyRecord {
        kid: row.get(0)?,
        private_key_pem: row.get(1)?,
        expires_at: row.get(2)?,
    })
}
