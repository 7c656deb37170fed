//! Per-tenant SQLite storage.
//!
//! Each tenant (one election database) lives in its own file under the
//! configured data directory. Handlers open a [`Connection`] per request through
//! [`Database::open`]; the connection is closed when it goes out of scope, so
//! every exit path of a handler releases it.

use regex::Regex;
use rusqlite::Connection;
use std::fmt;
use std::path::PathBuf;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS constituencies (
    id        INTEGER PRIMARY KEY,
    code      TEXT,
    name      TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS blocks (
    id        INTEGER PRIMARY KEY,
    code      TEXT,
    name      TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS booths (
    id        INTEGER PRIMARY KEY,
    code      TEXT,
    name      TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS parts (
    id        INTEGER PRIMARY KEY,
    code      TEXT,
    name      TEXT,
    is_active INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS voters (
    id                  INTEGER PRIMARY KEY,
    constituency_id     INTEGER,
    block_id            INTEGER,
    booth_id            INTEGER,
    part_id             INTEGER,
    voter_id            TEXT NOT NULL UNIQUE,
    name                TEXT NOT NULL,
    father_husband_name TEXT,
    photo               TEXT,
    age                 INTEGER,
    gender              TEXT NOT NULL DEFAULT 'male',
    house_no            TEXT,
    address             TEXT,
    phone               TEXT,
    email               TEXT,
    polling_station     TEXT,
    notes               TEXT,
    is_active           INTEGER NOT NULL DEFAULT 1
);
";

/// Creates any missing tables. Safe to run on every open.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

const TENANT_PATTERN: &str = r"^[A-Za-z0-9_-]{1,64}$";

#[derive(Debug, thiserror::Error)]
#[error("invalid tenant database name '{0}'")]
pub struct InvalidTenant(String);

/// Name of a tenant database, as selected by the caller's session.
///
/// Restricted to ASCII letters, digits, `-` and `_` so it can be used as a file
/// name without escaping the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(String);

impl Tenant {
    pub fn parse(raw: &str) -> Result<Self, InvalidTenant> {
        let raw = raw.trim();
        let re = Regex::new(TENANT_PATTERN).map_err(|_| InvalidTenant(raw.to_string()))?;
        if re.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidTenant(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection factory keyed by tenant.
#[derive(Debug, Clone)]
pub struct Database {
    data_dir: PathBuf,
}

impl Database {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, tenant: &Tenant) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite", tenant.as_str()))
    }

    /// Opens the tenant's database, creating the file and its tables on first use.
    pub fn open(&self, tenant: &Tenant) -> rusqlite::Result<Connection> {
        if let Err(e) = std::fs::create_dir_all(&self.data_dir) {
            log::warn!(
                "Could not create data directory {}: {}",
                self.data_dir.display(),
                e
            );
        }
        let conn = Connection::open(self.path_for(tenant))?;
        ensure_schema(&conn)?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_names_cannot_escape_the_data_dir() {
        assert!(Tenant::parse("election_2026").is_ok());
        assert!(Tenant::parse("east-district").is_ok());
        assert!(Tenant::parse("../etc/passwd").is_err());
        assert!(Tenant::parse("a/b").is_err());
        assert!(Tenant::parse("").is_err());
    }

    #[test]
    fn open_creates_schema_per_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path());
        let north = Tenant::parse("north").unwrap();
        let south = Tenant::parse("south").unwrap();

        let conn = db.open(&north).unwrap();
        conn.execute(
            "INSERT INTO voters (voter_id, name) VALUES ('V1', 'Asha')",
            [],
        )
        .unwrap();
        drop(conn);

        let count = |tenant: &Tenant| -> i64 {
            db.open(tenant)
                .unwrap()
                .query_row("SELECT COUNT(*) FROM voters", [], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(count(&north), 1);
        assert_eq!(count(&south), 0);
        assert!(db.path_for(&north).exists());
    }

    #[test]
    fn voter_id_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute("INSERT INTO voters (voter_id, name) VALUES ('V1', 'A')", [])
            .unwrap();
        let dup = conn.execute("INSERT INTO voters (voter_id, name) VALUES ('V1', 'B')", []);
        assert!(dup.is_err());
    }
}
