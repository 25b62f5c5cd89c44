//!
//! # Ledger
//!
//! The `_migrations` table is the only record of which migrations have run. A version is
//! present exactly when its migration completed; rows are never updated or deleted.
//!

use crate::error::Error;
use crate::log::{notice, Sink};
use crate::session::{column, datetime, datetime_value, Session};
use chrono::NaiveDateTime;
use mysql::Value;

/// Name of the bookkeeping table.
pub const LEDGER_TABLE_NAME: &str = "_migrations";

pub(crate) const TABLE_EXISTS_SQL: &str = "SELECT 1 FROM information_schema.TABLES \
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? LIMIT 1";

pub(crate) const CREATE_TABLE_SQL: &str = "CREATE TABLE _migrations (
    version INTEGER NOT NULL,
    created_at DATETIME NOT NULL,
    PRIMARY KEY (version)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_520_ci";

pub(crate) const HAS_APPLIED_SQL: &str = "SELECT 1 FROM _migrations WHERE version = ? LIMIT 1";

pub(crate) const RECORD_SQL: &str = "INSERT INTO _migrations (version, created_at) VALUES (?, ?)";

pub(crate) const ENTRIES_SQL: &str =
    "SELECT version, created_at FROM _migrations ORDER BY version ASC";

/// One applied migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: u32,
    /// UTC wall-clock time the migration finished, to the second.
    pub applied_at: NaiveDateTime,
}

/// Operations on the `_migrations` table of the session's current database.
///
/// Each operation is independent and works against a table created by any earlier process.
pub struct Ledger<'a> {
    sink: &'a dyn Sink,
}

impl<'a> Ledger<'a> {
    pub fn new(sink: &'a dyn Sink) -> Self {
        Self { sink }
    }

    /// Whether the ledger table exists in the current database.
    pub fn exists(&self, session: &mut dyn Session) -> Result<bool, Error> {
        let rows = session
            .select(TABLE_EXISTS_SQL, vec![Value::from(LEDGER_TABLE_NAME)])
            .map_err(|e| {
                e.context(format!(
                    "failed checking if table {:?} exists",
                    LEDGER_TABLE_NAME
                ))
            })?;
        Ok(!rows.is_empty())
    }

    /// Create the ledger table if it is missing. Returns whether it was created.
    pub fn ensure_table(&self, session: &mut dyn Session) -> Result<bool, Error> {
        if self.exists(session)? {
            return Ok(false);
        }

        notice!(self.sink, "table {} doesn't exist", LEDGER_TABLE_NAME);
        session
            .execute(CREATE_TABLE_SQL)
            .map_err(|e| e.context(format!("failed creating table {:?}", LEDGER_TABLE_NAME)))?;
        notice!(self.sink, "created {} table", LEDGER_TABLE_NAME);

        #[cfg(feature = "tracing")]
        tracing::debug!(table = LEDGER_TABLE_NAME, "Created ledger table");

        Ok(true)
    }

    /// Whether `version` has been recorded. A missing row is `false`, not an error.
    pub fn has_applied(&self, session: &mut dyn Session, version: u32) -> Result<bool, Error> {
        let rows = session
            .select(HAS_APPLIED_SQL, vec![Value::from(version)])
            .map_err(|e| {
                e.context(format!(
                    "failed checking if migration {} was executed",
                    version
                ))
            })?;
        Ok(!rows.is_empty())
    }

    /// Insert exactly one row for `version`. A duplicate version is reported, never ignored.
    pub fn record_applied(
        &self,
        session: &mut dyn Session,
        version: u32,
        at: NaiveDateTime,
    ) -> Result<(), Error> {
        session
            .execute_with(RECORD_SQL, vec![Value::from(version), datetime_value(at)])
            .map_err(|e| e.context(format!("failed recording migration {}", version)))
    }

    /// Every entry, ordered by version ascending.
    pub fn entries(&self, session: &mut dyn Session) -> Result<Vec<LedgerEntry>, Error> {
        let rows = session
            .select(ENTRIES_SQL, vec![])
            .map_err(|e| e.context(format!("unable to select from {} table", LEDGER_TABLE_NAME)))?;

        rows.iter()
            .map(|row| {
                Ok(LedgerEntry {
                    version: column(row, 0, LEDGER_TABLE_NAME)?,
                    applied_at: datetime(row, 1, LEDGER_TABLE_NAME)?,
                })
            })
            .collect()
    }
}
