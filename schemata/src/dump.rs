//!
//! # Schema dumps
//!
//! A snapshot directory holds one `<table>.sql` file per table, containing the statement
//! `SHOW CREATE TABLE` returned for it, and a `_migrations.sql` script that re-inserts the
//! ledger rows. Loading the directory with [Loader](crate::Loader) rebuilds the schema without
//! running any migration.
//!

use crate::error::Error;
use crate::interrupt::Interrupt;
use crate::ledger::{Ledger, LedgerEntry, LEDGER_TABLE_NAME};
use crate::log::Sink;
use crate::session::{column, quote_identifier, Session};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the ledger reconstruction script inside a snapshot.
pub const LEDGER_SCRIPT_NAME: &str = "_migrations.sql";

pub(crate) const LIST_TABLES_SQL: &str = "SELECT TABLE_NAME FROM information_schema.TABLES \
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a dump wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpReport {
    /// Tables dumped, in the order their files were written.
    pub tables: Vec<String>,
    /// Number of ledger rows in `_migrations.sql`; zero means the file was not written.
    pub ledger_entries: usize,
}

/// Path of the snapshot file for `table` under `location`.
///
/// `/`, `\` and `%` in the name are percent-encoded, so every table file sits directly
/// inside `location`.
pub fn table_path(location: &Path, table: &str) -> PathBuf {
    location.join(format!("{}.sql", table_file_stem(table)))
}

fn table_file_stem(table: &str) -> String {
    let mut stem = String::with_capacity(table.len());
    for c in table.chars() {
        match c {
            '%' => stem.push_str("%25"),
            '/' => stem.push_str("%2F"),
            '\\' => stem.push_str("%5C"),
            _ => stem.push(c),
        }
    }
    stem
}

/// The single multi-row insert that recreates `entries`.
pub fn ledger_script(entries: &[LedgerEntry]) -> String {
    let rows = entries
        .iter()
        .map(|entry| {
            format!(
                "({}, \"{}\")",
                entry.version,
                entry.applied_at.format(TIMESTAMP_FORMAT)
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "INSERT INTO {} (version, created_at) VALUES\n{}",
        LEDGER_TABLE_NAME, rows
    )
}

/// Writes snapshots of the session's current database.
pub struct Dumper<'a> {
    sink: &'a dyn Sink,
    interrupt: &'a Interrupt,
}

impl<'a> Dumper<'a> {
    pub fn new(sink: &'a dyn Sink, interrupt: &'a Interrupt) -> Self {
        Self { sink, interrupt }
    }

    /// Dump every table except the ledger into `location`, then the ledger script.
    ///
    /// Stops at the first table that cannot be dumped; files already written stay in place.
    pub fn dump(&self, session: &mut dyn Session, location: &Path) -> Result<DumpReport, Error> {
        fs::create_dir_all(location)
            .map_err(|e| Error::io(format!("failed creating dir {:?}", location), e))?;

        let tables = list_tables(session)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(tables = ?tables, location = %location.display(), "Dumping tables");

        for table in &tables {
            self.interrupt
                .check(|| format!("dumping table {:?}", table))?;

            let statement = create_statement(session, table).map_err(|e| {
                e.context(format!(
                    "failed showing create statement for table {:?}",
                    table
                ))
            })?;
            fs::write(table_path(location, table), statement).map_err(|e| {
                Error::io(
                    format!(
                        "failed writing out create table statement for table {:?}",
                        table
                    ),
                    e,
                )
            })?;
        }

        let ledger = Ledger::new(self.sink);
        let entries = if ledger.exists(session)? {
            ledger.entries(session)?
        } else {
            vec![]
        };

        let script_path = location.join(LEDGER_SCRIPT_NAME);
        if entries.is_empty() {
            // the snapshot must not keep a script from an earlier dump
            match fs::remove_file(&script_path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::io(
                        format!("failed removing stale {:?}", script_path),
                        e,
                    ))
                }
            }
        } else {
            fs::write(&script_path, ledger_script(&entries)).map_err(|e| {
                Error::io(
                    format!(
                        "failed writing out insert statement for {}",
                        LEDGER_TABLE_NAME
                    ),
                    e,
                )
            })?;
        }

        Ok(DumpReport {
            tables,
            ledger_entries: entries.len(),
        })
    }
}

/// Base tables of the current database, by name, without the ledger.
pub fn list_tables(session: &mut dyn Session) -> Result<Vec<String>, Error> {
    let rows = session
        .select(LIST_TABLES_SQL, vec![])
        .map_err(|e| e.context("unable to show tables"))?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = column(row, 0, "table name")?;
        if name != LEDGER_TABLE_NAME {
            tables.push(name);
        }
    }
    Ok(tables)
}

/// The statement `SHOW CREATE TABLE` reports for `table`, verbatim.
pub fn create_statement(session: &mut dyn Session, table: &str) -> Result<String, Error> {
    let rows = session.select(
        &format!("SHOW CREATE TABLE {}", quote_identifier(table)),
        vec![],
    )?;
    let row = rows
        .first()
        .ok_or_else(|| Error::Statement(format!("no create statement returned for {:?}", table)))?;
    column(row, 1, "create statement")
}
