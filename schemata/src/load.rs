//!
//! # Schema loads
//!

use crate::dump::LEDGER_SCRIPT_NAME;
use crate::error::Error;
use crate::interrupt::Interrupt;
use crate::ledger::Ledger;
use crate::log::Sink;
use crate::session::Session;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// What a load executed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Snapshot files executed, in execution order.
    pub files: Vec<String>,
}

/// Replays a snapshot written by [Dumper](crate::Dumper) into the session's current database.
pub struct Loader<'a> {
    sink: &'a dyn Sink,
    interrupt: &'a Interrupt,
}

impl<'a> Loader<'a> {
    pub fn new(sink: &'a dyn Sink, interrupt: &'a Interrupt) -> Self {
        Self { sink, interrupt }
    }

    /// Ensure the ledger table, then execute every `.sql` file in `location`.
    ///
    /// A directory without `_migrations.sql` is treated as an empty snapshot and nothing in it
    /// is executed. Otherwise table files run first, sorted by file name, and the ledger script
    /// runs last. Each file's whole contents are sent as one statement.
    pub fn load(&self, session: &mut dyn Session, location: &Path) -> Result<LoadReport, Error> {
        Ledger::new(self.sink).ensure_table(session)?;

        let script_path = location.join(LEDGER_SCRIPT_NAME);
        match fs::metadata(&script_path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                #[cfg(feature = "tracing")]
                tracing::debug!(location = %location.display(), "No ledger script, nothing to load");
                return Ok(LoadReport::default());
            }
            Err(e) => return Err(Error::io(format!("unable to stat {:?}", script_path), e)),
        }

        let mut report = LoadReport::default();
        for name in snapshot_files(location)? {
            self.interrupt.check(|| format!("loading {:?}", name))?;

            let schema = fs::read_to_string(location.join(&name))
                .map_err(|e| Error::io(format!("unable to read {:?}", name), e))?;
            session
                .execute(&schema)
                .map_err(|e| e.context(format!("failed loading {:?}", name)))?;

            #[cfg(feature = "tracing")]
            tracing::debug!(file = %name, "Loaded snapshot file");

            report.files.push(name);
        }
        Ok(report)
    }
}

/// The `.sql` files of a snapshot in load order: table files by name, then the ledger script.
pub fn snapshot_files(location: &Path) -> Result<Vec<String>, Error> {
    let entries = fs::read_dir(location)
        .map_err(|e| Error::io(format!("failed reading dir {:?}", location), e))?;

    let mut tables = Vec::new();
    let mut has_script = false;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(format!("failed reading dir {:?}", location), e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| Error::io(format!("failed reading dir {:?}", location), e))?
            .is_file();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_file || !name.ends_with(".sql") {
            continue;
        }
        if name == LEDGER_SCRIPT_NAME {
            has_script = true;
        } else {
            tables.push(name);
        }
    }

    tables.sort();
    if has_script {
        tables.push(LEDGER_SCRIPT_NAME.to_string());
    }
    Ok(tables)
}
