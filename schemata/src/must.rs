//! Panicking shorthands for startup code and test fixtures, where there is nothing sensible
//! to do with an error except stop.
//!
//! For a non-panicking version of each, use the function of the same name without `must_`.

use crate::core::Migration;
use crate::dump::DumpReport;
use crate::load::LoadReport;
use crate::migrator::{dump_schema, load_schema, migrate};
use crate::MigrationReport;
use std::path::Path;

fn must<T>(result: Result<T, crate::Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}

/// [migrate](crate::migrate), panicking on error.
pub fn must_migrate(locator: &str, migrations: &[Box<dyn Migration>]) -> MigrationReport {
    must(migrate(locator, migrations))
}

/// [dump_schema](crate::dump_schema), panicking on error.
pub fn must_dump_schema(locator: &str, location: impl AsRef<Path>) -> DumpReport {
    must(dump_schema(locator, location))
}

/// [load_schema](crate::load_schema), panicking on error.
pub fn must_load_schema(locator: &str, location: impl AsRef<Path>) -> LoadReport {
    must(load_schema(locator, location))
}
