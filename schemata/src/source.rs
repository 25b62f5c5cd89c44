//!
//! # Migrations from files
//!
//! Reads a directory of `<version>_<name>.sql` files, e.g. `0001_create_users.sql`, into
//! [Definition]s. Files without the `.sql` extension are ignored.
//!

use crate::core::{Definition, Migration, MAX_VERSION};
use crate::error::Error;
use std::fs;
use std::path::Path;

impl From<Definition> for Box<dyn Migration> {
    fn from(value: Definition) -> Self {
        Box::new(value)
    }
}

/// Read every migration file in `dir`, ordered by version ascending.
pub fn read_dir(dir: impl AsRef<Path>) -> Result<Vec<Definition>, Error> {
    let dir = dir.as_ref();
    let entries =
        fs::read_dir(dir).map_err(|e| Error::io(format!("failed reading dir {:?}", dir), e))?;

    let mut definitions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(format!("failed reading dir {:?}", dir), e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(stem) = file_name.strip_suffix(".sql") else {
            continue;
        };

        let (version, name) = parse_stem(stem).ok_or_else(|| {
            Error::Config(format!(
                "migration file {:?} must be named <version>_<name>.sql",
                file_name
            ))
        })?;
        let up = fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("unable to read {:?}", file_name), e))?;

        let definition = Definition::new(version, up);
        definitions.push(match name {
            Some(name) => definition.with_name(name),
            None => definition,
        });
    }

    definitions.sort_by_key(|d| d.version);
    Ok(definitions)
}

fn parse_stem(stem: &str) -> Option<(u32, Option<&str>)> {
    let (digits, name) = match stem.split_once('_') {
        Some((digits, name)) => (digits, Some(name).filter(|n| !n.is_empty())),
        None => (stem, None),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let version: u32 = digits.parse().ok()?;
    if version > MAX_VERSION {
        return None;
    }
    Some((version, name))
}
