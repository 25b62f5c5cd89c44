use crate::error::Error;
use crate::session::Session;
use std::collections::HashSet;

/// A report of actions performed by one call to [Runner::apply](crate::Runner::apply).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    /// Whether the `_migrations` ledger table had to be created.
    pub ledger_table_created: bool,
    /// Versions executed and recorded by this call, in execution order.
    pub migrations_run: Vec<u32>,
    /// Versions found in the ledger and therefore not executed, in supplied order.
    pub migrations_skipped: Vec<u32>,
}

/// A trait that must be implemented to define a migration.
///
/// [Definition] covers the common case of a single SQL statement. Implement this trait
/// directly when a migration needs several statements or has to read data before writing it.
pub trait Migration {
    /// Returns the version number of this migration.
    ///
    /// # IMPORTANT WARNING
    ///
    /// **Once a migration has been applied to any database, its version number must NEVER be changed.**
    /// The ledger only records versions, so a renumbered migration is indistinguishable from a
    /// new one and will be executed again.
    ///
    /// # Requirements
    ///
    /// - Must be greater than 0
    /// - Must be unique across all migrations passed to one run
    fn version(&self) -> u32;

    /// Returns the name of this migration. Only used in logs and error messages.
    fn name(&self) -> String {
        format!("Migration {}", self.version())
    }

    /// Execute the migration's forward logic.
    ///
    /// # MySQL DDL Behavior
    ///
    /// DDL statements (CREATE TABLE, ALTER TABLE, DROP TABLE, etc.) commit implicitly and
    /// cannot be rolled back. If a migration fails partway through, whatever already executed
    /// stays applied and the version is NOT recorded, so the next run will execute it again.
    /// Write migrations so that re-running them is harmless (`IF NOT EXISTS` and friends).
    fn apply(&self, session: &mut dyn Session) -> Result<(), Error>;
}

impl PartialEq for dyn Migration {
    fn eq(&self, other: &Self) -> bool {
        self.version() == other.version()
    }
}

impl std::fmt::Debug for dyn Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version())
            .field("name", &self.name())
            .finish()
    }
}

/// A migration consisting of one fixed forward statement.
///
/// The statement is sent as-is, so a `;`-separated batch works as long as the server
/// connection allows multiple statements (the `mysql` crate does by default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub version: u32,
    pub name: Option<String>,
    pub up: String,
}

impl Definition {
    pub fn new(version: u32, up: impl Into<String>) -> Self {
        Self {
            version,
            name: None,
            up: up.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Migration for Definition {
    fn version(&self) -> u32 {
        self.version
    }

    fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Migration {}", self.version),
        }
    }

    fn apply(&self, session: &mut dyn Session) -> Result<(), Error> {
        session.execute(&self.up)
    }
}

/// Largest version the ledger's `INTEGER` column can hold.
pub const MAX_VERSION: u32 = i32::MAX as u32;

/// Check a migration set before anything touches the database.
///
/// Versions must be unique and between 1 and [MAX_VERSION]. Order is not checked:
/// migrations run in the order supplied.
pub fn validate(migrations: &[Box<dyn Migration>]) -> Result<(), Error> {
    let mut seen = HashSet::with_capacity(migrations.len());
    for migration in migrations {
        let version = migration.version();
        if version == 0 {
            return Err(Error::Config(format!(
                "migration version must be greater than 0, found version 0 ('{}')",
                migration.name()
            )));
        }
        if version > MAX_VERSION {
            return Err(Error::Config(format!(
                "migration version {} ('{}') exceeds the maximum of {}",
                version,
                migration.name(),
                MAX_VERSION
            )));
        }
        if !seen.insert(version) {
            return Err(Error::DuplicateVersion(version));
        }
    }
    Ok(())
}
