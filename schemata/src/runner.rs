//!
//! # Applying migrations
//!

use crate::core::{validate, Migration, MigrationReport};
use crate::error::Error;
use crate::interrupt::Interrupt;
use crate::ledger::Ledger;
use crate::log::{notice, Sink};
use crate::session::Session;
use chrono::Utc;
use std::time::Instant;

/// Applies pending migrations on a session whose current database is the target.
///
/// Each migration's statement and its ledger row are written separately. MySQL commits DDL
/// implicitly, so a transaction around the pair would not make it atomic. If the process dies
/// between the two, the next run executes that migration again.
pub struct Runner<'a> {
    sink: &'a dyn Sink,
    interrupt: &'a Interrupt,
}

impl<'a> Runner<'a> {
    pub fn new(sink: &'a dyn Sink, interrupt: &'a Interrupt) -> Self {
        Self { sink, interrupt }
    }

    /// Run every migration not yet in the ledger, in the order given.
    ///
    /// The whole set is validated before the session is touched. The first failing migration
    /// stops the run; migrations after it are not attempted and nothing is rolled back.
    pub fn apply(
        &self,
        session: &mut dyn Session,
        migrations: &[Box<dyn Migration>],
    ) -> Result<MigrationReport, Error> {
        validate(migrations)?;

        let ledger = Ledger::new(self.sink);
        let mut report = MigrationReport {
            ledger_table_created: ledger.ensure_table(session)?,
            ..MigrationReport::default()
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            available_migrations = ?migrations.iter().map(|m| (m.version(), m.name())).collect::<Vec<_>>(),
            "Considering migrations to run"
        );

        for migration in migrations {
            let version = migration.version();
            self.interrupt
                .check(|| format!("migration {}", version))?;

            if ledger.has_applied(session, version)? {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    migration_version = version,
                    "Skipping migration (already applied)"
                );
                notice!(
                    self.sink,
                    "skipping migration {} as it has already been executed",
                    version
                );
                report.migrations_skipped.push(version);
                continue;
            }

            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!(
                "migration_apply",
                version = version,
                name = %migration.name()
            )
            .entered();

            #[cfg(feature = "tracing")]
            tracing::info!("Starting migration");

            let start = Instant::now();
            if let Err(error) = migration.apply(session) {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %error, "Migration failed");

                return Err(error.context(format!("failed executing migration {}", version)));
            }
            let elapsed = start.elapsed();

            ledger
                .record_applied(session, version, Utc::now().naive_utc())
                .map_err(|e| {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %e, "Migration executed but not recorded");

                    e.context(format!(
                        "migration {} was applied but could not be recorded",
                        version
                    ))
                })?;

            #[cfg(feature = "tracing")]
            tracing::info!(
                duration_ms = elapsed.as_millis() as u64,
                "Migration completed successfully"
            );

            notice!(self.sink, "executed migration {} in {:?}", version, elapsed);
            report.migrations_run.push(version);
        }

        Ok(report)
    }
}
