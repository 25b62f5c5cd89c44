//! Convenience macros for defining migrations.

/// Define a SQL-only migration as a unit struct.
///
/// [Definition](crate::Definition) is usually enough for a single statement. The macro is for
/// migrations kept as named types, and for sending several statements one after another,
/// which works regardless of whether the connection allows multi-statement batches.
///
/// # Basic Usage
///
/// ```
/// use schemata::sql_migration;
///
/// sql_migration!(CreateUsersTable, 1, "create_users",
///     up: "CREATE TABLE users (id INT NOT NULL, name VARCHAR(255), PRIMARY KEY (id))"
/// );
/// ```
///
/// # Multiple Statements
///
/// Statements run in the order listed; the first failure stops the migration and leaves the
/// earlier statements applied.
///
/// ```
/// use schemata::sql_migration;
///
/// sql_migration!(InitialSchema, 1, "initial_schema",
///     up: [
///         "CREATE TABLE users (id INT NOT NULL, PRIMARY KEY (id))",
///         "CREATE TABLE posts (id INT NOT NULL, user_id INT NOT NULL, PRIMARY KEY (id))",
///         "CREATE INDEX idx_posts_user ON posts (user_id)"
///     ]
/// );
/// ```
///
/// For migrations that need to query data and transform it in Rust, implement the
/// [`Migration`](crate::Migration) trait directly instead.
#[macro_export]
macro_rules! sql_migration {
    ($name:ident, $version:expr, $migration_name:expr,
        up: [$($up_sql:expr),* $(,)?]
    ) => {
        $crate::__sql_migration_impl!($name, $version, $migration_name, [$($up_sql),*]);
    };

    ($name:ident, $version:expr, $migration_name:expr,
        up: $up_sql:expr
    ) => {
        $crate::__sql_migration_impl!($name, $version, $migration_name, [$up_sql]);
    };
}

/// Internal implementation macro.
#[macro_export]
#[doc(hidden)]
macro_rules! __sql_migration_impl {
    ($name:ident, $version:expr, $migration_name:expr, [$($up_sql:expr),*]) => {
        pub struct $name;

        impl $crate::Migration for $name {
            fn version(&self) -> u32 {
                $version
            }

            fn name(&self) -> String {
                $migration_name.to_string()
            }

            fn apply(&self, session: &mut dyn $crate::Session) -> Result<(), $crate::Error> {
                $(session.execute($up_sql)?;)*
                Ok(())
            }
        }
    };
}
