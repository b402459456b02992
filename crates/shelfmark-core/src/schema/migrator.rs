//! Applies and reverts [`Migration`]s, tracking progress in `schema_migrations`.
//!
//! A [`Migrator`] is the explicit migration context: it reads the applied
//! version marker once when loaded and keeps it in step with the table as it
//! applies or reverts steps. Each step runs in its own transaction together
//! with its marker row, so a failed step leaves the marker at the last step
//! that succeeded.

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::{Direction, Error, Result};

use super::migrations::{Migration, MIGRATIONS};

/// A migration step recorded in `schema_migrations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: String,
    pub name: String,
    pub applied_at: String,
}

/// One row of [`Migrator::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: &'static str,
    pub name: &'static str,
    /// When the step was applied, or `None` if it is pending.
    pub applied_at: Option<String>,
}

impl MigrationStatus {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

#[derive(Debug)]
pub struct Migrator {
    migrations: Vec<&'static Migration>,
    applied: Vec<AppliedMigration>,
}

impl Migrator {
    /// Load the migration state for the built-in migration sequence.
    pub fn load(conn: &Connection) -> Result<Self> {
        Self::load_with(conn, MIGRATIONS)
    }

    /// Load the migration state for an explicit migration sequence.
    pub fn load_with(conn: &Connection, migrations: &'static [Migration]) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = conn
            .prepare("SELECT version, name, applied_at FROM schema_migrations ORDER BY version")?;
        let applied = stmt
            .query_map([], |row| {
                Ok(AppliedMigration {
                    version: row.get(0)?,
                    name: row.get(1)?,
                    applied_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut migrations: Vec<&'static Migration> = migrations.iter().collect();
        migrations.sort_by_key(|m| m.version);

        for record in &applied {
            if !migrations.iter().any(|m| m.version == record.version) {
                log::warn!(
                    "Database has migration {} ({}) that this build does not know",
                    record.version,
                    record.name
                );
            }
        }

        Ok(Self {
            migrations,
            applied,
        })
    }

    /// Applied steps, oldest first.
    #[must_use]
    pub fn applied(&self) -> &[AppliedMigration] {
        &self.applied
    }

    /// Version of the most recently applied step.
    #[must_use]
    pub fn current_version(&self) -> Option<&str> {
        self.applied.last().map(|m| m.version.as_str())
    }

    #[must_use]
    pub fn is_applied(&self, version: &str) -> bool {
        self.applied.iter().any(|m| m.version == version)
    }

    /// Known steps not yet applied, in the order they would run.
    #[must_use]
    pub fn pending(&self) -> Vec<&'static Migration> {
        self.migrations
            .iter()
            .copied()
            .filter(|m| !self.is_applied(m.version))
            .collect()
    }

    /// Every known step with its applied timestamp, if any.
    #[must_use]
    pub fn status(&self) -> Vec<MigrationStatus> {
        self.migrations
            .iter()
            .map(|m| MigrationStatus {
                version: m.version,
                name: m.name,
                applied_at: self
                    .applied
                    .iter()
                    .find(|a| a.version == m.version)
                    .map(|a| a.applied_at.clone()),
            })
            .collect()
    }

    /// Apply pending steps up to and including `target` (all of them if `None`).
    ///
    /// Returns the steps that were applied; already-applied steps are skipped.
    pub fn migrate_up(
        &mut self,
        conn: &Connection,
        target: Option<&str>,
    ) -> Result<Vec<&'static Migration>> {
        if let Some(target) = target {
            self.known(target)?;
        }

        let steps: Vec<_> = self
            .pending()
            .into_iter()
            .filter(|m| target.map_or(true, |t| m.version <= t))
            .collect();
        if steps.is_empty() {
            return Ok(steps);
        }

        let mut ran = Vec::with_capacity(steps.len());
        with_foreign_keys_off(conn, || {
            for migration in steps {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                if run_step(conn, migration, Direction::Up)? {
                    ran.push(migration);
                } else {
                    log::info!(
                        "Migration {} was applied by another connection",
                        migration.version
                    );
                }
                self.applied.push(AppliedMigration {
                    version: migration.version.to_string(),
                    name: migration.name.to_string(),
                    applied_at: applied_at(conn, migration.version)?,
                });
            }
            Ok(())
        })?;

        Ok(ran)
    }

    /// Revert applied steps newer than `target` (every step if `None`),
    /// newest first.
    pub fn migrate_down(
        &mut self,
        conn: &Connection,
        target: Option<&str>,
    ) -> Result<Vec<&'static Migration>> {
        if let Some(target) = target {
            self.known(target)?;
        }

        let mut steps = Vec::new();
        for record in self.applied.iter().rev() {
            if target.is_some_and(|t| record.version.as_str() <= t) {
                break;
            }
            let migration = self.known(&record.version)?;
            steps.push(migration);
        }
        if steps.is_empty() {
            return Ok(steps);
        }

        let mut ran = Vec::with_capacity(steps.len());
        with_foreign_keys_off(conn, || {
            for migration in steps {
                log::info!(
                    "Reverting migration {} ({})",
                    migration.version,
                    migration.name
                );
                if run_step(conn, migration, Direction::Down)? {
                    ran.push(migration);
                } else {
                    log::info!(
                        "Migration {} was reverted by another connection",
                        migration.version
                    );
                }
                self.applied.retain(|a| a.version != migration.version);
            }
            Ok(())
        })?;

        Ok(ran)
    }

    fn known(&self, version: &str) -> Result<&'static Migration> {
        self.migrations
            .iter()
            .copied()
            .find(|m| m.version == version)
            .ok_or_else(|| Error::UnknownMigration(version.to_string()))
    }
}

/// Run `f` with foreign key enforcement disabled, then put the connection's
/// previous setting back.
///
/// Table rebuilds drop tables that other tables still reference, which
/// SQLite only allows with enforcement off. The pragma is a no-op inside a
/// transaction, so it is toggled around the per-step transactions.
fn with_foreign_keys_off<T>(conn: &Connection, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let enabled: bool = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", false)?;
    let result = f();
    conn.pragma_update(None, "foreign_keys", enabled)?;
    result
}

/// Run one step and its marker change in an immediate transaction.
///
/// The marker is re-read under the write lock; returns `false` without
/// touching the schema when another connection already made this change.
fn run_step(conn: &Connection, migration: &Migration, direction: Direction) -> Result<bool> {
    let fail = |reason: String| Error::Migration {
        version: migration.version,
        name: migration.name,
        direction,
        reason,
    };

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let recorded = tx
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE version = ?1",
            [migration.version],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    let done = match direction {
        Direction::Up => recorded,
        Direction::Down => !recorded,
    };
    if done {
        return Ok(false);
    }

    let sql = match direction {
        Direction::Up => migration.up,
        Direction::Down => migration.down,
    };
    tx.execute_batch(sql).map_err(|e| fail(e.to_string()))?;

    let violations = foreign_key_violations(&tx).map_err(|e| fail(e.to_string()))?;
    if violations > 0 {
        return Err(fail(format!(
            "{violations} row(s) violate foreign keys after the step"
        )));
    }

    match direction {
        Direction::Up => tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.name],
        ),
        Direction::Down => tx.execute(
            "DELETE FROM schema_migrations WHERE version = ?1",
            [migration.version],
        ),
    }
    .map_err(|e| fail(e.to_string()))?;

    tx.commit().map_err(|e| fail(e.to_string()))?;
    Ok(true)
}

fn foreign_key_violations(conn: &Connection) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let mut rows = stmt.query([])?;
    let mut count = 0;
    while rows.next()?.is_some() {
        count += 1;
    }
    Ok(count)
}

fn applied_at(conn: &Connection, version: &str) -> Result<String> {
    let at = conn.query_row(
        "SELECT applied_at FROM schema_migrations WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;
    Ok(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::snapshot::SchemaSnapshot;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", true).unwrap();
        conn
    }

    #[test]
    fn test_fresh_database_has_everything_pending() {
        let conn = open();
        let migrator = Migrator::load(&conn).unwrap();
        assert!(migrator.current_version().is_none());
        assert_eq!(migrator.pending().len(), MIGRATIONS.len());
        assert!(migrator.status().iter().all(|s| !s.is_applied()));
    }

    #[test]
    fn test_migrate_up_applies_in_order() {
        let conn = open();
        let mut migrator = Migrator::load(&conn).unwrap();
        let applied = migrator.migrate_up(&conn, None).unwrap();

        let names: Vec<_> = applied.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Initial", "Updates", "Updates1"]);
        assert_eq!(migrator.current_version(), Some("20240402110000"));
        assert!(migrator.pending().is_empty());
    }

    #[test]
    fn test_rerun_is_noop() {
        let conn = open();
        let mut migrator = Migrator::load(&conn).unwrap();
        migrator.migrate_up(&conn, None).unwrap();
        assert!(migrator.migrate_up(&conn, None).unwrap().is_empty());

        // A second migrator reads the persisted marker.
        let mut reloaded = Migrator::load(&conn).unwrap();
        assert_eq!(reloaded.applied().len(), 3);
        assert!(reloaded.migrate_up(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn test_migrate_up_to_target() {
        let conn = open();
        let mut migrator = Migrator::load(&conn).unwrap();
        let applied = migrator.migrate_up(&conn, Some("20240315141500")).unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(migrator.current_version(), Some("20240315141500"));
        assert_eq!(migrator.pending()[0].name, "Updates1");
    }

    #[test]
    fn test_rollback_runs_in_reverse_order() {
        let conn = open();
        let mut migrator = Migrator::load(&conn).unwrap();
        migrator.migrate_up(&conn, None).unwrap();

        let reverted = migrator.migrate_down(&conn, None).unwrap();
        let names: Vec<_> = reverted.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Updates1", "Updates", "Initial"]);
        assert!(migrator.current_version().is_none());
    }

    #[test]
    fn test_rollback_to_target_keeps_target() {
        let conn = open();
        let mut migrator = Migrator::load(&conn).unwrap();
        migrator.migrate_up(&conn, None).unwrap();

        let reverted = migrator.migrate_down(&conn, Some("20240301093000")).unwrap();
        assert_eq!(reverted.len(), 2);
        assert_eq!(migrator.current_version(), Some("20240301093000"));
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let conn = open();
        let mut migrator = Migrator::load(&conn).unwrap();
        assert!(matches!(
            migrator.migrate_up(&conn, Some("19990101000000")),
            Err(Error::UnknownMigration(_))
        ));
    }

    #[test]
    fn test_each_step_down_restores_previous_schema() {
        let conn = open();
        let mut migrator = Migrator::load(&conn).unwrap();

        for migration in MIGRATIONS {
            let before = SchemaSnapshot::capture(&conn).unwrap();
            migrator.migrate_up(&conn, Some(migration.version)).unwrap();
            let after_up = SchemaSnapshot::capture(&conn).unwrap();
            assert_ne!(before, after_up, "{} changed nothing", migration.name);

            let previous = migrator
                .applied()
                .iter()
                .rev()
                .nth(1)
                .map(|a| a.version.clone());
            migrator.migrate_down(&conn, previous.as_deref()).unwrap();
            assert_eq!(
                SchemaSnapshot::capture(&conn).unwrap(),
                before,
                "{} down is not the inverse of up",
                migration.name
            );

            migrator.migrate_up(&conn, Some(migration.version)).unwrap();
        }
    }

    #[test]
    fn test_foreign_key_setting_is_preserved() {
        let conn = Connection::open_in_memory().unwrap();
        let mut migrator = Migrator::load(&conn).unwrap();
        migrator.migrate_up(&conn, Some("20240315141500")).unwrap();

        let fk: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(!fk);

        conn.pragma_update(None, "foreign_keys", true).unwrap();
        migrator.migrate_up(&conn, None).unwrap();
        let fk: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(fk);
    }

    #[test]
    fn test_stale_migrator_skips_steps_already_recorded() {
        let conn = open();
        let mut stale = Migrator::load(&conn).unwrap();
        Migrator::load(&conn).unwrap().migrate_up(&conn, None).unwrap();

        let applied = stale.migrate_up(&conn, None).unwrap();
        assert!(applied.is_empty());
        assert_eq!(stale.current_version(), Some("20240402110000"));
        assert!(stale.pending().is_empty());

        let mut other = Migrator::load(&conn).unwrap();
        other.migrate_down(&conn, None).unwrap();
        assert!(stale.migrate_down(&conn, None).unwrap().is_empty());
        assert!(stale.applied().is_empty());
    }

    static BROKEN: &[Migration] = &[
        Migration {
            version: "20240101000000",
            name: "CreateShelves",
            up: "CREATE TABLE \"Shelves\" (\"Id\" INTEGER PRIMARY KEY);",
            down: "DROP TABLE \"Shelves\";",
        },
        Migration {
            version: "20240102000000",
            name: "Broken",
            up: "CREATE TABLE \"Racks\" (\"Id\" INTEGER PRIMARY KEY); ALTER TABLE \"Nowhere\" ADD COLUMN \"X\" INTEGER;",
            down: "DROP TABLE \"Racks\";",
        },
        Migration {
            version: "20240103000000",
            name: "NeverReached",
            up: "CREATE TABLE \"Bins\" (\"Id\" INTEGER PRIMARY KEY);",
            down: "DROP TABLE \"Bins\";",
        },
    ];

    #[test]
    fn test_failed_step_halts_and_keeps_marker() {
        let conn = open();
        let mut migrator = Migrator::load_with(&conn, BROKEN).unwrap();

        match migrator.migrate_up(&conn, None) {
            Err(Error::Migration {
                version,
                name,
                direction,
                ..
            }) => {
                assert_eq!(version, "20240102000000");
                assert_eq!(name, "Broken");
                assert_eq!(direction, Direction::Up);
            }
            other => panic!("expected migration error, got {other:?}"),
        }

        assert_eq!(migrator.current_version(), Some("20240101000000"));
        let reloaded = Migrator::load_with(&conn, BROKEN).unwrap();
        assert_eq!(reloaded.current_version(), Some("20240101000000"));

        // The failed step's partial work was rolled back, the next never ran.
        let tables = SchemaSnapshot::capture(&conn).unwrap();
        assert!(tables.table("Shelves").is_some());
        assert!(tables.table("Racks").is_none());
        assert!(tables.table("Bins").is_none());

        // Foreign key enforcement is restored after a failure.
        let fk: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert!(fk);
    }
}
