use anyhow::{Context, Result};
use shelfmark_core::schema::Migration;

use super::{open_database, retry};
use crate::config::Config;

/// Apply pending migrations, up to `to` if given.
pub fn run_up(config: &Config, to: Option<String>) -> Result<()> {
    let db = open_database(config)?;
    let mut migrator = retry(|| db.migrator()).context("Failed to read migration state")?;

    let applied = retry(|| migrator.migrate_up(db.conn(), to.as_deref()))
        .context("Migration failed")?;

    if applied.is_empty() {
        println!("Database is up to date.");
    } else {
        print_steps("Applied", &applied);
    }
    print_current(migrator.current_version());
    Ok(())
}

/// Revert migrations.
///
/// With neither `to` nor `all`, only the most recent step is reverted.
pub fn run_down(config: &Config, to: Option<String>, all: bool) -> Result<()> {
    let db = open_database(config)?;
    let mut migrator = retry(|| db.migrator()).context("Failed to read migration state")?;

    if migrator.current_version().is_none() {
        println!("No migrations applied; nothing to revert.");
        return Ok(());
    }

    let target = if all {
        None
    } else if to.is_some() {
        to
    } else {
        // The step before the current one, or nothing if only one is applied.
        let applied = migrator.applied();
        applied
            .len()
            .checked_sub(2)
            .map(|i| applied[i].version.clone())
    };

    let reverted = retry(|| migrator.migrate_down(db.conn(), target.as_deref()))
        .context("Rollback failed")?;

    if reverted.is_empty() {
        println!("Nothing to revert.");
    } else {
        print_steps("Reverted", &reverted);
    }
    print_current(migrator.current_version());
    Ok(())
}

/// List every known migration and whether it is applied.
pub fn show_status(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let migrator = retry(|| db.migrator()).context("Failed to read migration state")?;

    println!("Database: {}\n", config.database_path.display());
    println!("{:<16} {:<12} Applied at", "Version", "Name");
    let known = migrator.status();
    for status in &known {
        println!(
            "{:<16} {:<12} {}",
            status.version,
            status.name,
            status.applied_at.as_deref().unwrap_or("pending")
        );
    }

    let unknown = migrator
        .applied()
        .iter()
        .filter(|a| !known.iter().any(|s| s.version == a.version));
    for record in unknown {
        println!(
            "{:<16} {:<12} {} (not known to this build)",
            record.version, record.name, record.applied_at
        );
    }

    println!();
    print_current(migrator.current_version());
    Ok(())
}

fn print_steps(verb: &str, steps: &[&Migration]) {
    println!("{verb} {} migration(s):", steps.len());
    for step in steps {
        println!("  {} {}", step.version, step.name);
    }
}

fn print_current(version: Option<&str>) {
    println!("Current version: {}", version.unwrap_or("<none>"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfmark_core::schema::latest_version;
    use shelfmark_core::Database;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        Config {
            database_path: dir.path().join("nested").join("catalog.db"),
            busy_timeout_ms: 100,
            ..Config::default()
        }
    }

    fn current(config: &Config) -> Option<String> {
        let db = open_database(config).unwrap();
        let migrator = db.migrator().unwrap();
        migrator.current_version().map(str::to_string)
    }

    #[test]
    fn test_up_creates_database_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);

        run_up(&config, None).unwrap();
        assert!(config.database_path.exists());
        assert_eq!(current(&config).as_deref(), latest_version());

        // Running again is a no-op.
        run_up(&config, None).unwrap();
    }

    #[test]
    fn test_down_reverts_one_step_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        run_up(&config, None).unwrap();

        run_down(&config, None, false).unwrap();
        assert_eq!(current(&config).as_deref(), Some("20240315141500"));

        run_down(&config, None, true).unwrap();
        assert_eq!(current(&config), None);

        let db = Database::open_with(
            &config.database_path,
            &shelfmark_core::DatabaseOptions {
                auto_migrate: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(db.schema_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        assert!(run_up(&config, Some("20990101000000".to_string())).is_err());
    }
}
