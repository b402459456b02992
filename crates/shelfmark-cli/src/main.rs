use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod commands;
mod config;

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "shelfmark", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/shelfmark/catalog.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Apply, revert or list schema migrations
    ///
    /// Migrations are applied in version order and reverted in reverse
    /// order. Each step runs in its own transaction together with its entry
    /// in the schema_migrations table, so a failed step leaves the database
    /// at the last step that succeeded.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Show the current schema: tables, columns, foreign keys and indexes
    Schema {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum MigrateAction {
    /// Apply pending migrations
    Up {
        /// Stop after this version
        #[arg(long)]
        to: Option<String>,
    },
    /// Revert the most recent migration
    Down {
        /// Revert every step newer than this version
        #[arg(long, conflicts_with = "all")]
        to: Option<String>,

        /// Revert every applied step
        #[arg(long)]
        all: bool,
    },
    /// List migrations and whether they are applied
    Status,
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file if it doesn't exist
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_with_db_path(cli.db)?;

    match twyg::setup(config.logging.clone()) {
        Ok(_) => {}
        Err(e) => eprintln!("Warning: failed to initialise logging: {e:?}"),
    }

    match cli.command {
        Commands::Migrate { action } => match action {
            MigrateAction::Up { to } => commands::migrate::run_up(&config, to)?,
            MigrateAction::Down { to, all } => commands::migrate::run_down(&config, to, all)?,
            MigrateAction::Status => commands::migrate::show_status(&config)?,
        },
        Commands::Schema { json } => commands::schema::show_schema(&config, json)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Path => commands::config::show_path()?,
            ConfigAction::Example => commands::config::show_example()?,
            ConfigAction::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate_down_to() {
        let cli = Cli::try_parse_from(["shelfmark", "migrate", "down", "--to", "20240301093000"])
            .unwrap();
        match cli.command {
            Commands::Migrate {
                action: MigrateAction::Down { to, all },
            } => {
                assert_eq!(to.as_deref(), Some("20240301093000"));
                assert!(!all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_down_to_and_all_conflict() {
        let result = Cli::try_parse_from(["shelfmark", "migrate", "down", "--to", "1", "--all"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_db_flag() {
        let cli = Cli::try_parse_from(["shelfmark", "schema", "--db", "/tmp/x.db", "--json"])
            .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
    }
}
