pub mod config;
pub mod migrate;
pub mod schema;

use anyhow::{Context, Result};
use backon::{BlockingRetryable, ExponentialBuilder};
use shelfmark_core::{Database, DatabaseOptions};

use crate::config::Config;

/// Open the configured database without migrating it.
///
/// Creates the parent directory if needed. A locked database is retried with
/// exponential backoff before giving up.
pub fn open_database(config: &Config) -> Result<Database> {
    let path = &config.database_path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = DatabaseOptions {
        busy_timeout: config.busy_timeout(),
        auto_migrate: false,
    };
    let db = retry(|| Database::open_with(path, &options))
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    Ok(db)
}

/// Run a storage operation, retrying while it fails with a transient error.
pub fn retry<T>(
    op: impl FnMut() -> shelfmark_core::Result<T>,
) -> shelfmark_core::Result<T> {
    op.retry(ExponentialBuilder::default().with_max_times(5))
        .sleep(std::thread::sleep)
        .when(shelfmark_core::Error::is_retryable)
        .notify(|err, delay| log::warn!("{err}; retrying in {delay:?}"))
        .call()
}
