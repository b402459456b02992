use anyhow::Result;

use crate::config::{self, Config};

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    let path = config::config_file_path();

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", path.display());
    let exists = path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    println!("  database_path: {}", config.database_path.display());
    println!("  busy_timeout_ms: {}", config.busy_timeout_ms);
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: CLI args > ENV vars (SHELF_*) > Config file > Defaults");

    Ok(())
}

pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize the config file with the example contents.
pub fn init_config() -> Result<()> {
    let path = config::config_file_path();

    if config::ensure_config_file(&path)? {
        println!("✓ Created config file: {}", path.display());
        println!("\nEdit this file to configure shelfmark.");
    } else {
        println!("Config file already exists: {}", path.display());
    }

    Ok(())
}
