//! SQLite storage: migrations, the migration runner, and the catalog
//! database with its validated CRUD operations.

mod books;
mod db;
mod domains;
mod lending;
pub mod migrations;
pub mod migrator;
pub mod snapshot;

pub use db::{Database, DatabaseOptions};
pub use migrations::{latest_version, Migration, MIGRATIONS};
pub use migrator::{AppliedMigration, MigrationStatus, Migrator};
pub use snapshot::{ColumnInfo, ForeignKeyInfo, IndexInfo, SchemaSnapshot, TableSnapshot};
