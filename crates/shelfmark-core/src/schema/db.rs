use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::catalog::{EntityDef, EntityKind, FieldValue, Record};
use crate::error::{Constraint, Error, Result};
use crate::integrity::validator::check_shape;
use crate::integrity::{validate_shape, CascadeExecutor, CascadeReport, ReferenceChecker};

use super::migrator::Migrator;
use super::snapshot::SchemaSnapshot;

/// Connection settings for [`Database::open_with`].
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// How long a write waits for a competing lock before failing with
    /// [`Error::TransientStorage`].
    pub busy_timeout: Duration,
    /// Apply pending migrations on open.
    pub auto_migrate: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            auto_migrate: true,
        }
    }
}

/// A catalog database connection.
///
/// Every write validates its record, checks its references and runs in an
/// immediate transaction; a rejected write leaves the database unchanged.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &DatabaseOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &DatabaseOptions) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn, options)
    }

    /// Open a migrated in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, &DatabaseOptions::default())
    }

    fn init(conn: Connection, options: &DatabaseOptions) -> Result<Self> {
        conn.busy_timeout(options.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Self { conn };
        if options.auto_migrate {
            db.migrator()?.migrate_up(&db.conn, None)?;
        }
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Load the migration state of this database.
    pub fn migrator(&self) -> Result<Migrator> {
        Migrator::load(&self.conn)
    }

    pub fn schema_snapshot(&self) -> Result<SchemaSnapshot> {
        SchemaSnapshot::capture(&self.conn)
    }

    pub(crate) fn begin(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Validate and insert `record`, returning the new row id.
    pub(crate) fn insert_record<R: Record>(&self, record: &R) -> Result<i64> {
        validate_shape(record)?;
        let tx = self.begin()?;
        ReferenceChecker::new(&tx).check(record)?;
        let id = insert_row(&tx, R::KIND.def(), &record.values())?;
        tx.commit()?;
        log::debug!("Inserted {} {}", R::KIND.name(), id);
        Ok(id)
    }

    /// Validate and overwrite the stored row for `record`.
    pub(crate) fn update_record<R: Record>(&self, record: &R) -> Result<()> {
        self.update_record_with(record, |_, _| Ok(()))
    }

    /// Like [`Self::update_record`], running `check` on the row id inside the
    /// transaction before the row is written.
    pub(crate) fn update_record_with<R: Record>(
        &self,
        record: &R,
        check: impl FnOnce(&Connection, i64) -> Result<()>,
    ) -> Result<()> {
        let tx = self.begin()?;
        let id = check_update(&tx, record)?;
        check(&tx, id)?;
        update_row(&tx, R::KIND.def(), id, &record.values())?;
        tx.commit()?;
        log::debug!("Updated {} {}", R::KIND.name(), id);
        Ok(())
    }

    /// Delete a row and everything that cascades from it.
    pub(crate) fn delete_record(&self, kind: EntityKind, id: i64) -> Result<CascadeReport> {
        let tx = self.begin()?;
        let report = CascadeExecutor::new(&tx).delete(kind, id)?;
        tx.commit()?;
        log::debug!(
            "Deleted {} {} ({} row(s) affected)",
            kind.name(),
            id,
            report.affected_count()
        );
        Ok(report)
    }

    /// Add a junction row after checking both sides exist.
    ///
    /// Returns `false` if the link was already present.
    pub(crate) fn link_rows(&self, kind: EntityKind, left: i64, right: i64) -> Result<bool> {
        let def = kind.def();
        let values = junction_values(def, left, right);
        check_shape(def, &values)?;

        let tx = self.begin()?;
        ReferenceChecker::new(&tx).check_values(def, &values)?;
        let sql = format!(
            "INSERT OR IGNORE INTO \"{}\" (\"{}\", \"{}\") VALUES (?1, ?2)",
            def.table, values[0].0, values[1].0
        );
        let added = tx.execute(&sql, [left, right])? > 0;
        tx.commit()?;
        if added {
            log::debug!("Linked {} ({}, {})", def.name, left, right);
        }
        Ok(added)
    }

    /// Remove a junction row. Returns `false` if there was nothing to remove.
    pub(crate) fn unlink_rows(&self, kind: EntityKind, left: i64, right: i64) -> Result<bool> {
        let def = kind.def();
        let values = junction_values(def, left, right);
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = ?1 AND \"{}\" = ?2",
            def.table, values[0].0, values[1].0
        );
        let tx = self.begin()?;
        let removed = tx.execute(&sql, [left, right])? > 0;
        tx.commit()?;
        Ok(removed)
    }

    /// Fetch one row of `kind` by id, mapping it with `map`.
    pub(crate) fn get_record<T>(
        &self,
        kind: EntityKind,
        id: i64,
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let sql = format!("{} WHERE \"Id\" = ?1", select_all(kind.def()));
        self.conn
            .query_row(&sql, [id], map)
            .optional()?
            .ok_or(Error::NotFound {
                entity: kind.name(),
                id,
            })
    }

    /// Fetch every row of `kind` matching `filter` (a SQL condition on `?1`),
    /// ordered by id.
    pub(crate) fn list_records<T>(
        &self,
        kind: EntityKind,
        filter: &str,
        param: i64,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let sql = format!(
            "{} WHERE {} ORDER BY \"Id\"",
            select_all(kind.def()),
            filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([param], map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Shape check, existence check and reference check for an update.
///
/// Returns the id of the row being updated.
pub(crate) fn check_update<R: Record>(conn: &Connection, record: &R) -> Result<i64> {
    let def = R::KIND.def();
    let id = record
        .id()
        .ok_or(Error::validation(def.name, "Id", Constraint::Required))?;
    validate_shape(record)?;

    let checker = ReferenceChecker::new(conn);
    if !checker.exists(R::KIND, id)? {
        return Err(Error::NotFound {
            entity: def.name,
            id,
        });
    }
    checker.check(record)?;
    Ok(id)
}

fn junction_values(def: &EntityDef, left: i64, right: i64) -> Vec<(&'static str, FieldValue<'static>)> {
    def.fields
        .iter()
        .zip([left, right])
        .map(|(field, id)| (field.column, FieldValue::Reference(Some(id))))
        .collect()
}

/// `SELECT "Id", <fields...> FROM "<table>"`, columns in definition order.
pub(crate) fn select_all(def: &EntityDef) -> String {
    let columns: Vec<String> = def.fields.iter().map(|f| format!("\"{}\"", f.column)).collect();
    format!("SELECT \"Id\", {} FROM \"{}\"", columns.join(", "), def.table)
}

fn insert_row(
    conn: &Connection,
    def: &EntityDef,
    values: &[(&'static str, FieldValue<'_>)],
) -> Result<i64> {
    let columns: Vec<String> = values.iter().map(|(c, _)| format!("\"{c}\"")).collect();
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        def.table,
        columns.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(values.iter().map(|(_, v)| v)))?;
    Ok(conn.last_insert_rowid())
}

fn update_row(
    conn: &Connection,
    def: &EntityDef,
    id: i64,
    values: &[(&'static str, FieldValue<'_>)],
) -> Result<()> {
    let assignments: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, (c, _))| format!("\"{c}\" = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE \"{}\" SET {} WHERE \"Id\" = ?{}",
        def.table,
        assignments.join(", "),
        values.len() + 1
    );
    let params = values
        .iter()
        .map(|(_, v)| v.clone())
        .chain(std::iter::once(FieldValue::Integer(Some(id))));
    conn.execute(&sql, rusqlite::params_from_iter(params))?;
    Ok(())
}

/// Read a required RFC 3339 timestamp column.
pub(crate) fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_datetime(idx, &text)
}

/// Read a nullable RFC 3339 timestamp column.
pub(crate) fn get_opt_datetime(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| parse_datetime(idx, &text))
        .transpose()
}

fn parse_datetime(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
