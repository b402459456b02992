//! A structural description of the user schema.
//!
//! Two databases with equal snapshots have the same tables, columns (name,
//! declared type, nullability, default, primary key position), foreign keys
//! and indexes. SQLite's own tables and the migration marker are left out, as
//! is the raw `CREATE` text, which changes with quoting after a table rebuild.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// 1-based position in the primary key, 0 if not part of it.
    pub primary_key: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ForeignKeyInfo {
    pub from: String,
    pub table: String,
    pub to: Option<String>,
    pub on_update: String,
    pub on_delete: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    /// `c` for `CREATE INDEX`, `u` for a UNIQUE constraint, `pk` for a primary key.
    pub origin: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub indexes: Vec<IndexInfo>,
}

impl TableSnapshot {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexInfo> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableSnapshot>,
}

impl SchemaSnapshot {
    /// Read the current schema of `conn`.
    pub fn capture(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table'
               AND name NOT LIKE 'sqlite_%'
               AND name <> 'schema_migrations'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let tables = names
            .into_iter()
            .map(|name| capture_table(conn, name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { tables })
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn capture_table(conn: &Connection, name: String) -> Result<TableSnapshot> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let columns = stmt
        .query_map([&name], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                not_null: row.get(2)?,
                default: row.get(3)?,
                primary_key: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT \"from\", \"table\", \"to\", on_update, on_delete FROM pragma_foreign_key_list(?1)",
    )?;
    let mut foreign_keys = stmt
        .query_map([&name], |row| {
            Ok(ForeignKeyInfo {
                from: row.get(0)?,
                table: row.get(1)?,
                to: row.get(2)?,
                on_update: row.get(3)?,
                on_delete: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    foreign_keys.sort();

    let mut stmt =
        conn.prepare("SELECT name, \"unique\", origin FROM pragma_index_list(?1) ORDER BY name")?;
    let listed = stmt
        .query_map([&name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut indexes = Vec::with_capacity(listed.len());
    for (index_name, unique, origin) in listed {
        let mut stmt =
            conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
        let columns = stmt
            .query_map([&index_name], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        indexes.push(IndexInfo {
            name: index_name,
            unique,
            origin,
            columns,
        });
    }

    Ok(TableSnapshot {
        name,
        columns,
        foreign_keys,
        indexes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SchemaSnapshot::capture(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_marker_and_internal_tables_are_ignored() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version TEXT PRIMARY KEY);
             CREATE TABLE \"Shelves\" (\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT);",
        )
        .unwrap();

        let snapshot = SchemaSnapshot::capture(&conn).unwrap();
        let names: Vec<_> = snapshot.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Shelves"]);
    }

    #[test]
    fn test_captures_columns_keys_and_indexes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"Rooms\" (\"Id\" INTEGER PRIMARY KEY);
             CREATE TABLE \"Shelves\" (
                 \"Id\" INTEGER PRIMARY KEY,
                 \"Label\" VARCHAR(20) NOT NULL,
                 \"RoomId\" INTEGER NULL REFERENCES \"Rooms\" (\"Id\") ON DELETE CASCADE
             );
             CREATE INDEX \"IX_Shelves_RoomId\" ON \"Shelves\" (\"RoomId\");",
        )
        .unwrap();

        let snapshot = SchemaSnapshot::capture(&conn).unwrap();
        let shelves = snapshot.table("Shelves").unwrap();

        let label = shelves.column("Label").unwrap();
        assert_eq!(label.declared_type, "VARCHAR(20)");
        assert!(label.not_null);
        assert_eq!(shelves.column("Id").unwrap().primary_key, 1);

        assert_eq!(shelves.foreign_keys.len(), 1);
        assert_eq!(shelves.foreign_keys[0].table, "Rooms");
        assert_eq!(shelves.foreign_keys[0].on_delete, "CASCADE");

        let index = shelves.index("IX_Shelves_RoomId").unwrap();
        assert_eq!(index.columns, vec!["RoomId".to_string()]);
        assert!(!index.unique);
    }

    #[test]
    fn test_column_type_change_is_visible() {
        let a = Connection::open_in_memory().unwrap();
        a.execute_batch("CREATE TABLE \"T\" (\"D\" DATETIME NOT NULL);")
            .unwrap();
        let b = Connection::open_in_memory().unwrap();
        b.execute_batch("CREATE TABLE \"T\" (\"D\" DATETIME2 NOT NULL);")
            .unwrap();

        assert_ne!(
            SchemaSnapshot::capture(&a).unwrap(),
            SchemaSnapshot::capture(&b).unwrap()
        );
    }
}
