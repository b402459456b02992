use anyhow::{Context, Result};
use shelfmark_core::schema::{SchemaSnapshot, TableSnapshot};

use super::{open_database, retry};
use crate::config::Config;

/// Print the current schema, as text or as JSON.
pub fn show_schema(config: &Config, json: bool) -> Result<()> {
    let db = open_database(config)?;
    let snapshot = retry(|| db.schema_snapshot()).context("Failed to read schema")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Failed to serialize schema")?
        );
    } else {
        print!("{}", render(&snapshot));
    }
    Ok(())
}

fn render(snapshot: &SchemaSnapshot) -> String {
    if snapshot.is_empty() {
        return String::from("No tables. Run 'shelfmark migrate up' to create the schema.\n");
    }
    snapshot.tables.iter().map(render_table).collect::<Vec<_>>().join("\n")
}

fn render_table(table: &TableSnapshot) -> String {
    let mut lines = vec![table.name.clone()];
    for column in &table.columns {
        let mut line = format!(
            "  {:<22} {:<14} {}",
            column.name,
            column.declared_type,
            if column.not_null { "NOT NULL" } else { "NULL" }
        );
        if column.primary_key > 0 {
            line.push_str(" PK");
        }
        lines.push(line);
    }
    for fk in &table.foreign_keys {
        lines.push(format!(
            "  FK {} -> {}.{} ON DELETE {}",
            fk.from,
            fk.table,
            fk.to.as_deref().unwrap_or("Id"),
            fk.on_delete
        ));
    }
    for index in &table.indexes {
        lines.push(format!(
            "  {} {} ({})",
            if index.unique { "UNIQUE" } else { "INDEX" },
            index.name,
            index.columns.join(", ")
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}
