//! Cascade executor for handling referential integrity on deletes.
//!
//! The executor walks the relation metadata in [`crate::catalog::relation`]:
//! - CASCADE: delete dependent rows, recursing through their own dependents
//! - RESTRICT: refuse the delete while dependent rows exist
//!
//! It must run inside a transaction; the caller commits only when the whole
//! walk succeeded, so a refused delete leaves every row untouched.

use rusqlite::Connection;

use crate::catalog::{relations_referencing, DeleteBehavior, EntityKind, RelationDef};
use crate::error::{Error, Result};

use super::validator::ReferenceChecker;

/// Rows removed by one delete, including the row that was asked for.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Entity rows deleted, in deletion order (dependents before principals).
    pub deleted: Vec<(EntityKind, i64)>,
    /// Junction rows removed, per junction table.
    pub junction_rows: Vec<(EntityKind, usize)>,
}

impl CascadeReport {
    /// Number of deleted rows of `kind`.
    #[must_use]
    pub fn deleted_count(&self, kind: EntityKind) -> usize {
        self.deleted.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Total junction rows removed from `kind`.
    #[must_use]
    pub fn junction_count(&self, kind: EntityKind) -> usize {
        self.junction_rows
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, n)| n)
            .sum()
    }

    #[must_use]
    pub fn affected_count(&self) -> usize {
        self.deleted.len() + self.junction_rows.iter().map(|(_, n)| n).sum::<usize>()
    }
}

/// Executes deletes with the catalog's cascade policy.
#[derive(Debug)]
pub struct CascadeExecutor<'a> {
    conn: &'a Connection,
}

impl<'a> CascadeExecutor<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Delete the row `id` of `kind` and everything that cascades from it.
    ///
    /// Fails with [`Error::NotFound`] if the row does not exist and with
    /// [`Error::ReferentialIntegrity`] if a restricting relation has
    /// dependents anywhere in the cascade.
    pub fn delete(&self, kind: EntityKind, id: i64) -> Result<CascadeReport> {
        if !ReferenceChecker::new(self.conn).exists(kind, id)? {
            return Err(Error::NotFound {
                entity: kind.name(),
                id,
            });
        }
        let mut report = CascadeReport::default();
        self.delete_recursive(kind, id, &mut report)?;
        Ok(report)
    }

    fn delete_recursive(&self, kind: EntityKind, id: i64, report: &mut CascadeReport) -> Result<()> {
        // Restrictions first, so a refused delete does no work at all.
        for relation in relations_referencing(kind) {
            if relation.on_delete == DeleteBehavior::Restrict {
                let count = self.count_dependents(relation, id)?;
                if count > 0 {
                    return Err(Error::ReferentialIntegrity {
                        entity: kind.name(),
                        id,
                        dependent: relation.dependent.name(),
                        relation: relation.name,
                        count,
                    });
                }
            }
        }

        for relation in relations_referencing(kind) {
            if relation.on_delete != DeleteBehavior::Cascade {
                continue;
            }

            if relation.dependent.has_identity() {
                for dependent_id in self.dependent_ids(relation, id)? {
                    self.delete_recursive(relation.dependent, dependent_id, report)?;
                }
            } else {
                let sql = format!(
                    "DELETE FROM \"{}\" WHERE \"{}\" = ?1",
                    relation.dependent.table(),
                    relation.foreign_key
                );
                let removed = self.conn.execute(&sql, [id])?;
                if removed > 0 {
                    log::debug!(
                        "Removed {} {} row(s) via {}",
                        removed,
                        relation.dependent.name(),
                        relation.name
                    );
                    report.junction_rows.push((relation.dependent, removed));
                }
            }
        }

        let sql = format!("DELETE FROM \"{}\" WHERE \"Id\" = ?1", kind.table());
        if self.conn.execute(&sql, [id])? > 0 {
            log::debug!("Deleted {} {}", kind.name(), id);
            report.deleted.push((kind, id));
        }
        Ok(())
    }

    fn count_dependents(&self, relation: &RelationDef, id: i64) -> Result<usize> {
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\" WHERE \"{}\" = ?1",
            relation.dependent.table(),
            relation.foreign_key
        );
        let count: i64 = self.conn.query_row(&sql, [id], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn dependent_ids(&self, relation: &RelationDef, id: i64) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT \"Id\" FROM \"{}\" WHERE \"{}\" = ?1 ORDER BY \"Id\"",
            relation.dependent.table(),
            relation.foreign_key
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}
