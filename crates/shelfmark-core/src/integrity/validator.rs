//! Write-time validation against the entity definitions.
//!
//! Shape checks (required fields, maximum lengths, column types) need no
//! database access. Reference checks look up every non-null foreign key and
//! must run inside the transaction that performs the write.

use rusqlite::{Connection, OptionalExtension};

use crate::catalog::{EntityDef, EntityKind, FieldType, FieldValue, Record};
use crate::error::{Constraint, Error, Result};

/// Validate a record's values against its entity definition.
pub fn validate_shape<R: Record>(record: &R) -> Result<()> {
    let def = R::KIND.def();
    let values = record.values();
    check_shape(def, &values)
}

pub(crate) fn check_shape(def: &EntityDef, values: &[(&'static str, FieldValue<'_>)]) -> Result<()> {
    for field in def.fields {
        let value = values
            .iter()
            .find(|(column, _)| *column == field.column)
            .map(|(_, value)| value);

        let Some(value) = value.filter(|v| !v.is_null()) else {
            if field.required {
                return Err(Error::validation(def.name, field.column, Constraint::Required));
            }
            continue;
        };

        if !value.matches(field.field_type) {
            return Err(Error::validation(
                def.name,
                field.column,
                Constraint::Type {
                    expected: field.type_label(),
                },
            ));
        }

        if let (FieldValue::Text(Some(text)), FieldType::Text { max_len }) =
            (value, field.field_type)
        {
            if field.required && text.trim().is_empty() {
                return Err(Error::validation(def.name, field.column, Constraint::Required));
            }
            let actual = text.chars().count();
            if actual > max_len {
                return Err(Error::validation(
                    def.name,
                    field.column,
                    Constraint::MaxLength {
                        max: max_len,
                        actual,
                    },
                ));
            }
        }
    }

    Ok(())
}

/// Checks foreign keys of pending writes against the current database state.
#[derive(Debug)]
pub struct ReferenceChecker<'a> {
    conn: &'a Connection,
}

impl<'a> ReferenceChecker<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Verify that every non-null reference in `record` points at an existing row.
    pub fn check<R: Record>(&self, record: &R) -> Result<()> {
        let values = record.values();
        self.check_values(R::KIND.def(), &values)
    }

    pub(crate) fn check_values(
        &self,
        def: &EntityDef,
        values: &[(&'static str, FieldValue<'_>)],
    ) -> Result<()> {
        for field in def.fields {
            let FieldType::Reference(target) = field.field_type else {
                continue;
            };
            let referenced = values.iter().find_map(|(column, value)| match value {
                FieldValue::Reference(Some(id)) if *column == field.column => Some(*id),
                _ => None,
            });
            if let Some(id) = referenced {
                if !self.exists(target, id)? {
                    return Err(Error::ForeignKeyViolation {
                        entity: def.name,
                        field: field.column,
                        references: target.name(),
                        id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether a row with the given surrogate id exists.
    pub fn exists(&self, kind: EntityKind, id: i64) -> Result<bool> {
        let sql = format!("SELECT 1 FROM \"{}\" WHERE \"Id\" = ?1", kind.table());
        let found = self
            .conn
            .query_row(&sql, [id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, Book, BookId, Borrowing, Edition, ReaderId};
    use crate::schema::Database;
    use chrono::Utc;

    fn expect_violation(result: Result<()>, field: &str, constraint: Constraint) {
        match result {
            Err(Error::Validation {
                field: f,
                constraint: c,
                ..
            }) => {
                assert_eq!(f, field);
                assert_eq!(c, constraint);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_book_passes() {
        assert!(validate_shape(&Book::new("Solaris").with_isbn("978-0156027601")).is_ok());
    }

    #[test]
    fn test_blank_required_text_is_missing() {
        expect_violation(validate_shape(&Book::new("   ")), "Title", Constraint::Required);
        expect_violation(
            validate_shape(&Author::new("", "Lem")),
            "FirstName",
            Constraint::Required,
        );
    }

    #[test]
    fn test_max_length_counts_characters() {
        // 100 two-byte characters fit in a 100 character column.
        let name = "é".repeat(100);
        assert!(validate_shape(&Author::new(name.clone(), "Lem")).is_ok());

        let too_long = format!("{name}x");
        expect_violation(
            validate_shape(&Author::new(too_long, "Lem")),
            "FirstName",
            Constraint::MaxLength {
                max: 100,
                actual: 101,
            },
        );
    }

    #[test]
    fn test_optional_text_length_is_checked() {
        let book = Book::new("Solaris").with_isbn("9".repeat(21));
        expect_violation(
            validate_shape(&book),
            "Isbn",
            Constraint::MaxLength { max: 20, actual: 21 },
        );
    }

    #[test]
    fn test_empty_optional_text_is_allowed() {
        assert!(validate_shape(&Book::new("Solaris").with_isbn("")).is_ok());
    }

    #[test]
    fn test_missing_required_value_is_rejected() {
        let values = vec![("Title", FieldValue::Text(Some("x")))];
        expect_violation(
            check_shape(EntityKind::Edition.def(), &values),
            "Publisher",
            Constraint::Required,
        );
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let values = vec![
            ("FirstName", FieldValue::Text(Some("Stanisław"))),
            ("LastName", FieldValue::Integer(Some(3))),
        ];
        expect_violation(
            check_shape(EntityKind::Author.def(), &values),
            "LastName",
            Constraint::Type { expected: "text" },
        );
    }

    #[test]
    fn test_reference_checker_reports_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let checker = ReferenceChecker::new(db.conn());

        let edition = Edition::new(BookId::new(99), "Walker", "Paperback", 1970);
        match checker.check(&edition) {
            Err(Error::ForeignKeyViolation {
                entity,
                field,
                references,
                id,
            }) => {
                assert_eq!(entity, "Edition");
                assert_eq!(field, "BookId");
                assert_eq!(references, "Book");
                assert_eq!(id, 99);
            }
            other => panic!("expected foreign key violation, got {other:?}"),
        }
    }

    #[test]
    fn test_reference_checker_skips_null_references() {
        let db = Database::open_in_memory().unwrap();
        let mut book = Book::new("Solaris");
        let book_id = db.insert_book(&mut book).unwrap();
        let mut reader = crate::model::Reader::new("Kris", "Kelvin", "Station");
        let reader_id = db.insert_reader(&mut reader).unwrap();

        let now = Utc::now();
        let borrowing = Borrowing::new(reader_id, book_id, now, now, 14);
        assert!(ReferenceChecker::new(db.conn()).check(&borrowing).is_ok());

        let with_ghost_staff = borrowing.issued_by(ReaderId::new(4242));
        assert!(matches!(
            ReferenceChecker::new(db.conn()).check(&with_ghost_staff),
            Err(Error::ForeignKeyViolation { field: "StaffId", .. })
        ));
    }
}
