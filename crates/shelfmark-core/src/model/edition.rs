use serde::{Deserialize, Serialize};

use crate::catalog::{EntityKind, FieldValue, Record};
use crate::model::ids::{BookId, EditionId};

/// A published edition of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    pub id: Option<EditionId>,
    pub book_id: BookId,
    pub publisher: String,

    /// Binding or medium, e.g. "Hardcover", "Paperback".
    pub book_type: String,

    pub year: i32,
    pub edition_number: i32,
    pub page_count: i32,
}

impl Edition {
    #[must_use]
    pub fn new(
        book_id: BookId,
        publisher: impl Into<String>,
        book_type: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            id: None,
            book_id,
            publisher: publisher.into(),
            book_type: book_type.into(),
            year,
            edition_number: 1,
            page_count: 0,
        }
    }

    #[must_use]
    pub fn with_edition_number(mut self, edition_number: i32) -> Self {
        self.edition_number = edition_number;
        self
    }

    #[must_use]
    pub fn with_page_count(mut self, page_count: i32) -> Self {
        self.page_count = page_count;
        self
    }
}

impl Record for Edition {
    const KIND: EntityKind = EntityKind::Edition;

    fn id(&self) -> Option<i64> {
        self.id.map(EditionId::get)
    }

    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("Publisher", FieldValue::Text(Some(&self.publisher))),
            ("BookType", FieldValue::Text(Some(&self.book_type))),
            ("Year", FieldValue::Integer(Some(i64::from(self.year)))),
            (
                "EditionNumber",
                FieldValue::Integer(Some(i64::from(self.edition_number))),
            ),
            ("PageCount", FieldValue::Integer(Some(i64::from(self.page_count)))),
            ("BookId", FieldValue::Reference(Some(self.book_id.get()))),
        ]
    }
}
