use serde::{Deserialize, Serialize};

use crate::catalog::{EntityKind, FieldValue, Record};
use crate::model::ids::BookId;

/// A bibliographic work held by the library.
///
/// Physical copies are modelled separately as [`Edition`](crate::model::Edition)s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<BookId>,
    pub title: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
}

impl Book {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            isbn: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Record for Book {
    const KIND: EntityKind = EntityKind::Book;

    fn id(&self) -> Option<i64> {
        self.id.map(BookId::get)
    }

    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("Title", FieldValue::Text(Some(&self.title))),
            ("Isbn", FieldValue::Text(self.isbn.as_deref())),
            ("Description", FieldValue::Text(self.description.as_deref())),
        ]
    }
}
