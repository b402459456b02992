use serde::{Deserialize, Serialize};

use crate::catalog::{EntityKind, FieldValue, Record};
use crate::model::ids::AuthorId;

/// A person credited with writing one or more books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<AuthorId>,
    pub first_name: String,
    pub last_name: String,
}

impl Author {
    #[must_use]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// "First Last", as shown on a title page.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Author {
    const KIND: EntityKind = EntityKind::Author;

    fn id(&self) -> Option<i64> {
        self.id.map(AuthorId::get)
    }

    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("FirstName", FieldValue::Text(Some(&self.first_name))),
            ("LastName", FieldValue::Text(Some(&self.last_name))),
        ]
    }
}
