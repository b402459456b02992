use serde::{Deserialize, Serialize};

use crate::catalog::{EntityKind, FieldValue, Record};
use crate::model::ids::BookDomainId;

/// A node in the subject classification hierarchy (e.g. "Science > Physics").
///
/// A domain has at most one parent and any number of subdomains. The parent
/// link is a plain optional id; acyclicity is checked by the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDomain {
    pub id: Option<BookDomainId>,
    pub name: String,
    pub parent_domain_id: Option<BookDomainId>,
}

impl BookDomain {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            parent_domain_id: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: BookDomainId) -> Self {
        self.parent_domain_id = Some(parent);
        self
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_domain_id.is_none()
    }
}

impl Record for BookDomain {
    const KIND: EntityKind = EntityKind::BookDomain;

    fn id(&self) -> Option<i64> {
        self.id.map(BookDomainId::get)
    }

    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("Name", FieldValue::Text(Some(&self.name))),
            (
                "ParentDomainId",
                FieldValue::Reference(self.parent_domain_id.map(BookDomainId::get)),
            ),
        ]
    }
}
