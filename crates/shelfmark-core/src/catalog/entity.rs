//! Entity definitions: which columns each table has, which are required,
//! and how long text values may be.
//!
//! These definitions describe the schema produced by the latest migration.
//! The write path validates every record against them before touching the
//! database, and the generic insert/update statements are built from them.

use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};

/// Every table in the catalog, including the two junction tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Author,
    Book,
    BookDomain,
    Edition,
    Reader,
    Borrowing,
    LoanExtension,
    BookAuthor,
    BookBookDomain,
}

impl EntityKind {
    #[must_use]
    pub fn def(self) -> &'static EntityDef {
        match self {
            Self::Author => &AUTHOR,
            Self::Book => &BOOK,
            Self::BookDomain => &BOOK_DOMAIN,
            Self::Edition => &EDITION,
            Self::Reader => &READER,
            Self::Borrowing => &BORROWING,
            Self::LoanExtension => &LOAN_EXTENSION,
            Self::BookAuthor => &BOOK_AUTHOR,
            Self::BookBookDomain => &BOOK_BOOK_DOMAIN,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.def().name
    }

    #[must_use]
    pub fn table(self) -> &'static str {
        self.def().table
    }

    /// Whether rows carry their own surrogate `Id` (junction rows do not).
    #[must_use]
    pub fn has_identity(self) -> bool {
        self.def().identity
    }
}

/// The declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text { max_len: usize },
    Integer,
    Boolean,
    DateTime,
    /// Integer foreign key into another entity's `Id`.
    Reference(EntityKind),
}

impl FieldType {
    const fn label(self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Reference(_) => "reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub column: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldDef {
    const fn optional(column: &'static str, field_type: FieldType) -> Self {
        Self {
            column,
            field_type,
            required: false,
        }
    }

    const fn required(column: &'static str, field_type: FieldType) -> Self {
        Self {
            column,
            field_type,
            required: true,
        }
    }

    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        self.field_type.label()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct EntityDef {
    pub kind: EntityKind,
    pub name: &'static str,
    pub table: &'static str,
    pub identity: bool,
    /// Non-key columns, in table order.
    pub fields: &'static [FieldDef],
}

impl EntityDef {
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.column == column)
    }
}

const fn text(max_len: usize) -> FieldType {
    FieldType::Text { max_len }
}

pub static AUTHOR: EntityDef = EntityDef {
    kind: EntityKind::Author,
    name: "Author",
    table: "Authors",
    identity: true,
    fields: &[
        FieldDef::required("FirstName", text(100)),
        FieldDef::required("LastName", text(100)),
    ],
};

pub static BOOK: EntityDef = EntityDef {
    kind: EntityKind::Book,
    name: "Book",
    table: "Books",
    identity: true,
    fields: &[
        FieldDef::required("Title", text(255)),
        FieldDef::optional("Isbn", text(20)),
        FieldDef::optional("Description", text(1000)),
    ],
};

pub static BOOK_DOMAIN: EntityDef = EntityDef {
    kind: EntityKind::BookDomain,
    name: "BookDomain",
    table: "BookDomains",
    identity: true,
    fields: &[
        FieldDef::required("Name", text(150)),
        FieldDef::optional("ParentDomainId", FieldType::Reference(EntityKind::BookDomain)),
    ],
};

pub static EDITION: EntityDef = EntityDef {
    kind: EntityKind::Edition,
    name: "Edition",
    table: "Editions",
    identity: true,
    fields: &[
        FieldDef::required("Publisher", text(150)),
        FieldDef::required("BookType", text(50)),
        FieldDef::required("Year", FieldType::Integer),
        FieldDef::required("EditionNumber", FieldType::Integer),
        FieldDef::required("PageCount", FieldType::Integer),
        FieldDef::required("BookId", FieldType::Reference(EntityKind::Book)),
    ],
};

pub static READER: EntityDef = EntityDef {
    kind: EntityKind::Reader,
    name: "Reader",
    table: "Readers",
    identity: true,
    fields: &[
        FieldDef::required("FirstName", text(100)),
        FieldDef::required("LastName", text(100)),
        FieldDef::required("Address", text(255)),
        FieldDef::optional("Email", text(150)),
        FieldDef::optional("PhoneNumber", text(20)),
        FieldDef::required("IsStaff", FieldType::Boolean),
        FieldDef::required("RegistrationDate", FieldType::DateTime),
    ],
};

pub static BORROWING: EntityDef = EntityDef {
    kind: EntityKind::Borrowing,
    name: "Borrowing",
    table: "Borrowings",
    identity: true,
    fields: &[
        FieldDef::required("ReaderId", FieldType::Reference(EntityKind::Reader)),
        FieldDef::required("BookId", FieldType::Reference(EntityKind::Book)),
        FieldDef::optional("StaffId", FieldType::Reference(EntityKind::Reader)),
        FieldDef::required("BorrowingDate", FieldType::DateTime),
        FieldDef::required("DueDate", FieldType::DateTime),
        FieldDef::optional("ReturnDate", FieldType::DateTime),
        FieldDef::required("IsActive", FieldType::Boolean),
        FieldDef::required("InitialBorrowingDays", FieldType::Integer),
        FieldDef::required("TotalExtensionDays", FieldType::Integer),
        FieldDef::optional("LastExtensionDate", FieldType::DateTime),
    ],
};

pub static LOAN_EXTENSION: EntityDef = EntityDef {
    kind: EntityKind::LoanExtension,
    name: "LoanExtension",
    table: "LoanExtensions",
    identity: true,
    fields: &[
        FieldDef::required("BorrowingId", FieldType::Reference(EntityKind::Borrowing)),
        FieldDef::required("ExtensionDate", FieldType::DateTime),
        FieldDef::required("ExtensionDays", FieldType::Integer),
    ],
};

pub static BOOK_AUTHOR: EntityDef = EntityDef {
    kind: EntityKind::BookAuthor,
    name: "BookAuthor",
    table: "BookAuthor",
    identity: false,
    fields: &[
        FieldDef::required("BookId", FieldType::Reference(EntityKind::Book)),
        FieldDef::required("AuthorId", FieldType::Reference(EntityKind::Author)),
    ],
};

pub static BOOK_BOOK_DOMAIN: EntityDef = EntityDef {
    kind: EntityKind::BookBookDomain,
    name: "BookBookDomain",
    table: "BookBookDomain",
    identity: false,
    fields: &[
        FieldDef::required("BookId", FieldType::Reference(EntityKind::Book)),
        FieldDef::required("DomainId", FieldType::Reference(EntityKind::BookDomain)),
    ],
};

/// A column value handed to the write path.
///
/// `None` inside a variant means the value is absent (SQL `NULL`).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(Option<&'a str>),
    Integer(Option<i64>),
    Boolean(Option<bool>),
    DateTime(Option<DateTime<Utc>>),
    Reference(Option<i64>),
}

impl FieldValue<'_> {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Text(None)
                | Self::Integer(None)
                | Self::Boolean(None)
                | Self::DateTime(None)
                | Self::Reference(None)
        )
    }

    /// Whether this value may be stored in a column of `field_type`.
    #[must_use]
    pub const fn matches(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Self::Text(_), FieldType::Text { .. })
                | (Self::Integer(_), FieldType::Integer)
                | (Self::Boolean(_), FieldType::Boolean)
                | (Self::DateTime(_), FieldType::DateTime)
                | (Self::Reference(_), FieldType::Reference(_))
        )
    }
}

impl ToSql for FieldValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let output = match self {
            Self::Text(Some(s)) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Integer(Some(v)) | Self::Reference(Some(v)) => {
                ToSqlOutput::Owned(Value::Integer(*v))
            }
            Self::Boolean(Some(b)) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            Self::DateTime(Some(dt)) => ToSqlOutput::Owned(Value::Text(dt.to_rfc3339())),
            _ => ToSqlOutput::Owned(Value::Null),
        };
        Ok(output)
    }
}

/// A row type that can be written through the catalog.
pub trait Record {
    const KIND: EntityKind;

    /// The row's surrogate id, if it has been persisted.
    fn id(&self) -> Option<i64>;

    /// Column values for every field in the entity definition.
    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)>;
}
