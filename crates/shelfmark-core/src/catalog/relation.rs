//! Relation definitions between entities.
//!
//! Each relation is described from the dependent side: the `dependent`
//! table holds a `foreign_key` column pointing at the `principal`'s `Id`.
//! The delete path reads `on_delete` to decide whether dependents are
//! removed with the principal or block its deletion.

use super::entity::EntityKind;

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Required foreign key on the many side.
    OneToMany,
    /// Nullable foreign key on the many side.
    OptionalOneToMany,
    /// One side of a junction table with a composite key.
    ManyToMany,
}

/// Behavior when a referenced entity is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteBehavior {
    /// Delete related entities.
    Cascade,
    /// Prevent deletion if related entities exist.
    Restrict,
}

impl DeleteBehavior {
    /// The `ON DELETE` clause the migrations declare for this behavior.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation name (unique within the catalog).
    pub name: &'static str,
    /// The referenced ("one") side.
    pub principal: EntityKind,
    /// The referencing ("many") side.
    pub dependent: EntityKind,
    /// Column on the dependent table holding the principal's id.
    pub foreign_key: &'static str,
    pub cardinality: Cardinality,
    pub on_delete: DeleteBehavior,
}

impl RelationDef {
    const fn new(
        name: &'static str,
        principal: EntityKind,
        dependent: EntityKind,
        foreign_key: &'static str,
        cardinality: Cardinality,
        on_delete: DeleteBehavior,
    ) -> Self {
        Self {
            name,
            principal,
            dependent,
            foreign_key,
            cardinality,
            on_delete,
        }
    }

    #[must_use]
    pub fn is_many_to_many(&self) -> bool {
        self.cardinality == Cardinality::ManyToMany
    }

    /// Whether this relation references its own entity type.
    #[must_use]
    pub fn is_self_referential(&self) -> bool {
        self.principal == self.dependent
    }
}

pub static RELATIONS: &[RelationDef] = &[
    RelationDef::new(
        "book_editions",
        EntityKind::Book,
        EntityKind::Edition,
        "BookId",
        Cardinality::OneToMany,
        DeleteBehavior::Cascade,
    ),
    RelationDef::new(
        "book_borrowings",
        EntityKind::Book,
        EntityKind::Borrowing,
        "BookId",
        Cardinality::OneToMany,
        DeleteBehavior::Restrict,
    ),
    RelationDef::new(
        "reader_borrowings",
        EntityKind::Reader,
        EntityKind::Borrowing,
        "ReaderId",
        Cardinality::OneToMany,
        DeleteBehavior::Restrict,
    ),
    RelationDef::new(
        "staff_borrowings",
        EntityKind::Reader,
        EntityKind::Borrowing,
        "StaffId",
        Cardinality::OptionalOneToMany,
        DeleteBehavior::Restrict,
    ),
    RelationDef::new(
        "borrowing_extensions",
        EntityKind::Borrowing,
        EntityKind::LoanExtension,
        "BorrowingId",
        Cardinality::OneToMany,
        DeleteBehavior::Cascade,
    ),
    RelationDef::new(
        "domain_subdomains",
        EntityKind::BookDomain,
        EntityKind::BookDomain,
        "ParentDomainId",
        Cardinality::OptionalOneToMany,
        DeleteBehavior::Restrict,
    ),
    RelationDef::new(
        "book_authors",
        EntityKind::Book,
        EntityKind::BookAuthor,
        "BookId",
        Cardinality::ManyToMany,
        DeleteBehavior::Cascade,
    ),
    RelationDef::new(
        "author_books",
        EntityKind::Author,
        EntityKind::BookAuthor,
        "AuthorId",
        Cardinality::ManyToMany,
        DeleteBehavior::Cascade,
    ),
    RelationDef::new(
        "book_domains",
        EntityKind::Book,
        EntityKind::BookBookDomain,
        "BookId",
        Cardinality::ManyToMany,
        DeleteBehavior::Cascade,
    ),
    RelationDef::new(
        "domain_books",
        EntityKind::BookDomain,
        EntityKind::BookBookDomain,
        "DomainId",
        Cardinality::ManyToMany,
        DeleteBehavior::Cascade,
    ),
];

/// Relations in which `kind` is the referenced side.
pub fn relations_referencing(kind: EntityKind) -> impl Iterator<Item = &'static RelationDef> {
    RELATIONS.iter().filter(move |r| r.principal == kind)
}

/// Look up a relation by name.
#[must_use]
pub fn relation(name: &str) -> Option<&'static RelationDef> {
    RELATIONS.iter().find(|r| r.name == name)
}
