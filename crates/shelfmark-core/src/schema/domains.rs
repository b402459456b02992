use rusqlite::{Connection, Row};

use crate::catalog::EntityKind;
use crate::error::{Constraint, Error, Result};
use crate::hierarchy::DomainTree;
use crate::integrity::CascadeReport;
use crate::model::{Book, BookDomain, BookDomainId, BookId};

use super::books::book_from_row;
use super::db::Database;

// BookDomain CRUD
impl Database {
    pub fn insert_domain(&self, domain: &mut BookDomain) -> Result<BookDomainId> {
        let id = BookDomainId::new(self.insert_record(domain)?);
        domain.id = Some(id);
        Ok(id)
    }

    pub fn get_domain(&self, id: BookDomainId) -> Result<BookDomain> {
        self.get_record(EntityKind::BookDomain, id.get(), domain_from_row)
    }

    /// Overwrite a domain. A new parent that is the domain itself or one of
    /// its descendants is rejected with [`Constraint::Acyclic`].
    pub fn update_domain(&self, domain: &BookDomain) -> Result<()> {
        self.update_record_with(domain, |conn, id| {
            match domain.parent_domain_id {
                Some(parent) => ensure_acyclic(conn, BookDomainId::new(id), parent),
                None => Ok(()),
            }
        })
    }

    /// Move a domain under `parent`, or make it a root with `None`.
    pub fn set_domain_parent(
        &self,
        id: BookDomainId,
        parent: Option<BookDomainId>,
    ) -> Result<()> {
        let mut domain = self.get_domain(id)?;
        domain.parent_domain_id = parent;
        self.update_domain(&domain)
    }

    /// Delete a domain and its book links.
    ///
    /// Refused while the domain has subdomains; move or delete them first.
    pub fn delete_domain(&self, id: BookDomainId) -> Result<CascadeReport> {
        self.delete_record(EntityKind::BookDomain, id.get())
    }

    /// Direct children of `parent`.
    pub fn subdomains(&self, parent: BookDomainId) -> Result<Vec<BookDomain>> {
        self.list_records(
            EntityKind::BookDomain,
            "\"ParentDomainId\" = ?1",
            parent.get(),
            domain_from_row,
        )
    }

    /// The whole hierarchy as a graph.
    pub fn domain_tree(&self) -> Result<DomainTree> {
        DomainTree::load(self.conn())
    }

    /// Parent, grandparent, ... of `id`, nearest first.
    pub fn domain_ancestors(&self, id: BookDomainId) -> Result<Vec<BookDomain>> {
        self.get_domain(id)?;
        self.domain_tree()?
            .ancestors(id)
            .into_iter()
            .map(|ancestor| self.get_domain(ancestor))
            .collect()
    }

    /// Every domain below `id`, breadth first.
    pub fn domain_descendants(&self, id: BookDomainId) -> Result<Vec<BookDomain>> {
        self.get_domain(id)?;
        self.domain_tree()?
            .descendants(id)
            .into_iter()
            .map(|descendant| self.get_domain(descendant))
            .collect()
    }

    pub fn root_domains(&self) -> Result<Vec<BookDomain>> {
        self.domain_tree()?
            .roots()
            .into_iter()
            .map(|root| self.get_domain(root))
            .collect()
    }

    pub fn domains_for_book(&self, book: BookId) -> Result<Vec<BookDomain>> {
        self.list_records(
            EntityKind::BookDomain,
            "\"Id\" IN (SELECT \"DomainId\" FROM \"BookBookDomain\" WHERE \"BookId\" = ?1)",
            book.get(),
            domain_from_row,
        )
    }

    pub fn books_in_domain(&self, domain: BookDomainId) -> Result<Vec<Book>> {
        self.list_records(
            EntityKind::Book,
            "\"Id\" IN (SELECT \"BookId\" FROM \"BookBookDomain\" WHERE \"DomainId\" = ?1)",
            domain.get(),
            book_from_row,
        )
    }

    /// Classify `book` under `domain`. Linking twice is a no-op that returns
    /// `false`.
    pub fn link_domain(&self, book: BookId, domain: BookDomainId) -> Result<bool> {
        self.link_rows(EntityKind::BookBookDomain, book.get(), domain.get())
    }

    pub fn unlink_domain(&self, book: BookId, domain: BookDomainId) -> Result<bool> {
        self.unlink_rows(EntityKind::BookBookDomain, book.get(), domain.get())
    }
}

fn ensure_acyclic(conn: &Connection, id: BookDomainId, parent: BookDomainId) -> Result<()> {
    if DomainTree::load(conn)?.would_create_cycle(id, parent) {
        log::debug!("Refusing to make domain {parent} the parent of {id}: cycle");
        return Err(Error::validation(
            EntityKind::BookDomain.name(),
            "ParentDomainId",
            Constraint::Acyclic,
        ));
    }
    Ok(())
}

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<BookDomain> {
    Ok(BookDomain {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        parent_domain_id: row.get(2)?,
    })
}
