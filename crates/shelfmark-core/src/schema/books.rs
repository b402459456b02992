use rusqlite::Row;

use crate::catalog::EntityKind;
use crate::error::Result;
use crate::integrity::CascadeReport;
use crate::model::{Author, AuthorId, Book, BookId, Edition, EditionId};

use super::db::Database;

// Book CRUD
impl Database {
    /// Insert a new book, setting `book.id`.
    pub fn insert_book(&self, book: &mut Book) -> Result<BookId> {
        let id = BookId::new(self.insert_record(book)?);
        book.id = Some(id);
        Ok(id)
    }

    pub fn get_book(&self, id: BookId) -> Result<Book> {
        self.get_record(EntityKind::Book, id.get(), book_from_row)
    }

    pub fn update_book(&self, book: &Book) -> Result<()> {
        self.update_record(book)
    }

    /// Delete a book with its editions and author/domain links.
    ///
    /// Refused while any borrowing references the book.
    pub fn delete_book(&self, id: BookId) -> Result<CascadeReport> {
        self.delete_record(EntityKind::Book, id.get())
    }

    /// Books written by `author`.
    pub fn books_by_author(&self, author: AuthorId) -> Result<Vec<Book>> {
        self.list_records(
            EntityKind::Book,
            "\"Id\" IN (SELECT \"BookId\" FROM \"BookAuthor\" WHERE \"AuthorId\" = ?1)",
            author.get(),
            book_from_row,
        )
    }
}

// Author CRUD
impl Database {
    pub fn insert_author(&self, author: &mut Author) -> Result<AuthorId> {
        let id = AuthorId::new(self.insert_record(author)?);
        author.id = Some(id);
        Ok(id)
    }

    pub fn get_author(&self, id: AuthorId) -> Result<Author> {
        self.get_record(EntityKind::Author, id.get(), author_from_row)
    }

    pub fn update_author(&self, author: &Author) -> Result<()> {
        self.update_record(author)
    }

    /// Delete an author; its book links go with it, the books stay.
    pub fn delete_author(&self, id: AuthorId) -> Result<CascadeReport> {
        self.delete_record(EntityKind::Author, id.get())
    }

    pub fn authors_for_book(&self, book: BookId) -> Result<Vec<Author>> {
        self.list_records(
            EntityKind::Author,
            "\"Id\" IN (SELECT \"AuthorId\" FROM \"BookAuthor\" WHERE \"BookId\" = ?1)",
            book.get(),
            author_from_row,
        )
    }

    /// Record that `author` wrote `book`. Linking twice is a no-op that
    /// returns `false`.
    pub fn link_author(&self, book: BookId, author: AuthorId) -> Result<bool> {
        self.link_rows(EntityKind::BookAuthor, book.get(), author.get())
    }

    pub fn unlink_author(&self, book: BookId, author: AuthorId) -> Result<bool> {
        self.unlink_rows(EntityKind::BookAuthor, book.get(), author.get())
    }
}

// Edition CRUD
impl Database {
    pub fn insert_edition(&self, edition: &mut Edition) -> Result<EditionId> {
        let id = EditionId::new(self.insert_record(edition)?);
        edition.id = Some(id);
        Ok(id)
    }

    pub fn get_edition(&self, id: EditionId) -> Result<Edition> {
        self.get_record(EntityKind::Edition, id.get(), edition_from_row)
    }

    pub fn update_edition(&self, edition: &Edition) -> Result<()> {
        self.update_record(edition)
    }

    pub fn delete_edition(&self, id: EditionId) -> Result<CascadeReport> {
        self.delete_record(EntityKind::Edition, id.get())
    }

    pub fn editions_for_book(&self, book: BookId) -> Result<Vec<Edition>> {
        self.list_records(
            EntityKind::Edition,
            "\"BookId\" = ?1",
            book.get(),
            edition_from_row,
        )
    }
}

pub(super) fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        isbn: row.get(2)?,
        description: row.get(3)?,
    })
}

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: Some(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
    })
}

fn edition_from_row(row: &Row<'_>) -> rusqlite::Result<Edition> {
    Ok(Edition {
        id: Some(row.get(0)?),
        publisher: row.get(1)?,
        book_type: row.get(2)?,
        year: row.get(3)?,
        edition_number: row.get(4)?,
        page_count: row.get(5)?,
        book_id: row.get(6)?,
    })
}
