pub mod author;
pub mod book;
pub mod borrowing;
pub mod domain;
pub mod edition;
pub mod ids;
pub mod reader;

pub use author::Author;
pub use book::Book;
pub use borrowing::{Borrowing, LoanExtension};
pub use domain::BookDomain;
pub use edition::Edition;
pub use ids::{AuthorId, BookDomainId, BookId, BorrowingId, EditionId, LoanExtensionId, ReaderId};
pub use reader::Reader;
