use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{EntityKind, FieldValue, Record};
use crate::model::ids::{BookId, BorrowingId, LoanExtensionId, ReaderId};

/// A loan of a book to a reader.
///
/// `reader_id` (the borrower) and `staff_id` (who issued the loan) both point
/// into the reader table and are resolved independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrowing {
    pub id: Option<BorrowingId>,
    pub reader_id: ReaderId,
    pub book_id: BookId,
    pub staff_id: Option<ReaderId>,
    pub borrowing_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub initial_borrowing_days: i32,
    pub total_extension_days: i32,
    pub last_extension_date: Option<DateTime<Utc>>,
}

impl Borrowing {
    /// A new active loan with no extensions.
    #[must_use]
    pub fn new(
        reader_id: ReaderId,
        book_id: BookId,
        borrowing_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
        initial_borrowing_days: i32,
    ) -> Self {
        Self {
            id: None,
            reader_id,
            book_id,
            staff_id: None,
            borrowing_date,
            due_date,
            return_date: None,
            is_active: true,
            initial_borrowing_days,
            total_extension_days: 0,
            last_extension_date: None,
        }
    }

    #[must_use]
    pub fn issued_by(mut self, staff_id: ReaderId) -> Self {
        self.staff_id = Some(staff_id);
        self
    }
}

impl Record for Borrowing {
    const KIND: EntityKind = EntityKind::Borrowing;

    fn id(&self) -> Option<i64> {
        self.id.map(BorrowingId::get)
    }

    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("ReaderId", FieldValue::Reference(Some(self.reader_id.get()))),
            ("BookId", FieldValue::Reference(Some(self.book_id.get()))),
            (
                "StaffId",
                FieldValue::Reference(self.staff_id.map(ReaderId::get)),
            ),
            ("BorrowingDate", FieldValue::DateTime(Some(self.borrowing_date))),
            ("DueDate", FieldValue::DateTime(Some(self.due_date))),
            ("ReturnDate", FieldValue::DateTime(self.return_date)),
            ("IsActive", FieldValue::Boolean(Some(self.is_active))),
            (
                "InitialBorrowingDays",
                FieldValue::Integer(Some(i64::from(self.initial_borrowing_days))),
            ),
            (
                "TotalExtensionDays",
                FieldValue::Integer(Some(i64::from(self.total_extension_days))),
            ),
            ("LastExtensionDate", FieldValue::DateTime(self.last_extension_date)),
        ]
    }
}

/// One extension granted on a borrowing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanExtension {
    pub id: Option<LoanExtensionId>,
    pub borrowing_id: BorrowingId,
    pub extension_date: DateTime<Utc>,
    pub extension_days: i32,
}

impl LoanExtension {
    #[must_use]
    pub fn new(borrowing_id: BorrowingId, extension_date: DateTime<Utc>, extension_days: i32) -> Self {
        Self {
            id: None,
            borrowing_id,
            extension_date,
            extension_days,
        }
    }
}

impl Record for LoanExtension {
    const KIND: EntityKind = EntityKind::LoanExtension;

    fn id(&self) -> Option<i64> {
        self.id.map(LoanExtensionId::get)
    }

    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("BorrowingId", FieldValue::Reference(Some(self.borrowing_id.get()))),
            ("ExtensionDate", FieldValue::DateTime(Some(self.extension_date))),
            (
                "ExtensionDays",
                FieldValue::Integer(Some(i64::from(self.extension_days))),
            ),
        ]
    }
}
