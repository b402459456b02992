use rusqlite::Row;

use crate::catalog::EntityKind;
use crate::error::Result;
use crate::integrity::CascadeReport;
use crate::model::{
    BookId, Borrowing, BorrowingId, LoanExtension, LoanExtensionId, Reader, ReaderId,
};

use super::db::{get_datetime, get_opt_datetime, Database};

// Reader CRUD
impl Database {
    pub fn insert_reader(&self, reader: &mut Reader) -> Result<ReaderId> {
        let id = ReaderId::new(self.insert_record(reader)?);
        reader.id = Some(id);
        Ok(id)
    }

    pub fn get_reader(&self, id: ReaderId) -> Result<Reader> {
        self.get_record(EntityKind::Reader, id.get(), reader_from_row)
    }

    pub fn update_reader(&self, reader: &Reader) -> Result<()> {
        self.update_record(reader)
    }

    /// Delete a reader. Refused while the reader has borrowings, either as
    /// borrower or as the staff member who issued them.
    pub fn delete_reader(&self, id: ReaderId) -> Result<CascadeReport> {
        self.delete_record(EntityKind::Reader, id.get())
    }
}

// Borrowing CRUD
impl Database {
    pub fn insert_borrowing(&self, borrowing: &mut Borrowing) -> Result<BorrowingId> {
        let id = BorrowingId::new(self.insert_record(borrowing)?);
        borrowing.id = Some(id);
        Ok(id)
    }

    pub fn get_borrowing(&self, id: BorrowingId) -> Result<Borrowing> {
        self.get_record(EntityKind::Borrowing, id.get(), borrowing_from_row)
    }

    pub fn update_borrowing(&self, borrowing: &Borrowing) -> Result<()> {
        self.update_record(borrowing)
    }

    /// Delete a borrowing together with its loan extensions.
    pub fn delete_borrowing(&self, id: BorrowingId) -> Result<CascadeReport> {
        self.delete_record(EntityKind::Borrowing, id.get())
    }

    /// Loans taken out by `reader`.
    pub fn borrowings_for_reader(&self, reader: ReaderId) -> Result<Vec<Borrowing>> {
        self.list_records(
            EntityKind::Borrowing,
            "\"ReaderId\" = ?1",
            reader.get(),
            borrowing_from_row,
        )
    }

    /// Loans issued by the staff member `staff`.
    pub fn borrowings_issued_by(&self, staff: ReaderId) -> Result<Vec<Borrowing>> {
        self.list_records(
            EntityKind::Borrowing,
            "\"StaffId\" = ?1",
            staff.get(),
            borrowing_from_row,
        )
    }

    pub fn borrowings_for_book(&self, book: BookId) -> Result<Vec<Borrowing>> {
        self.list_records(
            EntityKind::Borrowing,
            "\"BookId\" = ?1",
            book.get(),
            borrowing_from_row,
        )
    }
}

// LoanExtension CRUD
impl Database {
    pub fn insert_loan_extension(
        &self,
        extension: &mut LoanExtension,
    ) -> Result<LoanExtensionId> {
        let id = LoanExtensionId::new(self.insert_record(extension)?);
        extension.id = Some(id);
        Ok(id)
    }

    pub fn get_loan_extension(&self, id: LoanExtensionId) -> Result<LoanExtension> {
        self.get_record(EntityKind::LoanExtension, id.get(), extension_from_row)
    }

    pub fn update_loan_extension(&self, extension: &LoanExtension) -> Result<()> {
        self.update_record(extension)
    }

    pub fn delete_loan_extension(&self, id: LoanExtensionId) -> Result<CascadeReport> {
        self.delete_record(EntityKind::LoanExtension, id.get())
    }

    pub fn extensions_for_borrowing(&self, borrowing: BorrowingId) -> Result<Vec<LoanExtension>> {
        self.list_records(
            EntityKind::LoanExtension,
            "\"BorrowingId\" = ?1",
            borrowing.get(),
            extension_from_row,
        )
    }
}

fn reader_from_row(row: &Row<'_>) -> rusqlite::Result<Reader> {
    Ok(Reader {
        id: Some(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        address: row.get(3)?,
        email: row.get(4)?,
        phone_number: row.get(5)?,
        is_staff: row.get(6)?,
        registration_date: get_datetime(row, 7)?,
    })
}

fn borrowing_from_row(row: &Row<'_>) -> rusqlite::Result<Borrowing> {
    Ok(Borrowing {
        id: Some(row.get(0)?),
        reader_id: row.get(1)?,
        book_id: row.get(2)?,
        staff_id: row.get(3)?,
        borrowing_date: get_datetime(row, 4)?,
        due_date: get_datetime(row, 5)?,
        return_date: get_opt_datetime(row, 6)?,
        is_active: row.get(7)?,
        initial_borrowing_days: row.get(8)?,
        total_extension_days: row.get(9)?,
        last_extension_date: get_opt_datetime(row, 10)?,
    })
}

fn extension_from_row(row: &Row<'_>) -> rusqlite::Result<LoanExtension> {
    Ok(LoanExtension {
        id: Some(row.get(0)?),
        borrowing_id: row.get(1)?,
        extension_date: get_datetime(row, 2)?,
        extension_days: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Constraint, Error};
    use crate::model::Book;
    use chrono::{Duration, TimeZone, Utc};

    struct Fixture {
        db: Database,
        book: BookId,
        reader: ReaderId,
        staff: ReaderId,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let book = db.insert_book(&mut Book::new("Hard to Be a God")).unwrap();
        let reader = db
            .insert_reader(&mut Reader::new("Anton", "Rumata", "Arkanar"))
            .unwrap();
        let staff = db
            .insert_reader(&mut Reader::new("Don", "Condor", "Estor").as_staff())
            .unwrap();
        Fixture {
            db,
            book,
            reader,
            staff,
        }
    }

    fn loan(f: &Fixture) -> Borrowing {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        Borrowing::new(f.reader, f.book, start, start + Duration::days(14), 14)
    }

    #[test]
    fn test_reader_round_trip() {
        let f = fixture();
        let registered = Utc.with_ymd_and_hms(2023, 11, 5, 12, 0, 0).unwrap();
        let mut reader = Reader::new("Maxim", "Kammerer", "Saraksh")
            .with_email("maxim@example.org")
            .registered_at(registered);
        let id = f.db.insert_reader(&mut reader).unwrap();

        let stored = f.db.get_reader(id).unwrap();
        assert_eq!(stored, reader);
        assert_eq!(stored.registration_date, registered);
    }

    #[test]
    fn test_reader_without_address_is_rejected() {
        let f = fixture();
        let result = f.db.insert_reader(&mut Reader::new("No", "Address", " "));
        assert!(matches!(
            result,
            Err(Error::Validation {
                field: "Address",
                constraint: Constraint::Required,
                ..
            })
        ));
    }

    #[test]
    fn test_borrowing_round_trip_with_staff() {
        let f = fixture();
        let mut borrowing = loan(&f).issued_by(f.staff);
        let id = f.db.insert_borrowing(&mut borrowing).unwrap();

        let stored = f.db.get_borrowing(id).unwrap();
        assert_eq!(stored, borrowing);
        assert_eq!(stored.reader_id, f.reader);
        assert_eq!(stored.staff_id, Some(f.staff));

        assert_eq!(f.db.borrowings_for_reader(f.reader).unwrap().len(), 1);
        assert_eq!(f.db.borrowings_issued_by(f.staff).unwrap().len(), 1);
        assert!(f.db.borrowings_issued_by(f.reader).unwrap().is_empty());
        assert_eq!(f.db.borrowings_for_book(f.book).unwrap().len(), 1);
    }

    #[test]
    fn test_borrowing_with_missing_staff_is_rejected() {
        let f = fixture();
        let result = f.db.insert_borrowing(&mut loan(&f).issued_by(ReaderId::new(999)));
        assert!(matches!(
            result,
            Err(Error::ForeignKeyViolation {
                entity: "Borrowing",
                field: "StaffId",
                references: "Reader",
                id: 999,
            })
        ));
        assert!(f.db.borrowings_for_reader(f.reader).unwrap().is_empty());
    }

    #[test]
    fn test_return_a_book() {
        let f = fixture();
        let mut borrowing = loan(&f);
        let id = f.db.insert_borrowing(&mut borrowing).unwrap();

        borrowing.is_active = false;
        borrowing.return_date = Some(borrowing.borrowing_date + Duration::days(10));
        f.db.update_borrowing(&borrowing).unwrap();

        let stored = f.db.get_borrowing(id).unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.return_date, borrowing.return_date);
    }

    #[test]
    fn test_extensions_for_borrowing() {
        let f = fixture();
        let mut borrowing = loan(&f);
        let id = f.db.insert_borrowing(&mut borrowing).unwrap();

        let when = borrowing.due_date - Duration::days(1);
        let mut extension = LoanExtension::new(id, when, 7);
        let ext_id = f.db.insert_loan_extension(&mut extension).unwrap();

        assert_eq!(f.db.get_loan_extension(ext_id).unwrap(), extension);
        assert_eq!(f.db.extensions_for_borrowing(id).unwrap(), vec![extension]);
    }

    #[test]
    fn test_reader_with_loans_cannot_be_deleted() {
        let f = fixture();
        f.db.insert_borrowing(&mut loan(&f).issued_by(f.staff)).unwrap();

        assert!(matches!(
            f.db.delete_reader(f.reader),
            Err(Error::ReferentialIntegrity { relation: "reader_borrowings", .. })
        ));
        assert!(matches!(
            f.db.delete_reader(f.staff),
            Err(Error::ReferentialIntegrity { relation: "staff_borrowings", .. })
        ));
        assert!(f.db.get_reader(f.reader).is_ok());
    }

    #[test]
    fn test_deleted_borrowing_takes_extensions() {
        let f = fixture();
        let id = f.db.insert_borrowing(&mut loan(&f)).unwrap();
        let ext = f.db
            .insert_loan_extension(&mut LoanExtension::new(id, Utc::now(), 3))
            .unwrap();

        let report = f.db.delete_borrowing(id).unwrap();
        assert_eq!(report.deleted_count(EntityKind::LoanExtension), 1);
        assert!(matches!(
            f.db.get_loan_extension(ext),
            Err(Error::NotFound { entity: "LoanExtension", .. })
        ));
        f.db.delete_reader(f.reader).unwrap();
    }
}
