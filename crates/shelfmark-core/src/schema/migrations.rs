/// A reversible schema migration.
///
/// `version` is a sortable timestamp (`YYYYMMDDhhmmss`); steps are applied
/// in ascending version order and reverted in descending order. `down` must
/// restore exactly the schema that existed before `up` ran.
#[derive(Debug)]
pub struct Migration {
    pub version: &'static str,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

const INITIAL_UP: &str = r#"
CREATE TABLE "Authors" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Authors" PRIMARY KEY AUTOINCREMENT,
    "FirstName" VARCHAR(100) NOT NULL,
    "LastName" VARCHAR(100) NOT NULL
);

CREATE TABLE "Books" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Books" PRIMARY KEY AUTOINCREMENT,
    "Title" VARCHAR(255) NOT NULL,
    "Isbn" VARCHAR(20) NULL,
    "Description" VARCHAR(1000) NULL
);

CREATE TABLE "BookDomains" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_BookDomains" PRIMARY KEY AUTOINCREMENT,
    "Name" VARCHAR(150) NOT NULL,
    "ParentDomainId" INTEGER NULL,
    CONSTRAINT "FK_BookDomains_BookDomains_ParentDomainId" FOREIGN KEY ("ParentDomainId") REFERENCES "BookDomains" ("Id") ON DELETE RESTRICT
);

CREATE TABLE "Readers" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Readers" PRIMARY KEY AUTOINCREMENT,
    "FirstName" VARCHAR(100) NOT NULL,
    "LastName" VARCHAR(100) NOT NULL,
    "Address" VARCHAR(255) NOT NULL,
    "Email" VARCHAR(150) NULL,
    "PhoneNumber" VARCHAR(20) NULL,
    "IsStaff" INTEGER NOT NULL,
    "RegistrationDate" DATETIME NOT NULL
);

CREATE TABLE "Editions" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Editions" PRIMARY KEY AUTOINCREMENT,
    "Publisher" VARCHAR(150) NOT NULL,
    "BookType" VARCHAR(50) NOT NULL,
    "Year" INTEGER NOT NULL,
    "EditionNumber" INTEGER NOT NULL,
    "PageCount" INTEGER NOT NULL,
    "BookId" INTEGER NOT NULL,
    CONSTRAINT "FK_Editions_Books_BookId" FOREIGN KEY ("BookId") REFERENCES "Books" ("Id") ON DELETE CASCADE
);

CREATE TABLE "Borrowings" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Borrowings" PRIMARY KEY AUTOINCREMENT,
    "ReaderId" INTEGER NOT NULL,
    "BookId" INTEGER NOT NULL,
    "BorrowingDate" DATETIME NOT NULL,
    "DueDate" DATETIME NOT NULL,
    "ReturnDate" DATETIME NULL,
    "IsActive" INTEGER NOT NULL,
    "InitialBorrowingDays" INTEGER NOT NULL,
    "TotalExtensionDays" INTEGER NOT NULL,
    "LastExtensionDate" DATETIME NULL,
    CONSTRAINT "FK_Borrowings_Books_BookId" FOREIGN KEY ("BookId") REFERENCES "Books" ("Id") ON DELETE RESTRICT,
    CONSTRAINT "FK_Borrowings_Readers_ReaderId" FOREIGN KEY ("ReaderId") REFERENCES "Readers" ("Id") ON DELETE RESTRICT
);

CREATE TABLE "LoanExtensions" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_LoanExtensions" PRIMARY KEY AUTOINCREMENT,
    "BorrowingId" INTEGER NOT NULL,
    "ExtensionDate" DATETIME NOT NULL,
    "ExtensionDays" INTEGER NOT NULL,
    CONSTRAINT "FK_LoanExtensions_Borrowings_BorrowingId" FOREIGN KEY ("BorrowingId") REFERENCES "Borrowings" ("Id") ON DELETE CASCADE
);

CREATE TABLE "BookAuthor" (
    "BookId" INTEGER NOT NULL,
    "AuthorId" INTEGER NOT NULL,
    CONSTRAINT "PK_BookAuthor" PRIMARY KEY ("BookId", "AuthorId"),
    CONSTRAINT "FK_BookAuthor_Authors_AuthorId" FOREIGN KEY ("AuthorId") REFERENCES "Authors" ("Id") ON DELETE CASCADE,
    CONSTRAINT "FK_BookAuthor_Books_BookId" FOREIGN KEY ("BookId") REFERENCES "Books" ("Id") ON DELETE CASCADE
);

CREATE TABLE "BookBookDomain" (
    "BookId" INTEGER NOT NULL,
    "DomainId" INTEGER NOT NULL,
    CONSTRAINT "PK_BookBookDomain" PRIMARY KEY ("BookId", "DomainId"),
    CONSTRAINT "FK_BookBookDomain_BookDomains_DomainId" FOREIGN KEY ("DomainId") REFERENCES "BookDomains" ("Id") ON DELETE CASCADE,
    CONSTRAINT "FK_BookBookDomain_Books_BookId" FOREIGN KEY ("BookId") REFERENCES "Books" ("Id") ON DELETE CASCADE
);

CREATE INDEX "IX_BookAuthor_AuthorId" ON "BookAuthor" ("AuthorId");
CREATE INDEX "IX_BookBookDomain_DomainId" ON "BookBookDomain" ("DomainId");
CREATE INDEX "IX_BookDomains_ParentDomainId" ON "BookDomains" ("ParentDomainId");
CREATE INDEX "IX_Editions_BookId" ON "Editions" ("BookId");
CREATE INDEX "IX_Borrowings_BookId" ON "Borrowings" ("BookId");
CREATE INDEX "IX_Borrowings_ReaderId" ON "Borrowings" ("ReaderId");
CREATE INDEX "IX_LoanExtensions_BorrowingId" ON "LoanExtensions" ("BorrowingId");
"#;

const INITIAL_DOWN: &str = r#"
DROP TABLE "BookAuthor";
DROP TABLE "BookBookDomain";
DROP TABLE "Editions";
DROP TABLE "LoanExtensions";
DROP TABLE "Authors";
DROP TABLE "BookDomains";
DROP TABLE "Borrowings";
DROP TABLE "Books";
DROP TABLE "Readers";
"#;

// SQLite cannot change a column's declared type in place, so the Borrowings
// table is rebuilt: create the new shape, copy rows, drop, rename, re-index.
// The AUTOINCREMENT counter is carried over before the copy; the rename moves
// it to the final name. Foreign key enforcement is off while migrations run.

const UPDATES_UP: &str = r#"
CREATE TABLE "Borrowings_rebuild" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Borrowings" PRIMARY KEY AUTOINCREMENT,
    "ReaderId" INTEGER NOT NULL,
    "BookId" INTEGER NOT NULL,
    "BorrowingDate" DATETIME2 NOT NULL,
    "DueDate" DATETIME2 NOT NULL,
    "ReturnDate" DATETIME2 NULL,
    "IsActive" INTEGER NOT NULL,
    "InitialBorrowingDays" INTEGER NOT NULL,
    "TotalExtensionDays" INTEGER NOT NULL,
    "LastExtensionDate" DATETIME2 NULL,
    CONSTRAINT "FK_Borrowings_Books_BookId" FOREIGN KEY ("BookId") REFERENCES "Books" ("Id") ON DELETE RESTRICT,
    CONSTRAINT "FK_Borrowings_Readers_ReaderId" FOREIGN KEY ("ReaderId") REFERENCES "Readers" ("Id") ON DELETE RESTRICT
);

INSERT INTO sqlite_sequence ("name", "seq")
SELECT 'Borrowings_rebuild', "seq" FROM sqlite_sequence WHERE "name" = 'Borrowings';

INSERT INTO "Borrowings_rebuild" ("Id", "ReaderId", "BookId", "BorrowingDate", "DueDate", "ReturnDate", "IsActive", "InitialBorrowingDays", "TotalExtensionDays", "LastExtensionDate")
SELECT "Id", "ReaderId", "BookId", "BorrowingDate", "DueDate", "ReturnDate", "IsActive", "InitialBorrowingDays", "TotalExtensionDays", "LastExtensionDate"
FROM "Borrowings";

DROP TABLE "Borrowings";
ALTER TABLE "Borrowings_rebuild" RENAME TO "Borrowings";

CREATE INDEX "IX_Borrowings_BookId" ON "Borrowings" ("BookId");
CREATE INDEX "IX_Borrowings_ReaderId" ON "Borrowings" ("ReaderId");
"#;

const UPDATES_DOWN: &str = r#"
CREATE TABLE "Borrowings_rebuild" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Borrowings" PRIMARY KEY AUTOINCREMENT,
    "ReaderId" INTEGER NOT NULL,
    "BookId" INTEGER NOT NULL,
    "BorrowingDate" DATETIME NOT NULL,
    "DueDate" DATETIME NOT NULL,
    "ReturnDate" DATETIME NULL,
    "IsActive" INTEGER NOT NULL,
    "InitialBorrowingDays" INTEGER NOT NULL,
    "TotalExtensionDays" INTEGER NOT NULL,
    "LastExtensionDate" DATETIME NULL,
    CONSTRAINT "FK_Borrowings_Books_BookId" FOREIGN KEY ("BookId") REFERENCES "Books" ("Id") ON DELETE RESTRICT,
    CONSTRAINT "FK_Borrowings_Readers_ReaderId" FOREIGN KEY ("ReaderId") REFERENCES "Readers" ("Id") ON DELETE RESTRICT
);

INSERT INTO sqlite_sequence ("name", "seq")
SELECT 'Borrowings_rebuild', "seq" FROM sqlite_sequence WHERE "name" = 'Borrowings';

INSERT INTO "Borrowings_rebuild" ("Id", "ReaderId", "BookId", "BorrowingDate", "DueDate", "ReturnDate", "IsActive", "InitialBorrowingDays", "TotalExtensionDays", "LastExtensionDate")
SELECT "Id", "ReaderId", "BookId", "BorrowingDate", "DueDate", "ReturnDate", "IsActive", "InitialBorrowingDays", "TotalExtensionDays", "LastExtensionDate"
FROM "Borrowings";

DROP TABLE "Borrowings";
ALTER TABLE "Borrowings_rebuild" RENAME TO "Borrowings";

CREATE INDEX "IX_Borrowings_BookId" ON "Borrowings" ("BookId");
CREATE INDEX "IX_Borrowings_ReaderId" ON "Borrowings" ("ReaderId");
"#;

const UPDATES1_UP: &str = r#"
ALTER TABLE "Borrowings" ADD COLUMN "StaffId" INTEGER NULL CONSTRAINT "FK_Borrowings_Readers_StaffId" REFERENCES "Readers" ("Id") ON DELETE RESTRICT;

CREATE INDEX "IX_Borrowings_StaffId" ON "Borrowings" ("StaffId");
"#;

// A column that takes part in a foreign key cannot be dropped with
// ALTER TABLE, so this is a rebuild as well.
const UPDATES1_DOWN: &str = r#"
DROP INDEX "IX_Borrowings_StaffId";

CREATE TABLE "Borrowings_rebuild" (
    "Id" INTEGER NOT NULL CONSTRAINT "PK_Borrowings" PRIMARY KEY AUTOINCREMENT,
    "ReaderId" INTEGER NOT NULL,
    "BookId" INTEGER NOT NULL,
    "BorrowingDate" DATETIME2 NOT NULL,
    "DueDate" DATETIME2 NOT NULL,
    "ReturnDate" DATETIME2 NULL,
    "IsActive" INTEGER NOT NULL,
    "InitialBorrowingDays" INTEGER NOT NULL,
    "TotalExtensionDays" INTEGER NOT NULL,
    "LastExtensionDate" DATETIME2 NULL,
    CONSTRAINT "FK_Borrowings_Books_BookId" FOREIGN KEY ("BookId") REFERENCES "Books" ("Id") ON DELETE RESTRICT,
    CONSTRAINT "FK_Borrowings_Readers_ReaderId" FOREIGN KEY ("ReaderId") REFERENCES "Readers" ("Id") ON DELETE RESTRICT
);

INSERT INTO sqlite_sequence ("name", "seq")
SELECT 'Borrowings_rebuild', "seq" FROM sqlite_sequence WHERE "name" = 'Borrowings';

INSERT INTO "Borrowings_rebuild" ("Id", "ReaderId", "BookId", "BorrowingDate", "DueDate", "ReturnDate", "IsActive", "InitialBorrowingDays", "TotalExtensionDays", "LastExtensionDate")
SELECT "Id", "ReaderId", "BookId", "BorrowingDate", "DueDate", "ReturnDate", "IsActive", "InitialBorrowingDays", "TotalExtensionDays", "LastExtensionDate"
FROM "Borrowings";

DROP TABLE "Borrowings";
ALTER TABLE "Borrowings_rebuild" RENAME TO "Borrowings";

CREATE INDEX "IX_Borrowings_BookId" ON "Borrowings" ("BookId");
CREATE INDEX "IX_Borrowings_ReaderId" ON "Borrowings" ("ReaderId");
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20240301093000",
        name: "Initial",
        up: INITIAL_UP,
        down: INITIAL_DOWN,
    },
    Migration {
        version: "20240315141500",
        name: "Updates",
        up: UPDATES_UP,
        down: UPDATES_DOWN,
    },
    Migration {
        version: "20240402110000",
        name: "Updates1",
        up: UPDATES1_UP,
        down: UPDATES1_DOWN,
    },
];

/// Version of the newest known migration.
#[must_use]
pub fn latest_version() -> Option<&'static str> {
    MIGRATIONS.iter().map(|m| m.version).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_strictly_increasing() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn test_versions_are_timestamps() {
        for migration in MIGRATIONS {
            assert_eq!(migration.version.len(), 14);
            assert!(migration.version.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_latest_version() {
        assert_eq!(latest_version(), Some("20240402110000"));
    }
}
