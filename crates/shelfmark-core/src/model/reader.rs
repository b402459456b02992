use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{EntityKind, FieldValue, Record};
use crate::model::ids::ReaderId;

/// A registered library user.
///
/// Staff members are readers with `is_staff` set; they can also be recorded
/// as the issuer of a [`Borrowing`](crate::model::Borrowing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reader {
    pub id: Option<ReaderId>,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub is_staff: bool,
    pub registration_date: DateTime<Utc>,
}

impl Reader {
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            address: address.into(),
            email: None,
            phone_number: None,
            is_staff: false,
            registration_date: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    #[must_use]
    pub fn as_staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    #[must_use]
    pub fn registered_at(mut self, registration_date: DateTime<Utc>) -> Self {
        self.registration_date = registration_date;
        self
    }
}

impl Record for Reader {
    const KIND: EntityKind = EntityKind::Reader;

    fn id(&self) -> Option<i64> {
        self.id.map(ReaderId::get)
    }

    fn values(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("FirstName", FieldValue::Text(Some(&self.first_name))),
            ("LastName", FieldValue::Text(Some(&self.last_name))),
            ("Address", FieldValue::Text(Some(&self.address))),
            ("Email", FieldValue::Text(self.email.as_deref())),
            ("PhoneNumber", FieldValue::Text(self.phone_number.as_deref())),
            ("IsStaff", FieldValue::Boolean(Some(self.is_staff))),
            (
                "RegistrationDate",
                FieldValue::DateTime(Some(self.registration_date)),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_builder() {
        let reader = Reader::new("Shevek", "Urrasti", "1 Abbenay Square")
            .with_email("shevek@example.org")
            .as_staff();

        assert!(reader.is_staff);
        assert_eq!(reader.email.as_deref(), Some("shevek@example.org"));
        assert!(reader.phone_number.is_none());
    }
}
