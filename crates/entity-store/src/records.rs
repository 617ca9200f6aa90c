//! Typed rows and write inputs for the entity store tables.

use chrono::{DateTime, Utc};
use common::{
    AvailabilityStatus, InstrumentId, InstrumentTypeId, LoanId, RequestId, ReviewId, UserId,
};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

impl NewUser {
    /// Creates a user input with only the credentials set.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            ..Self::default()
        }
    }

    /// Sets the contact fields shown to lending counterparts.
    pub fn with_contact(
        mut self,
        email: impl Into<String>,
        full_name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        self.email = Some(email.into());
        self.full_name = Some(full_name.into());
        self.phone = Some(phone.into());
        self
    }
}

/// Partial update of a user's profile. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileChanges {
    /// Returns true if no column would change.
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.phone.is_none()
            && self.profile_picture.is_none()
    }
}

/// Instrument type lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InstrumentType {
    pub id: InstrumentTypeId,
    pub name: String,
}

/// A listed instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Instrument {
    pub instrument_id: InstrumentId,
    pub owner_id: UserId,
    pub instrument_name: String,
    pub description: String,
    pub location: String,
    pub instrument_type_id: InstrumentTypeId,
    pub image: Option<String>,
    pub availability_status: AvailabilityStatus,
}

/// Input for listing a new instrument. New instruments start as available.
#[derive(Debug, Clone)]
pub struct NewInstrument {
    pub owner_id: UserId,
    pub instrument_name: String,
    pub description: String,
    pub location: String,
    pub instrument_type_id: InstrumentTypeId,
    pub image: Option<String>,
}

/// Partial update of an instrument. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentChanges {
    pub instrument_name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub instrument_type_id: Option<InstrumentTypeId>,
    pub image: Option<String>,
    pub availability_status: Option<AvailabilityStatus>,
}

impl InstrumentChanges {
    /// Returns true if no column would change.
    pub fn is_empty(&self) -> bool {
        self.instrument_name.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.instrument_type_id.is_none()
            && self.image.is_none()
            && self.availability_status.is_none()
    }
}

/// A borrower's pending interest in an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanRequest {
    pub request_id: RequestId,
    pub instrument_id: InstrumentId,
    pub requester_id: UserId,
    pub request_date: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NewLoanRequest {
    pub instrument_id: InstrumentId,
    pub requester_id: UserId,
    pub request_date: DateTime<Utc>,
    pub message: String,
}

/// An active borrowing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub loan_id: LoanId,
    pub instrument_id: InstrumentId,
    pub borrower_id: UserId,
    pub loan_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLoan {
    pub instrument_id: InstrumentId,
    pub borrower_id: UserId,
    pub loan_date: DateTime<Utc>,
}

/// A user's rating of an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub review_id: ReviewId,
    pub instrument_id: InstrumentId,
    pub user_id: UserId,
    pub rating: i16,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub instrument_id: InstrumentId,
    pub user_id: UserId,
    pub rating: i16,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_changes_are_detected() {
        assert!(InstrumentChanges::default().is_empty());
        assert!(ProfileChanges::default().is_empty());

        let changes = InstrumentChanges {
            availability_status: Some(AvailabilityStatus::OnLoan),
            ..InstrumentChanges::default()
        };
        assert!(!changes.is_empty());
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            user_id: UserId::new(1),
            username: "alice".to_string(),
            password_hash: "secret-hash".to_string(),
            email: Some("alice@example.com".to_string()),
            full_name: None,
            phone: None,
            profile_picture: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
