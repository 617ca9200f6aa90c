//! Denormalized rows produced by the read-side queries.

use chrono::{DateTime, Utc};
use common::{AvailabilityStatus, InstrumentId, InstrumentTypeId, LoanId, RequestId, UserId};
use serde::{Deserialize, Serialize};

/// An instrument joined with its owner, type name and mean review rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogEntry {
    pub instrument_id: InstrumentId,
    pub owner_id: UserId,
    pub owner_username: String,
    pub instrument_name: String,
    pub description: String,
    pub location: String,
    pub availability_status: AvailabilityStatus,
    pub image: Option<String>,
    pub instrument_type_id: InstrumentTypeId,
    pub instrument_type: String,
    /// Mean of all review ratings, `0.0` when the instrument has none.
    pub average_rating: f64,
}

/// Which record a timeline row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum TimelineSource {
    /// A pending loan request (`source = 0`).
    Request = 0,
    /// An active loan (`source = 1`).
    Loan = 1,
}

impl TryFrom<i16> for TimelineSource {
    type Error = String;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TimelineSource::Request),
            1 => Ok(TimelineSource::Loan),
            other => Err(format!("invalid timeline source: {other}")),
        }
    }
}

impl From<TimelineSource> for i16 {
    fn from(source: TimelineSource) -> Self {
        source as i16
    }
}

/// One row of a borrower's "my loans" timeline.
///
/// Carries the owner's contact fields so the borrower can arrange pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimelineEntry {
    pub source: TimelineSource,
    /// Request date for requests, loan start for loans.
    pub event_date: DateTime<Utc>,
    pub request_id: Option<RequestId>,
    pub loan_id: Option<LoanId>,
    pub message: Option<String>,
    pub instrument_id: InstrumentId,
    pub instrument_name: String,
    pub description: String,
    pub location: String,
    pub availability_status: AvailabilityStatus,
    pub image: Option<String>,
    pub instrument_type_id: InstrumentTypeId,
    pub owner_id: UserId,
    pub owner_username: String,
    pub owner_full_name: Option<String>,
    pub owner_email: Option<String>,
    pub owner_phone: Option<String>,
}

/// A pending request on one instrument, with the requester's contact fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestListEntry {
    pub request_id: RequestId,
    pub instrument_id: InstrumentId,
    pub requester_id: UserId,
    pub requester_username: String,
    pub requester_full_name: Option<String>,
    pub requester_email: Option<String>,
    pub requester_phone: Option<String>,
    pub request_date: DateTime<Utc>,
    pub message: String,
}
