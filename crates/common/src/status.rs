//! Instrument availability status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Owner-set availability label of an instrument.
///
/// The status is advisory: lifecycle operations never write it, and it can
/// disagree with the loan requests and loans actually stored for the
/// instrument. Readers filter on it independently of those rows.
///
/// Encoded as a small integer both on the wire and in storage:
/// ```text
/// 1 = Available, 2 = Requested, 3 = OnLoan
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum AvailabilityStatus {
    /// Listed and free to borrow.
    #[default]
    Available = 1,

    /// At least one borrower has asked for it.
    Requested = 2,

    /// Currently lent out.
    OnLoan = 3,
}

/// Error returned when decoding an unknown status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid availability status code: {0} (expected 1, 2 or 3)")]
pub struct InvalidStatusCode(pub i16);

impl AvailabilityStatus {
    /// Returns the numeric code stored for this status.
    pub fn code(&self) -> i16 {
        *self as i16
    }

    /// Returns true if the instrument shows up in the discovery feed.
    pub fn is_discoverable(&self) -> bool {
        matches!(
            self,
            AvailabilityStatus::Available | AvailabilityStatus::Requested
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "Available",
            AvailabilityStatus::Requested => "Requested",
            AvailabilityStatus::OnLoan => "OnLoan",
        }
    }
}

impl TryFrom<i16> for AvailabilityStatus {
    type Error = InvalidStatusCode;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(AvailabilityStatus::Available),
            2 => Ok(AvailabilityStatus::Requested),
            3 => Ok(AvailabilityStatus::OnLoan),
            other => Err(InvalidStatusCode(other)),
        }
    }
}

impl From<AvailabilityStatus> for i16 {
    fn from(status: AvailabilityStatus) -> Self {
        status.code()
    }
}

impl std::str::FromStr for AvailabilityStatus {
    type Err = InvalidStatusCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: i16 = s.trim().parse().map_err(|_| InvalidStatusCode(0))?;
        Self::try_from(code)
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
