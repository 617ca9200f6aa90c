//! Availability gate.
//!
//! Pure decision logic: given an instrument and what the store currently holds
//! for the (instrument, user) pair, decide whether a lifecycle action is legal.
//! The gate reads `availability_status` but never writes it.
//!
//! ```text
//! action               │ denied when
//! ─────────────────────┼──────────────────────────────────────────────
//! request              │ requester owns the instrument
//!                      │ requester already holds a request on it
//! cancel               │ no matching request owned by the requester
//! loan (direct/promote)│ never; status is not consulted
//! bulk delete          │ never
//! ```

use common::UserId;
use entity_store::Instrument;

use crate::error::LendingError;

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Why the gate denied an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The requester owns the instrument.
    OwnInstrument,
    /// The requester already holds a request on the instrument.
    AlreadyRequested,
    /// No request matches the caller.
    RequestNotFound,
}

impl DenyReason {
    /// Returns the message reported to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::OwnInstrument => "You cannot loan your own instrument.",
            DenyReason::AlreadyRequested => "You have already requested this instrument.",
            DenyReason::RequestNotFound => {
                "Loan request not found or you do not have permission to cancel this request."
            }
        }
    }
}

impl From<DenyReason> for LendingError {
    fn from(reason: DenyReason) -> Self {
        let message = reason.message().to_string();
        match reason {
            DenyReason::OwnInstrument => LendingError::Forbidden(message),
            DenyReason::AlreadyRequested => LendingError::Conflict(message),
            DenyReason::RequestNotFound => LendingError::NotFound(message),
        }
    }
}

impl Decision {
    /// Converts a denial into the matching [`LendingError`].
    pub fn into_result(self) -> Result<(), LendingError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}

/// Decides whether `requester_id` may request `instrument`.
///
/// Any status is accepted, so several borrowers can request the same
/// instrument at once.
pub fn check_request(
    instrument: &Instrument,
    requester_id: UserId,
    already_requested: bool,
) -> Decision {
    if instrument.owner_id == requester_id {
        return Decision::Deny(DenyReason::OwnInstrument);
    }
    if already_requested {
        return Decision::Deny(DenyReason::AlreadyRequested);
    }
    Decision::Allow
}

/// Decides whether a cancellation may proceed.
///
/// `matching_request` is true only when a request exists that belongs to the
/// cancelling requester.
pub fn check_cancel(matching_request: bool) -> Decision {
    if matching_request {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::RequestNotFound)
    }
}

/// Decides whether a loan may be opened on `instrument`.
///
/// Loans are accepted whatever the instrument's status; the single open loan
/// per instrument is enforced by the store.
pub fn check_loan(_instrument: &Instrument) -> Decision {
    Decision::Allow
}
