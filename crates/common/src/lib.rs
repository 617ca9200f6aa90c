//! Shared types for the instrument lending platform.

pub mod status;
pub mod types;

pub use status::{AvailabilityStatus, InvalidStatusCode};
pub use types::{InstrumentId, InstrumentTypeId, LoanId, RequestId, ReviewId, UserId};
