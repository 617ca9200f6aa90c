//! Domain layer for the instrument lending platform.
//!
//! This crate provides:
//! - the availability gate, a pure decision function over an instrument's
//!   owner-set status and the loan requests/loans stored for it
//! - the loan lifecycle manager, which runs every request, cancellation,
//!   promotion and return inside a single store transaction
//! - instrument, review and profile services for the surrounding CRUD
//! - the media store boundary used for instrument and profile images
//! - account registration and credential checks

pub mod accounts;
pub mod error;
pub mod gate;
pub mod instruments;
pub mod lifecycle;
pub mod media;
pub mod profiles;
pub mod reviews;

pub use accounts::AccountService;
pub use error::LendingError;
pub use gate::{Decision, DenyReason};
pub use instruments::{InstrumentService, InstrumentUpdate, Listing};
pub use lifecycle::{LoanLifecycleManager, Promotion};
pub use media::{InMemoryMediaStore, LocalMediaStore, MediaError, MediaStore, MediaUpload};
pub use profiles::{ProfileService, ProfileUpdate};
pub use reviews::{ReviewService, parse_rating};
