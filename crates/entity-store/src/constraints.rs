//! Names of the schema constraints the lifecycle relies on.
//!
//! The PostgreSQL store reports these names from the database; the in-memory
//! store reports the same names so callers can match on them uniformly.

/// One user per username.
pub const UNIQUE_USERNAME: &str = "unique_username";

/// One outstanding loan request per (instrument, requester) pair.
pub const UNIQUE_INSTRUMENT_REQUESTER: &str = "unique_instrument_requester";

/// One open loan per instrument.
pub const UNIQUE_OPEN_LOAN: &str = "unique_open_loan";

/// One review per (instrument, user) pair.
pub const UNIQUE_INSTRUMENT_REVIEWER: &str = "unique_instrument_reviewer";

/// Ratings are within 0..=5.
pub const VALID_RATING: &str = "valid_rating";

pub const INSTRUMENTS_OWNER_FKEY: &str = "instruments_owner_id_fkey";
pub const INSTRUMENTS_TYPE_FKEY: &str = "instruments_instrument_type_id_fkey";
pub const LOANREQUESTS_INSTRUMENT_FKEY: &str = "loanrequests_instrument_id_fkey";
pub const LOANREQUESTS_REQUESTER_FKEY: &str = "loanrequests_requester_id_fkey";
pub const LOANS_INSTRUMENT_FKEY: &str = "loans_instrument_id_fkey";
pub const LOANS_BORROWER_FKEY: &str = "loans_borrower_id_fkey";
pub const REVIEWS_INSTRUMENT_FKEY: &str = "reviews_instrument_id_fkey";
pub const REVIEWS_USER_FKEY: &str = "reviews_user_id_fkey";
