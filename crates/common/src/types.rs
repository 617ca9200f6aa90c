use serde::{Deserialize, Serialize};

/// Declares a typed row identifier backed by a `BIGSERIAL` column.
///
/// Each identifier wraps an `i64` so that user, instrument, request and loan
/// ids cannot be mixed up at call sites, while still encoding as a plain
/// integer on the wire and in the database.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from its raw database value.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw database value.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a registered user (owner, requester or borrower).
    UserId
);

entity_id!(
    /// Identifier of a listed instrument.
    InstrumentId
);

entity_id!(
    /// Identifier of an instrument type lookup row.
    InstrumentTypeId
);

entity_id!(
    /// Identifier of a pending loan request.
    RequestId
);

entity_id!(
    /// Identifier of an active loan.
    LoanId
);

entity_id!(
    /// Identifier of an instrument review.
    ReviewId
);
