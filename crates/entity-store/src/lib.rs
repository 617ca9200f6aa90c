pub mod constraints;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;
pub mod views;

pub use common::{
    AvailabilityStatus, InstrumentId, InstrumentTypeId, LoanId, RequestId, ReviewId, UserId,
};
pub use error::{Result, StoreError};
pub use memory::InMemoryEntityStore;
pub use postgres::PostgresEntityStore;
pub use records::{
    Instrument, InstrumentChanges, InstrumentType, Loan, LoanRequest, NewInstrument, NewLoan,
    NewLoanRequest, NewReview, NewUser, ProfileChanges, Review, User,
};
pub use store::{EntityStore, StoreTransaction};
pub use views::{CatalogEntry, RequestListEntry, TimelineEntry, TimelineSource};
