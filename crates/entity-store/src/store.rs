use async_trait::async_trait;

use crate::records::{
    Instrument, InstrumentChanges, InstrumentType, Loan, LoanRequest, NewInstrument, NewLoan,
    NewLoanRequest, NewReview, NewUser, ProfileChanges, Review, User,
};
use crate::views::{CatalogEntry, RequestListEntry, TimelineEntry};
use crate::{InstrumentId, RequestId, Result, ReviewId, UserId};

/// Core trait for entity store implementations.
///
/// Writes go through a [`StoreTransaction`] obtained from [`EntityStore::begin`];
/// each service operation opens one transaction, validates inside it and then
/// mutates. The read-side queries run outside any transaction and return fully
/// decoded rows in a single round trip.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Opens a new transaction.
    ///
    /// Dropping the returned transaction without calling
    /// [`StoreTransaction::commit`] discards every write made through it.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Loads a user by ID.
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Loads a user by login name.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Loads an instrument by ID.
    async fn find_instrument(&self, instrument_id: InstrumentId) -> Result<Option<Instrument>>;

    /// Instruments owned by `owner_id`, with type name, owner username and
    /// mean rating. One row per instrument, ordered by instrument ID.
    async fn catalog_by_owner(&self, owner_id: UserId) -> Result<Vec<CatalogEntry>>;

    /// Discoverable instruments for `viewer_id`.
    ///
    /// Only instruments whose status is available or requested, not owned by
    /// the viewer, and not already requested by the viewer.
    async fn discovery_feed(&self, viewer_id: UserId) -> Result<Vec<CatalogEntry>>;

    /// Instruments `requester_id` holds a pending request for, oldest request first.
    async fn requested_instruments(&self, requester_id: UserId) -> Result<Vec<Instrument>>;

    /// Pending requests and active loans of `user_id`, merged chronologically.
    async fn borrower_timeline(&self, user_id: UserId) -> Result<Vec<TimelineEntry>>;

    /// Pending requests on `instrument_id`, oldest first.
    async fn instrument_requests(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<RequestListEntry>>;
}

/// A unit of work against the entity store.
///
/// Mutations report the number of affected rows where the caller decides
/// success from that count. Constraint violations surface as
/// [`StoreError`](crate::StoreError) variants carrying the constraint name
/// from [`constraints`](crate::constraints).
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_user(&mut self, user: NewUser) -> Result<User>;

    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>>;

    async fn update_profile(&mut self, user_id: UserId, changes: &ProfileChanges) -> Result<u64>;

    async fn insert_instrument_type(&mut self, name: &str) -> Result<InstrumentType>;

    /// Loads an instrument, locking its row until the transaction ends.
    async fn find_instrument(&mut self, instrument_id: InstrumentId)
    -> Result<Option<Instrument>>;

    async fn insert_instrument(&mut self, instrument: NewInstrument) -> Result<Instrument>;

    async fn update_instrument(
        &mut self,
        instrument_id: InstrumentId,
        changes: &InstrumentChanges,
    ) -> Result<u64>;

    /// Deletes an instrument together with its requests, loans and reviews.
    async fn delete_instrument(&mut self, instrument_id: InstrumentId) -> Result<u64>;

    async fn find_loan_request(&mut self, request_id: RequestId) -> Result<Option<LoanRequest>>;

    async fn loan_request_exists(
        &mut self,
        instrument_id: InstrumentId,
        requester_id: UserId,
    ) -> Result<bool>;

    async fn insert_loan_request(&mut self, request: NewLoanRequest) -> Result<LoanRequest>;

    async fn delete_loan_request(&mut self, request_id: RequestId) -> Result<u64>;

    async fn delete_loan_requests_by_requester(
        &mut self,
        instrument_id: InstrumentId,
        requester_id: UserId,
    ) -> Result<u64>;

    async fn delete_loan_requests_for_instrument(
        &mut self,
        instrument_id: InstrumentId,
    ) -> Result<u64>;

    async fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan>;

    async fn delete_loans_for_instrument(&mut self, instrument_id: InstrumentId) -> Result<u64>;

    async fn review_exists(&mut self, instrument_id: InstrumentId, user_id: UserId)
    -> Result<bool>;

    async fn insert_review(&mut self, review: NewReview) -> Result<Review>;

    async fn delete_review(&mut self, review_id: ReviewId) -> Result<u64>;

    /// Makes every write of this transaction durable.
    async fn commit(self: Box<Self>) -> Result<()>;
}
