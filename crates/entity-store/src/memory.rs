use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::constraints;
use crate::records::{
    Instrument, InstrumentChanges, InstrumentType, Loan, LoanRequest, NewInstrument, NewLoan,
    NewLoanRequest, NewReview, NewUser, ProfileChanges, Review, User,
};
use crate::store::{EntityStore, StoreTransaction};
use crate::views::{CatalogEntry, RequestListEntry, TimelineEntry, TimelineSource};
use crate::{
    InstrumentId, InstrumentTypeId, LoanId, RequestId, Result, ReviewId, StoreError, UserId,
};

#[derive(Debug, Clone, Default)]
struct Sequences {
    users: i64,
    instrument_types: i64,
    instruments: i64,
    loan_requests: i64,
    loans: i64,
    reviews: i64,
}

fn next(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    instrument_types: BTreeMap<InstrumentTypeId, InstrumentType>,
    instruments: BTreeMap<InstrumentId, Instrument>,
    loan_requests: BTreeMap<RequestId, LoanRequest>,
    loans: BTreeMap<LoanId, Loan>,
    reviews: BTreeMap<ReviewId, Review>,
    sequences: Sequences,
}

impl Tables {
    fn catalog_entry(&self, instrument: &Instrument) -> Option<CatalogEntry> {
        let owner = self.users.get(&instrument.owner_id)?;
        let instrument_type = self.instrument_types.get(&instrument.instrument_type_id)?;

        let ratings: Vec<f64> = self
            .reviews
            .values()
            .filter(|r| r.instrument_id == instrument.instrument_id)
            .map(|r| f64::from(r.rating))
            .collect();
        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };

        Some(CatalogEntry {
            instrument_id: instrument.instrument_id,
            owner_id: instrument.owner_id,
            owner_username: owner.username.clone(),
            instrument_name: instrument.instrument_name.clone(),
            description: instrument.description.clone(),
            location: instrument.location.clone(),
            availability_status: instrument.availability_status,
            image: instrument.image.clone(),
            instrument_type_id: instrument.instrument_type_id,
            instrument_type: instrument_type.name.clone(),
            average_rating,
        })
    }

    fn timeline_entry(
        &self,
        instrument_id: InstrumentId,
        source: TimelineSource,
        event_date: DateTime<Utc>,
    ) -> Option<TimelineEntry> {
        let instrument = self.instruments.get(&instrument_id)?;
        let owner = self.users.get(&instrument.owner_id)?;

        Some(TimelineEntry {
            source,
            event_date,
            request_id: None,
            loan_id: None,
            message: None,
            instrument_id,
            instrument_name: instrument.instrument_name.clone(),
            description: instrument.description.clone(),
            location: instrument.location.clone(),
            availability_status: instrument.availability_status,
            image: instrument.image.clone(),
            instrument_type_id: instrument.instrument_type_id,
            owner_id: owner.user_id,
            owner_username: owner.username.clone(),
            owner_full_name: owner.full_name.clone(),
            owner_email: owner.email.clone(),
            owner_phone: owner.phone.clone(),
        })
    }

    fn requests_oldest_first(&self) -> Vec<&LoanRequest> {
        let mut requests: Vec<_> = self.loan_requests.values().collect();
        requests.sort_by(|a, b| {
            a.request_date
                .cmp(&b.request_date)
                .then(a.request_id.cmp(&b.request_id))
        });
        requests
    }
}

/// In-memory entity store implementation for testing.
///
/// Mirrors the PostgreSQL schema: the same unique, foreign-key and check
/// constraints are enforced and reported under the same names, and deleting
/// an instrument cascades to its requests, loans and reviews.
///
/// A transaction holds the write lock for its whole lifetime and works on a
/// copy of the tables, which replaces the shared tables only on commit.
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryEntityStore {
    /// Creates a new empty in-memory entity store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored loan requests.
    pub async fn loan_request_count(&self) -> usize {
        self.tables.read().await.loan_requests.len()
    }

    /// Returns the number of stored loans.
    pub async fn loan_count(&self) -> usize {
        self.tables.read().await.loans.len()
    }

    /// Clears all tables and resets the id sequences.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().write_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_instrument(&self, instrument_id: InstrumentId) -> Result<Option<Instrument>> {
        Ok(self
            .tables
            .read()
            .await
            .instruments
            .get(&instrument_id)
            .cloned())
    }

    async fn catalog_by_owner(&self, owner_id: UserId) -> Result<Vec<CatalogEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .instruments
            .values()
            .filter(|i| i.owner_id == owner_id)
            .filter_map(|i| tables.catalog_entry(i))
            .collect())
    }

    async fn discovery_feed(&self, viewer_id: UserId) -> Result<Vec<CatalogEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .instruments
            .values()
            .filter(|i| i.availability_status.is_discoverable())
            .filter(|i| i.owner_id != viewer_id)
            .filter(|i| {
                !tables
                    .loan_requests
                    .values()
                    .any(|r| r.instrument_id == i.instrument_id && r.requester_id == viewer_id)
            })
            .filter_map(|i| tables.catalog_entry(i))
            .collect())
    }

    async fn requested_instruments(&self, requester_id: UserId) -> Result<Vec<Instrument>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests_oldest_first()
            .into_iter()
            .filter(|r| r.requester_id == requester_id)
            .filter_map(|r| tables.instruments.get(&r.instrument_id).cloned())
            .collect())
    }

    async fn borrower_timeline(&self, user_id: UserId) -> Result<Vec<TimelineEntry>> {
        let tables = self.tables.read().await;

        let requests = tables
            .loan_requests
            .values()
            .filter(|r| r.requester_id == user_id)
            .filter_map(|r| {
                let mut entry = tables.timeline_entry(
                    r.instrument_id,
                    TimelineSource::Request,
                    r.request_date,
                )?;
                entry.request_id = Some(r.request_id);
                entry.message = Some(r.message.clone());
                Some(entry)
            });

        let loans = tables
            .loans
            .values()
            .filter(|l| l.borrower_id == user_id)
            .filter_map(|l| {
                let mut entry =
                    tables.timeline_entry(l.instrument_id, TimelineSource::Loan, l.loan_date)?;
                entry.loan_id = Some(l.loan_id);
                Some(entry)
            });

        let mut timeline: Vec<_> = requests.chain(loans).collect();
        timeline.sort_by(|a, b| {
            a.event_date
                .cmp(&b.event_date)
                .then(a.source.cmp(&b.source))
        });
        Ok(timeline)
    }

    async fn instrument_requests(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<Vec<RequestListEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests_oldest_first()
            .into_iter()
            .filter(|r| r.instrument_id == instrument_id)
            .filter_map(|r| {
                let requester = tables.users.get(&r.requester_id)?;
                Some(RequestListEntry {
                    request_id: r.request_id,
                    instrument_id: r.instrument_id,
                    requester_id: r.requester_id,
                    requester_username: requester.username.clone(),
                    requester_full_name: requester.full_name.clone(),
                    requester_email: requester.email.clone(),
                    requester_phone: requester.phone.clone(),
                    request_date: r.request_date,
                    message: r.message.clone(),
                })
            })
            .collect())
    }
}

/// An in-memory transaction over a private copy of the tables.
pub struct InMemoryTransaction {
    guard: OwnedRwLockWriteGuard<Tables>,
    working: Tables,
}

impl InMemoryTransaction {
    fn require_user(&self, user_id: UserId, constraint: &str) -> Result<()> {
        if self.working.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::foreign_key(constraint))
        }
    }

    fn require_instrument(&self, instrument_id: InstrumentId, constraint: &str) -> Result<()> {
        if self.working.instruments.contains_key(&instrument_id) {
            Ok(())
        } else {
            Err(StoreError::foreign_key(constraint))
        }
    }

    fn require_instrument_type(&self, type_id: InstrumentTypeId) -> Result<()> {
        if self.working.instrument_types.contains_key(&type_id) {
            Ok(())
        } else {
            Err(StoreError::foreign_key(constraints::INSTRUMENTS_TYPE_FKEY))
        }
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        if self
            .working
            .users
            .values()
            .any(|u| u.username == user.username)
        {
            return Err(StoreError::unique(constraints::UNIQUE_USERNAME));
        }

        let user = User {
            user_id: UserId::new(next(&mut self.working.sequences.users)),
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            profile_picture: None,
        };
        self.working.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    async fn update_profile(&mut self, user_id: UserId, changes: &ProfileChanges) -> Result<u64> {
        if changes.is_empty() {
            return Ok(0);
        }
        let Some(user) = self.working.users.get_mut(&user_id) else {
            return Ok(0);
        };

        if let Some(email) = &changes.email {
            user.email = Some(email.clone());
        }
        if let Some(full_name) = &changes.full_name {
            user.full_name = Some(full_name.clone());
        }
        if let Some(phone) = &changes.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(picture) = &changes.profile_picture {
            user.profile_picture = Some(picture.clone());
        }
        Ok(1)
    }

    async fn insert_instrument_type(&mut self, name: &str) -> Result<InstrumentType> {
        let row = InstrumentType {
            id: InstrumentTypeId::new(next(&mut self.working.sequences.instrument_types)),
            name: name.to_string(),
        };
        self.working.instrument_types.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_instrument(
        &mut self,
        instrument_id: InstrumentId,
    ) -> Result<Option<Instrument>> {
        Ok(self.working.instruments.get(&instrument_id).cloned())
    }

    async fn insert_instrument(&mut self, instrument: NewInstrument) -> Result<Instrument> {
        self.require_user(instrument.owner_id, constraints::INSTRUMENTS_OWNER_FKEY)?;
        self.require_instrument_type(instrument.instrument_type_id)?;

        let row = Instrument {
            instrument_id: InstrumentId::new(next(&mut self.working.sequences.instruments)),
            owner_id: instrument.owner_id,
            instrument_name: instrument.instrument_name,
            description: instrument.description,
            location: instrument.location,
            instrument_type_id: instrument.instrument_type_id,
            image: instrument.image,
            availability_status: Default::default(),
        };
        self.working
            .instruments
            .insert(row.instrument_id, row.clone());
        Ok(row)
    }

    async fn update_instrument(
        &mut self,
        instrument_id: InstrumentId,
        changes: &InstrumentChanges,
    ) -> Result<u64> {
        if changes.is_empty() {
            return Ok(0);
        }
        if let Some(type_id) = changes.instrument_type_id {
            self.require_instrument_type(type_id)?;
        }
        let Some(instrument) = self.working.instruments.get_mut(&instrument_id) else {
            return Ok(0);
        };

        if let Some(name) = &changes.instrument_name {
            instrument.instrument_name = name.clone();
        }
        if let Some(description) = &changes.description {
            instrument.description = description.clone();
        }
        if let Some(location) = &changes.location {
            instrument.location = location.clone();
        }
        if let Some(type_id) = changes.instrument_type_id {
            instrument.instrument_type_id = type_id;
        }
        if let Some(image) = &changes.image {
            instrument.image = Some(image.clone());
        }
        if let Some(status) = changes.availability_status {
            instrument.availability_status = status;
        }
        Ok(1)
    }

    async fn delete_instrument(&mut self, instrument_id: InstrumentId) -> Result<u64> {
        if self.working.instruments.remove(&instrument_id).is_none() {
            return Ok(0);
        }

        self.working
            .loan_requests
            .retain(|_, r| r.instrument_id != instrument_id);
        self.working
            .loans
            .retain(|_, l| l.instrument_id != instrument_id);
        self.working
            .reviews
            .retain(|_, r| r.instrument_id != instrument_id);
        Ok(1)
    }

    async fn find_loan_request(&mut self, request_id: RequestId) -> Result<Option<LoanRequest>> {
        Ok(self.working.loan_requests.get(&request_id).cloned())
    }

    async fn loan_request_exists(
        &mut self,
        instrument_id: InstrumentId,
        requester_id: UserId,
    ) -> Result<bool> {
        Ok(self
            .working
            .loan_requests
            .values()
            .any(|r| r.instrument_id == instrument_id && r.requester_id == requester_id))
    }

    async fn insert_loan_request(&mut self, request: NewLoanRequest) -> Result<LoanRequest> {
        self.require_instrument(
            request.instrument_id,
            constraints::LOANREQUESTS_INSTRUMENT_FKEY,
        )?;
        self.require_user(
            request.requester_id,
            constraints::LOANREQUESTS_REQUESTER_FKEY,
        )?;
        if self
            .loan_request_exists(request.instrument_id, request.requester_id)
            .await?
        {
            return Err(StoreError::unique(
                constraints::UNIQUE_INSTRUMENT_REQUESTER,
            ));
        }

        let row = LoanRequest {
            request_id: RequestId::new(next(&mut self.working.sequences.loan_requests)),
            instrument_id: request.instrument_id,
            requester_id: request.requester_id,
            request_date: request.request_date,
            message: request.message,
        };
        self.working.loan_requests.insert(row.request_id, row.clone());
        Ok(row)
    }

    async fn delete_loan_request(&mut self, request_id: RequestId) -> Result<u64> {
        Ok(u64::from(
            self.working.loan_requests.remove(&request_id).is_some(),
        ))
    }

    async fn delete_loan_requests_by_requester(
        &mut self,
        instrument_id: InstrumentId,
        requester_id: UserId,
    ) -> Result<u64> {
        let before = self.working.loan_requests.len();
        self.working
            .loan_requests
            .retain(|_, r| !(r.instrument_id == instrument_id && r.requester_id == requester_id));
        Ok((before - self.working.loan_requests.len()) as u64)
    }

    async fn delete_loan_requests_for_instrument(
        &mut self,
        instrument_id: InstrumentId,
    ) -> Result<u64> {
        let before = self.working.loan_requests.len();
        self.working
            .loan_requests
            .retain(|_, r| r.instrument_id != instrument_id);
        Ok((before - self.working.loan_requests.len()) as u64)
    }

    async fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan> {
        self.require_instrument(loan.instrument_id, constraints::LOANS_INSTRUMENT_FKEY)?;
        self.require_user(loan.borrower_id, constraints::LOANS_BORROWER_FKEY)?;
        if self
            .working
            .loans
            .values()
            .any(|l| l.instrument_id == loan.instrument_id)
        {
            return Err(StoreError::unique(constraints::UNIQUE_OPEN_LOAN));
        }

        let row = Loan {
            loan_id: LoanId::new(next(&mut self.working.sequences.loans)),
            instrument_id: loan.instrument_id,
            borrower_id: loan.borrower_id,
            loan_date: loan.loan_date,
        };
        self.working.loans.insert(row.loan_id, row.clone());
        Ok(row)
    }

    async fn delete_loans_for_instrument(&mut self, instrument_id: InstrumentId) -> Result<u64> {
        let before = self.working.loans.len();
        self.working
            .loans
            .retain(|_, l| l.instrument_id != instrument_id);
        Ok((before - self.working.loans.len()) as u64)
    }

    async fn review_exists(
        &mut self,
        instrument_id: InstrumentId,
        user_id: UserId,
    ) -> Result<bool> {
        Ok(self
            .working
            .reviews
            .values()
            .any(|r| r.instrument_id == instrument_id && r.user_id == user_id))
    }

    async fn insert_review(&mut self, review: NewReview) -> Result<Review> {
        self.require_instrument(review.instrument_id, constraints::REVIEWS_INSTRUMENT_FKEY)?;
        self.require_user(review.user_id, constraints::REVIEWS_USER_FKEY)?;
        if !(0..=5).contains(&review.rating) {
            return Err(StoreError::check(constraints::VALID_RATING));
        }
        if self
            .review_exists(review.instrument_id, review.user_id)
            .await?
        {
            return Err(StoreError::unique(constraints::UNIQUE_INSTRUMENT_REVIEWER));
        }

        let row = Review {
            review_id: ReviewId::new(next(&mut self.working.sequences.reviews)),
            instrument_id: review.instrument_id,
            user_id: review.user_id,
            rating: review.rating,
            comment: review.comment,
        };
        self.working.reviews.insert(row.review_id, row.clone());
        Ok(row)
    }

    async fn delete_review(&mut self, review_id: ReviewId) -> Result<u64> {
        Ok(u64::from(self.working.reviews.remove(&review_id).is_some()))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction {
            mut guard,
            working,
        } = *self;
        *guard = working;
        Ok(())
    }
}
