//! Loan lifecycle manager.
//!
//! Orchestrates requests and loans for an instrument. Every operation opens a
//! single store transaction, asks the [gate](crate::gate) for a decision and
//! only then mutates. Nothing here writes `availability_status`.

use chrono::Utc;
use common::{InstrumentId, RequestId, UserId};
use entity_store::{
    EntityStore, Loan, LoanRequest, NewLoan, NewLoanRequest, StoreError, StoreTransaction,
    constraints,
};
use serde::Serialize;

use crate::error::LendingError;
use crate::gate;

const INSTRUMENT_NOT_FOUND: &str = "Instrument not found.";
const REQUEST_NOT_FOUND: &str = "Loan request not found.";
const USER_NOT_FOUND: &str = "User not found.";
const ALREADY_ON_LOAN: &str = "This instrument is already on loan.";

/// Result of promoting a request into a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    /// The loan that was opened.
    pub loan: Loan,
    /// Number of pending requests removed for the instrument, including the
    /// promoted one.
    pub cleared_requests: u64,
}

/// Drives loan requests and loans through their lifecycle.
pub struct LoanLifecycleManager<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> LoanLifecycleManager<S> {
    /// Creates a new manager over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers `requester_id`'s interest in an instrument.
    ///
    /// Two concurrent identical submissions may both pass the existence check;
    /// the loser is turned into `Conflict` by the store's unique key.
    #[tracing::instrument(skip(self, message))]
    pub async fn submit_request(
        &self,
        instrument_id: InstrumentId,
        requester_id: UserId,
        message: &str,
    ) -> Result<LoanRequest, LendingError> {
        if message.trim().is_empty() {
            return Err(rejected(LendingError::validation("All fields are required.")));
        }

        let mut tx = self.store.begin().await?;
        let instrument = tx
            .find_instrument(instrument_id)
            .await?
            .ok_or_else(|| rejected(LendingError::not_found(INSTRUMENT_NOT_FOUND)))?;

        let already_requested = tx.loan_request_exists(instrument_id, requester_id).await?;
        gate::check_request(&instrument, requester_id, already_requested)
            .into_result()
            .map_err(rejected)?;

        let request = tx
            .insert_loan_request(NewLoanRequest {
                instrument_id,
                requester_id,
                request_date: Utc::now(),
                message: message.to_string(),
            })
            .await
            .map_err(|e| rejected(request_insert_error(e)))?;
        tx.commit().await?;

        metrics::counter!("loan_requests_submitted").increment(1);
        tracing::info!(request_id = %request.request_id, "loan request submitted");
        Ok(request)
    }

    /// Cancels one request, provided it belongs to `requester_id`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_request(
        &self,
        requester_id: UserId,
        request_id: RequestId,
    ) -> Result<(), LendingError> {
        let mut tx = self.store.begin().await?;
        let owned = tx
            .find_loan_request(request_id)
            .await?
            .is_some_and(|request| request.requester_id == requester_id);
        gate::check_cancel(owned).into_result()?;

        let deleted = tx.delete_loan_request(request_id).await?;
        gate::check_cancel(deleted > 0).into_result()?;
        tx.commit().await?;

        metrics::counter!("loan_requests_cancelled").increment(deleted);
        tracing::info!("loan request cancelled");
        Ok(())
    }

    /// Cancels `requester_id`'s request on an instrument.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_request_by_instrument(
        &self,
        requester_id: UserId,
        instrument_id: InstrumentId,
    ) -> Result<(), LendingError> {
        let mut tx = self.store.begin().await?;
        let exists = tx.loan_request_exists(instrument_id, requester_id).await?;
        gate::check_cancel(exists).into_result()?;

        let deleted = tx
            .delete_loan_requests_by_requester(instrument_id, requester_id)
            .await?;
        gate::check_cancel(deleted > 0).into_result()?;
        tx.commit().await?;

        metrics::counter!("loan_requests_cancelled").increment(deleted);
        tracing::info!("loan request cancelled");
        Ok(())
    }

    /// Removes every pending request on an instrument.
    ///
    /// Returns the number of rows removed; zero is not an error here.
    #[tracing::instrument(skip(self))]
    pub async fn delete_all_requests_for_instrument(
        &self,
        instrument_id: InstrumentId,
    ) -> Result<u64, LendingError> {
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_loan_requests_for_instrument(instrument_id).await?;
        tx.commit().await?;

        if deleted == 0 {
            tracing::warn!("no loan requests to delete");
        } else {
            metrics::counter!("loan_requests_cancelled").increment(deleted);
            tracing::info!(deleted, "loan requests deleted");
        }
        Ok(deleted)
    }

    /// Opens a loan directly.
    ///
    /// Pending requests on the instrument, including the borrower's own, are
    /// left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn create_loan(
        &self,
        instrument_id: InstrumentId,
        borrower_id: UserId,
    ) -> Result<Loan, LendingError> {
        let mut tx = self.store.begin().await?;
        let loan = open_loan(tx.as_mut(), instrument_id, borrower_id).await?;
        tx.commit().await?;

        metrics::counter!("loans_created").increment(1);
        tracing::info!(loan_id = %loan.loan_id, "loan created");
        Ok(loan)
    }

    /// Turns a pending request into a loan for its requester and clears every
    /// request on that instrument, in one transaction.
    #[tracing::instrument(skip(self))]
    pub async fn promote_request(&self, request_id: RequestId) -> Result<Promotion, LendingError> {
        let mut tx = self.store.begin().await?;
        let request = tx
            .find_loan_request(request_id)
            .await?
            .ok_or_else(|| LendingError::not_found(REQUEST_NOT_FOUND))?;

        let loan = open_loan(tx.as_mut(), request.instrument_id, request.requester_id).await?;
        let cleared_requests = tx
            .delete_loan_requests_for_instrument(request.instrument_id)
            .await?;
        tx.commit().await?;

        metrics::counter!("loans_created").increment(1);
        tracing::info!(
            loan_id = %loan.loan_id,
            cleared_requests,
            "loan request promoted"
        );
        Ok(Promotion {
            loan,
            cleared_requests,
        })
    }

    /// Closes the open loan on an instrument.
    #[tracing::instrument(skip(self))]
    pub async fn close_loan(&self, instrument_id: InstrumentId) -> Result<(), LendingError> {
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_loans_for_instrument(instrument_id).await?;
        if deleted == 0 {
            tracing::warn!("no open loan to close");
            return Err(LendingError::persistence("Failed to delete loan."));
        }
        tx.commit().await?;

        metrics::counter!("loans_closed").increment(deleted);
        tracing::info!("loan closed");
        Ok(())
    }
}

async fn open_loan(
    tx: &mut dyn StoreTransaction,
    instrument_id: InstrumentId,
    borrower_id: UserId,
) -> Result<Loan, LendingError> {
    let instrument = tx
        .find_instrument(instrument_id)
        .await?
        .ok_or_else(|| LendingError::not_found(INSTRUMENT_NOT_FOUND))?;
    gate::check_loan(&instrument).into_result()?;

    tx.insert_loan(NewLoan {
        instrument_id,
        borrower_id,
        loan_date: Utc::now(),
    })
    .await
    .map_err(|e| {
        if e.is_unique_violation_of(constraints::UNIQUE_OPEN_LOAN) {
            LendingError::conflict(ALREADY_ON_LOAN)
        } else if e.is_foreign_key_violation() {
            LendingError::not_found(USER_NOT_FOUND)
        } else {
            e.into()
        }
    })
}

fn request_insert_error(e: StoreError) -> LendingError {
    if e.is_unique_violation_of(constraints::UNIQUE_INSTRUMENT_REQUESTER) {
        gate::DenyReason::AlreadyRequested.into()
    } else if e.is_foreign_key_violation() {
        LendingError::not_found(USER_NOT_FOUND)
    } else {
        e.into()
    }
}

fn rejected(err: LendingError) -> LendingError {
    metrics::counter!("loan_requests_rejected").increment(1);
    tracing::warn!(error = %err, "loan request rejected");
    err
}

#[cfg(test)]
mod tests {
    use common::AvailabilityStatus;
    use entity_store::{InMemoryEntityStore, InstrumentChanges, NewInstrument, NewUser};

    use super::*;

    struct Fixture {
        manager: LoanLifecycleManager<InMemoryEntityStore>,
        owner: UserId,
        borrower: UserId,
        instrument: InstrumentId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryEntityStore::new();
        let mut tx = store.begin().await.unwrap();
        let owner = tx.insert_user(NewUser::new("owner", "hash")).await.unwrap();
        let borrower = tx
            .insert_user(NewUser::new("borrower", "hash"))
            .await
            .unwrap();
        let kind = tx.insert_instrument_type("Violin").await.unwrap();
        let instrument = tx
            .insert_instrument(NewInstrument {
                owner_id: owner.user_id,
                instrument_name: "Stentor".to_string(),
                description: "Student violin".to_string(),
                location: "Yogyakarta".to_string(),
                instrument_type_id: kind.id,
                image: None,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        Fixture {
            manager: LoanLifecycleManager::new(store),
            owner: owner.user_id,
            borrower: borrower.user_id,
            instrument: instrument.instrument_id,
        }
    }

    #[tokio::test]
    async fn blank_message_is_a_validation_error() {
        let f = fixture().await;
        let err = f
            .manager
            .submit_request(f.instrument, f.borrower, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_instrument_is_not_found() {
        let f = fixture().await;
        let err = f
            .manager
            .submit_request(InstrumentId::new(404), f.borrower, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_requester_is_not_found() {
        let f = fixture().await;
        let err = f
            .manager
            .submit_request(f.instrument, UserId::new(404), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
    }

    #[tokio::test]
    async fn owner_request_is_forbidden() {
        let f = fixture().await;
        let err = f
            .manager
            .submit_request(f.instrument, f.owner, "mine")
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::Forbidden(_)));
        assert_eq!(err.to_string(), "You cannot loan your own instrument.");
    }

    #[tokio::test]
    async fn status_does_not_block_requests() {
        let f = fixture().await;
        let mut tx = f.manager.store().begin().await.unwrap();
        let changes = InstrumentChanges {
            availability_status: Some(AvailabilityStatus::OnLoan),
            ..InstrumentChanges::default()
        };
        tx.update_instrument(f.instrument, &changes).await.unwrap();
        tx.commit().await.unwrap();

        f.manager
            .submit_request(f.instrument, f.borrower, "still keen")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_by_other_user_is_not_found() {
        let f = fixture().await;
        let request = f
            .manager
            .submit_request(f.instrument, f.borrower, "please")
            .await
            .unwrap();

        let err = f
            .manager
            .cancel_request(f.owner, request.request_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
        assert_eq!(f.manager.store().loan_request_count().await, 1);
    }

    #[tokio::test]
    async fn cancel_by_instrument_without_request_is_not_found() {
        let f = fixture().await;
        let err = f
            .manager
            .cancel_request_by_instrument(f.borrower, f.instrument)
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_loan_on_instrument_is_a_conflict() {
        let f = fixture().await;
        f.manager
            .create_loan(f.instrument, f.borrower)
            .await
            .unwrap();
        let err = f
            .manager
            .create_loan(f.instrument, f.borrower)
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::Conflict(_)));
    }

    #[tokio::test]
    async fn loan_for_missing_instrument_is_not_found() {
        let f = fixture().await;
        let err = f
            .manager
            .create_loan(InstrumentId::new(404), f.borrower)
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
    }

    #[tokio::test]
    async fn promoting_missing_request_is_not_found() {
        let f = fixture().await;
        let err = f
            .manager
            .promote_request(RequestId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::NotFound(_)));
        assert_eq!(f.manager.store().loan_count().await, 0);
    }

    #[tokio::test]
    async fn failed_promotion_keeps_requests() {
        let f = fixture().await;
        let request = f
            .manager
            .submit_request(f.instrument, f.borrower, "please")
            .await
            .unwrap();
        f.manager
            .create_loan(f.instrument, f.owner)
            .await
            .unwrap();

        let err = f
            .manager
            .promote_request(request.request_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::Conflict(_)));
        assert_eq!(f.manager.store().loan_request_count().await, 1);
    }

    #[tokio::test]
    async fn closing_without_loan_is_a_persistence_failure() {
        let f = fixture().await;
        let err = f.manager.close_loan(f.instrument).await.unwrap_err();
        assert!(matches!(err, LendingError::PersistenceFailure(_)));
    }
}
