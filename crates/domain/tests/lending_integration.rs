//! Integration tests for the loan lifecycle.
//!
//! These tests drive the lifecycle manager against the in-memory store and
//! check both the mutation outcomes and what the read side sees afterwards.

use domain::{LendingError, LoanLifecycleManager};
use entity_store::{
    EntityStore, InMemoryEntityStore, InstrumentId, NewInstrument, NewUser, TimelineSource, UserId,
};

struct World {
    manager: LoanLifecycleManager<InMemoryEntityStore>,
    store: InMemoryEntityStore,
    owner: UserId,
    alice: UserId,
    bob: UserId,
    guitar: InstrumentId,
    bass: InstrumentId,
}

/// Helper to create an owner with two instruments and two borrowers.
async fn world() -> World {
    let store = InMemoryEntityStore::new();
    let mut tx = store.begin().await.unwrap();
    let owner = tx
        .insert_user(NewUser::new("owner", "hash").with_contact(
            "owner@example.com",
            "Budi Santoso",
            "555-0100",
        ))
        .await
        .unwrap();
    let alice = tx.insert_user(NewUser::new("alice", "hash")).await.unwrap();
    let bob = tx.insert_user(NewUser::new("bob", "hash")).await.unwrap();
    let kind = tx.insert_instrument_type("Guitar").await.unwrap();

    let mut ids = Vec::new();
    for name in ["Les Paul", "Jazz Bass"] {
        let instrument = tx
            .insert_instrument(NewInstrument {
                owner_id: owner.user_id,
                instrument_name: name.to_string(),
                description: "Well kept".to_string(),
                location: "Jakarta".to_string(),
                instrument_type_id: kind.id,
                image: None,
            })
            .await
            .unwrap();
        ids.push(instrument.instrument_id);
    }
    tx.commit().await.unwrap();

    World {
        manager: LoanLifecycleManager::new(store.clone()),
        store,
        owner: owner.user_id,
        alice: alice.user_id,
        bob: bob.user_id,
        guitar: ids[0],
        bass: ids[1],
    }
}

mod requests {
    use super::*;

    #[tokio::test]
    async fn owner_cannot_request_own_instrument() {
        let w = world().await;
        let err = w
            .manager
            .submit_request(w.guitar, w.owner, "mine")
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::Forbidden(_)));
        assert_eq!(w.store.loan_request_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_request_conflicts_until_cancelled() {
        let w = world().await;
        let first = w
            .manager
            .submit_request(w.guitar, w.alice, "for a gig")
            .await
            .unwrap();

        let err = w
            .manager
            .submit_request(w.guitar, w.alice, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::Conflict(_)));
        assert_eq!(err.to_string(), "You have already requested this instrument.");

        w.manager
            .cancel_request(w.alice, first.request_id)
            .await
            .unwrap();
        w.manager
            .submit_request(w.guitar, w.alice, "once more")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn several_borrowers_may_request_the_same_instrument() {
        let w = world().await;
        w.manager
            .submit_request(w.guitar, w.alice, "alice")
            .await
            .unwrap();
        w.manager
            .submit_request(w.guitar, w.bob, "bob")
            .await
            .unwrap();

        let requests = w.store.instrument_requests(w.guitar).await.unwrap();
        let usernames: Vec<_> = requests
            .iter()
            .map(|r| r.requester_username.as_str())
            .collect();
        assert_eq!(usernames, ["alice", "bob"]);
    }

    #[tokio::test]
    async fn cancel_by_instrument_removes_only_callers_request() {
        let w = world().await;
        w.manager
            .submit_request(w.guitar, w.alice, "alice")
            .await
            .unwrap();
        w.manager
            .submit_request(w.guitar, w.bob, "bob")
            .await
            .unwrap();

        w.manager
            .cancel_request_by_instrument(w.alice, w.guitar)
            .await
            .unwrap();

        let requests = w.store.instrument_requests(w.guitar).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].requester_id, w.bob);
    }

    #[tokio::test]
    async fn concurrent_duplicates_yield_one_request() {
        let w = world().await;
        let (a, b) = tokio::join!(
            w.manager.submit_request(w.guitar, w.alice, "first"),
            w.manager.submit_request(w.guitar, w.alice, "second"),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(LendingError::Conflict(_)))));
        assert_eq!(w.store.loan_request_count().await, 1);
    }

    #[tokio::test]
    async fn bulk_delete_without_requests_reports_zero_rows() {
        let w = world().await;
        let deleted = w
            .manager
            .delete_all_requests_for_instrument(w.guitar)
            .await
            .unwrap();
        assert_eq!(deleted, 0);

        w.manager
            .submit_request(w.guitar, w.alice, "alice")
            .await
            .unwrap();
        w.manager
            .submit_request(w.guitar, w.bob, "bob")
            .await
            .unwrap();
        w.manager
            .submit_request(w.bass, w.bob, "bass")
            .await
            .unwrap();

        let deleted = w
            .manager
            .delete_all_requests_for_instrument(w.guitar)
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(w.store.loan_request_count().await, 1);
    }
}

mod loans {
    use super::*;

    #[tokio::test]
    async fn direct_loan_leaves_request_untouched() {
        let w = world().await;
        let request = w
            .manager
            .submit_request(w.guitar, w.alice, "weekend")
            .await
            .unwrap();

        w.manager.create_loan(w.guitar, w.alice).await.unwrap();
        assert_eq!(w.store.loan_request_count().await, 1);
        assert_eq!(w.store.loan_count().await, 1);

        w.manager
            .cancel_request(w.alice, request.request_id)
            .await
            .unwrap();
        assert_eq!(w.store.loan_request_count().await, 0);
        assert_eq!(w.store.loan_count().await, 1);
    }

    #[tokio::test]
    async fn promotion_opens_loan_and_clears_every_request() {
        let w = world().await;
        let alice_request = w
            .manager
            .submit_request(w.guitar, w.alice, "alice")
            .await
            .unwrap();
        w.manager
            .submit_request(w.guitar, w.bob, "bob")
            .await
            .unwrap();
        w.manager
            .submit_request(w.bass, w.bob, "bass")
            .await
            .unwrap();

        let promotion = w
            .manager
            .promote_request(alice_request.request_id)
            .await
            .unwrap();

        assert_eq!(promotion.loan.borrower_id, w.alice);
        assert_eq!(promotion.loan.instrument_id, w.guitar);
        assert_eq!(promotion.cleared_requests, 2);
        assert!(w.store.instrument_requests(w.guitar).await.unwrap().is_empty());
        assert_eq!(w.store.instrument_requests(w.bass).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_never_writes_status() {
        let w = world().await;
        let request = w
            .manager
            .submit_request(w.guitar, w.alice, "alice")
            .await
            .unwrap();
        w.manager.promote_request(request.request_id).await.unwrap();

        let guitar = w.store.find_instrument(w.guitar).await.unwrap().unwrap();
        assert_eq!(
            guitar.availability_status,
            entity_store::AvailabilityStatus::Available
        );
    }

    #[tokio::test]
    async fn closing_a_loan_allows_a_new_one() {
        let w = world().await;
        w.manager.create_loan(w.guitar, w.alice).await.unwrap();
        w.manager.close_loan(w.guitar).await.unwrap();
        w.manager.create_loan(w.guitar, w.bob).await.unwrap();

        let err = w.manager.close_loan(w.bass).await.unwrap_err();
        assert!(matches!(err, LendingError::PersistenceFailure(_)));
    }
}

mod read_side {
    use super::*;

    #[tokio::test]
    async fn discovery_feed_hides_own_and_requested_instruments() {
        let w = world().await;
        assert!(w.store.discovery_feed(w.owner).await.unwrap().is_empty());

        w.manager
            .submit_request(w.guitar, w.alice, "alice")
            .await
            .unwrap();

        let feed = w.store.discovery_feed(w.alice).await.unwrap();
        let ids: Vec<_> = feed.iter().map(|e| e.instrument_id).collect();
        assert_eq!(ids, [w.bass]);

        // Bob has no request, so both remain visible to him.
        assert_eq!(w.store.discovery_feed(w.bob).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn timeline_tracks_requests_and_loans() {
        let w = world().await;
        w.manager.create_loan(w.bass, w.alice).await.unwrap();
        let request = w
            .manager
            .submit_request(w.guitar, w.alice, "alice")
            .await
            .unwrap();

        let timeline = w.store.borrower_timeline(w.alice).await.unwrap();
        let sources: Vec<_> = timeline.iter().map(|e| e.source).collect();
        assert_eq!(sources, [TimelineSource::Loan, TimelineSource::Request]);
        assert!(timeline[0].event_date <= timeline[1].event_date);
        assert_eq!(timeline[1].owner_email.as_deref(), Some("owner@example.com"));

        w.manager
            .cancel_request(w.alice, request.request_id)
            .await
            .unwrap();
        let timeline = w.store.borrower_timeline(w.alice).await.unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].source, TimelineSource::Loan);
    }
}
