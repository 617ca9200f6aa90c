//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p entity-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use entity_store::{
    AvailabilityStatus, EntityStore, InstrumentChanges, InstrumentId, NewInstrument, NewLoan,
    NewLoanRequest, NewReview, NewUser, PostgresEntityStore, StoreError, TimelineSource, UserId,
    constraints,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_lending_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresEntityStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE reviews, loans, loanrequests, instruments, instrument_type, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresEntityStore::new(pool)
}

struct Fixture {
    owner: UserId,
    borrower: UserId,
    instrument: InstrumentId,
}

async fn seed(store: &PostgresEntityStore) -> Fixture {
    let mut tx = store.begin().await.unwrap();
    let owner = tx
        .insert_user(NewUser::new("owner", "hash").with_contact(
            "owner@example.com",
            "Olivia Owner",
            "555-0100",
        ))
        .await
        .unwrap();
    let borrower = tx
        .insert_user(NewUser::new("borrower", "hash"))
        .await
        .unwrap();
    let guitar = tx.insert_instrument_type("Guitar").await.unwrap();
    let instrument = tx
        .insert_instrument(NewInstrument {
            owner_id: owner.user_id,
            instrument_name: "Telecaster".to_string(),
            description: "Butterscotch blonde".to_string(),
            location: "Bandung".to_string(),
            instrument_type_id: guitar.id,
            image: Some("tele.jpg".to_string()),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    Fixture {
        owner: owner.user_id,
        borrower: borrower.user_id,
        instrument: instrument.instrument_id,
    }
}

fn request(fixture: &Fixture, message: &str) -> NewLoanRequest {
    NewLoanRequest {
        instrument_id: fixture.instrument,
        requester_id: fixture.borrower,
        request_date: Utc::now(),
        message: message.to_string(),
    }
}

#[tokio::test]
#[serial]
async fn new_instruments_start_available() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let instrument = store
        .find_instrument(fixture.instrument)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(instrument.availability_status, AvailabilityStatus::Available);
    assert_eq!(instrument.owner_id, fixture.owner);
}

#[tokio::test]
#[serial]
async fn duplicate_request_is_reported_by_unique_constraint() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_loan_request(request(&fixture, "first"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert_loan_request(request(&fixture, "second"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation_of(constraints::UNIQUE_INSTRUMENT_REQUESTER));
}

#[tokio::test]
#[serial]
async fn uncommitted_transaction_rolls_back() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_loan_request(request(&fixture, "dropped"))
            .await
            .unwrap();
    }

    let requested = store
        .requested_instruments(fixture.borrower)
        .await
        .unwrap();
    assert!(requested.is_empty());
}

#[tokio::test]
#[serial]
async fn second_open_loan_is_rejected() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let mut tx = store.begin().await.unwrap();
    let loan = NewLoan {
        instrument_id: fixture.instrument,
        borrower_id: fixture.borrower,
        loan_date: Utc::now(),
    };
    tx.insert_loan(loan.clone()).await.unwrap();
    let err = tx.insert_loan(loan).await.unwrap_err();
    assert!(err.is_unique_violation_of(constraints::UNIQUE_OPEN_LOAN));
}

#[tokio::test]
#[serial]
async fn loan_for_missing_instrument_violates_foreign_key() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert_loan(NewLoan {
            instrument_id: InstrumentId::new(9_999),
            borrower_id: fixture.borrower,
            loan_date: Utc::now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
}

#[tokio::test]
#[serial]
async fn out_of_range_rating_violates_check() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let mut tx = store.begin().await.unwrap();
    let err = tx
        .insert_review(NewReview {
            instrument_id: fixture.instrument,
            user_id: fixture.borrower,
            rating: 6,
            comment: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::CheckViolation { .. }));
}

#[tokio::test]
#[serial]
async fn catalog_averages_ratings_and_defaults_to_zero() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let catalog = store.catalog_by_owner(fixture.owner).await.unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].average_rating, 0.0);
    assert_eq!(catalog[0].owner_username, "owner");
    assert_eq!(catalog[0].instrument_type, "Guitar");

    let mut tx = store.begin().await.unwrap();
    let critic = tx.insert_user(NewUser::new("critic", "hash")).await.unwrap();
    for (user_id, rating) in [(fixture.borrower, 4), (critic.user_id, 5)] {
        tx.insert_review(NewReview {
            instrument_id: fixture.instrument,
            user_id,
            rating,
            comment: None,
        })
        .await
        .unwrap();
    }
    tx.commit().await.unwrap();

    let catalog = store.catalog_by_owner(fixture.owner).await.unwrap();
    assert_eq!(catalog.len(), 1, "reviews must not duplicate catalog rows");
    assert_eq!(catalog[0].average_rating, 4.5);
}

#[tokio::test]
#[serial]
async fn discovery_feed_excludes_owned_requested_and_on_loan() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    assert!(store.discovery_feed(fixture.owner).await.unwrap().is_empty());
    assert_eq!(store.discovery_feed(fixture.borrower).await.unwrap().len(), 1);

    let mut tx = store.begin().await.unwrap();
    tx.insert_loan_request(request(&fixture, "mine"))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(store
        .discovery_feed(fixture.borrower)
        .await
        .unwrap()
        .is_empty());

    let mut tx = store.begin().await.unwrap();
    let other = tx.insert_user(NewUser::new("other", "hash")).await.unwrap();
    let changes = InstrumentChanges {
        availability_status: Some(AvailabilityStatus::OnLoan),
        ..InstrumentChanges::default()
    };
    tx.update_instrument(fixture.instrument, &changes)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(store
        .discovery_feed(other.user_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[serial]
async fn timeline_merges_requests_and_loans_chronologically() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;
    let earlier = Utc::now() - Duration::hours(2);

    let mut tx = store.begin().await.unwrap();
    let drum = tx.insert_instrument_type("Drum").await.unwrap();
    let snare = tx
        .insert_instrument(NewInstrument {
            owner_id: fixture.owner,
            instrument_name: "Snare".to_string(),
            description: "Maple shell".to_string(),
            location: "Jakarta".to_string(),
            instrument_type_id: drum.id,
            image: None,
        })
        .await
        .unwrap();
    tx.insert_loan(NewLoan {
        instrument_id: snare.instrument_id,
        borrower_id: fixture.borrower,
        loan_date: earlier,
    })
    .await
    .unwrap();
    tx.insert_loan_request(request(&fixture, "later"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let timeline = store.borrower_timeline(fixture.borrower).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].source, TimelineSource::Loan);
    assert_eq!(timeline[0].instrument_id, snare.instrument_id);
    assert_eq!(timeline[1].source, TimelineSource::Request);
    assert_eq!(timeline[1].message.as_deref(), Some("later"));
    assert_eq!(timeline[1].owner_email.as_deref(), Some("owner@example.com"));
}

#[tokio::test]
#[serial]
async fn instrument_requests_carry_requester_contact() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_loan_request(request(&fixture, "weekend gig"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let requests = store
        .instrument_requests(fixture.instrument)
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].requester_username, "borrower");
    assert_eq!(requests[0].message, "weekend gig");
}

#[tokio::test]
#[serial]
async fn deleting_instrument_cascades() {
    let store = get_test_store().await;
    let fixture = seed(&store).await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_loan_request(request(&fixture, "cascade"))
        .await
        .unwrap();
    assert_eq!(tx.delete_instrument(fixture.instrument).await.unwrap(), 1);
    assert!(!tx
        .loan_request_exists(fixture.instrument, fixture.borrower)
        .await
        .unwrap());
    tx.commit().await.unwrap();

    assert!(store
        .find_instrument(fixture.instrument)
        .await
        .unwrap()
        .is_none());
}
