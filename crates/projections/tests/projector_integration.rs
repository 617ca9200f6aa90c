//! Integration tests: lifecycle operations → QueryProjector views.

use common::{AvailabilityStatus, InstrumentId, UserId};
use domain::{InMemoryMediaStore, InstrumentService, InstrumentUpdate, LoanLifecycleManager};
use entity_store::{EntityStore, InMemoryEntityStore, NewInstrument, NewUser, TimelineSource};
use projections::QueryProjector;

struct Setup {
    lifecycle: LoanLifecycleManager<InMemoryEntityStore>,
    instruments: InstrumentService<InMemoryEntityStore, InMemoryMediaStore>,
    projector: QueryProjector<InMemoryEntityStore>,
    owner: UserId,
    borrower: UserId,
    drums: InstrumentId,
    piano: InstrumentId,
}

/// Helper to set up the services and projector over one shared store.
async fn setup() -> Setup {
    let store = InMemoryEntityStore::new();
    let mut tx = store.begin().await.unwrap();
    let owner = tx
        .insert_user(NewUser::new("owner", "hash").with_contact(
            "owner@example.com",
            "Sari Wulandari",
            "555-0110",
        ))
        .await
        .unwrap();
    let borrower = tx
        .insert_user(NewUser::new("borrower", "hash").with_contact(
            "borrower@example.com",
            "Agus Pratama",
            "555-0111",
        ))
        .await
        .unwrap();
    let kind = tx.insert_instrument_type("Percussion").await.unwrap();

    let mut ids = Vec::new();
    for name in ["Drum kit", "Digital piano"] {
        let instrument = tx
            .insert_instrument(NewInstrument {
                owner_id: owner.user_id,
                instrument_name: name.to_string(),
                description: "Rehearsal ready".to_string(),
                location: "Semarang".to_string(),
                instrument_type_id: kind.id,
                image: None,
            })
            .await
            .unwrap();
        ids.push(instrument.instrument_id);
    }
    tx.commit().await.unwrap();

    Setup {
        lifecycle: LoanLifecycleManager::new(store.clone()),
        instruments: InstrumentService::new(store.clone(), InMemoryMediaStore::new()),
        projector: QueryProjector::new(store),
        owner: owner.user_id,
        borrower: borrower.user_id,
        drums: ids[0],
        piano: ids[1],
    }
}

#[tokio::test]
async fn catalog_lists_owned_instruments_with_zero_rating() {
    let s = setup().await;
    let catalog = s.projector.catalog_by_owner(s.owner).await.unwrap();

    let names: Vec<_> = catalog.iter().map(|e| e.instrument_name.as_str()).collect();
    assert_eq!(names, ["Drum kit", "Digital piano"]);
    assert!(catalog.iter().all(|e| e.average_rating == 0.0));
    assert!(catalog.iter().all(|e| e.owner_username == "owner"));
    assert!(s
        .projector
        .catalog_by_owner(s.borrower)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn discovery_feed_follows_requests_and_status() {
    let s = setup().await;
    assert_eq!(s.projector.discovery_feed(s.borrower).await.unwrap().len(), 2);

    s.lifecycle
        .submit_request(s.drums, s.borrower, "band practice")
        .await
        .unwrap();
    let feed = s.projector.discovery_feed(s.borrower).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].instrument_id, s.piano);

    // Status is owner-set and filtered independently of loan rows.
    s.instruments
        .update(
            s.piano,
            InstrumentUpdate {
                availability_status: Some(AvailabilityStatus::OnLoan),
                ..InstrumentUpdate::default()
            },
        )
        .await
        .unwrap();
    assert!(s
        .projector
        .discovery_feed(s.borrower)
        .await
        .unwrap()
        .is_empty());

    s.instruments
        .update(
            s.piano,
            InstrumentUpdate {
                availability_status: Some(AvailabilityStatus::Requested),
                ..InstrumentUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(s.projector.discovery_feed(s.borrower).await.unwrap().len(), 1);
}

#[tokio::test]
async fn requested_instruments_and_loan_list_track_requests() {
    let s = setup().await;
    let request = s
        .lifecycle
        .submit_request(s.piano, s.borrower, "recital")
        .await
        .unwrap();

    let requested = s.projector.requested_instruments(s.borrower).await.unwrap();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].instrument_id, s.piano);

    let list = s.projector.loan_list(s.piano).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].request_id, request.request_id);
    assert_eq!(list[0].requester_full_name.as_deref(), Some("Agus Pratama"));
    assert_eq!(list[0].message, "recital");

    s.lifecycle.promote_request(request.request_id).await.unwrap();
    assert!(s.projector.loan_list(s.piano).await.unwrap().is_empty());
    assert!(s
        .projector
        .requested_instruments(s.borrower)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn my_loans_merges_requests_and_loans() {
    let s = setup().await;
    let request = s
        .lifecycle
        .submit_request(s.drums, s.borrower, "tour")
        .await
        .unwrap();
    s.lifecycle.create_loan(s.piano, s.borrower).await.unwrap();

    let timeline = s.projector.my_loans(s.borrower).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].source, TimelineSource::Request);
    assert_eq!(timeline[0].request_id, Some(request.request_id));
    assert_eq!(timeline[0].instrument_id, s.drums);
    assert_eq!(timeline[1].source, TimelineSource::Loan);
    assert_eq!(timeline[1].instrument_id, s.piano);
    assert!(timeline[1].loan_id.is_some());
    assert!(timeline
        .iter()
        .all(|e| e.owner_phone.as_deref() == Some("555-0110")));

    s.lifecycle
        .cancel_request(s.borrower, request.request_id)
        .await
        .unwrap();
    let timeline = s.projector.my_loans(s.borrower).await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].source, TimelineSource::Loan);

    s.lifecycle.close_loan(s.piano).await.unwrap();
    assert!(s.projector.my_loans(s.borrower).await.unwrap().is_empty());
}
