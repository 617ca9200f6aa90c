//! Query projector over the entity store.

use std::future::Future;
use std::time::Instant;

use common::{InstrumentId, UserId};
use entity_store::{CatalogEntry, EntityStore, Instrument, RequestListEntry, TimelineEntry};

use crate::Result;
use crate::view::View;

/// Serves the read views.
///
/// Every view is a single read-only query; nothing is cached between calls,
/// so a view always reflects the last committed lifecycle operation. Query
/// latency is recorded per view in `projection_query_duration_seconds`.
pub struct QueryProjector<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> QueryProjector<S> {
    /// Creates a new projector reading from the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Instruments owned by `owner_id`, each with its mean rating (0 when
    /// unreviewed).
    #[tracing::instrument(skip(self))]
    pub async fn catalog_by_owner(&self, owner_id: UserId) -> Result<Vec<CatalogEntry>> {
        self.run(View::CatalogByOwner, self.store.catalog_by_owner(owner_id))
            .await
    }

    /// Instruments `viewer_id` could still request.
    ///
    /// Filters on the owner-set status (available or requested) and never
    /// includes the viewer's own instruments or ones the viewer has already
    /// requested.
    #[tracing::instrument(skip(self))]
    pub async fn discovery_feed(&self, viewer_id: UserId) -> Result<Vec<CatalogEntry>> {
        self.run(View::DiscoveryFeed, self.store.discovery_feed(viewer_id))
            .await
    }

    /// Pending requests and active loans of `user_id`, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn my_loans(&self, user_id: UserId) -> Result<Vec<TimelineEntry>> {
        self.run(View::MyLoans, self.store.borrower_timeline(user_id))
            .await
    }

    /// Instruments `requester_id` has pending requests for.
    #[tracing::instrument(skip(self))]
    pub async fn requested_instruments(&self, requester_id: UserId) -> Result<Vec<Instrument>> {
        self.run(
            View::RequestedInstruments,
            self.store.requested_instruments(requester_id),
        )
        .await
    }

    /// Pending requests on an instrument with requester contact details.
    #[tracing::instrument(skip(self))]
    pub async fn loan_list(&self, instrument_id: InstrumentId) -> Result<Vec<RequestListEntry>> {
        self.run(View::LoanList, self.store.instrument_requests(instrument_id))
            .await
    }

    async fn run<T, F>(&self, view: View, query: F) -> Result<Vec<T>>
    where
        F: Future<Output = entity_store::Result<Vec<T>>>,
    {
        let start = Instant::now();
        let rows = query.await;
        metrics::histogram!("projection_query_duration_seconds", "view" => view.name())
            .record(start.elapsed().as_secs_f64());

        let rows = rows?;
        tracing::debug!(%view, rows = rows.len(), "view served");
        Ok(rows)
    }
}
