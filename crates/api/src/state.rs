//! Shared application state.

use domain::{
    AccountService, InstrumentService, LoanLifecycleManager, MediaStore, ProfileService,
    ReviewService,
};
use entity_store::EntityStore;
use projections::QueryProjector;

/// Services shared by every handler. Each one holds its own clone of the
/// store handle; no other state lives between requests.
pub struct AppState<S: EntityStore, M: MediaStore> {
    /// Raw store handle, used only by the health check.
    pub store: S,
    pub lifecycle: LoanLifecycleManager<S>,
    pub instruments: InstrumentService<S, M>,
    pub reviews: ReviewService<S>,
    pub profiles: ProfileService<S, M>,
    pub accounts: AccountService<S>,
    pub projector: QueryProjector<S>,
}

impl<S, M> AppState<S, M>
where
    S: EntityStore + Clone,
    M: MediaStore + Clone,
{
    pub fn new(store: S, media: M) -> Self {
        Self {
            lifecycle: LoanLifecycleManager::new(store.clone()),
            instruments: InstrumentService::new(store.clone(), media.clone()),
            reviews: ReviewService::new(store.clone()),
            profiles: ProfileService::new(store.clone(), media),
            accounts: AccountService::new(store.clone()),
            projector: QueryProjector::new(store.clone()),
            store,
        }
    }
}
