//! HTTP API server with observability for the instrument lending platform.
//!
//! Provides the `/api/v1` REST surface for accounts, loans, instruments,
//! reviews and profiles, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use domain::MediaStore;
use entity_store::EntityStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, M>(state: Arc<AppState<S, M>>, metrics_handle: PrometheusHandle) -> Router
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    use routes::{auth, instruments, loans, profiles, reviews};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let loan_routes = Router::new()
        .route("/request_loan/{requester_id}", post(loans::request_loan::<S, M>))
        .route(
            "/cancel_loan_request/{requester_id}/{request_id}",
            delete(loans::cancel_loan_request::<S, M>),
        )
        .route(
            "/cancel_loan_request_by_instrument/{requester_id}/{instrument_id}",
            delete(loans::cancel_loan_request_by_instrument::<S, M>),
        )
        .route(
            "/delete_loan_requests/{instrument_id}",
            delete(loans::delete_loan_requests::<S, M>),
        )
        .route("/add_loan/{instrument_id}", post(loans::add_loan::<S, M>))
        .route(
            "/approve_request/{request_id}",
            post(loans::approve_request::<S, M>),
        )
        .route("/delete_loan/{instrument_id}", delete(loans::delete_loan::<S, M>))
        .route(
            "/loan_requests/{requester_id}",
            get(loans::loan_requests::<S, M>),
        )
        .route("/my_loans/{requester_id}", get(loans::my_loans::<S, M>))
        .route("/loan_list/{instrument_id}", get(loans::loan_list::<S, M>));

    let instrument_routes = Router::new()
        .route(
            "/add_instrument/{user_id}",
            post(instruments::add_instrument::<S, M>),
        )
        .route(
            "/update_instrument/{instrument_id}",
            post(instruments::update_instrument::<S, M>),
        )
        .route(
            "/delete_instrument/{instrument_id}",
            delete(instruments::delete_instrument::<S, M>),
        )
        .route(
            "/read_instruments_by_user/{user_id}",
            get(instruments::read_by_user::<S, M>),
        )
        .route(
            "/read_instruments_by_availability_excluding_user/{exclude_user_id}",
            get(instruments::read_available_excluding_user::<S, M>),
        );

    let review_routes = Router::new()
        .route(
            "/add_review/{user_id}/{instrument_id}",
            post(reviews::add_review::<S, M>),
        )
        .route(
            "/delete_review/{review_id}",
            delete(reviews::delete_review::<S, M>),
        );

    let profile_routes = Router::new()
        .route("/read/{user_id}", get(profiles::read::<S, M>))
        .route("/update/{user_id}", post(profiles::update::<S, M>));

    let auth_routes = Router::new()
        .route("/register", post(auth::register::<S, M>))
        .route("/login", post(auth::login::<S, M>));

    let v1 = Router::new()
        .nest("/auth", auth_routes)
        .nest("/loan", loan_routes)
        .nest("/instruments", instrument_routes)
        .nest("/reviews", review_routes)
        .nest("/profile", profile_routes);

    Router::new()
        .route("/health", get(routes::health::check::<S, M>))
        .nest("/api/v1", v1)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given entity and media stores.
pub fn create_default_state<S, M>(store: S, media: M) -> Arc<AppState<S, M>>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    Arc::new(AppState::new(store, media))
}
