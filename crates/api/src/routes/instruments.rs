//! Instrument listing and catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use common::{AvailabilityStatus, InstrumentId, UserId};
use domain::{InstrumentUpdate, Listing, MediaStore};
use entity_store::{CatalogEntry, EntityStore};
use serde::Serialize;

use super::form::MultipartForm;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct InstrumentAddedResponse {
    pub user_id: UserId,
    pub instrument_id: InstrumentId,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct InstrumentChangedResponse {
    pub instrument_id: InstrumentId,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct CatalogResponse {
    pub user_id: UserId,
    pub instruments: Vec<CatalogEntry>,
}

#[derive(Serialize)]
pub struct DiscoveryResponse {
    pub exclude_user_id: UserId,
    pub instruments: Vec<CatalogEntry>,
}

/// POST /instruments/add_instrument/{user_id}: multipart listing with image.
#[tracing::instrument(skip(state, multipart))]
pub async fn add_instrument<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(user_id): Path<UserId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<InstrumentAddedResponse>), ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let mut form = MultipartForm::read(multipart).await?;
    let listing = Listing {
        instrument_type_id: form.id("instrument_type_id")?,
        instrument_name: form.text("instrument_name").unwrap_or_default(),
        description: form.text("description").unwrap_or_default(),
        location: form.text("location").unwrap_or_default(),
        image: form.file("image"),
    };

    let instrument = state.instruments.add(user_id, listing).await?;

    Ok((
        StatusCode::CREATED,
        Json(InstrumentAddedResponse {
            user_id,
            instrument_id: instrument.instrument_id,
            message: "Instrument added successfully.",
        }),
    ))
}

/// POST /instruments/update_instrument/{instrument_id}: partial update,
/// including the owner-set availability status.
#[tracing::instrument(skip(state, multipart))]
pub async fn update_instrument<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(instrument_id): Path<InstrumentId>,
    multipart: Multipart,
) -> Result<Json<InstrumentChangedResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let mut form = MultipartForm::read(multipart).await?;
    let update = InstrumentUpdate {
        instrument_type_id: form.id("instrument_type_id")?,
        availability_status: form.parse::<AvailabilityStatus>("availability_status")?,
        instrument_name: form.text("instrument_name"),
        description: form.text("description"),
        location: form.text("location"),
        image: form.file("image"),
    };

    state.instruments.update(instrument_id, update).await?;

    Ok(Json(InstrumentChangedResponse {
        instrument_id,
        message: "Instrument updated successfully.",
    }))
}

/// DELETE /instruments/delete_instrument/{instrument_id}
#[tracing::instrument(skip(state))]
pub async fn delete_instrument<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(instrument_id): Path<InstrumentId>,
) -> Result<Json<InstrumentChangedResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    state.instruments.delete(instrument_id).await?;

    Ok(Json(InstrumentChangedResponse {
        instrument_id,
        message: "Instrument deleted successfully.",
    }))
}

/// GET /instruments/read_instruments_by_user/{user_id}: owner catalog.
#[tracing::instrument(skip(state))]
pub async fn read_by_user<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<CatalogResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let instruments = state.projector.catalog_by_owner(user_id).await?;
    if instruments.is_empty() {
        return Err(ApiError::NotFound(
            "No instruments found for the user.".to_string(),
        ));
    }

    Ok(Json(CatalogResponse {
        user_id,
        instruments,
    }))
}

/// GET /instruments/read_instruments_by_availability_excluding_user/{exclude_user_id}
///
/// An empty feed answers 400, unlike the other list views.
#[tracing::instrument(skip(state))]
pub async fn read_available_excluding_user<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(exclude_user_id): Path<UserId>,
) -> Result<Json<DiscoveryResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let instruments = state.projector.discovery_feed(exclude_user_id).await?;
    if instruments.is_empty() {
        return Err(ApiError::BadRequest(
            "No instruments found with the specified availability status.".to_string(),
        ));
    }

    Ok(Json(DiscoveryResponse {
        exclude_user_id,
        instruments,
    }))
}
