//! Profile endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use common::UserId;
use domain::{MediaStore, ProfileUpdate};
use entity_store::{EntityStore, User};
use serde::Serialize;

use super::form::MultipartForm;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub data: User,
}

#[derive(Serialize)]
pub struct ProfileUpdatedResponse {
    pub user_id: UserId,
    pub message: &'static str,
}

/// GET /profile/read/{user_id}
#[tracing::instrument(skip(state))]
pub async fn read<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ProfileResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let user = state.profiles.read_profile(user_id).await?;
    Ok(Json(ProfileResponse {
        message: "OK",
        data: user,
    }))
}

/// POST /profile/update/{user_id}: multipart contact fields and picture.
#[tracing::instrument(skip(state, multipart))]
pub async fn update<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(user_id): Path<UserId>,
    multipart: Multipart,
) -> Result<Json<ProfileUpdatedResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let mut form = MultipartForm::read(multipart).await?;
    let update = ProfileUpdate {
        email: form.text("email"),
        full_name: form.text("full_name"),
        phone: form.text("phone"),
        profile_picture: form.file("profile_picture"),
    };

    state.profiles.update_profile(user_id, update).await?;

    Ok(Json(ProfileUpdatedResponse {
        user_id,
        message: "Profile updated successfully.",
    }))
}
