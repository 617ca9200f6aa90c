//! Review endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Form, Json};
use common::{InstrumentId, ReviewId, UserId};
use domain::{MediaStore, parse_rating};
use entity_store::EntityStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReviewForm {
    pub rating: Option<String>,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct ReviewAddedResponse {
    pub review_id: ReviewId,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ReviewDeletedResponse {
    pub message: &'static str,
}

/// POST /reviews/add_review/{user_id}/{instrument_id}
#[tracing::instrument(skip(state, form))]
pub async fn add_review<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path((user_id, instrument_id)): Path<(UserId, InstrumentId)>,
    Form(form): Form<ReviewForm>,
) -> Result<(StatusCode, Json<ReviewAddedResponse>), ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let rating = parse_rating(form.rating.as_deref())?;
    let review = state
        .reviews
        .add_review(user_id, instrument_id, rating, form.comment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewAddedResponse {
            review_id: review.review_id,
            message: "Review added successfully.",
        }),
    ))
}

/// DELETE /reviews/delete_review/{review_id}
#[tracing::instrument(skip(state))]
pub async fn delete_review<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(review_id): Path<ReviewId>,
) -> Result<Json<ReviewDeletedResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    state.reviews.delete_review(review_id).await?;

    Ok(Json(ReviewDeletedResponse {
        message: "Review deleted successfully.",
    }))
}
