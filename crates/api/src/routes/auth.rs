//! Registration and login endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};
use common::UserId;
use domain::MediaStore;
use entity_store::EntityStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    fn parts(&self) -> (&str, &str) {
        (
            self.username.as_deref().unwrap_or_default(),
            self.password.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Serialize)]
pub struct RegisteredResponse {
    pub user_id: UserId,
    pub username: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub message: &'static str,
}

/// POST /auth/register (form: username, password)
#[tracing::instrument(skip(state, credentials))]
pub async fn register<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Form(credentials): Form<Credentials>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let (username, password) = credentials.parts();
    let user = state.accounts.register(username, password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            user_id: user.user_id,
            username: user.username,
            message: "User created.",
        }),
    ))
}

/// POST /auth/login (JSON: username, password)
///
/// A mismatch answers 401 with `matched: false`; the body never says whether
/// the username exists.
#[tracing::instrument(skip(state, credentials))]
pub async fn login<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let (username, password) = credentials.parts();
    let response = match state.accounts.login(username, password).await? {
        Some(user) => (
            StatusCode::OK,
            Json(LoginResponse {
                matched: true,
                user_id: Some(user.user_id),
                message: "Login successful.",
            }),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                matched: false,
                user_id: None,
                message: "Bad username or password.",
            }),
        ),
    };
    Ok(response)
}
