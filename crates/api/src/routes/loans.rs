//! Loan request and loan endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Form, Json};
use common::{InstrumentId, LoanId, RequestId, UserId};
use domain::MediaStore;
use entity_store::{EntityStore, Instrument, RequestListEntry, TimelineEntry};
use serde::{Deserialize, Serialize};

use super::form::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RequestLoanForm {
    pub instrument_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct AddLoanForm {
    pub borrowed_id: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct LoanRequestCreatedResponse {
    pub requester_id: UserId,
    pub request_id: RequestId,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct InstrumentMessageResponse {
    pub instrument_id: InstrumentId,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct RequestsDeletedResponse {
    pub instrument_id: InstrumentId,
    pub deleted: u64,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct LoanCreatedResponse {
    pub instrument_id: InstrumentId,
    pub borrower_id: UserId,
    pub loan_id: LoanId,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct RequestApprovedResponse {
    pub request_id: RequestId,
    pub instrument_id: InstrumentId,
    pub borrower_id: UserId,
    pub loan_id: LoanId,
    pub cleared_requests: u64,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct RequestedInstrumentsResponse {
    pub requester_id: UserId,
    pub instruments: Vec<Instrument>,
}

#[derive(Serialize)]
pub struct MyLoansResponse {
    pub requester_id: UserId,
    pub loans: Vec<TimelineEntry>,
}

#[derive(Serialize)]
pub struct LoanListResponse {
    pub instrument_id: InstrumentId,
    pub requests: Vec<RequestListEntry>,
}

// -- Handlers --

/// POST /loan/request_loan/{requester_id}: submit a loan request.
#[tracing::instrument(skip(state, form))]
pub async fn request_loan<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(requester_id): Path<UserId>,
    Form(form): Form<RequestLoanForm>,
) -> Result<(StatusCode, Json<LoanRequestCreatedResponse>), ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let instrument_id = parse_id::<InstrumentId>(form.instrument_id.as_deref(), "instrument_id")?;
    let message = form.message.filter(|m| !m.trim().is_empty());
    let (Some(instrument_id), Some(message)) = (instrument_id, message) else {
        return Err(ApiError::BadRequest("All fields are required.".to_string()));
    };

    let request = state
        .lifecycle
        .submit_request(instrument_id, requester_id, &message)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanRequestCreatedResponse {
            requester_id,
            request_id: request.request_id,
            message: "Loan request submitted successfully.",
        }),
    ))
}

/// DELETE /loan/cancel_loan_request/{requester_id}/{request_id}
#[tracing::instrument(skip(state))]
pub async fn cancel_loan_request<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path((requester_id, request_id)): Path<(UserId, RequestId)>,
) -> Result<Json<MessageResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    state
        .lifecycle
        .cancel_request(requester_id, request_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Loan request cancelled successfully.",
    }))
}

/// DELETE /loan/cancel_loan_request_by_instrument/{requester_id}/{instrument_id}
#[tracing::instrument(skip(state))]
pub async fn cancel_loan_request_by_instrument<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path((requester_id, instrument_id)): Path<(UserId, InstrumentId)>,
) -> Result<Json<InstrumentMessageResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    state
        .lifecycle
        .cancel_request_by_instrument(requester_id, instrument_id)
        .await?;

    Ok(Json(InstrumentMessageResponse {
        instrument_id,
        message: "Loan request cancelled successfully.",
    }))
}

/// DELETE /loan/delete_loan_requests/{instrument_id}: remove every pending
/// request on an instrument. Nothing to remove is reported as a failure.
#[tracing::instrument(skip(state))]
pub async fn delete_loan_requests<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(instrument_id): Path<InstrumentId>,
) -> Result<Json<RequestsDeletedResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let deleted = state
        .lifecycle
        .delete_all_requests_for_instrument(instrument_id)
        .await?;
    if deleted == 0 {
        return Err(ApiError::Internal(
            "Failed to delete loan requests.".to_string(),
        ));
    }

    Ok(Json(RequestsDeletedResponse {
        instrument_id,
        deleted,
        message: "Loan requests deleted successfully.",
    }))
}

/// POST /loan/add_loan/{instrument_id}: open a loan directly.
#[tracing::instrument(skip(state, form))]
pub async fn add_loan<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(instrument_id): Path<InstrumentId>,
    Form(form): Form<AddLoanForm>,
) -> Result<(StatusCode, Json<LoanCreatedResponse>), ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let borrower_id = parse_id::<UserId>(form.borrowed_id.as_deref(), "borrowed_id")?
        .ok_or_else(|| ApiError::BadRequest("All fields are required.".to_string()))?;

    let loan = state
        .lifecycle
        .create_loan(instrument_id, borrower_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanCreatedResponse {
            instrument_id,
            borrower_id,
            loan_id: loan.loan_id,
            message: "Loan added successfully.",
        }),
    ))
}

/// POST /loan/approve_request/{request_id}: promote a request to a loan.
#[tracing::instrument(skip(state))]
pub async fn approve_request<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(request_id): Path<RequestId>,
) -> Result<(StatusCode, Json<RequestApprovedResponse>), ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let promotion = state.lifecycle.promote_request(request_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(RequestApprovedResponse {
            request_id,
            instrument_id: promotion.loan.instrument_id,
            borrower_id: promotion.loan.borrower_id,
            loan_id: promotion.loan.loan_id,
            cleared_requests: promotion.cleared_requests,
            message: "Loan request approved successfully.",
        }),
    ))
}

/// DELETE /loan/delete_loan/{instrument_id}: close the open loan.
#[tracing::instrument(skip(state))]
pub async fn delete_loan<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(instrument_id): Path<InstrumentId>,
) -> Result<Json<InstrumentMessageResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    state.lifecycle.close_loan(instrument_id).await?;

    Ok(Json(InstrumentMessageResponse {
        instrument_id,
        message: "Loan deleted successfully.",
    }))
}

/// GET /loan/loan_requests/{requester_id}: instruments the user requested.
#[tracing::instrument(skip(state))]
pub async fn loan_requests<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(requester_id): Path<UserId>,
) -> Result<Json<RequestedInstrumentsResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let instruments = state.projector.requested_instruments(requester_id).await?;
    if instruments.is_empty() {
        return Err(ApiError::NotFound(
            "No loan requests found for this user.".to_string(),
        ));
    }

    Ok(Json(RequestedInstrumentsResponse {
        requester_id,
        instruments,
    }))
}

/// GET /loan/my_loans/{requester_id}: merged request and loan timeline.
#[tracing::instrument(skip(state))]
pub async fn my_loans<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(requester_id): Path<UserId>,
) -> Result<Json<MyLoansResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let loans = state.projector.my_loans(requester_id).await?;
    if loans.is_empty() {
        return Err(ApiError::NotFound(
            "No loans found for this user.".to_string(),
        ));
    }

    Ok(Json(MyLoansResponse {
        requester_id,
        loans,
    }))
}

/// GET /loan/loan_list/{instrument_id}: pending requests on an instrument.
#[tracing::instrument(skip(state))]
pub async fn loan_list<S, M>(
    State(state): State<Arc<AppState<S, M>>>,
    Path(instrument_id): Path<InstrumentId>,
) -> Result<Json<LoanListResponse>, ApiError>
where
    S: EntityStore + Clone + 'static,
    M: MediaStore + Clone + 'static,
{
    let requests = state.projector.loan_list(instrument_id).await?;
    if requests.is_empty() {
        return Err(ApiError::NotFound(
            "No loan requests found for this instrument.".to_string(),
        ));
    }

    Ok(Json(LoanListResponse {
        instrument_id,
        requests,
    }))
}
