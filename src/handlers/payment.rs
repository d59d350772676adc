use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::display::PaymentSummary;
use crate::error::AppError;
use crate::gateway::GatewayNotification;
use crate::services::payment::{CreatePaymentRequest, ListPaymentsQuery, UpdatePaymentRequest};
use crate::session::RequestContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DefaultFeeQuery {
    pub semester: Option<i32>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    query: Result<Query<ListPaymentsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    Ok(Json(state.payments.list(query).await?))
}

pub async fn get_payment(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    Ok(Json(state.payments.get(id).await?))
}

pub async fn payment_summary(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let payment = state.payments.get(id).await?;
    Ok(Json(PaymentSummary::from_record(payment)))
}

pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = payload?;
    let payment = state.payments.create(input).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Creates the record together with a gateway charge.
pub async fn create_gateway_payment(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = payload?;
    tracing::debug!(request_id = %ctx.request_id, payment_code = %input.payment_code, "opening gateway charge");
    let payment = state.payments.create_with_gateway_intent(input).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn update_payment(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    Ok(Json(state.payments.update(&ctx, id, patch).await?))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    state.payments.remove(&ctx, id).await?;
    Ok(Json(json!({ "id": id, "deleted": true })))
}

pub async fn default_fee(
    State(state): State<AppState>,
    student_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<DefaultFeeQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(student_id) = student_id?;
    let Query(query) = query?;
    Ok(Json(
        state
            .fee_computation
            .default_fee(student_id, query.semester)
            .await?,
    ))
}

/// Gateway status callback. Authenticated by its signature, not by the
/// admin key.
pub async fn gateway_notification(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<GatewayNotification>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(notification) = payload?;

    if !state.verifier.verify(&notification) {
        tracing::warn!(
            request_id = %ctx.request_id,
            order_id = %notification.order_id,
            "gateway notification signature mismatch"
        );
        return Err(AppError::Unauthorized(
            "invalid notification signature".to_string(),
        ));
    }

    let payment = state.payments.apply_notification(&notification).await?;
    Ok(Json(payment))
}
