//! Fee schedule (`biaya`) endpoints.

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

use crate::error::AppError;
use crate::services::fee_schedule::{CreateFeeScheduleRequest, UpdateFeeScheduleRequest};
use crate::session::RequestContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeScheduleQuery {
    pub major_id: Option<String>,
}

pub async fn list_fee_schedules(
    State(state): State<AppState>,
    query: Result<Query<FeeScheduleQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let major_id = query
        .major_id
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    Ok(Json(state.fee_schedules.list(major_id).await?))
}

pub async fn get_fee_schedule(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    Ok(Json(state.fee_schedules.get(id).await?))
}

pub async fn create_fee_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreateFeeScheduleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = payload?;
    let schedule = state.fee_schedules.create(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn update_fee_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateFeeScheduleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    Ok(Json(state.fee_schedules.update(&ctx, id, patch).await?))
}

pub async fn delete_fee_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    state.fee_schedules.remove(&ctx, id).await?;
    Ok(Json(json!({ "id": id, "deleted": true })))
}
