use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::convert::Infallible;
use uuid::Uuid;

use super::request_logger::REQUEST_ID_HEADER;
use crate::session::RequestContext;
use crate::AppState;

/// Builds the [`RequestContext`] for a handler from the request id the
/// logger assigned and the `Authorization` header.
#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let actor = RequestContext::actor_from_authorization(auth_header, &state.admin_api_key);
        Ok(RequestContext::new(request_id, actor))
    }
}
