use super::{ApiError, ApiHandler, state::AppState};
use crate::auth::HandlerRequirements;
use async_trait::async_trait;
use axum::{
    Json,
    extract::Request,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// POST /rfc: acknowledgement endpoint for remote-command clients.
pub struct RfcHandler;

#[async_trait]
impl ApiHandler for RfcHandler {
    fn name(&self) -> &'static str {
        "rfc"
    }

    fn requirements(&self) -> HandlerRequirements {
        HandlerRequirements::NONE.auth()
    }

    async fn handle(&self, _state: AppState, _request: Request) -> Result<Response, ApiError> {
        Ok(Json(json!({ "status": "ack" })).into_response())
    }
}
