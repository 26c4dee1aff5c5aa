use super::{ApiError, ApiHandler, state::AppState};
use crate::auth::{
    HandlerRequirements,
    session::{session_cookie, session_id_from_headers},
};
use async_trait::async_trait;
use axum::{
    Json,
    extract::Request,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::MethodFilter,
};
use serde_json::json;

/// GET /csrf_token hands out the token the CSRF gate expects for this session.
pub struct CsrfTokenHandler;

#[async_trait]
impl ApiHandler for CsrfTokenHandler {
    fn name(&self) -> &'static str {
        "csrf_token"
    }

    fn methods(&self) -> MethodFilter {
        MethodFilter::GET
    }

    fn requirements(&self) -> HandlerRequirements {
        HandlerRequirements::NONE.auth()
    }

    async fn handle(&self, state: AppState, request: Request) -> Result<Response, ApiError> {
        let existing = session_id_from_headers(request.headers());
        let issued = state.sessions.issue(existing.as_deref());

        let mut response = Json(json!({ "ok": true, "token": issued.token })).into_response();
        if issued.new_session {
            let cookie = HeaderValue::from_str(&session_cookie(&issued.session_id))
                .map_err(|err| ApiError::internal(err.to_string()))?;
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        Ok(response)
    }
}
