use super::{ApiError, ApiHandler, state::AppState};
use crate::auth::HandlerRequirements;
use agentgate_exec::local_hostname;
use async_trait::async_trait;
use axum::{
    Json,
    extract::Request,
    response::{IntoResponse, Response},
    routing::MethodFilter,
};
use serde_json::json;

/// GET /runtime_info, local operators only.
pub struct RuntimeInfoHandler;

#[async_trait]
impl ApiHandler for RuntimeInfoHandler {
    fn name(&self) -> &'static str {
        "runtime_info"
    }

    fn methods(&self) -> MethodFilter {
        MethodFilter::GET
    }

    fn requirements(&self) -> HandlerRequirements {
        HandlerRequirements::NONE.loopback()
    }

    async fn handle(&self, state: AppState, _request: Request) -> Result<Response, ApiError> {
        let exec = &state.config.exec;
        Ok(Json(json!({
            "hostname": local_hostname(),
            "version": env!("CARGO_PKG_VERSION"),
            "exec": {
                "shell": exec.shell,
                "remote_shell": exec.remote_shell,
                "timeout_secs": exec.timeout.map(|t| t.as_secs()),
            },
            "auth": {
                "api_key_configured": state.config.auth.api_key().is_some(),
                "basic_auth_enabled": state.config.auth.basic_credentials().is_some(),
            },
        }))
        .into_response())
    }
}
