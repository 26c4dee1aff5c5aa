use super::{ApiError, ApiHandler, state::AppState};
use crate::auth::HandlerRequirements;
use agentgate_exec::ExecutionTarget;
use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequest, Request},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    #[serde(default = "default_host")]
    pub host: String,
    pub command: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub output: OutputFormat,
}

/// How a finished command is rendered back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `{"stdout", "stderr", "exit_code"}`.
    #[default]
    Json,
    /// Plain text: stdout, then stderr under a `[stderr]:` marker. The exit
    /// status moves to the `X-Exit-Code` header.
    Text,
}

const X_EXIT_CODE: HeaderName = HeaderName::from_static("x-exit-code");

fn default_host() -> String {
    "localhost".to_string()
}

/// POST /exec: browser-facing, behind basic auth and CSRF.
pub struct ExecHandler;

/// POST /api_exec, for API clients holding the API key.
pub struct ApiExecHandler;

#[async_trait]
impl ApiHandler for ExecHandler {
    fn name(&self) -> &'static str {
        "exec"
    }

    fn requirements(&self) -> HandlerRequirements {
        HandlerRequirements::NONE.auth().csrf()
    }

    async fn handle(&self, state: AppState, request: Request) -> Result<Response, ApiError> {
        run_command(state, request).await
    }
}

#[async_trait]
impl ApiHandler for ApiExecHandler {
    fn name(&self) -> &'static str {
        "api_exec"
    }

    fn requirements(&self) -> HandlerRequirements {
        HandlerRequirements::NONE.api_key()
    }

    async fn handle(&self, state: AppState, request: Request) -> Result<Response, ApiError> {
        run_command(state, request).await
    }
}

async fn run_command(state: AppState, request: Request) -> Result<Response, ApiError> {
    let Json(input) = Json::<ExecRequest>::from_request(request, &())
        .await
        .map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;

    if input.command.trim().is_empty() {
        return Err(ApiError::bad_request("command must not be empty"));
    }

    let target = ExecutionTarget {
        host: input.host,
        user: input.user,
    };
    let result = state.dispatcher.execute(&target, &input.command).await?;
    match input.output {
        OutputFormat::Json => Ok(Json(result).into_response()),
        OutputFormat::Text => Ok((
            [(X_EXIT_CODE, HeaderValue::from(result.exit_code))],
            result.combined_output(),
        )
            .into_response()),
    }
}
