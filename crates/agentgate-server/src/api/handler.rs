use super::{ApiError, state::AppState};
use crate::auth::HandlerRequirements;
use async_trait::async_trait;
use axum::{extract::Request, response::Response, routing::MethodFilter};

/// One HTTP endpoint, bound by the gateway at `/{name}`.
///
/// `requirements` is read once at registration; the gateway wraps the
/// handler with exactly the gates it asks for.
#[async_trait]
pub trait ApiHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn methods(&self) -> MethodFilter {
        MethodFilter::POST
    }

    fn requirements(&self) -> HandlerRequirements {
        HandlerRequirements::NONE
    }

    async fn handle(&self, state: AppState, request: Request) -> Result<Response, ApiError>;
}
