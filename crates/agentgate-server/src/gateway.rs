//! Route composition: every handler is bound behind the gates it declares.

use crate::api::{self, ApiHandler, state::AppState};
use crate::auth::{AuthorizationChain, GateState, authorize};
use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, on},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub struct Gateway {
    state: AppState,
    router: Router<AppState>,
}

impl Gateway {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            router: Router::new(),
        }
    }

    /// Bind `handler` at `/{name}`, wrapped with the gates its requirements
    /// select. The chain is composed here, once; requests only run it.
    pub fn bind(mut self, handler: Arc<dyn ApiHandler>) -> Self {
        let path = format!("/{}", handler.name());
        let chain = AuthorizationChain::from_requirements(handler.requirements());
        let gates = chain.gate_names();

        let methods = handler.methods();
        let endpoint = move |State(state): State<AppState>, request: Request| {
            let handler = Arc::clone(&handler);
            async move {
                match handler.handle(state, request).await {
                    Ok(response) => response,
                    Err(err) => err.into_response(),
                }
            }
        };

        let mut route = on(methods, endpoint);
        if !chain.is_empty() {
            route = route.layer(from_fn_with_state(
                GateState::new(chain, self.state.clone()),
                authorize,
            ));
        }

        info!(route = %path, ?gates, "Registered handler");
        self.router = self.router.route(&path, route);
        self
    }

    pub fn into_router(self) -> Router {
        self.router
            .route("/health", get(health))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state)
    }
}

/// The full application router with every registered handler.
pub fn build_router(state: AppState) -> Router {
    api::handlers()
        .into_iter()
        .fold(Gateway::new(state), Gateway::bind)
        .into_router()
}
