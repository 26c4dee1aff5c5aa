use super::credentials::{api_key_from_body, header_str};
use super::gates::{AuthorizationChain, AuthorizationOutcome, Gate, GateRequest};
use super::session::session_id_from_headers;
use crate::api::state::AppState;
use axum::{
    body::{Body, to_bytes},
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest body read when looking for an `api_key` field.
pub(crate) const MAX_API_KEY_BODY_BYTES: usize = 1024 * 1024;

const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

/// Per-route middleware state: the route's composed chain plus shared state.
#[derive(Clone)]
pub struct GateState {
    chain: Arc<AuthorizationChain>,
    app: AppState,
}

impl GateState {
    pub fn new(chain: AuthorizationChain, app: AppState) -> Self {
        Self {
            chain: Arc::new(chain),
            app,
        }
    }
}

pub async fn authorize(State(gate): State<GateState>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let mut input = gather(&parts, &gate);

    let body = if gate.chain.contains(Gate::ApiKey) && input.api_key_header.is_none() {
        match to_bytes(body, MAX_API_KEY_BODY_BYTES).await {
            Ok(bytes) => {
                input.api_key_body = api_key_from_body(&bytes);
                Body::from(bytes)
            }
            Err(err) => {
                // The API-key gate is guaranteed to deny; the body is never forwarded.
                debug!(error = %err, "Could not read request body for API key");
                Body::empty()
            }
        }
    } else {
        body
    };

    match gate.chain.evaluate(&input, &gate.app.config.auth).await {
        AuthorizationOutcome::Allow => next.run(Request::from_parts(parts, body)).await,
        AuthorizationOutcome::Deny(denial) => {
            warn!(
                gate = denial.gate.name(),
                status = denial.status.as_u16(),
                peer = ?input.peer,
                path = %parts.uri.path(),
                "Request denied"
            );
            denial.into_response()
        }
    }
}

fn gather(parts: &Parts, gate: &GateState) -> GateRequest {
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let session_token = if gate.chain.contains(Gate::Csrf) {
        session_id_from_headers(&parts.headers)
            .and_then(|session_id| gate.app.sessions.csrf_token(&session_id))
    } else {
        None
    };

    GateRequest {
        peer,
        api_key_header: header_str(&parts.headers, &X_API_KEY).filter(|v| !v.is_empty()),
        api_key_body: None,
        authorization: header_str(&parts.headers, &header::AUTHORIZATION),
        csrf_header: header_str(&parts.headers, &X_CSRF_TOKEN),
        session_token,
    }
}
