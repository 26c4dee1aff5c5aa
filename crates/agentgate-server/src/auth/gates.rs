//! Authorization gates and their fixed-order composition.
//!
//! A route declares which gates it needs through [`HandlerRequirements`].
//! [`AuthorizationChain::from_requirements`] turns that into an ordered list
//! (loopback, API key, basic auth, CSRF) no matter how the flags were
//! declared, and evaluation stops at the first denial.

use std::net::IpAddr;

use agentgate_exec::is_loopback;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::credentials::{parse_basic, secrets_match};
use crate::config::AuthSecrets;

/// The four independent requirement flags a handler declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerRequirements {
    pub requires_loopback: bool,
    pub requires_api_key: bool,
    pub requires_auth: bool,
    pub requires_csrf: bool,
}

impl HandlerRequirements {
    pub const NONE: Self = Self {
        requires_loopback: false,
        requires_api_key: false,
        requires_auth: false,
        requires_csrf: false,
    };

    pub const fn loopback(mut self) -> Self {
        self.requires_loopback = true;
        self
    }

    pub const fn api_key(mut self) -> Self {
        self.requires_api_key = true;
        self
    }

    pub const fn auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub const fn csrf(mut self) -> Self {
        self.requires_csrf = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Loopback,
    ApiKey,
    BasicAuth,
    Csrf,
}

impl Gate {
    /// Evaluation order.
    pub const ORDER: [Gate; 4] = [Gate::Loopback, Gate::ApiKey, Gate::BasicAuth, Gate::Csrf];

    pub fn name(self) -> &'static str {
        match self {
            Gate::Loopback => "loopback",
            Gate::ApiKey => "api_key",
            Gate::BasicAuth => "basic_auth",
            Gate::Csrf => "csrf",
        }
    }

    fn required_by(self, requirements: HandlerRequirements) -> bool {
        match self {
            Gate::Loopback => requirements.requires_loopback,
            Gate::ApiKey => requirements.requires_api_key,
            Gate::BasicAuth => requirements.requires_auth,
            Gate::Csrf => requirements.requires_csrf,
        }
    }

    fn denial(self) -> Denial {
        let (status, reason) = match self {
            Gate::Loopback => (StatusCode::FORBIDDEN, "Access denied."),
            Gate::ApiKey => (StatusCode::UNAUTHORIZED, "API key required"),
            Gate::BasicAuth => (
                StatusCode::UNAUTHORIZED,
                "Could not verify your access level. You have to login with proper credentials",
            ),
            Gate::Csrf => (StatusCode::FORBIDDEN, "CSRF token missing or invalid"),
        };
        Denial {
            gate: self,
            status,
            reason,
        }
    }

    /// Evaluate this gate. Only the loopback gate does I/O (hostname
    /// resolution when the peer is not a literal).
    pub async fn evaluate(self, request: &GateRequest, secrets: &AuthSecrets) -> AuthorizationOutcome {
        let allowed = match self {
            Gate::Loopback => match request.peer {
                Some(ip) => is_loopback(&ip.to_string()).await,
                None => false,
            },
            Gate::ApiKey => check_api_key(request, secrets),
            Gate::BasicAuth => check_basic_auth(request, secrets),
            Gate::Csrf => check_csrf(request),
        };

        if allowed {
            AuthorizationOutcome::Allow
        } else {
            AuthorizationOutcome::Deny(self.denial())
        }
    }
}

/// Everything the gates look at, gathered once per request.
#[derive(Debug, Clone, Default)]
pub struct GateRequest {
    /// Transport-layer peer; forwarded-for headers are never consulted.
    pub peer: Option<IpAddr>,
    pub api_key_header: Option<String>,
    pub api_key_body: Option<String>,
    pub authorization: Option<String>,
    pub csrf_header: Option<String>,
    /// Token bound to the caller's session, if the session exists.
    pub session_token: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// A present header decides on its own; the body field is only consulted
/// when the header is absent. No configured key denies everything.
fn check_api_key(request: &GateRequest, secrets: &AuthSecrets) -> bool {
    let Some(expected) = secrets.api_key() else {
        return false;
    };
    let provided = non_empty(&request.api_key_header).or_else(|| non_empty(&request.api_key_body));
    provided.is_some_and(|key| secrets_match(key, expected))
}

/// No-op unless both login and password are configured.
fn check_basic_auth(request: &GateRequest, secrets: &AuthSecrets) -> bool {
    let Some((login, password)) = secrets.basic_credentials() else {
        return true;
    };
    let Some((user, pass)) = request.authorization.as_deref().and_then(parse_basic) else {
        return false;
    };
    // Evaluate both so a wrong login costs the same as a wrong password.
    let user_ok = secrets_match(&user, login);
    let pass_ok = secrets_match(&pass, password);
    user_ok && pass_ok
}

fn check_csrf(request: &GateRequest) -> bool {
    match (non_empty(&request.session_token), non_empty(&request.csrf_header)) {
        (Some(expected), Some(provided)) => secrets_match(provided, expected),
        _ => false,
    }
}

/// Terminal response of a failed gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub gate: Gate,
    pub status: StatusCode,
    pub reason: &'static str,
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "detail": self.reason }))).into_response();
        if self.gate == Gate::BasicAuth {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Login Required\""),
            );
        }
        response
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Allow,
    Deny(Denial),
}

/// The gates one route requires, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationChain {
    gates: Vec<Gate>,
}

impl AuthorizationChain {
    pub fn from_requirements(requirements: HandlerRequirements) -> Self {
        Self {
            gates: Gate::ORDER
                .into_iter()
                .filter(|gate| gate.required_by(requirements))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn contains(&self, gate: Gate) -> bool {
        self.gates.contains(&gate)
    }

    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|gate| gate.name()).collect()
    }

    /// Run the gates in order, stopping at the first denial.
    pub async fn evaluate(&self, request: &GateRequest, secrets: &AuthSecrets) -> AuthorizationOutcome {
        for gate in &self.gates {
            if let AuthorizationOutcome::Deny(denial) = gate.evaluate(request, secrets).await {
                return AuthorizationOutcome::Deny(denial);
            }
        }
        AuthorizationOutcome::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::STANDARD};
    use std::net::Ipv4Addr;

    const ALL: HandlerRequirements = HandlerRequirements::NONE.loopback().api_key().auth().csrf();

    fn secrets() -> AuthSecrets {
        AuthSecrets::new(
            Some("k-123".to_string()),
            Some("admin".to_string()),
            Some("hunter2".to_string()),
        )
    }

    fn basic(user: &str, pass: &str) -> Option<String> {
        Some(format!("Basic {}", STANDARD.encode(format!("{user}:{pass}"))))
    }

    /// A request that passes every gate under [`secrets`].
    fn passing_request() -> GateRequest {
        GateRequest {
            peer: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            api_key_header: Some("k-123".to_string()),
            api_key_body: None,
            authorization: basic("admin", "hunter2"),
            csrf_header: Some("tok".to_string()),
            session_token: Some("tok".to_string()),
        }
    }

    fn denied_gate(outcome: AuthorizationOutcome) -> Option<Gate> {
        match outcome {
            AuthorizationOutcome::Allow => None,
            AuthorizationOutcome::Deny(denial) => Some(denial.gate),
        }
    }

    #[test]
    fn test_chain_order_is_fixed() {
        let chain = AuthorizationChain::from_requirements(
            HandlerRequirements::NONE.csrf().auth().api_key().loopback(),
        );
        assert_eq!(chain.gate_names(), vec!["loopback", "api_key", "basic_auth", "csrf"]);

        let chain = AuthorizationChain::from_requirements(HandlerRequirements::NONE.csrf().api_key());
        assert_eq!(chain.gate_names(), vec!["api_key", "csrf"]);
        assert!(AuthorizationChain::from_requirements(HandlerRequirements::NONE).is_empty());
    }

    #[tokio::test]
    async fn test_passing_request_is_allowed() {
        let chain = AuthorizationChain::from_requirements(ALL);
        assert_eq!(
            chain.evaluate(&passing_request(), &secrets()).await,
            AuthorizationOutcome::Allow
        );
    }

    #[tokio::test]
    async fn test_loopback_gate() {
        let mut request = passing_request();
        request.peer = Some("::1".parse().unwrap());
        assert_eq!(denied_gate(Gate::Loopback.evaluate(&request, &secrets()).await), None);

        request.peer = Some("192.168.1.20".parse().unwrap());
        assert_eq!(
            denied_gate(Gate::Loopback.evaluate(&request, &secrets()).await),
            Some(Gate::Loopback)
        );

        request.peer = None;
        assert_eq!(
            denied_gate(Gate::Loopback.evaluate(&request, &secrets()).await),
            Some(Gate::Loopback)
        );
    }

    #[tokio::test]
    async fn test_api_key_header_and_body_fallback() {
        let secrets = secrets();
        let mut request = GateRequest {
            api_key_header: Some("k-123".to_string()),
            ..Default::default()
        };
        assert_eq!(denied_gate(Gate::ApiKey.evaluate(&request, &secrets).await), None);

        request.api_key_header = None;
        request.api_key_body = Some("k-123".to_string());
        assert_eq!(denied_gate(Gate::ApiKey.evaluate(&request, &secrets).await), None);

        // A wrong header is not rescued by a correct body value.
        request.api_key_header = Some("wrong".to_string());
        assert_eq!(
            denied_gate(Gate::ApiKey.evaluate(&request, &secrets).await),
            Some(Gate::ApiKey)
        );

        request.api_key_header = None;
        request.api_key_body = None;
        assert_eq!(
            denied_gate(Gate::ApiKey.evaluate(&request, &secrets).await),
            Some(Gate::ApiKey)
        );
    }

    #[tokio::test]
    async fn test_api_key_without_configured_key_denies_everything() {
        let secrets = AuthSecrets::new(Some(String::new()), None, None);
        for presented in [Some(""), Some("anything"), None] {
            let request = GateRequest {
                api_key_header: presented.map(str::to_string),
                api_key_body: presented.map(str::to_string),
                ..Default::default()
            };
            assert_eq!(
                denied_gate(Gate::ApiKey.evaluate(&request, &secrets).await),
                Some(Gate::ApiKey),
                "presented {presented:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_basic_auth_disabled_without_credentials() {
        let secrets = AuthSecrets::new(None, Some("admin".to_string()), None);
        for authorization in [None, basic("x", "y"), Some("garbage".to_string())] {
            let request = GateRequest {
                authorization,
                ..Default::default()
            };
            assert_eq!(denied_gate(Gate::BasicAuth.evaluate(&request, &secrets).await), None);
        }
    }

    #[tokio::test]
    async fn test_basic_auth_requires_exact_match() {
        let secrets = secrets();
        for authorization in [
            None,
            basic("admin", "wrong"),
            basic("Admin", "hunter2"),
            basic("admin", "hunter2 "),
            Some("Basic not-base64".to_string()),
        ] {
            let request = GateRequest {
                authorization: authorization.clone(),
                ..Default::default()
            };
            assert_eq!(
                denied_gate(Gate::BasicAuth.evaluate(&request, &secrets).await),
                Some(Gate::BasicAuth),
                "{authorization:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_csrf_requires_both_sides() {
        let secrets = secrets();
        let cases = [
            (Some("tok"), Some("tok"), None),
            (Some("tok"), Some("other"), Some(Gate::Csrf)),
            (None, Some("tok"), Some(Gate::Csrf)),
            (Some("tok"), None, Some(Gate::Csrf)),
            (Some(""), Some(""), Some(Gate::Csrf)),
        ];
        for (session, header, expected) in cases {
            let request = GateRequest {
                session_token: session.map(str::to_string),
                csrf_header: header.map(str::to_string),
                ..Default::default()
            };
            assert_eq!(
                denied_gate(Gate::Csrf.evaluate(&request, &secrets).await),
                expected,
                "session={session:?} header={header:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_api_key_denial_reported_before_basic_auth() {
        let mut request = passing_request();
        request.api_key_header = Some("wrong".to_string());
        request.authorization = basic("admin", "wrong");

        let chain = AuthorizationChain::from_requirements(ALL);
        assert_eq!(
            denied_gate(chain.evaluate(&request, &secrets()).await),
            Some(Gate::ApiKey)
        );
    }

    #[tokio::test]
    async fn test_disabled_flags_never_deny() {
        // Each request breaks exactly one gate.
        let broken: [(Gate, GateRequest); 4] = [
            (Gate::Loopback, GateRequest { peer: Some("203.0.113.9".parse().unwrap()), ..passing_request() }),
            (Gate::ApiKey, GateRequest { api_key_header: None, ..passing_request() }),
            (Gate::BasicAuth, GateRequest { authorization: None, ..passing_request() }),
            (Gate::Csrf, GateRequest { csrf_header: Some("stale".to_string()), ..passing_request() }),
        ];

        for bits in 0u8..16 {
            let requirements = HandlerRequirements {
                requires_loopback: bits & 1 != 0,
                requires_api_key: bits & 2 != 0,
                requires_auth: bits & 4 != 0,
                requires_csrf: bits & 8 != 0,
            };
            let chain = AuthorizationChain::from_requirements(requirements);
            for (gate, request) in &broken {
                let expected = chain.contains(*gate).then_some(*gate);
                assert_eq!(
                    denied_gate(chain.evaluate(request, &secrets()).await),
                    expected,
                    "requirements={requirements:?} broken={gate:?}"
                );
            }
        }
    }

    #[test]
    fn test_denial_payloads_are_stable() {
        let cases = [
            (Gate::Loopback, StatusCode::FORBIDDEN),
            (Gate::ApiKey, StatusCode::UNAUTHORIZED),
            (Gate::BasicAuth, StatusCode::UNAUTHORIZED),
            (Gate::Csrf, StatusCode::FORBIDDEN),
        ];
        for (gate, status) in cases {
            let denial = gate.denial();
            assert_eq!(denial.status, status);
            let response = denial.into_response();
            assert_eq!(response.status(), status);
            assert_eq!(
                response.headers().contains_key(header::WWW_AUTHENTICATE),
                gate == Gate::BasicAuth
            );
        }
    }
}
