//! In-memory session store backing the CSRF gate.

use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "agentgate_session";

#[derive(Debug, Clone)]
struct SessionEntry {
    csrf_token: String,
    created_at: DateTime<Utc>,
}

/// A CSRF token handed out for a session.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub session_id: String,
    pub token: String,
    /// The session did not exist before; the caller must set the cookie.
    pub new_session: bool,
}

/// Sessions live until `max_age` passes. At most `max_entries` are held;
/// opening one more evicts the oldest.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_age: Duration,
    max_entries: usize,
}

impl SessionStore {
    pub fn new(max_age: Duration, max_entries: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age,
            max_entries: max_entries.max(1),
        }
    }

    /// The token bound to `session_id`, unless the session is unknown or expired.
    pub fn csrf_token(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read();
        let entry = sessions.get(session_id)?;
        if self.is_expired(entry) {
            return None;
        }
        Some(entry.csrf_token.clone())
    }

    /// Return the token of a live session, or open a new session.
    pub fn issue(&self, existing: Option<&str>) -> IssuedToken {
        let mut sessions = self.sessions.write();
        sessions.retain(|_, entry| !self.is_expired(entry));

        if let Some(session_id) = existing
            && let Some(entry) = sessions.get(session_id)
        {
            return IssuedToken {
                session_id: session_id.to_string(),
                token: entry.csrf_token.clone(),
                new_session: false,
            };
        }

        while sessions.len() >= self.max_entries {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
            debug!(max_entries = self.max_entries, "Session store full; evicted oldest session");
        }

        let session_id = random_token();
        let token = random_token();
        sessions.insert(
            session_id.clone(),
            SessionEntry {
                csrf_token: token.clone(),
                created_at: Utc::now(),
            },
        );

        IssuedToken {
            session_id,
            token,
            new_session: true,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        (Utc::now() - entry.created_at)
            .to_std()
            .map(|age| age > self.max_age)
            .unwrap_or(false)
    }
}

fn random_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Session id from the request's `Cookie` headers.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a new session.
pub fn session_cookie(session_id: &str) -> String {
    format!("{SESSION_COOKIE}={session_id}; HttpOnly; SameSite=Strict; Path=/")
}
