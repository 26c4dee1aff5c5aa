use crate::auth::SessionStore;
use crate::config::ServerConfig;
use agentgate_exec::CommandDispatcher;
use std::sync::Arc;

/// Everything handlers and gates share. Only the session store is mutable.
#[derive(Debug)]
pub struct AppContext {
    pub config: ServerConfig,
    pub dispatcher: CommandDispatcher,
    pub sessions: SessionStore,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        let dispatcher = CommandDispatcher::new(config.exec.clone());
        let sessions = SessionStore::new(config.session_max_age, config.session_max_entries);
        Self {
            config,
            dispatcher,
            sessions,
        }
    }
}

/// Application state shared across all API handlers
pub type AppState = Arc<AppContext>;
