//! Application state.

use std::sync::Arc;

use tubefetch_lifecycle::{LifecycleConfig, SystemClock};

use crate::config::ApiConfig;
use crate::services::{InsightService, SessionService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub fn new(config: ApiConfig, sessions: SessionService) -> Self {
        Self {
            config,
            sessions: Arc::new(sessions),
        }
    }

    /// Create application state with the wall clock and Gemini from env.
    pub fn from_env(config: ApiConfig) -> Self {
        let sessions = SessionService::new(
            Arc::new(SystemClock::new()),
            Arc::new(InsightService::from_env()),
            LifecycleConfig::from_env(),
            config.analyze_delay,
        )
        .with_limits(config.session_ttl, config.max_sessions);
        Self::new(config, sessions)
    }
}
