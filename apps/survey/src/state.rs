use std::time::Duration;

use crate::config::Config;
use crate::survey::engine::SurveyPolicy;
use crate::survey::session::Collaborators;
use crate::survey::store::SessionStore;

/// Shared service state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Platform collaborators. Default: the HTTP `ApiClient`; tests use fakes.
    pub collaborators: Collaborators,
    pub policy: SurveyPolicy,
}

impl AppState {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        Self {
            sessions: SessionStore::new(Duration::from_secs(config.session_idle_ttl_secs)),
            collaborators,
            policy: SurveyPolicy {
                require_answer: config.require_answer,
                notification_ttl_ms: config.notification_ttl_ms,
            },
        }
    }
}
