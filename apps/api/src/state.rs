use std::sync::Arc;

use crate::chat::controller::ConversationController;
use crate::chat::store::SessionStore;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Stateless orchestrator shared by every session.
    pub controller: Arc<ConversationController>,
    pub sessions: SessionStore,
    pub config: Config,
}
