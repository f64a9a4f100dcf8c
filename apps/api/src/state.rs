use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::LlmProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The configured model backend. Swappable in tests with a stub.
    pub llm: Arc<dyn LlmProvider>,
}
