use std::sync::Arc;

use crate::config::Config;
use crate::session::Session;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single editing session; owns the page, the store and the exporter.
    pub session: Arc<Session>,
    pub config: Config,
}
