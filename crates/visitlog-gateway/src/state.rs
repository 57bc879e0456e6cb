use std::sync::Arc;

use visitlog_db::VisitStore;

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub store: Arc<dyn VisitStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn VisitStore>) -> Self {
        Self { store }
    }
}

pub type SharedState = Arc<AppState>;
