use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use visitlog_common::{Error, Result};
use visitlog_config::{AppConfig, ConfigLoader};
use visitlog_db::{SqliteVisitStore, VisitStore};

use crate::router::build_router;
use crate::state::AppState;

/// Binds the configured address and serves the ingest API.
pub struct GatewayServer {
    config: AppConfig,
    store: Option<Arc<dyn VisitStore>>,
}

impl GatewayServer {
    /// Server backed by the SQLite file named in `config.database.path`,
    /// opened when [`run`](Self::run) starts.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            store: None,
        }
    }

    pub fn with_store(config: AppConfig, store: Arc<dyn VisitStore>) -> Self {
        Self {
            config,
            store: Some(store),
        }
    }

    pub async fn run(self) -> Result<()> {
        let store = match self.store {
            Some(store) => store,
            None => {
                ConfigLoader::ensure_data_dir(&self.config)?;
                Arc::new(SqliteVisitStore::open(&self.config.database.path)?)
            }
        };

        let addr = format!("{}:{}", self.config.gateway.host, self.config.gateway.port);
        let state = Arc::new(AppState::new(store));
        let app = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        info!("visitlog listening on {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Gateway(format!("server error: {e}")))?;

        Ok(())
    }
}
