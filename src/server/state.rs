//! Shared application state

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::core::router::RequestRouter;
use crate::storage::ActivityLogStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub router: Arc<RequestRouter>,
    pub log_store: Arc<dyn ActivityLogStore>,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        router: RequestRouter,
        log_store: Arc<dyn ActivityLogStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            log_store,
        }
    }
}
