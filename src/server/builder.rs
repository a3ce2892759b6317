//! Server assembly and startup

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::config::GatewayConfig;
use crate::core::providers::ProviderRegistry;
use crate::core::router::RequestRouter;
use crate::storage::{ActivityLogStore, MemoryLogStore};
use crate::utils::GatewayError;

use super::routes;
use super::state::AppState;

/// Build the shared application state from configuration
pub fn build_state(config: GatewayConfig, log_store: Arc<dyn ActivityLogStore>) -> AppState {
    let registry = ProviderRegistry::from_config(&config.upstream);
    let router = RequestRouter::new(
        registry,
        Arc::clone(&log_store),
        Duration::from_secs(config.upstream.timeout_secs),
    );
    AppState::new(config, router, log_store)
}

/// Malformed request bodies get the same `{ message }` error shape as every
/// other gateway error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _request| {
        GatewayError::Validation(err.to_string()).into()
    })
}

/// Run the gateway until shutdown
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    let bind_addr = (config.server.host.clone(), config.server.port);
    let state = build_state(config, Arc::new(MemoryLogStore::new()));

    info!(host = %bind_addr.0, port = bind_addr.1, "starting gateway");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(json_config())
            .wrap(TracingLogger::default())
            .configure(routes::configure)
    })
    .bind(bind_addr)?
    .run()
    .await?;

    Ok(())
}
