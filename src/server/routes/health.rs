//! Health and readiness endpoints

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub providers: Vec<ProviderHealth>,
}

#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub configured: bool,
}

/// Liveness probe at the root path
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "OK" }))
}

/// Detailed health report
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let providers = crate::core::catalog::list_providers()
        .into_iter()
        .map(|id| ProviderHealth {
            provider: id.to_string(),
            configured: state.config.upstream_settings(id).api_key.is_some(),
        })
        .collect();

    HttpResponse::Ok().json(HealthStatus {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        providers,
    })
}
