//! Catalog listing endpoints

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::core::catalog;
use crate::server::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub providers: Vec<String>,
    pub supports_streaming: bool,
    pub supports_json_mode: bool,
    pub supports_image_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub configured: bool,
    pub models: Vec<String>,
}

/// `GET /v1/models`
pub async fn list_models() -> HttpResponse {
    let data = catalog::list_models()
        .iter()
        .map(|model| {
            let mapping = model.default_mapping();
            ModelInfo {
                id: model.id.to_string(),
                object: "model".to_string(),
                providers: model
                    .mappings
                    .iter()
                    .map(|m| m.provider.to_string())
                    .collect(),
                supports_streaming: mapping.supports_streaming,
                supports_json_mode: model.supports_json_mode,
                supports_image_input: model.supports_image_input,
                context_length: mapping.context_length,
            }
        })
        .collect();

    HttpResponse::Ok().json(ModelList {
        object: "list".to_string(),
        data,
    })
}

/// `GET /v1/providers`
pub async fn list_providers(state: web::Data<AppState>) -> HttpResponse {
    let providers: Vec<ProviderInfo> = catalog::list_providers()
        .into_iter()
        .map(|id| ProviderInfo {
            id: id.to_string(),
            configured: state.config.upstream_settings(id).api_key.is_some(),
            models: catalog::list_models()
                .iter()
                .filter(|model| model.mapping_for(id).is_some())
                .map(|model| model.id.to_string())
                .collect(),
        })
        .collect();

    HttpResponse::Ok().json(providers)
}
