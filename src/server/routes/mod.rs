//! HTTP route registration

pub mod chat;
pub mod health;
pub mod models;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health::root))
        .route("/health", web::get().to(health::health))
        .service(
            web::scope("/v1")
                .route("/models", web::get().to(models::list_models))
                .route("/providers", web::get().to(models::list_providers))
                .route(
                    "/chat/completions",
                    web::post().to(chat::chat_completions),
                ),
        );
}
