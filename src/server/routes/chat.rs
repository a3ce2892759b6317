//! Chat completion endpoint

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};

use crate::core::types::{ChatCompletionRequest, RequestContext};
use crate::server::state::AppState;
use crate::utils::GatewayError;

/// Build the request context from identity headers
///
/// Both headers are optional and arrive already resolved by the
/// authenticating reverse proxy.
fn context_from_headers(request: &HttpRequest) -> RequestContext {
    let header_value = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(String::from)
    };
    RequestContext::new(header_value("x-project-id"), header_value("x-api-key-id"))
}

/// `POST /v1/chat/completions`
pub async fn chat_completions(
    state: web::Data<AppState>,
    http_request: HttpRequest,
    body: web::Json<ChatCompletionRequest>,
) -> Result<HttpResponse, GatewayError> {
    let request = body.into_inner();
    let context = context_from_headers(&http_request);

    if request.stream {
        let stream = state
            .router
            .chat_completion_stream(request, context)
            .await?;
        Ok(HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "text/event-stream"))
            .insert_header((header::CACHE_CONTROL, "no-cache"))
            .insert_header((header::CONNECTION, "keep-alive"))
            .streaming(stream))
    } else {
        let response = state.router.chat_completion(request, context).await?;
        Ok(HttpResponse::Ok().json(response))
    }
}
