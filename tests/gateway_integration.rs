//! End-to-end tests against a mocked upstream.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tollgate::config::{GatewayConfig, ProviderSettings};
use tollgate::core::types::FinishReason;
use tollgate::server::{self, AppState};
use tollgate::storage::MemoryLogStore;

fn test_state(openai_base: &str, timeout_secs: u64) -> (AppState, Arc<MemoryLogStore>) {
    let mut config = GatewayConfig::default();
    config.upstream.timeout_secs = timeout_secs;
    config.upstream.openai = ProviderSettings {
        api_key: Some("sk-test".to_string()),
        api_base: Some(openai_base.to_string()),
    };
    let store = Arc::new(MemoryLogStore::new());
    let state = server::build_state(config, store.clone());
    (state, store)
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(server::json_config())
                .configure(tollgate::server::routes::configure),
        )
        .await
    };
}

fn completion_body() -> Value {
    json!({
        "model": "gpt-4",
        "messages": [{"role": "user", "content": "Say hello"}]
    })
}

fn upstream_response(usage: Option<Value>) -> Value {
    let mut body = json!({
        "id": "upstream-id",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4-0613",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello there!"},
            "finish_reason": "stop"
        }]
    });
    if let Some(usage) = usage {
        body["usage"] = usage;
    }
    body
}

#[actix_web::test]
async fn root_returns_ok_message() {
    let (state, _store) = test_state("http://localhost:1", 5);
    let app = init_app!(state);

    let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = test::read_body(response).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(r#""message":"OK""#), "body was {text}");
}

#[actix_web::test]
async fn models_and_providers_are_listed() {
    let (state, _store) = test_state("http://localhost:1", 5);
    let app = init_app!(state);

    let response =
        test::call_service(&app, test::TestRequest::get().uri("/v1/models").to_request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    let models = body["data"].as_array().unwrap();
    assert!(models.iter().any(|m| m["id"] == "gpt-4"));

    let response = test::call_service(
        &app,
        test::TestRequest::get().uri("/v1/providers").to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let providers: Value = test::read_body_json(response).await;
    let openai = providers
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == "openai")
        .unwrap();
    assert_eq!(openai["configured"], true);
    assert!(openai["models"].as_array().unwrap().iter().any(|m| m == "gpt-4"));
}

#[actix_web::test]
async fn unknown_model_is_rejected_before_any_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let (state, store) = test_state(&upstream.uri(), 5);
    let app = init_app!(state);

    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(json!({
            "model": "does-not-exist",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert!(
        body["message"].as_str().unwrap().contains("does-not-exist"),
        "body was {body}"
    );

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].requested_model, "does-not-exist");
    assert!(entries[0].provider.is_none());
    assert_eq!(entries[0].finish_reason, FinishReason::Error);
}

#[actix_web::test]
async fn buffered_completion_books_upstream_usage() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_response(Some(
            json!({"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}),
        ))))
        .expect(1)
        .mount(&upstream)
        .await;

    let (state, store) = test_state(&upstream.uri(), 5);
    let app = init_app!(state);

    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .insert_header(("x-project-id", "proj-42"))
        .set_json(completion_body())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["choices"][0]["message"]["content"], "Hello there!");
    assert_eq!(body["usage"]["prompt_tokens"], 100);
    assert_eq!(body["usage"]["completion_tokens"], 50);
    assert_eq!(body["usage"]["total_tokens"], 150);

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.project_id.as_deref(), Some("proj-42"));
    assert_eq!(entry.upstream_model.as_deref(), Some("gpt-4-0613"));
    assert_eq!(entry.prompt_tokens, Some(100));
    assert_eq!(entry.completion_tokens, Some(50));
    assert_eq!(entry.input_cost, Some(0.001));
    assert_eq!(entry.output_cost, Some(0.0015));
    assert_eq!(entry.total_cost, Some(0.0025));
    assert_eq!(entry.finish_reason, FinishReason::Stop);
}

#[actix_web::test]
async fn buffered_completion_estimates_when_usage_is_missing() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_response(None)))
        .mount(&upstream)
        .await;

    let (state, store) = test_state(&upstream.uri(), 5);
    let app = init_app!(state);

    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(completion_body())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = test::read_body_json(response).await;
    assert!(body["usage"]["prompt_tokens"].as_u64().unwrap() > 0);
    assert!(body["usage"]["completion_tokens"].as_u64().unwrap() > 0);

    let entry = &store.entries()[0];
    assert!(entry.prompt_tokens.is_some());
    assert!(entry.completion_tokens.is_some());
    assert!(entry.total_cost.is_some());
}

#[actix_web::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": {"message": "internal upstream failure"}})),
        )
        .mount(&upstream)
        .await;

    let (state, store) = test_state(&upstream.uri(), 5);
    let app = init_app!(state);

    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(completion_body())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("internal upstream failure")
    );

    let entry = &store.entries()[0];
    assert_eq!(entry.finish_reason, FinishReason::Error);
    assert!(entry.error.is_some());
}

#[actix_web::test]
async fn slow_upstream_times_out_with_504() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(upstream_response(None))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&upstream)
        .await;

    let (state, store) = test_state(&upstream.uri(), 1);
    let app = init_app!(state);

    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(completion_body())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    let entry = &store.entries()[0];
    assert_eq!(entry.finish_reason, FinishReason::Timeout);
}

fn sse_fixture() -> String {
    let chunks = [
        json!({"id":"up-1","object":"chat.completion.chunk","created":1,"model":"gpt-4-0613",
            "choices":[{"index":0,"delta":{"role":"assistant","content":"Hello"},"finish_reason":null}]}),
        json!({"id":"up-1","object":"chat.completion.chunk","created":1,"model":"gpt-4-0613",
            "choices":[{"index":0,"delta":{"content":" there!"},"finish_reason":null}]}),
        json!({"id":"up-1","object":"chat.completion.chunk","created":1,"model":"gpt-4-0613",
            "choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}),
    ];
    let mut body = String::new();
    for chunk in &chunks {
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[actix_web::test]
async fn streaming_relays_chunks_and_accounts_once() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_fixture(), "text/event-stream"),
        )
        .mount(&upstream)
        .await;

    let (state, store) = test_state(&upstream.uri(), 5);
    let app = init_app!(state);

    let mut body = completion_body();
    body["stream"] = json!(true);
    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(body)
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let body = test::read_body(response).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    let frames: Vec<&str> = text
        .split("\n\n")
        .filter(|frame| !frame.is_empty())
        .collect();
    assert_eq!(frames.last(), Some(&"data: [DONE]"));

    // Relayed chunks carry the gateway's identity, not the upstream's.
    let mut relayed = String::new();
    for frame in &frames[..frames.len() - 1] {
        let payload = frame.strip_prefix("data: ").unwrap();
        let chunk: Value = serde_json::from_str(payload).unwrap();
        assert!(chunk["id"].as_str().unwrap().starts_with("chatcmpl-"));
        assert_eq!(chunk["model"], "gpt-4");
        if let Some(content) = chunk["choices"][0]["delta"]["content"].as_str() {
            relayed.push_str(content);
        }
    }
    assert_eq!(relayed, "Hello there!");

    let entries = store.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.finish_reason, FinishReason::Stop);
    assert!(entry.prompt_tokens.is_some());
    assert!(entry.completion_tokens.is_some());
    assert!(entry.total_cost.is_some());
}

#[actix_web::test]
async fn streaming_and_buffered_account_the_same_tokens() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stream/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_fixture(), "text/event-stream"),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/buffered/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_response(None)))
        .mount(&upstream)
        .await;

    let (stream_state, stream_store) = test_state(&format!("{}/stream", upstream.uri()), 5);
    let (buffered_state, buffered_store) =
        test_state(&format!("{}/buffered", upstream.uri()), 5);

    let app = init_app!(stream_state);
    let mut body = completion_body();
    body["stream"] = json!(true);
    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(body)
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    test::read_body(response).await;

    let app = init_app!(buffered_state);
    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(completion_body())
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    test::read_body(response).await;

    // Both paths saw the same prompt and the same completion text, so
    // text-derived counts must agree.
    let streamed = &stream_store.entries()[0];
    let buffered = &buffered_store.entries()[0];
    assert_eq!(streamed.prompt_tokens, buffered.prompt_tokens);
    assert_eq!(streamed.completion_tokens, buffered.completion_tokens);
    assert_eq!(streamed.total_cost, buffered.total_cost);
}

#[actix_web::test]
async fn streaming_unsupported_model_is_rejected() {
    let (state, store) = test_state("http://localhost:1", 5);
    let app = init_app!(state);

    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .set_json(json!({
            "model": "o1-mini",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("o1-mini"));
    assert_eq!(store.entries().len(), 1);
}

#[actix_web::test]
async fn malformed_body_gets_message_error_shape() {
    let (state, _store) = test_state("http://localhost:1", 5);
    let app = init_app!(state);

    let request = test::TestRequest::post()
        .uri("/v1/chat/completions")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not valid json")
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert!(body["message"].is_string());
}
