use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use scribeline::application::ports::{LlmClient, LlmClientError};
use scribeline::infrastructure::llm::create_chat_client;
use scribeline::presentation::config::{LlmProvider, LlmSettings};

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, HeaderMap, serde_json::Value)>>>,
}

async fn start_mock_chat_server(
    path: &'static str,
    response_status: u16,
    response_body: &'static str,
) -> (String, Seen, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let seen = Seen::default();

    let app = Router::new()
        .route(
            path,
            post(
                move |State(seen): State<Seen>,
                      uri: Uri,
                      headers: HeaderMap,
                      axum::Json(body): axum::Json<serde_json::Value>| async move {
                    seen.requests
                        .lock()
                        .unwrap()
                        .push((uri.to_string(), headers, body));
                    let status = StatusCode::from_u16(response_status).unwrap();
                    (status, response_body).into_response()
                },
            ),
        )
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (base_url, seen, shutdown_tx)
}

fn settings(provider: LlmProvider, base_url: Option<String>) -> LlmSettings {
    LlmSettings {
        provider,
        api_key: "llm-key".to_string(),
        chat_model: "gpt-4o-mini".to_string(),
        base_url,
        azure_endpoint: None,
        max_tokens: 512,
        temperature: 0.0,
        timeout_secs: 5,
    }
}

const ANSWER: &str = r#"{"choices": [{"message": {"role": "assistant", "content": "你好，我是小明。"}}]}"#;

#[tokio::test]
async fn given_openai_settings_when_completing_then_prompt_is_system_message_and_text_is_user_message() {
    let (base_url, seen, shutdown_tx) =
        start_mock_chat_server("/v1/chat/completions", 200, ANSWER).await;
    let client = create_chat_client(&settings(
        LlmProvider::OpenAi,
        Some(format!("{}/v1/", base_url)),
    ))
    .unwrap();

    let answer = client.complete("Add punctuation.", "你好我是小明").await.unwrap();

    assert_eq!(answer, "你好，我是小明。");
    let requests = seen.requests.lock().unwrap();
    let (_, headers, body) = &requests[0];
    assert_eq!(headers["authorization"], "Bearer llm-key");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "Add punctuation.");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "你好我是小明");
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_azure_settings_when_completing_then_deployment_path_and_api_key_header_are_used() {
    let (base_url, seen, shutdown_tx) = start_mock_chat_server(
        "/openai/deployments/gpt-4o-mini/chat/completions",
        200,
        ANSWER,
    )
    .await;
    let mut azure = settings(LlmProvider::Azure, None);
    azure.azure_endpoint = Some(base_url);
    let client = create_chat_client(&azure).unwrap();

    client.complete("Add punctuation.", "你好").await.unwrap();

    let requests = seen.requests.lock().unwrap();
    let (uri, headers, _) = &requests[0];
    assert!(uri.ends_with("?api-version=2024-06-01"));
    assert_eq!(headers["api-key"], "llm-key");
    assert!(headers.get("authorization").is_none());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_429_when_completing_then_rate_limited() {
    let (base_url, _, shutdown_tx) =
        start_mock_chat_server("/chat/completions", 429, "slow down").await;
    let client = create_chat_client(&settings(LlmProvider::Compatible, Some(base_url))).unwrap();

    let result = client.complete("p", "t").await;

    assert!(matches!(result, Err(LlmClientError::RateLimited)));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_server_error_when_completing_then_api_request_failed_with_status() {
    let (base_url, _, shutdown_tx) =
        start_mock_chat_server("/chat/completions", 500, "boom").await;
    let client = create_chat_client(&settings(LlmProvider::Compatible, Some(base_url))).unwrap();

    let result = client.complete("p", "t").await;

    assert!(matches!(result, Err(LlmClientError::ApiRequestFailed(m)) if m.contains("500")));
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_empty_choices_when_completing_then_invalid_response() {
    let (base_url, _, shutdown_tx) =
        start_mock_chat_server("/chat/completions", 200, r#"{"choices": []}"#).await;
    let client = create_chat_client(&settings(LlmProvider::Compatible, Some(base_url))).unwrap();

    let result = client.complete("p", "t").await;

    assert!(matches!(result, Err(LlmClientError::InvalidResponse(_))));
    shutdown_tx.send(()).ok();
}

#[test]
fn given_compatible_provider_without_base_url_when_created_then_rejected() {
    assert!(matches!(
        create_chat_client(&settings(LlmProvider::Compatible, None)),
        Err(LlmClientError::Misconfigured(m)) if m.contains("base_url")
    ));
    assert!(matches!(
        create_chat_client(&settings(LlmProvider::Azure, None)),
        Err(LlmClientError::Misconfigured(m)) if m.contains("azure_endpoint")
    ));
}
