use super::*;
use crate::config::{ChatConfig, ElasticsearchConfig, OpenAiConfig};
use std::path::PathBuf;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(openai_url: &str, elastic_url: &str) -> Config {
    Config {
        elastic_cloud_password: "pw".to_string(),
        index_name: "kb1".to_string(),
        llm_model: "gpt-4o-mini".to_string(),
        openai_api_key: "sk-test".to_string(),
        elasticsearch: ElasticsearchConfig {
            url: elastic_url.to_string(),
            username: "elastic".to_string(),
        },
        openai: OpenAiConfig {
            base_url: openai_url.to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        },
        chat: ChatConfig::default(),
        base_dir: PathBuf::new(),
    }
}

async fn mock_backends(openai: &MockServer, elastic: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]
        })))
        .mount(openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": "Chunking splits text into windows."
            }}]
        })))
        .mount(openai)
        .await;

    Mock::given(method("HEAD"))
        .and(path_regex(r"^/chat-history-[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(404))
        .mount(elastic)
        .await;
    Mock::given(method("POST"))
        .and(path("/kb1/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hits": {
                "hits": [
                    {"_score": 0.9, "_source": {"source": "a.pdf", "content": "alpha"}}
                ]
            }
        })))
        .mount(elastic)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/chat-history-[0-9a-f-]+/_doc$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "result": "created"
        })))
        .mount(elastic)
        .await;
}

async fn spawn_app(config: Config) -> String {
    let session = tokio::task::spawn_blocking(move || Session::start(&config))
        .await
        .expect("task should join")
        .expect("session should start");

    let app = router(AppState::new(session));
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });

    format!("http://{}", addr)
}

fn post_chat(base: &str, route: &str, text: &str) -> Result<String, ureq::Error> {
    let url = format!("{}{}", base, route);
    let body = serde_json::json!({ "text": text }).to_string();
    ureq::post(&url)
        .header("Content-Type", "application/json")
        .send(&body)
        .and_then(|mut resp| resp.body_mut().read_to_string())
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_route_returns_the_answer_with_sources() {
    let openai = MockServer::start().await;
    let elastic = MockServer::start().await;
    mock_backends(&openai, &elastic).await;

    let base = spawn_app(test_config(&openai.uri(), &elastic.uri())).await;

    let body = tokio::task::spawn_blocking(move || post_chat(&base, "/chat/", "What is chunking?"))
        .await
        .expect("task should join")
        .expect("request should succeed");

    let parsed: serde_json::Value = serde_json::from_str(&body).expect("should parse");
    assert_eq!(
        parsed["response"],
        "Chunking splits text into windows.\n\nSources: a.pdf"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_route_without_trailing_slash_also_works() {
    let openai = MockServer::start().await;
    let elastic = MockServer::start().await;
    mock_backends(&openai, &elastic).await;

    let base = spawn_app(test_config(&openai.uri(), &elastic.uri())).await;

    let body = tokio::task::spawn_blocking(move || post_chat(&base, "/chat", "What is chunking?"))
        .await
        .expect("task should join")
        .expect("request should succeed");

    let parsed: serde_json::Value = serde_json::from_str(&body).expect("should parse");
    assert_eq!(
        parsed["response"],
        "Chunking splits text into windows.\n\nSources: a.pdf"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_request_confirms_and_deletes_history() {
    let openai = MockServer::start().await;
    let elastic = MockServer::start().await;
    mock_backends(&openai, &elastic).await;

    Mock::given(method("DELETE"))
        .and(path_regex(r"^/chat-history-[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&elastic)
        .await;

    let base = spawn_app(test_config(&openai.uri(), &elastic.uri())).await;

    let body = tokio::task::spawn_blocking(move || post_chat(&base, "/chat/", "new conversation"))
        .await
        .expect("task should join")
        .expect("request should succeed");

    let parsed: serde_json::Value = serde_json::from_str(&body).expect("should parse");
    assert_eq!(parsed["response"], "Conversation reset successfully.");
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_rejected() {
    let openai = MockServer::start().await;
    let elastic = MockServer::start().await;
    mock_backends(&openai, &elastic).await;

    let base = spawn_app(test_config(&openai.uri(), &elastic.uri())).await;

    let result = tokio::task::spawn_blocking(move || {
        ureq::post(&format!("{}/chat/", base))
            .header("Content-Type", "application/json")
            .send("{\"message\": \"wrong field\"}")
    })
    .await
    .expect("task should join");

    assert!(matches!(
        result,
        Err(ureq::Error::StatusCode(code)) if code >= 400 && code < 500
    ));
}
