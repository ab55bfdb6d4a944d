use super::*;
use crate::config::{ChatConfig, ElasticsearchConfig, OpenAiConfig};
use std::path::PathBuf;
use wiremock::matchers::{body_string_contains, method, path};
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

fn retrieved(source: &str, content: &str) -> RetrievedChunk {
    RetrievedChunk {
        source: source.to_string(),
        content: content.to_string(),
        score: 0.5,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

async fn mock_embedding(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]
        })))
        .mount(server)
        .await;
}

#[test]
fn display_text_appends_sorted_sources() {
    let answer = ChatAnswer {
        answer: "Chunking splits text.".to_string(),
        sources: vec!["a.pdf".to_string(), "b.pdf".to_string()],
    };

    assert_eq!(
        answer.display_text(),
        "Chunking splits text.\n\nSources: a.pdf; b.pdf"
    );
}

#[test]
fn display_text_without_sources_is_bare() {
    let answer = ChatAnswer {
        answer: "Hmm, I'm not sure.".to_string(),
        sources: Vec::new(),
    };

    assert_eq!(answer.display_text(), "Hmm, I'm not sure.");
}

#[test]
fn collect_sources_dedupes_and_sorts() {
    let chunks = vec![
        retrieved("b.pdf", "beta"),
        retrieved("a.pdf", "alpha"),
        retrieved("a.pdf", "alpha again"),
    ];

    assert_eq!(collect_sources(&chunks), ["a.pdf", "b.pdf"]);
}

#[test]
fn format_docs_tags_chunks_by_position() {
    let chunks = vec![retrieved("a.pdf", "alpha"), retrieved("b.pdf", "beta")];

    assert_eq!(
        format_docs(&chunks),
        "<doc id='0'>alpha</doc>\n<doc id='1'>beta</doc>"
    );
}

#[test]
fn format_chat_history_labels_roles() {
    let history = vec![
        ChatMessage {
            role: Role::User,
            content: "What is chunking?".to_string(),
        },
        ChatMessage {
            role: Role::Assistant,
            content: "Splitting text into windows.".to_string(),
        },
    ];

    assert_eq!(
        format_chat_history(&history),
        "Human: What is chunking?\nAssistant: Splitting text into windows."
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn first_question_skips_the_rephrase_call() {
    let openai = MockServer::start().await;
    let elastic = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Standalone Question"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("<context>"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "Chunking splits text into windows.",
        )))
        .expect(1)
        .mount(&openai)
        .await;
    mock_embedding(&openai).await;

    Mock::given(method("POST"))
        .and(path("/kb1/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hits": {
                "hits": [
                    {"_score": 0.9, "_source": {"source": "b.pdf", "content": "beta"}},
                    {"_score": 0.8, "_source": {"source": "a.pdf", "content": "alpha"}},
                    {"_score": 0.7, "_source": {"source": "a.pdf", "content": "alpha again"}}
                ]
            }
        })))
        .mount(&elastic)
        .await;

    let chain =
        RetrievalChain::new(&test_config(&openai.uri(), &elastic.uri())).expect("should create");
    let query_id = Uuid::new_v4();

    let answer =
        tokio::task::spawn_blocking(move || chain.answer("What is chunking?", &[], query_id))
            .await
            .expect("task should join")
            .expect("answer should succeed");

    assert_eq!(answer.answer, "Chunking splits text into windows.");
    assert_eq!(answer.sources, ["a.pdf", "b.pdf"]);
    assert_eq!(
        answer.display_text(),
        "Chunking splits text into windows.\n\nSources: a.pdf; b.pdf"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn follow_up_question_is_condensed_first() {
    let openai = MockServer::start().await;
    let elastic = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Follow Up Input: What about overlap?"))
        .and(body_string_contains("Human: What is chunking?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "How does chunk overlap work?",
        )))
        .expect(1)
        .mount(&openai)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("<context>"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "Adjacent chunks share characters.",
        )))
        .expect(1)
        .mount(&openai)
        .await;
    mock_embedding(&openai).await;

    Mock::given(method("POST"))
        .and(path("/kb1/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hits": {
                "hits": [
                    {"_score": 0.9, "_source": {"source": "a.pdf", "content": "alpha"}}
                ]
            }
        })))
        .mount(&elastic)
        .await;

    let chain =
        RetrievalChain::new(&test_config(&openai.uri(), &elastic.uri())).expect("should create");
    let history = vec![
        ChatMessage {
            role: Role::User,
            content: "What is chunking?".to_string(),
        },
        ChatMessage {
            role: Role::Assistant,
            content: "Splitting text into windows.".to_string(),
        },
    ];
    let query_id = Uuid::new_v4();

    let answer = tokio::task::spawn_blocking(move || {
        chain.answer("What about overlap?", &history, query_id)
    })
    .await
    .expect("task should join")
    .expect("answer should succeed");

    assert_eq!(answer.answer, "Adjacent chunks share characters.");
    assert_eq!(answer.sources, ["a.pdf"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_retrieval_abstains_without_generating() {
    let openai = MockServer::start().await;
    let elastic = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("unused")))
        .expect(0)
        .mount(&openai)
        .await;
    mock_embedding(&openai).await;

    Mock::given(method("POST"))
        .and(path("/kb1/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hits": { "hits": [] }
        })))
        .mount(&elastic)
        .await;

    let chain =
        RetrievalChain::new(&test_config(&openai.uri(), &elastic.uri())).expect("should create");
    let query_id = Uuid::new_v4();

    let answer = tokio::task::spawn_blocking(move || chain.answer("Anything?", &[], query_id))
        .await
        .expect("task should join")
        .expect("answer should succeed");

    assert_eq!(answer.answer, FALLBACK_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.display_text(), "Hmm, I'm not sure.");
}
