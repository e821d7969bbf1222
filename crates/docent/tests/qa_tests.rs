//! Integration tests for the question-mining and answering flows

use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docent::auth::UserId;
use docent::config::{GenerationConfig, RetrievalConfig};
use docent::embedding::TextEmbedder;
use docent::generation::ChatClient;
use docent::index::{ChunkRecord, LanceIndex};
use docent::qa;
use docent::streaming::{
    DelimiterFilter, EventReceiver, PassthroughHandler, StreamEvent, channel, run_generation,
};
use docent::testing::MockEmbeddingModel;

fn sse_chunk(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
    )
}

fn sse_body(contents: &[&str]) -> String {
    let mut body: String = contents.iter().map(|c| sse_chunk(c)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn completion_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn chat_client(server: &MockServer) -> ChatClient {
    let config = GenerationConfig {
        api_url: server.uri(),
        timeout_secs: 10,
        ..GenerationConfig::default()
    };
    ChatClient::new(config, "test-key").unwrap()
}

fn collect(rx: EventReceiver) -> Vec<StreamEvent> {
    let mut rx = rx.into_inner();
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn create_index() -> (tempfile::TempDir, Arc<TokioMutex<LanceIndex>>) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut index = LanceIndex::connect(&temp_dir.path().join("index"))
        .await
        .unwrap();
    index.create_chunks_table().await.unwrap();
    (temp_dir, Arc::new(TokioMutex::new(index)))
}

#[tokio::test]
async fn test_ask_documents_streams_answer_with_context() {
    let server = MockServer::start().await;
    let (_tmp, index) = create_index().await;
    let embedder: Arc<dyn TextEmbedder> = Arc::new(MockEmbeddingModel::new());
    let alice = UserId::try_from("alice").unwrap();

    let chunk_text = "Paris is the capital of France.";
    let embedding = embedder.embed(chunk_text).unwrap();
    index
        .lock()
        .await
        .insert_batch(&[ChunkRecord::new(
            &alice,
            "geo-1.txt",
            "geo.txt",
            0,
            chunk_text,
            embedding,
        )])
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .and(body_string_contains("Paris is the capital of France."))
        .and(body_string_contains("SOURCE: geo.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["It is ", "Paris."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let chat = chat_client(&server);
    let (tx, rx) = channel();
    let mut handler = PassthroughHandler::new(tx);

    let outcome = qa::ask_documents(
        &mut handler,
        &chat,
        &index,
        &embedder,
        &RetrievalConfig::default(),
        &alice,
        "What is the capital of France?",
        &[],
    )
    .await
    .unwrap();

    assert_eq!(outcome.answer, "It is Paris.");
    assert_eq!(outcome.sources, vec!["geo.txt".to_string()]);

    drop(handler);
    assert_eq!(
        collect(rx),
        vec![StreamEvent::token("It is "), StreamEvent::token("Paris.")]
    );
}

#[tokio::test]
async fn test_ask_documents_condenses_chat_history() {
    let server = MockServer::start().await;
    let (_tmp, index) = create_index().await;
    let embedder: Arc<dyn TextEmbedder> = Arc::new(MockEmbeddingModel::new());
    let alice = UserId::try_from("alice").unwrap();

    // First call: non-streaming condensation of the follow-up
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": false})))
        .and(body_string_contains("we talked about France"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_response("What is the capital of France?")),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Second call: streaming answer over the condensed question
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": true})))
        .and(body_string_contains("What is the capital of France?"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["Paris"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let chat = chat_client(&server);
    let (tx, _rx) = channel();
    let mut handler = PassthroughHandler::new(tx);

    let outcome = qa::ask_documents(
        &mut handler,
        &chat,
        &index,
        &embedder,
        &RetrievalConfig::default(),
        &alice,
        "and its capital?",
        &["we talked about France".to_string()],
    )
    .await
    .unwrap();

    assert_eq!(outcome.answer, "Paris");
}

#[tokio::test]
async fn test_ask_documents_with_empty_index_still_answers() {
    let server = MockServer::start().await;
    let (_tmp, index) = create_index().await;
    let embedder: Arc<dyn TextEmbedder> = Arc::new(MockEmbeddingModel::new());
    let alice = UserId::try_from("alice").unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["On my own."]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let chat = chat_client(&server);
    let (tx, _rx) = channel();
    let mut handler = PassthroughHandler::new(tx);

    let outcome = qa::ask_documents(
        &mut handler,
        &chat,
        &index,
        &embedder,
        &RetrievalConfig::default(),
        &alice,
        "Anything?",
        &[],
    )
    .await
    .unwrap();

    assert_eq!(outcome.answer, "On my own.");
    assert!(outcome.sources.is_empty());
}

#[tokio::test]
async fn test_mine_questions_streams_filtered_regions() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let doc_path = temp_dir.path().join("homework.txt");
    tokio::fs::write(&doc_path, "Prove the theorem. Then do exercise two.")
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Prove the theorem."))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[
                "###QQQ### Prove: the theorem ###QQQ###",
                "\n",
                "###QQQ### Do: exercise two ###QQQ###",
            ]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let chat = chat_client(&server);
    let (tx, mut rx) = channel();
    let filter = DelimiterFilter::new(tx, "###QQQ###");

    run_generation(filter, async |handler: &mut DelimiterFilter| {
        qa::mine_questions(handler, &chat, &doc_path).await
    })
    .await
    .unwrap();

    assert_eq!(rx.next().await, Some(StreamEvent::flush(" Prove: the theorem ")));
    assert_eq!(rx.next().await, Some(StreamEvent::flush(" Do: exercise two ")));
    assert_eq!(rx.next().await, Some(StreamEvent::EndStream));
    assert_eq!(rx.next().await, None);
}

#[tokio::test]
async fn test_mine_questions_none_marker_is_invisible() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let doc_path = temp_dir.path().join("plain.txt");
    tokio::fs::write(&doc_path, "Just prose, nothing to do.")
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["###NO_LIST###"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let chat = chat_client(&server);
    let (tx, mut rx) = channel();
    let filter = DelimiterFilter::new(tx, "###QQQ###");

    run_generation(filter, async |handler: &mut DelimiterFilter| {
        qa::mine_questions(handler, &chat, &doc_path).await
    })
    .await
    .unwrap();

    assert_eq!(rx.next().await, Some(StreamEvent::EndStream));
    assert_eq!(rx.next().await, None);
}

#[tokio::test]
async fn test_mine_questions_provider_failure_skips_block() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let doc_path = temp_dir.path().join("doc.txt");
    tokio::fs::write(&doc_path, "Some content.").await.unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&server)
        .await;

    let chat = chat_client(&server);
    let (tx, mut rx) = channel();
    let filter = DelimiterFilter::new(tx, "###QQQ###");

    // Per-block failures are skipped; the flow itself succeeds and the
    // stream still terminates.
    run_generation(filter, async |handler: &mut DelimiterFilter| {
        qa::mine_questions(handler, &chat, &doc_path).await
    })
    .await
    .unwrap();

    assert_eq!(rx.next().await, Some(StreamEvent::EndStream));
    assert_eq!(rx.next().await, None);
}

#[tokio::test]
async fn test_mine_questions_unsupported_document_still_ends_stream() {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let doc_path = temp_dir.path().join("deck.pptx");
    tokio::fs::write(&doc_path, "binary").await.unwrap();

    let chat = chat_client(&server);
    let (tx, mut rx) = channel();
    let filter = DelimiterFilter::new(tx, "###QQQ###");

    let result = run_generation(filter, async |handler: &mut DelimiterFilter| {
        qa::mine_questions(handler, &chat, &doc_path).await
    })
    .await;

    assert!(result.is_err());
    assert_eq!(rx.next().await, Some(StreamEvent::EndStream));
    assert_eq!(rx.next().await, None);
}
