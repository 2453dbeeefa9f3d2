use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use docdigest::{api, config::Config, processing::ProcessingService};
use httpmock::{Method::POST, MockServer};
use serde_json::{Value, json};
use tower::ServiceExt;

const SUMMARY: &str = "The harbor town keeps its lanterns lit through every season.";
const ANSWER: &str = "It is about a harbor town and its orchards.";

fn document(words: usize) -> String {
    (0..words)
        .map(|i| ["harbor", "lantern", "orchard", "quarry", "meadow"][i % 5])
        .collect::<Vec<_>>()
        .join(" ")
}

fn app_for(server: &MockServer) -> Router {
    let config = Config {
        ollama_url: server.base_url(),
        summarization_model: "sum-model".into(),
        qa_model: "qa-model".into(),
        ..Config::default()
    };
    let service = ProcessingService::from_config(&config).expect("service");
    api::create_router(Arc::new(service), config.max_upload_bytes)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn summarize_then_ask_then_clear() {
    let server = MockServer::start_async().await;
    let summarize_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Summary:")
                .json_body_partial(r#"{"model":"sum-model","stream":false}"#);
            then.status(200)
                .json_body(json!({ "response": SUMMARY, "done": true }));
        })
        .await;
    let answer_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .body_contains("Question: What is it about?")
                .json_body_partial(r#"{"model":"qa-model","options":{"num_predict":150}}"#);
            then.status(200)
                .json_body(json!({ "response": ANSWER, "done": true }));
        })
        .await;
    let app = app_for(&server);

    let (status, body) = call(
        &app,
        post_json("/api/answer-question", json!({ "question": "Anything?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().expect("error").starts_with("No content available"));

    let (status, body) = call(
        &app,
        post_json("/api/summarize-text", json!({ "text": document(400) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], SUMMARY);
    assert_eq!(body["original_length"], 400);
    assert_eq!(body["summary_length"], 10);
    summarize_mock.assert_hits_async(1).await;

    let (_, progress) = call(&app, get("/api/progress")).await;
    assert_eq!(progress["stage"], "done");
    assert_eq!(progress["percent"], 100);

    let (status, body) = call(
        &app,
        post_json("/api/answer-question", json!({ "question": "What is it about?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], ANSWER);
    assert_eq!(
        body["history"],
        json!([
            { "role": "user", "content": "What is it about?" },
            { "role": "assistant", "content": ANSWER }
        ])
    );
    answer_mock.assert_hits_async(1).await;

    let (status, body) = call(&app, post_json("/api/clear-chat", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"], json!([]));

    let (_, metrics) = call(&app, get("/api/metrics")).await;
    assert_eq!(metrics["documents_summarized"], 1);
    assert_eq!(metrics["questions_answered"], 1);
    assert_eq!(metrics["failed_requests"], 1);
}

#[tokio::test]
async fn out_of_memory_surfaces_as_service_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(500)
                .body(r#"{"error":"CUDA error: out of memory"}"#);
        })
        .await;
    let app = app_for(&server);

    let (status, body) = call(
        &app,
        post_json("/api/summarize-text", json!({ "text": document(120) })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().expect("error").contains("chunk 1"));

    let (_, progress) = call(&app, get("/api/progress")).await;
    assert_eq!(progress["stage"], "idle");
    assert_eq!(progress["percent"], 0);
}

#[tokio::test]
async fn short_text_and_non_pdf_uploads_are_rejected_without_model_calls() {
    let server = MockServer::start_async().await;
    let generate = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200)
                .json_body(json!({ "response": "unused", "done": true }));
        })
        .await;
    let app = app_for(&server);

    let (status, _) = call(
        &app,
        post_json("/api/summarize-text", json!({ "text": "far too short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let boundary = "docdigest-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nplain text\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/summarize-pdf")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");
    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only PDF files are supported");

    generate.assert_hits_async(0).await;
}
