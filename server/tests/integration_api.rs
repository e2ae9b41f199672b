use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use ta_answer::{LanguageModelClient, LlmError, OcrBackend, Pipeline, PipelineConfig, FALLBACK_ANSWER};
use ta_core::corpus::parse_discourse_posts;
use ta_core::Index;
use tower::ServiceExt;

const POST_URL: &str = "https://discourse.onlinedegree.iitm.ac.in/t/ga5-question-8-clarification/155939";

struct CannedLlm(Result<&'static str, fn() -> LlmError>);

impl LanguageModelClient for CannedLlm {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        match self.0 {
            Ok(text) => Ok(text.to_string()),
            Err(make) => Err(make()),
        }
    }
}

fn build_tiny_app(llm: CannedLlm) -> Router {
    let posts = parse_discourse_posts(
        br#"[{"id": 155939, "title": "GA5 Question 8 Clarification",
              "url": "https://discourse.onlinedegree.iitm.ac.in/t/ga5-question-8-clarification/155939",
              "raw": "Use gpt-3.5-turbo-0125, not gpt-4o-mini, for this question.",
              "created_at": "2025-04-10T08:00:00Z", "author": "s.anand"}]"#,
    )
    .unwrap();
    let index = Arc::new(Index::build(posts.documents));
    let pipeline = Pipeline::new(index, llm, OcrBackend::Disabled, PipelineConfig::default());
    ta_server::build_app(Arc::new(pipeline))
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn answers_with_links() {
    let app = build_tiny_app(CannedLlm(Ok(r#"{"answer": "Use gpt-3.5-turbo-0125.", "sources": [1]}"#)));
    let (status, json) = call(
        app,
        post_json("/api/", r#"{"question": "Should I use gpt-4o-mini or gpt-3.5-turbo for the assignment?"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "Use gpt-3.5-turbo-0125.");
    let links = json["links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["url"], POST_URL);
    assert!(links[0]["text"].as_str().unwrap().starts_with("GA5 Question 8"));
}

#[tokio::test]
async fn path_without_trailing_slash_is_served() {
    let app = build_tiny_app(CannedLlm(Ok(r#"{"answer": "ok", "sources": []}"#)));
    let (status, json) = call(app, post_json("/api", r#"{"question": "gpt-4o-mini?"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], "ok");
    assert_eq!(json["links"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unmatched_question_gets_fallback() {
    let app = build_tiny_app(CannedLlm(Ok("unused")));
    let (status, json) = call(app, post_json("/api/", r#"{"question": "Where is the library?"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], FALLBACK_ANSWER);
    assert!(json["links"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_question_is_bad_request() {
    let app = build_tiny_app(CannedLlm(Ok("unused")));
    let (status, json) = call(app.clone(), post_json("/api/", r#"{"image": "abcd"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Question is required");

    let (status, json) = call(app, post_json("/api/", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("question"));
}

#[tokio::test]
async fn unreachable_model_is_bad_gateway_without_detail() {
    let app = build_tiny_app(CannedLlm(Err(|| LlmError::Api { code: 503, message: "backend-secret-detail".into() })));
    let (status, json) = call(app, post_json("/api/", r#"{"question": "gpt-4o-mini or gpt-3.5-turbo?"}"#)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = json["error"].as_str().unwrap();
    assert!(!message.contains("backend-secret-detail"));
}

#[tokio::test]
async fn model_timeout_is_gateway_timeout() {
    let app = build_tiny_app(CannedLlm(Err(|| LlmError::Timeout)));
    let (status, _) = call(app, post_json("/api/", r#"{"question": "gpt-4o-mini or gpt-3.5-turbo?"}"#)).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn health_reports_documents() {
    let app = build_tiny_app(CannedLlm(Ok("unused")));
    let (status, json) = call(app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["documents"], 1);
    assert!(json["timestamp"].as_str().unwrap().contains('T'));
}
