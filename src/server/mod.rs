//! HTTP server.
//!
//! Four POST endpoints backing the interview frontend, plus a health
//! check. Every handler is a thin pass-through to one gateway:
//! validation, one upstream call, one JSON (or audio) response.
//! Upstream failures become a generic 500 with the detail logged
//! server-side.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::assess::{self, AssessError};
use crate::classify::{self, ClassifyError};
use crate::contacts::{ContactRecord, ContactStore};
use crate::provider::LanguageModel;
use crate::speech::SpeechGateway;

/// Shared handler state. Each field is independently testable.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn LanguageModel>,
    pub speech: Arc<SpeechGateway>,
    pub contacts: Arc<dyn ContactStore>,
}

/// Build the application router. Routes are POST-only; axum answers
/// other methods with 405 on its own.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/speak", post(speak))
        .route("/api/classify", post(classify_text))
        .route("/api/query", post(query))
        .route("/api/subscribe", post(subscribe))
        .route("/health", get(health))
        // The dev frontend is served from a different origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "ok": false, "error": message }))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true, "service": "burncheck" }))
}

// ── /api/speak ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SpeakRequest {
    input: Option<String>,
    voice: Option<String>,
    instructions: Option<String>,
}

/// Synthesize question audio, cache-first. Responds with raw MP3
/// bytes and an `x-cache: hit|miss` header.
async fn speak(State(state): State<AppState>, Json(req): Json<SpeakRequest>) -> Response {
    let Some(input) = req.input.filter(|s| !s.trim().is_empty()) else {
        return bad_request("missing or invalid 'input' field");
    };

    match state
        .speech
        .speak(&input, req.voice.as_deref(), req.instructions.as_deref())
        .await
    {
        Ok(audio) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "audio/mpeg")
            .header("x-cache", audio.cache.as_str())
            .body(Body::from(audio.bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            error!("speech synthesis failed: {e}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// ── /api/classify ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    text: Option<String>,
    options: Option<Vec<String>>,
}

async fn classify_text(State(state): State<AppState>, Json(req): Json<ClassifyRequest>) -> Response {
    let text = req.text.unwrap_or_default();
    let options = req.options.unwrap_or_default();

    match classify::classify(state.model.as_ref(), &text, &options).await {
        Ok(c) => Json(json!({
            "ok": true,
            "choice": c.choice,
            "reasoning": c.reasoning,
            "finish_reason": c.finish_reason,
            "raw_text": c.raw_text,
            "raw": c.raw,
        }))
        .into_response(),
        Err(e @ (ClassifyError::InvalidText | ClassifyError::InvalidOptions)) => {
            bad_request(&e.to_string())
        }
        Err(ClassifyError::Upstream(e)) => {
            error!("classification failed: {e}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// ── /api/query ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QueryRequest {
    q: Option<String>,
}

/// Score a full interview transcript. The response's `text` field is
/// the JSON string of the result schema; range validation and parsing
/// stay with the caller.
async fn query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Response {
    let q = req.q.unwrap_or_default();

    match assess::score_transcript(state.model.as_ref(), &q).await {
        Ok(output) => Json(json!({
            "ok": true,
            "query": q,
            "text": output.text,
            "finish_reason": output.finish_reason,
            "raw": output.raw,
        }))
        .into_response(),
        Err(e @ AssessError::InvalidTranscript) => bad_request(&e.to_string()),
        Err(AssessError::Upstream(e)) => {
            error!("scoring failed: {e}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// ── /api/subscribe ───────────────────────────────────────────────

/// Capture a contact row. Email is required; everything else is
/// optional and stored as-is. No idempotency key, so client retries
/// can duplicate rows.
async fn subscribe(State(state): State<AppState>, Json(record): Json<ContactRecord>) -> Response {
    if record.email.as_deref().is_none_or(|e| e.trim().is_empty()) {
        return bad_request("email required");
    }

    match state.contacts.insert(&record).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => {
            error!("contact insert failed: {e:#}");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "db error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::contacts::MemoryContacts;
    use crate::provider::mock::{MockSynthesizer, ScriptedModel};
    use crate::speech::cache::AudioCache;

    fn test_state(model: ScriptedModel) -> (AppState, Arc<MemoryContacts>) {
        let contacts = Arc::new(MemoryContacts::new());
        let state = AppState {
            model: Arc::new(model),
            speech: Arc::new(SpeechGateway::new(
                Arc::new(MockSynthesizer::new()),
                AudioCache::in_memory(100).unwrap(),
            )),
            contacts: contacts.clone(),
        };
        (state, contacts)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_on_post_route_is_405() {
        let (state, _) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/api/classify")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (state, _) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn speak_returns_audio_with_cache_header() {
        let (state, _) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(post_json("/api/speak", json!({ "input": "hello there" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "audio/mpeg"
        );
        assert_eq!(response.headers().get("x-cache").unwrap(), "miss");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!bytes.is_empty());

        // Same input again: served from cache.
        let response = app
            .oneshot(post_json("/api/speak", json!({ "input": "hello there" })))
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-cache").unwrap(), "hit");
    }

    #[tokio::test]
    async fn speak_rejects_empty_input() {
        let (state, _) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json("/api/speak", json!({ "input": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn classify_happy_path() {
        let (state, _) = test_state(ScriptedModel::new(vec![
            r#"{"choice":"energy","reasoning":"tiredness theme"}"#,
        ]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json(
                "/api/classify",
                json!({ "text": "so tired", "options": ["patience", "energy", "thinking"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["choice"], json!("energy"));
        assert_eq!(body["reasoning"], json!("tiredness theme"));
    }

    #[tokio::test]
    async fn classify_missing_text_is_400() {
        let (state, _) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json("/api/classify", json!({ "options": ["a"] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn classify_upstream_failure_is_500() {
        let (state, _) = test_state(ScriptedModel::failing());
        let app = create_router(state);
        let response = app
            .oneshot(post_json(
                "/api/classify",
                json!({ "text": "t", "options": ["a"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("Internal server error"));
    }

    #[tokio::test]
    async fn classify_null_choice_still_ok() {
        let (state, _) = test_state(ScriptedModel::new(vec!["no structured output here"]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json(
                "/api/classify",
                json!({ "text": "t", "options": ["a"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["choice"], Value::Null);
        assert_eq!(body["raw_text"], json!("no structured output here"));
    }

    #[tokio::test]
    async fn query_returns_schema_text() {
        let score = r###"{"score_percent":55,"evaluation_markdown":"## Notes"}"###;
        let (state, _) = test_state(ScriptedModel::new(vec![score]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json("/api/query", json!({ "q": "Q1: x\nA1: y" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["query"], json!("Q1: x\nA1: y"));
        assert_eq!(body["text"], json!(score));
    }

    #[tokio::test]
    async fn query_missing_q_is_400() {
        let (state, _) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json("/api/query", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn subscribe_requires_email() {
        let (state, contacts) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json("/api/subscribe", json!({ "phone": "5558675309" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(contacts.records().is_empty());
    }

    #[tokio::test]
    async fn subscribe_inserts_row() {
        let (state, contacts) = test_state(ScriptedModel::new(vec![]));
        let app = create_router(state);
        let response = app
            .oneshot(post_json(
                "/api/subscribe",
                json!({ "email": "a@b.co", "first_name": "Ana" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], json!(true));

        let records = contacts.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email.as_deref(), Some("a@b.co"));
        assert_eq!(records[0].first_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn subscribe_store_failure_is_500() {
        let state = AppState {
            model: Arc::new(ScriptedModel::new(vec![])),
            speech: Arc::new(SpeechGateway::new(
                Arc::new(MockSynthesizer::new()),
                AudioCache::in_memory(100).unwrap(),
            )),
            contacts: Arc::new(MemoryContacts::failing()),
        };
        let app = create_router(state);
        let response = app
            .oneshot(post_json("/api/subscribe", json!({ "email": "a@b.co" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], json!("db error"));
    }
}
