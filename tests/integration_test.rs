//! Integration tests for the retrieval pipeline and HTTP surface.
//!
//! A fake generator stands in for the language model, so nothing here needs
//! network access.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine as _;
use tower::ServiceExt;

use rag_chat::api;
use rag_chat::auth::hash_password;
use rag_chat::config::{AdminCredentials, Config};
use rag_chat::engine::RagEngine;
use rag_chat::ingest::extract::FileExtractor;
use rag_chat::llm::Generator;
use rag_chat::models::DocumentId;
use rag_chat::state::AppState;
use rag_chat::store::DocumentStore;

/// Replies with a fixed answer and remembers the last prompt.
#[derive(Default)]
struct ScriptedGenerator {
    last_prompt: parking_lot::Mutex<Option<String>>,
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        *self.last_prompt.lock() = Some(prompt.to_string());
        Ok("Deadline: January 15\n\nApply <early>.".to_string())
    }
}

fn config_in(dir: &tempfile::TempDir) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    }
}

fn open_engine(dir: &tempfile::TempDir) -> RagEngine {
    RagEngine::open(
        &config_in(dir),
        Arc::new(ScriptedGenerator::default()),
        Arc::new(FileExtractor),
    )
    .unwrap()
}

#[test]
fn test_seeded_deadline_query_ranks_admission_first() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(&dir);

    let results = engine.search_with("When is the application deadline?", 5, 0.1);
    assert!(!results.is_empty());
    assert_eq!(results[0].document.title, "Admission Requirements");
    assert!(results[0].score > 0.1);

    let (prompt, _) = engine.build_prompt("When is the application deadline?", &[]);
    assert!(prompt.contains(&results[0].document.content));
}

#[test]
fn test_search_respects_top_k_and_min_score() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(&dir);
    for i in 0..8 {
        engine
            .add_document(
                &format!("Library note {i}"),
                &format!("The library is open late during exam week {i}"),
                "manual",
            )
            .unwrap();
    }

    let results = engine.search_with("library exam week", 5, 0.1);
    assert!(results.len() <= 5);
    assert!(results.iter().all(|r| r.score > 0.1));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_delete_removes_document_from_results() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(&dir);
    let rows_before = engine.vector_rows();

    let admission = engine.search("application deadline")[0].document.id;
    engine.delete_document(admission).unwrap();

    assert_eq!(engine.vector_rows(), rows_before - 1);
    assert!(engine
        .search_with("application deadline transcripts", 5, 0.0)
        .iter()
        .all(|r| r.document.id != admission));
}

#[test]
fn test_add_grows_rows_and_ids_stay_stable() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(&dir);

    let first = engine
        .add_document("Parking", "Parking permits are sold online", "manual")
        .unwrap();
    assert_eq!(engine.vector_rows(), 3);
    engine.delete_document(DocumentId(0)).unwrap();
    let second = engine
        .add_document("Housing", "Dormitory applications open in March", "manual")
        .unwrap();

    assert_eq!(first, DocumentId(2));
    assert_eq!(second, DocumentId(3));
    assert_eq!(engine.search("parking permits")[0].document.id, first);
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = open_engine(&dir);
        engine
            .add_document("Dining", "The dining hall serves vegan meals", "manual")
            .unwrap();
        engine.delete_document(DocumentId(1)).unwrap();
    }

    let before = DocumentStore::load(&config_in(&dir).documents_path());
    let engine = open_engine(&dir);
    let after = DocumentStore::load(&config_in(&dir).documents_path());

    assert_eq!(before.documents(), after.documents());
    assert_eq!(engine.document_count(), 2);
    assert_eq!(engine.vector_rows(), 2);
    assert_eq!(engine.search("vegan dining")[0].document.title, "Dining");
}

#[test]
fn test_empty_collection_search_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(&dir);
    engine.delete_document(DocumentId(0)).unwrap();
    engine.delete_document(DocumentId(1)).unwrap();

    assert_eq!(engine.vector_rows(), 0);
    assert!(engine.search("anything at all").is_empty());
}

#[test]
fn test_sources_dropped_before_startup_are_ingested() {
    let dir = tempfile::tempdir().unwrap();
    let sources = config_in(&dir).sources_dir();
    std::fs::create_dir_all(&sources).unwrap();
    std::fs::write(
        sources.join("housing.txt"),
        "Dormitory rooms are assigned by lottery every April",
    )
    .unwrap();

    let engine = open_engine(&dir);
    assert_eq!(engine.document_count(), 3);
    let hit = &engine.search("dormitory lottery")[0];
    assert_eq!(hit.document.title, "housing.txt - Chunk 1");
    assert_eq!(hit.document.source, "text:housing.txt:chunk1");

    // A restart does not ingest the same file twice.
    drop(engine);
    assert_eq!(open_engine(&dir).document_count(), 3);
}

// ─── HTTP surface ───────────────────────────────────────

fn app_in(dir: &tempfile::TempDir, admin: bool) -> axum::Router {
    let mut config = config_in(dir);
    if admin {
        config.admin = Some(AdminCredentials {
            username: "admin".into(),
            password_sha256: hash_password("s3cret"),
        });
    }
    let state = AppState::with_backends(
        config,
        Arc::new(ScriptedGenerator::default()),
        Arc::new(FileExtractor),
    )
    .unwrap();
    api::router(state)
}

fn basic_auth(user: &str, pass: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_chat_round_trip_keeps_session_history() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(&dir, false);

    let resp = app
        .clone()
        .oneshot(json_post(
            "/api/chat",
            serde_json::json!({ "message": "When is the application deadline?" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(
        body["bot_response"],
        "<p>Deadline: January 15</p>\n<p>Apply &lt;early&gt;.</p>"
    );
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/chat/history?session_id={session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let turns = body_json(resp).await;
    assert_eq!(turns.as_array().unwrap().len(), 2);
    assert_eq!(turns[0]["sender"], "user");
    assert_eq!(turns[1]["raw_text"], "Deadline: January 15\n\nApply <early>.");

    let resp = app
        .clone()
        .oneshot(json_post(
            "/api/chat/clear",
            serde_json::json!({ "session_id": session_id }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_chat_rejects_blank_message() {
    let dir = tempfile::tempdir().unwrap();
    let resp = app_in(&dir, false)
        .oneshot(json_post("/api/chat", serde_json::json!({ "message": "   " })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_disabled_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let resp = app_in(&dir, false)
        .oneshot(
            Request::builder()
                .uri("/api/admin/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_admin_requires_valid_password() {
    let dir = tempfile::tempdir().unwrap();
    let resp = app_in(&dir, true)
        .oneshot(
            Request::builder()
                .uri("/api/admin/dashboard")
                .header(header::AUTHORIZATION, basic_auth("admin", "wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn test_admin_document_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(&dir, true);
    let auth = basic_auth("admin", "s3cret");

    let mut req = json_post(
        "/api/admin/documents",
        serde_json::json!({ "title": "Library", "content": "The library opens at eight" }),
    );
    req.headers_mut()
        .insert(header::AUTHORIZATION, auth.parse().unwrap());
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = body_json(resp).await["id"].as_u64().unwrap();
    assert_eq!(id, 2);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/dashboard")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let dashboard = body_json(resp).await;
    assert_eq!(dashboard["vector_rows"], 3);
    assert_eq!(dashboard["documents"][2]["source"], "manual");

    let delete = |id: u64| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/admin/documents/{id}"))
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())
            .unwrap()
    };
    let resp = app.clone().oneshot(delete(id)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = app.clone().oneshot(delete(id)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_source_upload_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(&dir, true);
    let auth = basic_auth("admin", "s3cret");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/sources/clubs.md")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::from("The chess club meets on Fridays"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["chunks"], 1);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/sources/tool.exe")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::from("MZ"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/admin/sources/clubs.md")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["removed_documents"], 1);
}
