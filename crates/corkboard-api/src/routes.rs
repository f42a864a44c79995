use axum::{
    Json, Router,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use crate::{AppState, downloads, messages};

/// Every API and download endpoint. Static files, CORS and tracing layers
/// are added by the server binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/messages", get(messages::list_messages).post(messages::create_message))
        .route("/api/messages/{id}", delete(messages::delete_message))
        .route("/api/messages/{id}/like", post(messages::like_message))
        .route("/download/db", get(downloads::download_db))
        .route("/download/backups", get(downloads::list_backups))
        .route("/download/backup/{filename}", get(downloads::download_backup))
        .route("/download/create-backup", post(downloads::create_backup))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use corkboard_backup::BackupEngine;
    use corkboard_db::Database;

    use super::*;
    use crate::AppStateInner;

    fn app_with_state(retention: usize) -> (TempDir, AppState, Router) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("messages.db")).unwrap());
        let backups =
            Arc::new(BackupEngine::new(db.clone(), dir.path().join("backups")).unwrap());
        let state = Arc::new(AppStateInner {
            db,
            backups,
            retention,
        });
        (dir, state.clone(), router(state))
    }

    fn app(retention: usize) -> (TempDir, Router) {
        let (dir, _, app) = app_with_state(retention);
        (dir, app)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_post_like_delete_scenario() {
        let (_dir, app) = app(10);
        let before = now_ms();

        let (status, msg) = send_json(
            &app,
            Method::POST,
            "/api/messages",
            Some(json!({ "name": "Alice", "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(msg["id"], 1);
        assert_eq!(msg["name"], "Alice");
        assert_eq!(msg["likes"], 0);
        assert_eq!(msg["liked"], false);
        assert!(msg["timestamp"].as_i64().unwrap() >= before);

        let (status, msg) = send_json(&app, Method::POST, "/api/messages/1/like", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(msg["likes"], 1);
        assert_eq!(msg["liked"], true);

        let (_, msg) = send_json(&app, Method::POST, "/api/messages/1/like", None).await;
        assert_eq!(msg["likes"], 2);
        assert_eq!(msg["liked"], true);

        let (status, body) = send_json(&app, Method::DELETE, "/api/messages/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let (status, list) = send_json(&app, Method::GET, "/api/messages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_with_default_name() {
        let (_dir, app) = app(10);
        for content in ["first", "second", "third"] {
            send(&app, Method::POST, "/api/messages", Some(json!({ "content": content }))).await;
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let (_, list) = send_json(&app, Method::GET, "/api/messages", None).await;
        let contents: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["third", "second", "first"]);
        assert_eq!(list[0]["name"], "anonymous");
    }

    #[tokio::test]
    async fn test_missing_or_empty_content_is_rejected() {
        let (_dir, app) = app(10);

        let (status, body) =
            send_json(&app, Method::POST, "/api/messages", Some(json!({ "name": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("content"));

        let blank = Some(json!({ "content": "  " }));
        let (status, _) = send_json(&app, Method::POST, "/api/messages", blank).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, list) = send_json(&app, Method::GET, "/api/messages", None).await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (_dir, app) = app(10);

        let (status, body) = send_json(&app, Method::DELETE, "/api/messages/41", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = send_json(&app, Method::POST, "/api/messages/41/like", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_and_download_backup() {
        let (_dir, app) = app(10);
        send(&app, Method::POST, "/api/messages", Some(json!({ "content": "keep me" }))).await;

        let (status, created) =
            send_json(&app, Method::POST, "/download/create-backup", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["success"], true);
        let filename = created["filename"].as_str().unwrap().to_string();
        assert_eq!(created["download_url"], format!("/download/backup/{filename}"));

        let (status, listing) = send_json(&app, Method::GET, "/download/backups", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["total"], 2);

        let uri = format!("/download/backup/{filename}");
        let (status, bytes) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"SQLite format 3\0"));

        let export = created["export_filename"].as_str().unwrap();
        let uri = format!("/download/backup/{export}");
        let (status, bytes) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let export: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(export["total_count"], 1);
        assert_eq!(export["items"][0]["content"], "keep me");
    }

    #[tokio::test]
    async fn test_on_demand_backups_respect_retention() {
        let (_dir, app) = app(2);
        for _ in 0..3 {
            let (status, _) = send_json(&app, Method::POST, "/download/create-backup", None).await;
            assert_eq!(status, StatusCode::OK);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let (_, listing) = send_json(&app, Method::GET, "/download/backups", None).await;
        assert_eq!(listing["total"], 4);
    }

    #[tokio::test]
    async fn test_backup_download_rejects_bad_names() {
        let (_dir, app) = app(10);

        let uri = "/download/backup/messages-backup-nope.db";
        let (status, _) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/download/backup/..%2Fmessages.db", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_live_database() {
        let (_dir, app) = app(10);
        send(&app, Method::POST, "/api/messages", Some(json!({ "content": "in the file" }))).await;

        let (status, bytes) = send(&app, Method::GET, "/download/db", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.starts_with(b"SQLite format 3\0"));
    }

    #[tokio::test]
    async fn test_mistyped_body_gets_json_error() {
        let (_dir, app) = app(10);

        let (status, body) =
            send_json(&app, Method::POST, "/api/messages", Some(json!({ "content": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid request body"));
    }

    #[tokio::test]
    async fn test_unparsable_id_is_not_found_json() {
        let (_dir, app) = app(10);

        let (status, body) = send_json(&app, Method::DELETE, "/api/messages/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, body) = send_json(&app, Method::POST, "/api/messages/abc/like", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_database_download_ignores_writes_mid_stream() {
        let (dir, state, app) = app_with_state(10);
        let text = "x".repeat(1900);
        for _ in 0..400 {
            state.db.create_message(None, &text).unwrap();
        }

        let request = Request::get("/download/db").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let declared: u64 = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();

        let mut body = response.into_body();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();

        for message in state.db.list_messages().unwrap().iter().step_by(2) {
            state.db.delete_message(message.id).unwrap();
        }
        for _ in 0..1500 {
            state.db.create_message(None, &text).unwrap();
        }

        let rest = body.collect().await.unwrap().to_bytes();
        let mut bytes = first.to_vec();
        bytes.extend_from_slice(&rest);
        assert_eq!(bytes.len() as u64, declared);

        let downloaded = dir.path().join("downloaded.db");
        std::fs::write(&downloaded, &bytes).unwrap();
        let downloaded = Database::open(&downloaded).unwrap();
        let check: String = downloaded
            .with_conn(|conn| Ok(conn.query_row("PRAGMA integrity_check", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(check, "ok");
        assert_eq!(downloaded.count_messages().unwrap(), 400);
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = app(10);
        let (status, body) = send_json(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    fn now_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64
    }
}
