pub mod assessments;
pub mod stats;
pub mod submit;

use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "app": "phq-screening-backend"
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.max_request_body_bytes();

    Router::new()
        .route("/health", get(health_check))
        .route("/api/submit_test", post(submit::submit_test))
        .route("/api/submit_test/upload", post(submit::submit_test_upload))
        .route("/api/stats", get(stats::get_stats))
        .route("/api/assessments", get(assessments::list_assessments))
        .route("/api/assessments/:id", get(assessments::get_assessment))
        .route(
            "/api/assessments/:id/audio",
            get(assessments::get_assessment_audio),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::records::RecordStore;
    use crate::storage::{AudioStore, LocalDiskStore};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn test_state(temp_dir: &TempDir, extra: &[(&str, &str)]) -> Arc<AppState> {
        let vars = extra.iter().map(|(k, v)| (k.to_string(), v.to_string()));
        let config = Config::from_iter(vars).unwrap();
        Arc::new(AppState {
            config,
            records: RecordStore::Sqlite(crate::db::memory_pool().await),
            audio: AudioStore::LocalDisk(LocalDiskStore::new(temp_dir.path())),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[]).await);
        let (status, body) = send_json(app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_submit_scores_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir, &[]).await;
        let app = router(state.clone());

        let (status, body) = send_json(
            app.clone(),
            post_json(
                "/api/submit_test",
                json!({
                    "fullName": "Nusrat Jahan",
                    "age": 29,
                    "gender": "female",
                    "question1": 1, "question2": 2, "question3": 1, "question4": 0,
                    "question5": 1, "question6": 0, "question7": 0, "question8": 1,
                    "audioData": "data:audio/webm;base64,aGVsbG8gYXVkaW8="
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalScore"], 6);
        assert_eq!(body["severity"], "mild");
        assert_eq!(body["questionnaire"], "phq8");
        assert_eq!(body["status"], "pending");
        assert_eq!(body["result"], "model is in training");

        let id = body["testId"].as_str().unwrap().to_string();
        assert_eq!(
            body["audioUrl"],
            format!("/api/assessments/{}/audio", id)
        );
        assert!(temp_dir
            .path()
            .join(format!("recordings/{}.webm", id))
            .exists());

        let (status, record) =
            send_json(app.clone(), get(&format!("/api/assessments/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["fullName"], "Nusrat Jahan");
        assert_eq!(record["totalScore"], 6);
        assert_eq!(record["answers"]["question2"], 2);
        assert_eq!(record["hasAudio"], true);

        let (status, audio) = send(app, get(&format!("/api/assessments/{}/audio", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(audio, b"hello audio");
    }

    #[tokio::test]
    async fn test_recording_served_as_audio_only() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[]).await);

        let (status, body) = send_json(
            app.clone(),
            post_json(
                "/api/submit_test",
                json!({
                    "fullName": "A",
                    "age": 30,
                    "audioData": "data:text/html;base64,PHNjcmlwdD5hbGVydCgxKTwvc2NyaXB0Pg=="
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["testId"].as_str().unwrap().to_string();

        let response = app
            .oneshot(get(&format!("/api/assessments/{}/audio", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        let content_type = headers[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("audio/"), "served {}", content_type);
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            format!("inline; filename=\"{}.webm\"", id).as_str()
        );
    }

    #[tokio::test]
    async fn test_submit_is_lenient_with_items() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[]).await);

        let (status, body) = send_json(
            app,
            post_json(
                "/api/submit_test",
                json!({
                    "fullName": "Test User",
                    "age": "31",
                    "q1": "3", "q2": "often", "question3": null, "q4": 7
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalScore"], 3);
        assert_eq!(body["severity"], "minimal");
        assert!(body["audioUrl"].is_null());
    }

    #[tokio::test]
    async fn test_three_item_questionnaire() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[("QUESTIONNAIRE", "phq3")]).await);

        let (status, body) = send_json(
            app,
            post_json(
                "/api/submit_test",
                json!({
                    "fullName": "Test User",
                    "age": 40,
                    "question1": 3, "question2": 3, "question3": 3, "question4": 3
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalScore"], 9);
        assert_eq!(body["severity"], "mild");
        assert_eq!(body["questionnaire"], "phq3");
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[]).await);

        let (status, body) = send_json(
            app.clone(),
            post_json("/api/submit_test", json!({ "age": 30, "question1": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "fullName is required");

        let (status, _) = send_json(
            app.clone(),
            post_json("/api/submit_test", json!({ "fullName": "Kid", "age": 15 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(
            app.clone(),
            post_json(
                "/api/submit_test",
                json!({ "fullName": "A", "age": 30, "audioData": "%%%" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid base64 audio");

        let (status, _) = send_json(app, get("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_audio_too_large() {
        let temp_dir = TempDir::new().unwrap();
        let state = test_state(&temp_dir, &[("MAX_AUDIO_SIZE_MB", "0")]).await;
        let app = router(state);

        let (status, _) = send_json(
            app,
            post_json(
                "/api/submit_test",
                json!({ "fullName": "A", "age": 30, "audioData": "aGVsbG8=" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_multipart_submission() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[]).await);

        let boundary = "phqboundary";
        let mut body = String::new();
        for (name, value) in [
            ("fullName", "Multipart User"),
            ("age", "45"),
            ("question1", "2"),
            ("q2", "3"),
        ] {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            ));
        }
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"rec.ogg\"\r\nContent-Type: audio/ogg\r\n\r\nOggS-data\r\n--{}--\r\n",
            boundary, boundary
        ));

        let request = Request::builder()
            .method("POST")
            .uri("/api/submit_test/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send_json(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalScore"], 5);
        assert_eq!(body["severity"], "mild");

        let id = body["testId"].as_str().unwrap();
        assert!(temp_dir
            .path()
            .join(format!("recordings/{}.ogg", id))
            .exists());
    }

    #[tokio::test]
    async fn test_list_and_stats() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[]).await);

        for (name, item) in [("One", 0), ("Two", 3), ("Three", 2)] {
            let (status, _) = send_json(
                app.clone(),
                post_json(
                    "/api/submit_test",
                    json!({
                        "fullName": name, "age": 20, "gender": "male",
                        "question1": item, "question2": item, "question3": item,
                        "question4": item, "question5": item, "question6": item,
                        "question7": item, "question8": item
                    }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, list) = send_json(app.clone(), get("/api/assessments?limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 2);

        let (status, stats) = send_json(app, get("/api/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalTests"], 3);
        assert_eq!(stats["totalAudio"], 0);
        // (0 + 24 + 16) / 3
        assert_eq!(stats["averagePhq8"], 13.3);
        assert_eq!(stats["malePercent"], 100.0);
        assert_eq!(stats["statusDistribution"]["pending"], 3);
        assert_eq!(stats["ageDistribution"][0]["count"], 3);
    }

    #[tokio::test]
    async fn test_unknown_assessment() {
        let temp_dir = TempDir::new().unwrap();
        let app = router(test_state(&temp_dir, &[]).await);

        let (status, body) = send_json(app.clone(), get("/api/assessments/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = send(app, get("/api/assessments/nope/audio")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
