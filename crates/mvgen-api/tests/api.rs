//! HTTP-level tests against an in-process router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use mvgen_api::{create_router, ApiConfig, AppState};
use mvgen_models::ProjectRecord;
use mvgen_pipeline::{ManualClock, Pipeline, PipelineConfig, Providers};
use mvgen_providers::testing::{DownProvider, StaticText};
use mvgen_providers::TextGenerator;
use mvgen_storage::{ArtifactStore, LocalArtifactStore};

const LYRICS: &str = "Rain on the window\n\
                      Neon in the puddles\n\
                      We keep on dancing\n\
                      Through the city night";

struct TestApp {
    _dir: TempDir,
    store: Arc<LocalArtifactStore>,
    router: Router,
}

async fn app_with_text(text: Arc<dyn TextGenerator>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let pipeline_config = PipelineConfig {
        output_dir: dir.path().join("public/outputs"),
        fallback_dir: dir.path().join("public/fallback"),
        ..Default::default()
    };
    let api_config = ApiConfig {
        public_dir: dir.path().join("public"),
        ..Default::default()
    };

    let down = Arc::new(DownProvider::new());
    let providers = Providers {
        text,
        music: down.clone(),
        image: down,
    };
    let store = Arc::new(LocalArtifactStore::new(&pipeline_config.output_dir));
    let pipeline = Pipeline::builder(pipeline_config, store.clone(), providers)
        .clock(Arc::new(ManualClock::new()))
        .build();
    pipeline.init().await.unwrap();
    pipeline.seed_fallbacks().await.unwrap();

    let state = AppState::with_pipeline(api_config, pipeline);
    TestApp {
        _dir: dir,
        store,
        router: create_router(state, None),
    }
}

async fn app() -> TestApp {
    app_with_text(Arc::new(StaticText::ok(LYRICS))).await
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        (status, json_body(response).await)
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn create_project(&self) -> String {
        let (status, body) = self
            .post("/api/generate-lyrics", json!({"prompt": "a rainy city night"}))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await["status"], "healthy");

    let response = app.get("/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ready");
}

#[tokio::test]
async fn test_generate_lyrics() {
    let app = app().await;
    let (status, body) = app
        .post("/api/generate-lyrics", json!({"prompt": "a rainy city night"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lyrics"], LYRICS);
    assert_eq!(body["status"], "succeeded");
    assert!(body["id"].as_str().is_some());
}

#[tokio::test]
async fn test_generate_lyrics_requires_prompt() {
    let app = app().await;
    for body in [json!({}), json!({"prompt": ""}), json!({"prompt": "   "})] {
        let (status, response) = app.post("/api/generate-lyrics", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_lyrics_provider_failure_names_stage() {
    let app = app_with_text(Arc::new(DownProvider::new())).await;
    let (status, body) = app
        .post("/api/generate-lyrics", json!({"prompt": "storm"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stage"], "lyrics");
}

#[tokio::test]
async fn test_stage_requests_validate_project_id() {
    let app = app().await;

    let (status, body) = app.post("/api/generate-music", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lyricsId"));

    let (status, _) = app
        .post("/api/generate-images", json!({"lyricsId": "../etc/passwd"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/assemble-video",
            json!({"lyricsId": "550e8400-e29b-41d4-a716-446655440000"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(
        app.get("/api/project/not-a-uuid").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.get("/api/project/550e8400-e29b-41d4-a716-446655440000")
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_stage_by_stage_with_providers_down() {
    let app = app().await;
    let id = app.create_project().await;

    let (status, music) = app
        .post("/api/generate-music", json!({"lyricsId": id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(music["status"], "degraded");
    assert!(music["reason"].as_str().is_some());
    let music_url = music["musicUrl"].as_str().unwrap().to_string();
    assert!(music_url.starts_with(&format!("/outputs/music/{}_", id)));

    let (status, images) = app
        .post("/api/generate-images", json!({"lyricsId": id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(images["status"], "degraded");
    assert_eq!(images["imageUrls"].as_array().unwrap().len(), 4);

    let (status, video) = app
        .post("/api/assemble-video", json!({"lyricsId": id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(video["status"], "succeeded");
    assert_eq!(video["isHtmlPlayer"], true);
    let video_url = video["videoUrl"].as_str().unwrap().to_string();

    // The player is served from the output directory
    let response = app.get(&video_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&html).contains(&music_url));

    let response = app.get(&format!("/api/project/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let project = json_body(response).await;
    assert_eq!(project["lyrics"], LYRICS);
    assert_eq!(project["hasMusicGenerated"], true);
    assert_eq!(project["hasImagesGenerated"], true);
    assert_eq!(project["hasVideoAssembled"], true);
    assert_eq!(project["musicUrl"], music_url.as_str());
    assert_eq!(project["videoUrl"], video_url.as_str());
    assert_eq!(project["stages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_repeated_stage_reuses_artifact_unless_forced() {
    let app = app().await;
    let id = app.create_project().await;

    let (_, first) = app
        .post("/api/generate-music", json!({"lyricsId": id}))
        .await;
    let (_, again) = app
        .post("/api/generate-music", json!({"lyricsId": id}))
        .await;
    assert_eq!(first["musicUrl"], again["musicUrl"]);

    let (status, forced) = app
        .post("/api/generate-music", json!({"lyricsId": id, "force": true}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first["musicUrl"], forced["musicUrl"]);
}

#[tokio::test]
async fn test_fatal_stage_returns_stage_error() {
    let app = app().await;
    // Lyrics with no usable lines cannot be illustrated
    let project = ProjectRecord::new("silence", " \n \n");
    app.store.save_project(&project).await.unwrap();

    let (status, body) = app
        .post("/api/generate-images", json!({"lyricsId": project.id}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stage"], "images");
    assert!(body["error"].as_str().unwrap().contains("key lines"));
}

#[tokio::test]
async fn test_full_generation_run() {
    let app = app().await;
    let (status, body) = app
        .post("/api/generate", json!({"prompt": "a rainy city night"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let stages = body["stages"].as_array().unwrap();
    let names: Vec<&str> = stages.iter().map(|s| s["stage"].as_str().unwrap()).collect();
    assert_eq!(names, ["lyrics", "music", "images", "assembly"]);
    assert_eq!(stages[1]["status"], "degraded");
    assert_eq!(stages[1]["placeholder"], true);
    assert_eq!(stages[3]["status"], "succeeded");
}
