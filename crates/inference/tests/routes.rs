use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use capture::{Frame, PixelFormat, encode};
use inference::{BackendLoader, InferenceBackend, ModelService, ServiceConfig, router};
use inference::backend::HeuristicBackend;
use preprocess::InputShape;
use schema::{DetectResponse, ErrorBody, HealthResponse, ModelsResponse};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn checkerboard(width: u32, height: u32) -> Frame {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = if (x / 4 + y / 4) % 2 == 0 { 40 } else { 210 };
            pixels.extend_from_slice(&[v, v, v]);
        }
    }
    Frame::new(pixels, width, height, PixelFormat::Rgb8)
}

async fn loaded_app() -> Router {
    let service = ModelService::new(ServiceConfig::test_default());
    service.load_startup_model().await;
    router(Arc::new(service))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn health_reports_loaded_heuristic() {
    let app = loaded_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "ok");
    assert!(health.model_loaded);
    assert_eq!(health.model_state, "loaded");
    let shape = health.input_shape.unwrap();
    assert_eq!((shape.width, shape.height, shape.channels), (32, 32, 3));
}

#[tokio::test]
async fn detect_returns_labelled_confidence() {
    let app = loaded_app().await;
    let payload = encode(&checkerboard(64, 48), 0.9).unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/detect-drowsiness",
        Some(json!({ "image": payload.to_data_url(), "timestamp": payload.timestamp_ms })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let resp: DetectResponse = serde_json::from_slice(&body).unwrap();
    assert!((0.0..=100.0).contains(&resp.confidence));
    let expected = schema::classify(resp.confidence).to_string();
    assert_eq!(resp.alertness.as_deref(), Some(expected.as_str()));
    assert_eq!(resp.model_used.as_deref(), Some("heuristic"));
    assert!(resp.metrics.unwrap().contains_key("brightness"));
}

#[tokio::test]
async fn identical_payloads_give_identical_results() {
    let app = loaded_app().await;
    let image = encode(&checkerboard(32, 32), 0.8).unwrap().to_data_url();
    let body = json!({ "image": image, "timestamp": 1 });

    let (_, first) = send(&app, "POST", "/detect-drowsiness", Some(body.clone())).await;
    let (_, second) = send(&app, "POST", "/detect-drowsiness", Some(body)).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn undecodable_image_is_bad_request() {
    let app = loaded_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/detect-drowsiness",
        Some(json!({ "image": "data:image/jpeg;base64,bm90IGFuIGltYWdl", "timestamp": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorBody = serde_json::from_slice(&body).unwrap();
    assert!(!error.error.is_empty());
}

#[tokio::test]
async fn missing_fields_are_bad_request() {
    let app = loaded_app().await;
    let (status, _) = send(&app, "POST", "/detect-drowsiness", Some(json!({ "timestamp": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn detect_without_model_is_unavailable() {
    let app = router(Arc::new(ModelService::new(ServiceConfig::test_default())));
    let payload = encode(&checkerboard(16, 16), 0.8).unwrap();
    let (status, _) = send(
        &app,
        "POST",
        "/detect-drowsiness",
        Some(json!({ "image": payload.to_data_url(), "timestamp": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

fn slow_loader(delay: Duration) -> BackendLoader {
    Arc::new(
        move |_path: &Path, _shape: InputShape| -> anyhow::Result<Box<dyn InferenceBackend>> {
            std::thread::sleep(delay);
            Ok(Box::new(HeuristicBackend))
        },
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_load_while_loading_conflicts() {
    let service = ModelService::with_loader(
        ServiceConfig::test_default(),
        slow_loader(Duration::from_millis(300)),
    );
    let app = router(Arc::new(service));

    let first = {
        let app = app.clone();
        tokio::spawn(async move {
            send(&app, "POST", "/load-model", Some(json!({ "path": "a.onnx" }))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, _) = send(&app, "POST", "/load-model", Some(json!({ "path": "b.onnx" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.model_path.as_deref(), Some("./models/a.onnx"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_load_still_leaves_loading() {
    let service = ModelService::with_loader(
        ServiceConfig::test_default(),
        slow_loader(Duration::from_millis(200)),
    );

    let abandoned = tokio::time::timeout(Duration::from_millis(20), service.load_model("a.onnx")).await;
    assert!(abandoned.is_err());
    assert_eq!(service.state().await.as_str(), "loading");

    tokio::time::sleep(Duration::from_millis(600)).await;
    let state = service.state().await;
    assert!(state.is_loaded(), "got {:?}", state);

    service.load_model("b.onnx").await.unwrap();
    assert_eq!(
        service.state().await.path().map(|p| p.display().to_string()).as_deref(),
        Some("./models/b.onnx")
    );
}

#[tokio::test]
async fn failed_load_is_unprocessable_and_recorded() {
    let failing: BackendLoader = Arc::new(
        |path: &Path, _shape: InputShape| -> anyhow::Result<Box<dyn InferenceBackend>> {
            anyhow::bail!("no such model {}", path.display())
        },
    );
    let app = router(Arc::new(ModelService::with_loader(
        ServiceConfig::test_default(),
        failing,
    )));

    let (status, _) = send(&app, "POST", "/load-model", Some(json!({ "path": "/tmp/x.onnx" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = send(&app, "GET", "/health", None).await;
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.model_state, "failed");
    assert!(!health.model_loaded);
}

#[tokio::test]
async fn models_lists_onnx_files_only() {
    let dir = std::env::temp_dir().join(format!("model-service-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("b.onnx"), b"").unwrap();
    std::fs::write(dir.join("a.onnx"), b"").unwrap();
    std::fs::write(dir.join("notes.txt"), b"").unwrap();

    let mut config = ServiceConfig::test_default();
    config.models_dir = dir.clone();
    let app = router(Arc::new(ModelService::new(config)));

    let (status, body) = send(&app, "GET", "/models", None).await;
    assert_eq!(status, StatusCode::OK);
    let models: ModelsResponse = serde_json::from_slice(&body).unwrap();
    let names: Vec<_> = models.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(models.current.is_none());

    std::fs::remove_dir_all(&dir).unwrap();
}
