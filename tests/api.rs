//! HTTP API tests driven through the router without binding a socket.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use netverdict::config::AppConfig;

struct TestApp {
    router: Router,
    _dir: tempfile::TempDir,
}

fn app() -> TestApp {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage.db_path = dir.path().join("api.db").to_str().unwrap().to_string();
    let state = netverdict::build_state(&config).unwrap();
    TestApp {
        router: netverdict::api::router(state),
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_predict(body: Value, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["model"], "logistic");
}

#[tokio::test]
async fn test_schema() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/v1/schema")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["features"].as_array().unwrap().len(), 15);
    assert_eq!(body["data"]["features"][5]["name"], "logged_in");
    assert_eq!(body["data"]["features"][5]["kind"], "boolean");
    assert_eq!(body["data"]["labels"], json!(["anomaly", "normal"]));
}

#[tokio::test]
async fn test_predict_and_history() {
    let app = app();
    let record = json!({
        "protocol_type": "tcp",
        "service": "http",
        "flag": "SF",
        "src_bytes": 491,
        "logged_in": true
    });

    let (status, body) = send(&app.router, post_predict(record, Some("analyst-7"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["prediction"], "normal");
    assert_eq!(body["meta"]["persisted"], true);
    assert_eq!(body["meta"]["user_id"], "analyst-7");
    let confidence = body["data"]["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));

    let (status, body) = send(&app.router, get("/api/v1/detections?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["prediction"], "normal");
    assert_eq!(records[0]["user_id"], "analyst-7");
}

#[tokio::test]
async fn test_anonymous_user() {
    let app = app();
    let record = json!({ "protocol_type": "udp", "service": "domain_u", "flag": "SF" });
    let (status, body) = send(&app.router, post_predict(record, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["user_id"], "anonymous");
}

#[tokio::test]
async fn test_validation_error_is_422() {
    let app = app();
    let record = json!({ "protocol_type": "xyz", "service": "http", "flag": "SF" });
    let (status, body) = send(&app.router, post_predict(record, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "unknown_category");
    assert_eq!(body["error"]["field"], "protocol_type");
    assert_eq!(body["error"]["value"], "xyz");

    let record = json!({
        "protocol_type": "tcp",
        "service": "http",
        "flag": "SF",
        "src_bytes": "abc"
    });
    let (status, body) = send(&app.router, post_predict(record, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_number");
    assert_eq!(body["error"]["field"], "src_bytes");

    let record = json!({
        "protocol_type": "tcp",
        "service": "http",
        "flag": "SF",
        "serror_rate": 1e308
    });
    let (status, body) = send(&app.router, post_predict(record, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_number");
    assert_eq!(body["error"]["field"], "serror_rate");

    let record = json!({ "service": "http", "flag": "SF" });
    let (status, body) = send(&app.router, post_predict(record, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "missing_field");
    assert_eq!(body["error"]["value"], Value::Null);

    // Rejected requests are not recorded.
    let (_, body) = send(&app.router, get("/api/v1/detections")).await;
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn test_non_object_body_is_400() {
    let app = app();
    let (status, body) = send(&app.router, post_predict(json!(["tcp", "http"]), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "bad_request");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/v1/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");
}

struct Broken;

impl netverdict::model::Classifier for Broken {
    fn kind(&self) -> &'static str {
        "broken"
    }
    fn n_features(&self) -> usize {
        15
    }
    fn n_classes(&self) -> usize {
        2
    }
    fn predict_proba(
        &self,
        _x: &netverdict::features::ScaledFeatureVector,
    ) -> Result<Vec<f64>, netverdict::model::ClassifierError> {
        Err(netverdict::model::ClassifierError("booster file truncated".to_string()))
    }
}

#[tokio::test]
async fn test_classifier_failure_is_generic_500() {
    use std::sync::Arc;

    use netverdict::api::state::AppState;
    use netverdict::detect::Detector;
    use netverdict::features::Vocabularies;
    use netverdict::model::{LabelStrategy, Scaler, ScalerParams};

    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("api.db");
    let pool = netverdict::storage::open_pool(db.to_str().unwrap()).unwrap();
    let scaler = Scaler::new(ScalerParams {
        mean: vec![0.0; 15],
        scale: vec![1.0; 15],
    })
    .unwrap();
    let detector = Detector::new(
        Vocabularies::builtin().unwrap(),
        scaler,
        Box::new(Broken),
        LabelStrategy::BinaryFallback,
    )
    .unwrap();
    let router = netverdict::api::router(AppState {
        detector: Arc::new(detector),
        detections: netverdict::storage::DetectionLog::new(pool),
        default_user: Arc::from("anonymous"),
    });

    let record = json!({ "protocol_type": "tcp", "service": "http", "flag": "SF" });
    let (status, body) = send(&router, post_predict(record, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "model prediction failed");
    assert!(!body.to_string().contains("truncated"));

    let (_, body) = send(&router, get("/api/v1/detections")).await;
    assert_eq!(body["meta"]["total"], 0);
}

#[tokio::test]
async fn test_storage_failure_keeps_prediction() {
    use std::sync::Arc;

    use netverdict::api::state::AppState;

    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("api.db");
    let pool = netverdict::storage::open_pool(db.to_str().unwrap()).unwrap();
    let detector = netverdict::load_detector(&AppConfig::default()).unwrap();
    let router = netverdict::api::router(AppState {
        detector: Arc::new(detector),
        detections: netverdict::storage::DetectionLog::new(pool.clone()),
        default_user: Arc::from("anonymous"),
    });

    pool.get().unwrap().execute_batch("DROP TABLE detections").unwrap();

    let record = json!({
        "protocol_type": "tcp",
        "service": "http",
        "flag": "SF",
        "src_bytes": 491,
        "logged_in": 1
    });
    let (status, body) = send(&router, post_predict(record, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["prediction"], "normal");
    assert_eq!(body["data"]["detection_id"], Value::Null);
    assert_eq!(body["meta"]["persisted"], false);
}

#[tokio::test]
async fn test_statistics() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/v1/statistics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);
    assert_eq!(body["data"]["by_prediction"]["normal"], 0);
    assert_eq!(body["data"]["by_prediction"]["anomaly"], 0);

    let web = json!({
        "protocol_type": "tcp",
        "service": "http",
        "flag": "SF",
        "src_bytes": 491,
        "logged_in": "1"
    });
    let flood = json!({
        "protocol_type": "tcp",
        "service": "private",
        "flag": "S0",
        "count": 250,
        "srv_count": 10,
        "serror_rate": 1.0,
        "same_srv_rate": 0.05,
        "diff_srv_rate": 0.07,
        "dst_host_srv_count": 10,
        "dst_host_serror_rate": 1.0
    });
    send(&app.router, post_predict(web.clone(), Some("alice"))).await;
    send(&app.router, post_predict(flood, Some("alice"))).await;
    send(&app.router, post_predict(web, Some("bob"))).await;

    let (status, body) = send(&app.router, get("/api/v1/statistics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["by_prediction"]["anomaly"], 1);
    assert_eq!(body["data"]["by_user"][0]["user_id"], "alice");
    assert_eq!(body["data"]["by_user"][0]["count"], 2);

    let (_, body) = send(&app.router, get("/api/v1/statistics?user=bob")).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["by_user"][0]["percentage"], 100.0);
    assert_eq!(body["meta"]["user_id"], "bob");
}
