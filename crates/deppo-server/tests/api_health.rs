use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use deppo_server::{app, config::Config, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn state_for(connection_string: String) -> AppState {
    let mut config = Config::default();
    config.database.connection_string = connection_string;
    AppState::from_config(&config)
}

async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = app(state)
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let json = serde_json::from_slice(&body).expect("body should be json");
    (status, json)
}

#[tokio::test]
async fn health_reports_version() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let state = state_for(dir.path().join("health.db").to_string_lossy().into_owned());

    let (status, json) = get_json(state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn db_health_returns_success_envelope() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let state = state_for(dir.path().join("health.db").to_string_lossy().into_owned());

    let (status, json) = get_json(state, "/health/db").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], 1);
}

#[tokio::test]
async fn db_health_reports_unreachable_database() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let state = state_for(
        dir.path()
            .join("missing")
            .join("health.db")
            .to_string_lossy()
            .into_owned(),
    );

    let (status, json) = get_json(state, "/health/db").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["success"], false);
    assert_eq!(json["data"], Value::Null);
    assert!(json["message"]
        .as_str()
        .is_some_and(|m| m.starts_with("failed to open database connection")));
}
