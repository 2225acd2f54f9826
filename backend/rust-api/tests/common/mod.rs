#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use testwindow_api::{
    config::{Config, SessionSettings, TelemetrySettings},
    create_router,
    engine::SystemClock,
    models::test::TestDocument,
    services::{test_catalog::InMemoryTestCatalog, AppState},
};
use tower::ServiceExt;

pub const MOCK_TEST: &str = "Mock Test";
pub const EXPIRED_TEST: &str = "Expired Test";
pub const SHORT_TEST: &str = "Short Test";

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        mongo_uri: "mongodb://localhost:27017".to_string(),
        mongo_database: "test-window-tests".to_string(),
        session: SessionSettings::default(),
        telemetry: TelemetrySettings::default(),
    }
}

/// `(section name, minutes, question count)`; correct answer is always B.
pub fn test_document(name: &str, sections: &[(&str, &str, usize)]) -> Value {
    let sections: Vec<Value> = sections
        .iter()
        .map(|(section, minutes, count)| {
            let questions: Vec<Value> = (0..*count)
                .map(|n| {
                    json!({
                        "id": format!("{}-{}", section, n),
                        "question": format!("{} question {}", section, n + 1),
                        "options": [
                            { "text": "alpha" },
                            { "text": "bravo" },
                            { "text": "charlie" },
                            { "text": "delta" }
                        ],
                        "correctAnswer": "B",
                        "explanation": "Because bravo"
                    })
                })
                .collect();
            json!({ "sectionName": section, "duration": minutes, "questions": questions })
        })
        .collect();

    json!({
        "name": name,
        "startDateTime": "2020-01-01T00:00",
        "endDateTime": "2999-12-31T23:59",
        "marksPerQuestion": 4,
        "negativeMarking": 0.25,
        "calculatorEnabled": true,
        "sections": sections
    })
}

pub fn seed_documents() -> Vec<TestDocument> {
    let mut expired = test_document(EXPIRED_TEST, &[("Maths", "10", 2)]);
    expired["endDateTime"] = json!("2021-01-01T00:00:00Z");

    [
        test_document(MOCK_TEST, &[("Maths", "1", 3), ("Physics", "2", 2)]),
        test_document(SHORT_TEST, &[("Sprint", "1", 1)]),
        expired,
    ]
    .into_iter()
    .map(|value| serde_json::from_value(value).expect("seed document should deserialize"))
    .collect()
}

pub fn create_test_app() -> (Router, Arc<AppState>) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let catalog = Arc::new(InMemoryTestCatalog::new(seed_documents()));
    let app_state = Arc::new(AppState::new(test_config(), catalog, Arc::new(SystemClock)));
    (create_router(app_state.clone()), app_state)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// Starts a session and returns its id.
pub async fn start_session(app: &Router, test_name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/sessions",
        Some(json!({ "test_name": test_name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body {}", body);
    body["session_id"].as_str().unwrap().to_string()
}
