//! HTTP contract of the webhook routes, exercised in-process via `oneshot`.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use messenger_webhook::config::{DispatchMode, WebhookConfig};
use messenger_webhook::dispatcher::{Dispatcher, message_handler, postback_handler};
use messenger_webhook::webhook::{EVENT_RECEIVED, webhook_routes};
use messenger_webhook::MessagingEntry;

const VERIFY_TOKEN: &str = "verify-me";

const CALLBACK: &str = r#"{
    "object": "page",
    "entry": [
        {"id": "PAGE", "time": 1, "messaging": [
            {"sender": {"id": "U1"}, "recipient": {"id": "PAGE"}, "timestamp": 1,
             "message": {"mid": "m1", "text": "hello"}},
            {"sender": {"id": "U1"}, "recipient": {"id": "PAGE"}, "timestamp": 2,
             "postback": {"title": "Start", "payload": "GET_STARTED"}}
        ]}
    ]
}"#;

fn app(dispatcher: Dispatcher<String>, mode: DispatchMode) -> Router {
    let mut config = WebhookConfig::new(VERIFY_TOKEN);
    config.mode = mode;
    webhook_routes(Arc::new(dispatcher), &config)
}

fn recording(calls: &Arc<Mutex<Vec<String>>>) -> Dispatcher<String> {
    let on_message = Arc::clone(calls);
    let on_postback = Arc::clone(calls);
    Dispatcher::new([
        message_handler(move |entry: &MessagingEntry| {
            let text = entry.message.as_ref().and_then(|m| m.text.clone());
            on_message.lock().unwrap().push(text.unwrap_or_default());
            Ok(())
        }),
        postback_handler(move |entry: &MessagingEntry| {
            let payload = entry.postback.as_ref().map(|p| p.payload.clone());
            on_postback.lock().unwrap().push(payload.unwrap_or_default());
            Ok(())
        }),
    ])
}

async fn post(app: Router, body: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn verify_echoes_challenge() {
    let app = app(Dispatcher::default(), DispatchMode::Lenient);
    let (status, body) = get(
        app,
        "/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=CHALLENGE_ACCEPTED",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "CHALLENGE_ACCEPTED");
}

#[tokio::test]
async fn verify_rejects_wrong_token() {
    let app = app(Dispatcher::default(), DispatchMode::Lenient);
    let (status, _) = get(
        app,
        "/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=123",
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn verify_rejects_missing_params() {
    let app = app(Dispatcher::default(), DispatchMode::Lenient);
    let (status, _) = get(app, "/webhook").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_dispatches_in_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let app = app(recording(&calls), DispatchMode::Lenient);

    let (status, body) = post(app, CALLBACK).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, EVENT_RECEIVED);
    assert_eq!(*calls.lock().unwrap(), vec!["hello", "GET_STARTED"]);
}

#[tokio::test]
async fn handler_failure_returns_500() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let on_postback = Arc::clone(&calls);
    let dispatcher = Dispatcher::new([
        message_handler(|_: &MessagingEntry| Err("send failed".to_string())),
        postback_handler(move |_: &MessagingEntry| {
            on_postback.lock().unwrap().push("postback".to_string());
            Ok(())
        }),
    ]);

    let (status, _) = post(app(dispatcher, DispatchMode::Lenient), CALLBACK).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let app = app(Dispatcher::default(), DispatchMode::Lenient);
    let (status, _) = post(app, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_page_object_returns_404() {
    let app = app(Dispatcher::default(), DispatchMode::Lenient);
    let (status, _) = post(app, r#"{"object": "user", "entry": []}"#).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

const AMBIGUOUS: &str = r#"{
    "object": "page",
    "entry": [{"id": "PAGE", "time": 1, "messaging": [
        {"message": {"mid": "m1", "text": "hello"}, "postback": {"payload": "P"}}
    ]}]
}"#;

#[tokio::test]
async fn lenient_mode_honours_precedence() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let app = app(recording(&calls), DispatchMode::Lenient);

    let (status, _) = post(app, AMBIGUOUS).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*calls.lock().unwrap(), vec!["hello"]);
}

#[tokio::test]
async fn strict_mode_rejects_ambiguous_entries() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let app = app(recording(&calls), DispatchMode::Strict);

    let (status, body) = post(app, AMBIGUOUS).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("more than one payload"));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app(Dispatcher::default(), DispatchMode::Lenient);
    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
}

#[tokio::test]
async fn panicking_handler_returns_500() {
    let dispatcher = Dispatcher::new([message_handler(
        |_: &MessagingEntry| -> Result<(), String> { panic!("handler blew up") },
    )]);

    let (status, _) = post(app(dispatcher, DispatchMode::Lenient), CALLBACK).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
