//! HTTP surface for the Messenger webhook.
//!
//! - `GET {path}` answers the subscription handshake.
//! - `POST {path}` decodes the callback and hands it to the dispatcher.
//!
//! Dispatch runs on the blocking pool since handlers are synchronous and may
//! do blocking I/O. A handler failure maps to 500 so the platform redelivers.

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::callback::Callback;
use crate::config::{DispatchMode, HEALTH_PATH, WebhookConfig};
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, WebhookError};

/// Body returned once a callback has been fully dispatched.
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

/// Shared state for webhook routes.
struct WebhookState<E> {
    dispatcher: Arc<Dispatcher<E>>,
    verify_token: SecretString,
    mode: DispatchMode,
}

impl<E> Clone for WebhookState<E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            verify_token: self.verify_token.clone(),
            mode: self.mode,
        }
    }
}

/// Query parameters of the subscription handshake.
#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Build the webhook routes for `config.path`, plus `/health`.
pub fn webhook_routes<E>(dispatcher: Arc<Dispatcher<E>>, config: &WebhookConfig) -> Router
where
    E: fmt::Display + Send + 'static,
{
    let state = WebhookState {
        dispatcher,
        verify_token: config.verify_token.clone(),
        mode: config.mode,
    };

    Router::new()
        .route(&config.path, get(verify::<E>).post(receive::<E>))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

/// Bind `config.bind_addr` and serve the webhook until the server exits.
pub async fn serve<E>(
    config: WebhookConfig,
    dispatcher: Arc<Dispatcher<E>>,
) -> Result<(), WebhookError>
where
    E: fmt::Display + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| WebhookError::Bind {
            addr: config.bind_addr,
            source,
        })?;

    info!(
        addr = %config.bind_addr,
        path = %config.path,
        mode = ?config.mode,
        "Messenger webhook listening"
    );

    axum::serve(listener, webhook_routes(dispatcher, &config))
        .await
        .map_err(WebhookError::Serve)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET {path}
///
/// Echoes `hub.challenge` when the mode is `subscribe` and the token matches.
async fn verify<E>(
    State(state): State<WebhookState<E>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let token_matches =
        params.verify_token.as_deref() == Some(state.verify_token.expose_secret());

    match (params.mode.as_deref(), params.challenge) {
        (Some("subscribe"), Some(challenge)) if token_matches => {
            info!("Webhook subscription verified");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!(mode = ?params.mode, "Rejected webhook verification");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST {path}
async fn receive<E>(State(state): State<WebhookState<E>>, body: Bytes) -> Response
where
    E: fmt::Display + Send + 'static,
{
    let callback = match Callback::from_slice(&body) {
        Ok(cb) => cb,
        Err(e) => {
            warn!(error = %e, "Malformed webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Malformed callback payload"})),
            )
                .into_response();
        }
    };

    if !callback.is_page() {
        debug!(object = %callback.object, "Ignoring non-page callback");
        return StatusCode::NOT_FOUND.into_response();
    }

    let dispatcher = Arc::clone(&state.dispatcher);
    let mode = state.mode;
    let outcome = tokio::task::spawn_blocking(move || match mode {
        DispatchMode::Lenient => dispatcher
            .dispatch(&callback)
            .map_err(DispatchError::Handler),
        DispatchMode::Strict => dispatcher.dispatch_strict(&callback),
    })
    .await;

    match outcome {
        Ok(Ok(())) => (StatusCode::OK, EVENT_RECEIVED).into_response(),
        Ok(Err(DispatchError::Handler(err))) => {
            warn!(error = %err, "Handler failed; callback rejected");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Handler failed"})),
            )
                .into_response()
        }
        Ok(Err(err @ DispatchError::Classify { .. })) => {
            warn!(error = %err, "Ambiguous messaging entry rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": err.to_string()})),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
