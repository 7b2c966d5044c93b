//! Error types for the Messenger webhook.

use std::net::SocketAddr;

use crate::event::EventKind;

/// Top-level error type for the webhook host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// Shell hint for fixing a missing variable; `None` for other errors.
    pub fn env_hint(&self) -> Option<String> {
        match self {
            ConfigError::MissingEnvVar(key) => Some(format!("export {key}=...")),
            _ => None,
        }
    }
}

/// Raised by strict classification when a messaging entry cannot be mapped
/// to exactly one event kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("Messaging entry carries more than one payload: {kinds:?}")]
    Ambiguous { kinds: Vec<EventKind> },
}

/// Result of [`Dispatcher::dispatch_strict`](crate::dispatcher::Dispatcher::dispatch_strict).
///
/// Plain [`dispatch`](crate::dispatcher::Dispatcher::dispatch) never wraps
/// handler errors; only the strict path needs a second failure mode.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<E> {
    #[error("Handler failed: {0}")]
    Handler(E),

    #[error("Entry {entry}, messaging {position}: {source}")]
    Classify {
        entry: usize,
        position: usize,
        source: ClassifyError,
    },
}

/// Webhook server errors.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// Result type alias for the webhook host.
pub type Result<T> = std::result::Result<T, Error>;
