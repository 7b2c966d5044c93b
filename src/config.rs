//! Configuration types.

use std::net::SocketAddr;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Liveness route mounted next to the webhook.
pub const HEALTH_PATH: &str = "/health";

/// How the webhook host classifies messaging entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// First populated payload wins; conflicts are ignored.
    #[default]
    Lenient,
    /// Reject a batch if any entry carries more than one payload.
    Strict,
}

impl FromStr for DispatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(DispatchMode::Lenient),
            "strict" => Ok(DispatchMode::Strict),
            other => Err(ConfigError::InvalidValue {
                key: "MESSENGER_DISPATCH_MODE".into(),
                message: format!("expected `lenient` or `strict`, got `{other}`"),
            }),
        }
    }
}

/// Webhook host configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Token echoed back during the subscription handshake.
    pub verify_token: SecretString,
    /// Route the webhook is mounted on.
    pub path: String,
    pub bind_addr: SocketAddr,
    pub mode: DispatchMode,
}

impl WebhookConfig {
    /// Config with defaults for everything but the verify token.
    pub fn new(verify_token: impl Into<String>) -> Self {
        Self {
            verify_token: SecretString::from(verify_token.into()),
            path: DEFAULT_WEBHOOK_PATH.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            mode: DispatchMode::default(),
        }
    }

    /// Build config from environment variables.
    ///
    /// `MESSENGER_VERIFY_TOKEN` is required; `MESSENGER_WEBHOOK_PATH`,
    /// `MESSENGER_BIND_ADDR` and `MESSENGER_DISPATCH_MODE` fall back to
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let verify_token = lookup("MESSENGER_VERIFY_TOKEN")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("MESSENGER_VERIFY_TOKEN".into()))?;

        let mut path = lookup("MESSENGER_WEBHOOK_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        validate_path(&path)?;

        let bind_raw =
            lookup("MESSENGER_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                key: "MESSENGER_BIND_ADDR".into(),
                message: e.to_string(),
            })?;

        let mode = match lookup("MESSENGER_DISPATCH_MODE") {
            Some(raw) => raw.parse()?,
            None => DispatchMode::default(),
        };

        Ok(Self {
            verify_token: SecretString::from(verify_token),
            path,
            bind_addr,
            mode,
        })
    }
}

/// The webhook path is registered verbatim as an axum route, so it must be a
/// literal and must not collide with the health route.
fn validate_path(path: &str) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidValue {
        key: "MESSENGER_WEBHOOK_PATH".into(),
        message: message.to_string(),
    };

    if path == HEALTH_PATH {
        return Err(invalid("conflicts with the health route"));
    }
    if path.contains(['{', '}', '*']) {
        return Err(invalid("route parameters and wildcards are not allowed"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_verify_token_is_an_error() {
        let err = WebhookConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "MESSENGER_VERIFY_TOKEN"));
    }

    #[test]
    fn defaults_apply() {
        let config =
            WebhookConfig::from_lookup(lookup(&[("MESSENGER_VERIFY_TOKEN", "s3cret")])).unwrap();
        assert_eq!(config.verify_token.expose_secret(), "s3cret");
        assert_eq!(config.path, "/webhook");
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.mode, DispatchMode::Lenient);
    }

    #[test]
    fn overrides_are_read() {
        let config = WebhookConfig::from_lookup(lookup(&[
            ("MESSENGER_VERIFY_TOKEN", "t"),
            ("MESSENGER_WEBHOOK_PATH", "hooks/messenger"),
            ("MESSENGER_BIND_ADDR", "127.0.0.1:9000"),
            ("MESSENGER_DISPATCH_MODE", "Strict"),
        ]))
        .unwrap();
        assert_eq!(config.path, "/hooks/messenger");
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.mode, DispatchMode::Strict);
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let err = WebhookConfig::from_lookup(lookup(&[
            ("MESSENGER_VERIFY_TOKEN", "t"),
            ("MESSENGER_BIND_ADDR", "not-an-addr"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MESSENGER_BIND_ADDR"));
    }

    fn path_error(path: &str) -> ConfigError {
        WebhookConfig::from_lookup(lookup(&[
            ("MESSENGER_VERIFY_TOKEN", "t"),
            ("MESSENGER_WEBHOOK_PATH", path),
        ]))
        .unwrap_err()
    }

    #[test]
    fn health_path_is_rejected() {
        for path in ["/health", "health"] {
            let err = path_error(path);
            assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MESSENGER_WEBHOOK_PATH"));
        }
    }

    #[test]
    fn route_syntax_in_path_is_rejected() {
        for path in ["/hook/{", "/hook/}", "/hook/{id}", "/hook/*rest"] {
            let err = path_error(path);
            assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MESSENGER_WEBHOOK_PATH"));
        }
    }

    #[test]
    fn invalid_mode_is_rejected() {
        assert!("fuzzy".parse::<DispatchMode>().is_err());
        assert_eq!("lenient".parse::<DispatchMode>().unwrap(), DispatchMode::Lenient);
    }
}
