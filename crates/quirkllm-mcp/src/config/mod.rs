//! Configuration loading and resolution.
//!
//! Precedence: CLI flags > environment > defaults. Flags are applied by the
//! binary on top of [`ServerConfig::from_env`].

pub mod desktop;

use crate::protocol::HandshakePolicy;
use crate::transport::framing::DEFAULT_MAX_MESSAGE_BYTES;
use crate::types::{Implementation, SERVER_NAME, SERVER_VERSION};

pub const ENV_NAME: &str = "QUIRKLLM_MCP_NAME";
pub const ENV_LOG: &str = "QUIRKLLM_MCP_LOG";
pub const ENV_STRICT: &str = "QUIRKLLM_MCP_STRICT";
pub const ENV_MAX_MESSAGE_BYTES: &str = "QUIRKLLM_MCP_MAX_MESSAGE_BYTES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    pub name: String,
    /// Version reported in `serverInfo`.
    pub version: String,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Reject methods that arrive out of handshake order.
    pub strict_handshake: bool,
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
            log_level: "info".to_string(),
            strict_handshake: false,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable source. Unusable values keep
    /// the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_NAME).filter(|v| !v.trim().is_empty()) {
            config.name = name.trim().to_string();
        }
        config.log_level = log_level(None, &lookup);
        if let Some(raw) = lookup(ENV_STRICT) {
            match parse_bool(&raw) {
                Some(strict) => config.strict_handshake = strict,
                None => tracing::warn!("Ignoring {ENV_STRICT}={raw:?}: expected a boolean"),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_MESSAGE_BYTES) {
            match raw.trim().parse::<usize>() {
                Ok(max) if max > 0 => config.max_message_bytes = max,
                _ => tracing::warn!(
                    "Ignoring {ENV_MAX_MESSAGE_BYTES}={raw:?}: expected a positive integer"
                ),
            }
        }

        config
    }

    pub fn handshake_policy(&self) -> HandshakePolicy {
        if self.strict_handshake {
            HandshakePolicy::Strict
        } else {
            HandshakePolicy::Tolerant
        }
    }

    pub fn server_info(&self) -> Implementation {
        Implementation {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// Log filter from the `--log-level` flag, then `QUIRKLLM_MCP_LOG`, then
/// `info`. Needed before the subscriber exists, so it never logs.
pub fn log_level(flag: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> String {
    flag.map(str::to_string)
        .or_else(|| lookup(ENV_LOG))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Accepts `1/0`, `true/false`, `yes/no`, `on/off`, case-insensitively.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.name, "quirkllm");
        assert_eq!(config.handshake_policy(), HandshakePolicy::Tolerant);
    }

    #[test]
    fn environment_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_NAME, "custom"),
            (ENV_LOG, "debug"),
            (ENV_STRICT, "yes"),
            (ENV_MAX_MESSAGE_BYTES, "1024"),
        ]));
        assert_eq!(config.name, "custom");
        assert_eq!(config.log_level, "debug");
        assert!(config.strict_handshake);
        assert_eq!(config.max_message_bytes, 1024);
        assert_eq!(config.server_info().name, "custom");
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_STRICT, "maybe"),
            (ENV_MAX_MESSAGE_BYTES, "0"),
            (ENV_NAME, "  "),
        ]));
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn log_level_precedence() {
        let env = lookup(&[(ENV_LOG, "warn")]);
        assert_eq!(log_level(Some("trace"), &env), "trace");
        assert_eq!(log_level(None, &env), "warn");
        assert_eq!(log_level(Some(" "), &env), "info");
        assert_eq!(log_level(None, lookup(&[])), "info");
    }

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
