//! Completion client configuration.

use serde::{Deserialize, Serialize};

use crate::completion::{CompletionError, CompletionResult, DEFAULT_MAX_TOKENS};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
/// Label photos can take a while; two minutes covers a slow vision reply.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_ENDPOINT: &str = "MEDMINDER_ENDPOINT";
pub const ENV_MODEL: &str = "MEDMINDER_MODEL";
pub const ENV_API_KEY: &str = "MEDMINDER_API_KEY";
pub const ENV_MAX_TOKENS: &str = "MEDMINDER_MAX_TOKENS";
pub const ENV_TIMEOUT_SECS: &str = "MEDMINDER_TIMEOUT_SECS";

/// Settings for the remote completion client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Full URL of the messages endpoint (or a proxy in front of it)
    pub endpoint: String,
    /// Model identifier sent with every request
    pub model: String,
    /// API key; omitted when talking to a keyless proxy
    pub api_key: Option<String>,
    /// Token budget per request
    pub max_tokens: u32,
    /// Transport timeout; `None` waits indefinitely
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            model: DEFAULT_MODEL.into(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read configuration from `MEDMINDER_*` environment variables.
    pub fn from_env() -> CompletionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> CompletionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = non_blank(lookup(ENV_ENDPOINT)) {
            config.endpoint = endpoint;
        }
        if let Some(model) = non_blank(lookup(ENV_MODEL)) {
            config.model = model;
        }
        config.api_key = non_blank(lookup(ENV_API_KEY));

        if let Some(raw) = non_blank(lookup(ENV_MAX_TOKENS)) {
            config.max_tokens = raw.parse().map_err(|_| {
                CompletionError::Config(format!("{} must be a positive integer, got {:?}", ENV_MAX_TOKENS, raw))
            })?;
        }
        if let Some(raw) = non_blank(lookup(ENV_TIMEOUT_SECS)) {
            config.timeout_secs = Some(raw.parse().map_err(|_| {
                CompletionError::Config(format!("{} must be a whole number of seconds, got {:?}", ENV_TIMEOUT_SECS, raw))
            })?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the transport cannot use.
    pub fn validate(&self) -> CompletionResult<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(CompletionError::Config(format!(
                "endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }
        if self.model.trim().is_empty() {
            return Err(CompletionError::Config("model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(CompletionError::Config("max_tokens must be greater than zero".into()));
        }
        if self.timeout_secs == Some(0) {
            return Err(CompletionError::Config("timeout_secs must be greater than zero".into()));
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
