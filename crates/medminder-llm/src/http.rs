//! HTTP transport for a Messages-API style completion endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::completion::{
    CompletionError, CompletionRequest, CompletionResult, CompletionService, Message,
};
use crate::config::ClientConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Blocking HTTP client for the remote completion service.
pub struct HttpCompletionClient {
    config: ClientConfig,
    client: reqwest::blocking::Client,
}

impl HttpCompletionClient {
    pub fn new(config: ClientConfig) -> CompletionResult<Self> {
        config.validate()?;

        let mut builder = reqwest::blocking::Client::builder();
        // reqwest's blocking client defaults to 30s; None lifts the limit
        builder = match config.timeout_secs {
            Some(secs) => builder.timeout(Duration::from_secs(secs)),
            None => builder.timeout(None),
        };
        let client = builder
            .build()
            .map_err(|e| CompletionError::HttpClient(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Client configured from `MEDMINDER_*` environment variables.
    pub fn from_env() -> CompletionResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Request body for the messages endpoint.
#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
}

/// Response body from the messages endpoint.
#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    error: Option<ServiceError>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ServiceError {
    message: Option<String>,
}

impl CompletionService for HttpCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> CompletionResult<String> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens.min(self.config.max_tokens),
            system: request.system.as_deref(),
            messages: &request.messages,
        };

        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            max_tokens = body.max_tokens,
            "Sending completion request"
        );

        let mut http = self
            .client
            .post(&self.config.endpoint)
            .header("content-type", "application/json");
        if let Some(key) = &self.config.api_key {
            http = http
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION);
        }

        let response = http.json(&body).send().map_err(|e| {
            if e.is_connect() {
                CompletionError::Connection(self.config.endpoint.clone())
            } else if e.is_timeout() {
                CompletionError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.config.timeout_secs.unwrap_or_default()
                ))
            } else {
                CompletionError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| CompletionError::ResponseParsing(e.to_string()))?;

        collect_text(parsed)
    }
}

fn collect_text(response: MessagesResponse) -> CompletionResult<String> {
    if let Some(error) = response.error {
        return Err(CompletionError::Service(
            error.message.unwrap_or_else(|| "unknown error".into()),
        ));
    }
    Ok(response
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ContentBlock;

    #[test]
    fn test_client_constructor() {
        let client = HttpCompletionClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.config().endpoint, crate::config::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = ClientConfig {
            endpoint: "localhost:8080".into(),
            ..ClientConfig::default()
        };
        assert!(HttpCompletionClient::new(config).is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![Message {
            role: crate::completion::Role::User,
            content: vec![ContentBlock::text("hi")],
        }];
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: None,
            messages: &messages,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["max_tokens"], 10);
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["content"][0]["text"], "hi");
    }

    #[test]
    fn test_collect_text_concatenates_blocks() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"{\"a\":"},{"type":"text","text":"1}"},{"type":"tool_use"}]}"#,
        )
        .unwrap();
        assert_eq!(collect_text(response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_collect_text_surfaces_service_error() {
        let response: MessagesResponse =
            serde_json::from_str(r#"{"error":{"type":"overloaded_error","message":"Overloaded"}}"#)
                .unwrap();
        match collect_text(response) {
            Err(CompletionError::Service(msg)) => assert_eq!(msg, "Overloaded"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_collect_text_empty_content() {
        let response: MessagesResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(collect_text(response).unwrap(), "");
    }
}
