//! Completion service boundary.
//!
//! A single request/response call: ordered messages in, concatenated text out.
//! The HTTP transport lives in [`crate::http`]; tests use [`ScriptedCompletion`].

use std::collections::VecDeque;
use std::sync::Mutex;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default token budget for a single completion.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;

/// Completion service errors.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Cannot reach completion service at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion service error: {0}")]
    Service(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type CompletionResult<T> = Result<T, CompletionError>;

/// Message author.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Inline base64 image payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

/// One block of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Encode raw image bytes as an inline base64 block.
    pub fn image(bytes: &[u8], media_type: &str) -> Self {
        ContentBlock::Image {
            source: ImageSource {
                kind: "base64".into(),
                media_type: media_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        }
    }
}

/// A single conversation message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A user message with plain text content.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// Full completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: &str, messages: Vec<Message>) -> Self {
        Self {
            system: if system.is_empty() {
                None
            } else {
                Some(system.to_string())
            },
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// All text content across messages, in order.
    pub fn text_content(&self) -> String {
        self.messages
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Image { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A text/vision completion service.
pub trait CompletionService: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> CompletionResult<String>;
}

/// Completion stub that replays queued replies in order.
///
/// Every request is recorded so tests can inspect the prompts that were sent.
/// When the queue is empty the stub fails like an unreachable service.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<CompletionResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    /// Queue a failed exchange.
    pub fn fail(self, error: CompletionError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, reply: CompletionResult<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> CompletionResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.replies
            .lock()
            .map_err(|_| CompletionError::HttpClient("Lock poisoned".into()))?
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Connection("scripted".into())))
    }
}
