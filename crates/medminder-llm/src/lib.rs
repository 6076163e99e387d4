//! Remote completion client for prescription label reading, dosing advice and
//! symptom triage.
//!
//! The three operations are exposed as capability traits ([`LabelExtractor`],
//! [`TimingAdvisor`], [`SymptomEvaluator`]) so callers can swap the remote
//! [`RemoteAdvisor`] for a deterministic stub.

pub mod advisor;
pub mod completion;
pub mod config;
pub mod extraction;
pub mod http;
pub mod prompts;
pub mod types;

pub use advisor::*;
pub use completion::*;
pub use config::ClientConfig;
pub use extraction::*;
pub use http::HttpCompletionClient;
pub use types::*;
