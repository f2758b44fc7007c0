//! of-api: REST boundary of the prescriptive-analysis backend.
//!
//! [`ApiClient`] exposes one typed method per backend endpoint and normalizes
//! wire shapes (`id`, `project`, `csv_name`, ...) into `of-core` entities.
//! Requests go through a [`Transport`], either [`HttpTransport`] for a real
//! server or [`ScriptedTransport`] for canned responses.

pub mod client;
pub mod request;
pub mod scripted;
pub mod transport;
pub mod wire;

pub use client::ApiClient;
pub use request::{ApiRequest, Method, UploadForm};
pub use scripted::{RecordedRequest, ScriptedTransport};
pub use transport::{HttpTransport, Transport};
pub use wire::{GoalRecord, PropertyLists};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Request to {target} failed: {message}")]
    Transport { target: String, message: String },

    #[error("Server returned {status} for {target}: {body}")]
    Status {
        target: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {target}: {message}")]
    Decode { target: String, message: String },

    #[error("Malformed response from {target}: {what}")]
    Malformed { target: String, what: String },
}

impl ApiError {
    pub fn target(&self) -> &str {
        match self {
            ApiError::Transport { target, .. }
            | ApiError::Status { target, .. }
            | ApiError::Decode { target, .. }
            | ApiError::Malformed { target, .. } => target,
        }
    }
}
