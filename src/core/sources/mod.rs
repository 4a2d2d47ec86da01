pub mod fetch;
pub mod file;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::models::usage::UsageSnapshot;

/// Opaque identity of the user whose quota is read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quota read failures. Cloneable so one failure can be handed to every
/// caller waiting on the same request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed quota response: {0}")]
    Malformed(String),
}

/// Something that can read a user's current usage snapshot.
#[async_trait]
pub trait QuotaSource: Send + Sync {
    /// Short label for logs and output ("http", "file").
    fn name(&self) -> &'static str;

    /// Read the current snapshot. Never retries.
    async fn fetch_snapshot(&self, user: &UserId) -> Result<UsageSnapshot, FetchError>;
}
