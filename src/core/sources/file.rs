use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;

use crate::core::models::usage::UsageSnapshot;
use crate::core::sources::fetch::parse_quota_response;
use crate::core::sources::{FetchError, QuotaSource, UserId};

/// Reads a saved quota payload from disk, for offline evaluation.
pub struct FileQuotaSource {
    path: PathBuf,
}

impl FileQuotaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuotaSource for FileQuotaSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch_snapshot(&self, _user: &UserId) -> Result<UsageSnapshot, FetchError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Network(format!("{}: {}", self.path.display(), e)))?;
        parse_quota_response(&body, Utc::now())
    }
}
