use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::core::models::usage::UsageSnapshot;
use crate::core::sources::fetch::{parse_quota_response, validate_endpoint};
use crate::core::sources::{FetchError, QuotaSource, UserId};

/// Reads usage from the quota REST endpoint.
pub struct HttpQuotaSource {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpQuotaSource {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        validate_endpoint(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
        })
    }
}

#[async_trait]
impl QuotaSource for HttpQuotaSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_snapshot(&self, user: &UserId) -> Result<UsageSnapshot, FetchError> {
        debug!(endpoint = %self.endpoint, %user, "requesting quota snapshot");

        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("user_id", user.as_str())])
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized(format!(
                "quota endpoint returned HTTP {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        parse_quota_response(&body, Utc::now())
    }
}
