use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::core::models::usage::{Period, PeriodUsage, Tier, UsageSnapshot};
use crate::core::sources::FetchError;

/// Validate that a quota endpoint uses HTTPS.
///
/// Plain HTTP is only accepted for loopback hosts so a local test server can
/// stand in for the real endpoint without bearer tokens leaving the machine.
pub fn validate_endpoint(url: &str) -> anyhow::Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| anyhow::anyhow!("invalid quota endpoint '{}': {}", url, e))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(parsed.host_str()) => Ok(()),
        _ => anyhow::bail!("quota endpoint must use HTTPS, got: {}", url),
    }
}

fn is_loopback(host: Option<&str>) -> bool {
    let Some(host) = host else {
        return false;
    };
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    // IPv6 hosts keep their brackets in `host_str`.
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}

/// Wire shape of the quota read endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotaResponse {
    tier: String,
    daily_used: u64,
    daily_limit: u64,
    daily_remaining: Option<u64>,
    daily_reset_at: String,
    monthly_used: u64,
    monthly_limit: u64,
    monthly_remaining: Option<u64>,
    monthly_reset_at: String,
}

fn parse_reset(
    field: &str,
    raw: &str,
    fetched_at: DateTime<Utc>,
) -> Result<DateTime<Utc>, FetchError> {
    let reset_at = raw.parse::<DateTime<Utc>>().map_err(|e| {
        FetchError::Malformed(format!("{} '{}' is not ISO 8601: {}", field, raw, e))
    })?;
    if reset_at <= fetched_at {
        warn!(field, %reset_at, %fetched_at, "quota reset time is not in the future");
    }
    Ok(reset_at)
}

fn period_usage(
    period: Period,
    used: u64,
    limit: u64,
    remaining: Option<u64>,
    reset_at: DateTime<Utc>,
) -> Result<PeriodUsage, FetchError> {
    match remaining {
        Some(reported) => {
            PeriodUsage::with_reported_remaining(period, used, limit, reported, reset_at)
                .map_err(|e| FetchError::Malformed(e.to_string()))
        }
        None => Ok(PeriodUsage::new(used, limit, reset_at)),
    }
}

/// Decode a quota payload into a snapshot stamped with `fetched_at`.
pub fn parse_quota_response(
    body: &str,
    fetched_at: DateTime<Utc>,
) -> Result<UsageSnapshot, FetchError> {
    let raw: QuotaResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    let tier = Tier::from_id(&raw.tier)
        .ok_or_else(|| FetchError::Malformed(format!("unknown tier '{}'", raw.tier)))?;

    let daily = period_usage(
        Period::Daily,
        raw.daily_used,
        raw.daily_limit,
        raw.daily_remaining,
        parse_reset("dailyResetAt", &raw.daily_reset_at, fetched_at)?,
    )?;
    let monthly = period_usage(
        Period::Monthly,
        raw.monthly_used,
        raw.monthly_limit,
        raw.monthly_remaining,
        parse_reset("monthlyResetAt", &raw.monthly_reset_at, fetched_at)?,
    )?;

    Ok(UsageSnapshot::new(tier, daily, monthly, fetched_at))
}
