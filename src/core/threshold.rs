use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::formatter::format_reset_countdown;
use crate::core::models::tier::CurrentLimits;
use crate::core::models::usage::{Period, Tier, UsagePeriodView, UsageSnapshot};

pub const WARNING_PERCENT: u8 = 80;

/// Rounded share of the limit that has been used.
///
/// A zero limit counts as exhausted. While anything remains the result is
/// capped at 99, so 100 always means blocked.
fn used_percentage(used: u64, limit: u64, remaining: u64) -> u8 {
    if limit == 0 {
        return 100;
    }
    let limit = u128::from(limit);
    let rounded = (u128::from(used) * 100 + limit / 2) / limit;
    let clamped = rounded.min(100) as u8;
    if remaining > 0 {
        clamped.min(99)
    } else {
        clamped
    }
}

/// Project one period of a snapshot. Pure: `now` only feeds the countdown.
pub fn evaluate(snapshot: &UsageSnapshot, period: Period, now: DateTime<Utc>) -> UsagePeriodView {
    let usage = snapshot.period(period);
    let reset_at = usage.reset_at();
    UsagePeriodView {
        period,
        percentage: used_percentage(usage.used(), usage.limit(), usage.remaining()),
        used: usage.used(),
        remaining: usage.remaining(),
        limit: usage.limit(),
        reset_at,
        reset_in: format_reset_countdown(&reset_at, &now),
        zero_limit: usage.limit() == 0,
    }
}

/// 80% banner condition. Never true together with [`is_blocking`].
pub fn is_warning(view: &UsagePeriodView) -> bool {
    (WARNING_PERCENT..100).contains(&view.percentage) && view.remaining > 0
}

pub fn is_blocking(view: &UsagePeriodView) -> bool {
    view.remaining == 0
}

pub fn is_active(view: &UsagePeriodView) -> bool {
    is_warning(view) || is_blocking(view)
}

/// Both periods of one snapshot, evaluated against the same `now`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub tier: Tier,
    pub daily: UsagePeriodView,
    pub monthly: UsagePeriodView,
}

impl UsageReport {
    pub fn evaluate(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            tier: snapshot.tier(),
            daily: evaluate(snapshot, Period::Daily, now),
            monthly: evaluate(snapshot, Period::Monthly, now),
        }
    }

    pub fn current_limits(&self) -> CurrentLimits {
        CurrentLimits {
            daily_limit: self.daily.limit,
            monthly_limit: self.monthly.limit,
        }
    }
}
