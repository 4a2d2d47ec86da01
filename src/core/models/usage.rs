use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription plan level. Declaration order is the upgrade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Starter,
    Pro,
    Team,
    Enterprise,
}

impl Tier {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "starter" => Some(Self::Starter),
            "pro" => Some(Self::Pro),
            "team" => Some(Self::Team),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Team => "team",
            Self::Enterprise => "enterprise",
        }
    }

    /// All tiers, lowest first.
    pub fn all() -> &'static [Tier] {
        &[
            Tier::Free,
            Tier::Starter,
            Tier::Pro,
            Tier::Team,
            Tier::Enterprise,
        ]
    }

    /// The tier directly above this one, or `None` for the top tier.
    pub fn next(&self) -> Option<Tier> {
        match self {
            Self::Free => Some(Self::Starter),
            Self::Starter => Some(Self::Pro),
            Self::Pro => Some(Self::Team),
            Self::Team => Some(Self::Enterprise),
            Self::Enterprise => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Monthly,
}

impl Period {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Monthly => "Monthly",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("{period:?} remaining {reported} does not match limit {limit} - used {used}")]
    InconsistentRemaining {
        period: Period,
        used: u64,
        limit: u64,
        reported: u64,
    },
}

/// Counters for a single quota period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodUsage {
    used: u64,
    limit: u64,
    remaining: u64,
    reset_at: DateTime<Utc>,
}

impl PeriodUsage {
    /// Remaining is always `limit - used`, floored at zero.
    pub fn new(used: u64, limit: u64, reset_at: DateTime<Utc>) -> Self {
        Self {
            used,
            limit,
            remaining: limit.saturating_sub(used),
            reset_at,
        }
    }

    /// Like [`PeriodUsage::new`], but cross-checks a server-reported remaining count.
    pub fn with_reported_remaining(
        period: Period,
        used: u64,
        limit: u64,
        reported: u64,
        reset_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        let usage = Self::new(used, limit, reset_at);
        if usage.remaining != reported {
            return Err(SnapshotError::InconsistentRemaining {
                period,
                used,
                limit,
                reported,
            });
        }
        Ok(usage)
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }
}

/// Point-in-time read of a user's consumption against quota. Never mutated;
/// a fresh fetch produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    tier: Tier,
    daily: PeriodUsage,
    monthly: PeriodUsage,
    fetched_at: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn new(
        tier: Tier,
        daily: PeriodUsage,
        monthly: PeriodUsage,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tier,
            daily,
            monthly,
            fetched_at,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn period(&self, period: Period) -> &PeriodUsage {
        match period {
            Period::Daily => &self.daily,
            Period::Monthly => &self.monthly,
        }
    }

    pub fn daily(&self) -> &PeriodUsage {
        &self.daily
    }

    pub fn monthly(&self) -> &PeriodUsage {
        &self.monthly
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Per-period projection of a snapshot used by display logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsagePeriodView {
    pub period: Period,
    /// 0..=100. Only 100 when nothing remains.
    pub percentage: u8,
    pub used: u64,
    pub remaining: u64,
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
    /// Countdown text, e.g. "in 2 days".
    pub reset_in: String,
    /// Set when the limit was zero and the percentage was pinned to 100
    /// instead of being divided out.
    pub zero_limit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn tier_order_follows_upgrade_path() {
        let mut tier = Tier::Free;
        let mut seen = vec![tier];
        while let Some(next) = tier.next() {
            assert!(next > tier);
            seen.push(next);
            tier = next;
        }
        assert_eq!(seen, Tier::all());
    }

    #[test]
    fn tier_from_id_round_trips() {
        for tier in Tier::all() {
            assert_eq!(Tier::from_id(tier.id()), Some(*tier));
        }
        assert_eq!(Tier::from_id(" PRO "), Some(Tier::Pro));
        assert_eq!(Tier::from_id("platinum"), None);
    }

    #[test]
    fn remaining_floors_at_zero() {
        let usage = PeriodUsage::new(12, 10, Utc::now());
        assert_eq!(usage.remaining(), 0);
        let usage = PeriodUsage::new(3, 10, Utc::now());
        assert_eq!(usage.remaining(), 7);
        assert_eq!(usage.used() + usage.remaining(), usage.limit());
    }

    #[test]
    fn reported_remaining_must_match() {
        let reset = Utc::now() + Duration::days(1);
        assert!(PeriodUsage::with_reported_remaining(Period::Daily, 4, 10, 6, reset).is_ok());
        let err = PeriodUsage::with_reported_remaining(Period::Daily, 4, 10, 5, reset).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn snapshot_exposes_periods() {
        let reset = Utc::now() + Duration::days(1);
        let snapshot = UsageSnapshot::new(
            Tier::Starter,
            PeriodUsage::new(1, 10, reset),
            PeriodUsage::new(20, 50, reset),
            Utc::now(),
        );
        assert_eq!(snapshot.tier(), Tier::Starter);
        assert_eq!(snapshot.period(Period::Daily).used(), 1);
        assert_eq!(snapshot.period(Period::Monthly).limit(), 50);
    }
}
