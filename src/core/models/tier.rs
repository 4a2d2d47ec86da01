use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::models::usage::Tier;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierTableError {
    #[error("tier table is missing '{0}'")]
    MissingTier(Tier),
    #[error("{period} limit drops from {lower_limit} ({lower}) to {higher_limit} ({higher})")]
    NotMonotonic {
        period: &'static str,
        lower: Tier,
        lower_limit: u64,
        higher: Tier,
        higher_limit: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub daily_limit: u64,
    pub monthly_limit: u64,
    pub display_name: String,
    #[serde(default)]
    pub additional_features: Vec<String>,
}

impl TierLimits {
    fn new(daily_limit: u64, monthly_limit: u64, display_name: &str, features: &[&str]) -> Self {
        Self {
            daily_limit,
            monthly_limit,
            display_name: display_name.to_string(),
            additional_features: features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Read-only tier → limits mapping. Every tier is present and limits never
/// decrease along the upgrade path.
///
/// Deserializing merges the given tiers over the defaults, so a config only
/// needs to list the tiers it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Tier, TierLimits>", into = "BTreeMap<Tier, TierLimits>")]
pub struct TierLimitTable {
    tiers: BTreeMap<Tier, TierLimits>,
}

impl TierLimitTable {
    pub fn new(tiers: BTreeMap<Tier, TierLimits>) -> Result<Self, TierTableError> {
        for tier in Tier::all() {
            if !tiers.contains_key(tier) {
                return Err(TierTableError::MissingTier(*tier));
            }
        }

        for pair in Tier::all().windows(2) {
            let (lower, higher) = (&tiers[&pair[0]], &tiers[&pair[1]]);
            if higher.daily_limit < lower.daily_limit {
                return Err(TierTableError::NotMonotonic {
                    period: "daily",
                    lower: pair[0],
                    lower_limit: lower.daily_limit,
                    higher: pair[1],
                    higher_limit: higher.daily_limit,
                });
            }
            if higher.monthly_limit < lower.monthly_limit {
                return Err(TierTableError::NotMonotonic {
                    period: "monthly",
                    lower: pair[0],
                    lower_limit: lower.monthly_limit,
                    higher: pair[1],
                    higher_limit: higher.monthly_limit,
                });
            }
        }

        Ok(Self { tiers })
    }

    /// Replace the default limits of the listed tiers, then validate.
    pub fn with_overrides(
        overrides: BTreeMap<Tier, TierLimits>,
    ) -> Result<Self, TierTableError> {
        let mut tiers = Self::default().tiers;
        tiers.extend(overrides);
        Self::new(tiers)
    }

    pub fn get(&self, tier: Tier) -> &TierLimits {
        // Presence of every tier is checked in `new`.
        &self.tiers[&tier]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &TierLimits)> {
        self.tiers.iter().map(|(tier, limits)| (*tier, limits))
    }
}

impl Default for TierLimitTable {
    fn default() -> Self {
        let tiers = BTreeMap::from([
            (
                Tier::Free,
                TierLimits::new(3, 10, "Free", &["README generation", "Community support"]),
            ),
            (
                Tier::Starter,
                TierLimits::new(10, 50, "Starter", &["All doc types", "Email support"]),
            ),
            (
                Tier::Pro,
                TierLimits::new(
                    50,
                    200,
                    "Pro",
                    &["Batch processing", "Custom templates", "Priority support"],
                ),
            ),
            (
                Tier::Team,
                TierLimits::new(
                    250,
                    1000,
                    "Team",
                    &["Shared workspaces", "Usage analytics", "Team management"],
                ),
            ),
            (
                Tier::Enterprise,
                TierLimits::new(
                    1000,
                    10000,
                    "Enterprise",
                    &["SSO", "Audit logs", "Dedicated support", "SLA"],
                ),
            ),
        ]);
        Self { tiers }
    }
}

impl TryFrom<BTreeMap<Tier, TierLimits>> for TierLimitTable {
    type Error = TierTableError;

    fn try_from(tiers: BTreeMap<Tier, TierLimits>) -> Result<Self, Self::Error> {
        Self::with_overrides(tiers)
    }
}

impl From<TierLimitTable> for BTreeMap<Tier, TierLimits> {
    fn from(table: TierLimitTable) -> Self {
        table.tiers
    }
}

/// Limits actually applied to the user, as reported by the quota endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentLimits {
    pub daily_limit: u64,
    pub monthly_limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Multiplier {
    /// "Nx more"; always at least 1.
    Times(u64),
    /// No meaningful ratio: the current limit is zero or the next tier does
    /// not offer more.
    ContactSales,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePath {
    pub next_tier: Tier,
    pub next_tier_name: String,
    pub monthly_multiplier: Multiplier,
    pub daily_multiplier: Multiplier,
    pub next_tier_features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UpgradeOffer {
    Available(UpgradePath),
    NoUpgradePath,
}
