use crate::core::models::tier::{CurrentLimits, Multiplier, TierLimitTable, UpgradeOffer, UpgradePath};
use crate::core::models::usage::Tier;

fn ratio(next_limit: u64, current_limit: u64) -> Multiplier {
    match next_limit.checked_div(current_limit) {
        Some(n) if n >= 1 => Multiplier::Times(n),
        _ => Multiplier::ContactSales,
    }
}

/// Work out how much more the next tier offers over the user's current limits.
///
/// Always read from `table`, so changing the configured limits changes every
/// multiplier shown. The top tier yields [`UpgradeOffer::NoUpgradePath`].
pub fn compute_multiplier(
    current_tier: Tier,
    current_limits: CurrentLimits,
    table: &TierLimitTable,
) -> UpgradeOffer {
    let Some(next_tier) = current_tier.next() else {
        return UpgradeOffer::NoUpgradePath;
    };
    let next = table.get(next_tier);

    UpgradeOffer::Available(UpgradePath {
        next_tier,
        next_tier_name: next.display_name.clone(),
        monthly_multiplier: ratio(next.monthly_limit, current_limits.monthly_limit),
        daily_multiplier: ratio(next.daily_limit, current_limits.daily_limit),
        next_tier_features: next.additional_features.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::tier::TierLimits;
    use std::collections::BTreeMap;

    fn table_limits(table: &TierLimitTable, tier: Tier) -> CurrentLimits {
        let limits = table.get(tier);
        CurrentLimits {
            daily_limit: limits.daily_limit,
            monthly_limit: limits.monthly_limit,
        }
    }

    fn path(offer: UpgradeOffer) -> UpgradePath {
        match offer {
            UpgradeOffer::Available(path) => path,
            UpgradeOffer::NoUpgradePath => panic!("expected an upgrade path"),
        }
    }

    #[test]
    fn free_to_starter_is_five_times() {
        let table = TierLimitTable::default();
        let offer = compute_multiplier(Tier::Free, table_limits(&table, Tier::Free), &table);
        let path = path(offer);
        assert_eq!(path.next_tier, Tier::Starter);
        assert_eq!(path.next_tier_name, "Starter");
        assert_eq!(path.monthly_multiplier, Multiplier::Times(5));
        assert_eq!(path.daily_multiplier, Multiplier::Times(3));
        assert_eq!(path.next_tier_features, table.get(Tier::Starter).additional_features);
    }

    #[test]
    fn pro_to_team_uses_current_limits() {
        let table = TierLimitTable::default();
        let current = CurrentLimits {
            daily_limit: 10,
            monthly_limit: 50,
        };
        let path = path(compute_multiplier(Tier::Pro, current, &table));
        assert_eq!(path.next_tier, Tier::Team);
        assert_eq!(path.monthly_multiplier, Multiplier::Times(20));
        assert_eq!(path.daily_multiplier, Multiplier::Times(25));
    }

    #[test]
    fn enterprise_has_no_upgrade_path() {
        let table = TierLimitTable::default();
        let offer = compute_multiplier(
            Tier::Enterprise,
            table_limits(&table, Tier::Enterprise),
            &table,
        );
        assert_eq!(offer, UpgradeOffer::NoUpgradePath);
    }

    #[test]
    fn zero_current_limit_is_contact_sales() {
        let table = TierLimitTable::default();
        let current = CurrentLimits {
            daily_limit: 0,
            monthly_limit: 0,
        };
        let path = path(compute_multiplier(Tier::Free, current, &table));
        assert_eq!(path.monthly_multiplier, Multiplier::ContactSales);
        assert_eq!(path.daily_multiplier, Multiplier::ContactSales);
    }

    #[test]
    fn custom_limits_above_next_tier_are_contact_sales() {
        let table = TierLimitTable::default();
        let current = CurrentLimits {
            daily_limit: 5000,
            monthly_limit: 50_000,
        };
        let path = path(compute_multiplier(Tier::Team, current, &table));
        assert_eq!(path.monthly_multiplier, Multiplier::ContactSales);
    }

    #[test]
    fn multiplier_follows_table_changes() {
        let mut tiers: BTreeMap<Tier, TierLimits> = TierLimitTable::default().into();
        if let Some(starter) = tiers.get_mut(&Tier::Starter) {
            starter.monthly_limit = 100;
        }
        let table = TierLimitTable::new(tiers).unwrap();
        let current = CurrentLimits {
            daily_limit: 3,
            monthly_limit: 10,
        };
        let path = path(compute_multiplier(Tier::Free, current, &table));
        assert_eq!(path.monthly_multiplier, Multiplier::Times(10));
    }

    #[test]
    fn every_upgrade_on_default_table_is_at_least_one() {
        let table = TierLimitTable::default();
        for tier in Tier::all() {
            match compute_multiplier(*tier, table_limits(&table, *tier), &table) {
                UpgradeOffer::Available(path) => {
                    assert!(matches!(path.monthly_multiplier, Multiplier::Times(n) if n >= 1));
                    assert!(matches!(path.daily_multiplier, Multiplier::Times(n) if n >= 1));
                }
                UpgradeOffer::NoUpgradePath => assert_eq!(*tier, Tier::Enterprise),
            }
        }
    }
}
