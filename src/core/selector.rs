use std::sync::Arc;

use crate::core::models::notification::{ErrorSignal, NotificationDecision, Severity, UsageNotice};
use crate::core::models::tier::TierLimitTable;
use crate::core::threshold::{is_active, is_blocking, UsageReport};
use crate::core::upgrade::compute_multiplier;

/// Picks the single notification to show from competing signals.
///
/// Priority, highest first: blocking error, upload error, usage (monthly view
/// when it is at or past the warning threshold, otherwise daily), nothing.
#[derive(Debug, Clone)]
pub struct NotificationSelector {
    table: Arc<TierLimitTable>,
}

impl NotificationSelector {
    pub fn new(table: Arc<TierLimitTable>) -> Self {
        Self { table }
    }

    pub fn select(
        &self,
        blocking_error: Option<&ErrorSignal>,
        upload_error: Option<&ErrorSignal>,
        usage: Option<&UsageReport>,
    ) -> NotificationDecision {
        if let Some(err) = blocking_error {
            return NotificationDecision::BlockingError(err.clone());
        }
        if let Some(err) = upload_error {
            return NotificationDecision::UploadError(err.clone());
        }
        let Some(report) = usage else {
            return NotificationDecision::None;
        };

        let view = [&report.monthly, &report.daily]
            .into_iter()
            .find(|view| is_active(view));
        let Some(view) = view else {
            return NotificationDecision::None;
        };

        let severity = if is_blocking(view) {
            Severity::Blocking
        } else {
            Severity::Warning
        };

        NotificationDecision::UsageWarning(UsageNotice {
            severity,
            tier: report.tier,
            view: view.clone(),
            upgrade: compute_multiplier(report.tier, report.current_limits(), &self.table),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::tier::{Multiplier, UpgradeOffer};
    use crate::core::models::usage::{Period, PeriodUsage, Tier, UsageSnapshot};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn report(tier: Tier, daily: (u64, u64), monthly: (u64, u64)) -> UsageReport {
        let now = now();
        let snapshot = UsageSnapshot::new(
            tier,
            PeriodUsage::new(daily.0, daily.1, now + Duration::hours(8)),
            PeriodUsage::new(monthly.0, monthly.1, now + Duration::days(2)),
            now,
        );
        UsageReport::evaluate(&snapshot, now)
    }

    fn selector() -> NotificationSelector {
        NotificationSelector::new(Arc::new(TierLimitTable::default()))
    }

    fn notice(decision: NotificationDecision) -> UsageNotice {
        match decision {
            NotificationDecision::UsageWarning(notice) => notice,
            other => panic!("expected usage warning, got {}", other.kind()),
        }
    }

    #[test]
    fn monthly_warning_offers_starter_upgrade() {
        let usage = report(Tier::Free, (1, 3), (8, 10));
        let notice = notice(selector().select(None, None, Some(&usage)));
        assert_eq!(notice.severity, Severity::Warning);
        assert_eq!(notice.view.period, Period::Monthly);
        assert_eq!(notice.view.percentage, 80);
        assert_eq!(notice.view.remaining, 2);
        match notice.upgrade {
            UpgradeOffer::Available(path) => {
                assert_eq!(path.monthly_multiplier, Multiplier::Times(5));
            }
            UpgradeOffer::NoUpgradePath => panic!("free tier should have an upgrade"),
        }
    }

    #[test]
    fn monthly_exhausted_is_blocking_variant() {
        let usage = report(Tier::Free, (1, 3), (10, 10));
        let notice = notice(selector().select(None, None, Some(&usage)));
        assert_eq!(notice.severity, Severity::Blocking);
        assert_eq!(notice.view.percentage, 100);
        assert_eq!(notice.view.remaining, 0);
    }

    #[test]
    fn blocking_error_suppresses_usage_block() {
        let usage = report(Tier::Free, (3, 3), (10, 10));
        let err = ErrorSignal::new("rate limited", "generation");
        let decision = selector().select(Some(&err), None, Some(&usage));
        assert_eq!(decision, NotificationDecision::BlockingError(err));
    }

    #[test]
    fn upload_error_beats_usage() {
        let usage = report(Tier::Free, (1, 3), (9, 10));
        let err = ErrorSignal::new("file too large", "upload");
        let decision = selector().select(None, Some(&err), Some(&usage));
        assert_eq!(decision, NotificationDecision::UploadError(err));
    }

    #[test]
    fn blocking_error_beats_upload_error() {
        let blocking = ErrorSignal::new("server error", "generation");
        let upload = ErrorSignal::new("bad file", "upload");
        let decision = selector().select(Some(&blocking), Some(&upload), None);
        assert_eq!(decision.kind(), "blocking_error");
    }

    #[test]
    fn daily_used_when_monthly_quiet() {
        let usage = report(Tier::Starter, (9, 10), (12, 50));
        let notice = notice(selector().select(None, None, Some(&usage)));
        assert_eq!(notice.view.period, Period::Daily);
        assert_eq!(notice.tier, Tier::Starter);
    }

    #[test]
    fn monthly_preferred_over_daily() {
        let usage = report(Tier::Free, (3, 3), (8, 10));
        let notice = notice(selector().select(None, None, Some(&usage)));
        assert_eq!(notice.view.period, Period::Monthly);
        assert_eq!(notice.severity, Severity::Warning);
    }

    #[test]
    fn quiet_usage_selects_none() {
        let usage = report(Tier::Pro, (1, 50), (20, 200));
        assert_eq!(
            selector().select(None, None, Some(&usage)),
            NotificationDecision::None
        );
        assert_eq!(selector().select(None, None, None), NotificationDecision::None);
    }

    #[test]
    fn enterprise_notice_has_no_upgrade() {
        let usage = report(Tier::Enterprise, (1, 1000), (9000, 10000));
        let notice = notice(selector().select(None, None, Some(&usage)));
        assert_eq!(notice.upgrade, UpgradeOffer::NoUpgradePath);
    }

    #[test]
    fn decision_serializes_with_kind_tag() {
        let usage = report(Tier::Free, (1, 3), (8, 10));
        let decision = selector().select(None, None, Some(&usage));
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["kind"], "usage_warning");
        assert_eq!(json["payload"]["severity"], "warning");
        assert_eq!(json["payload"]["upgrade"]["next_tier_name"], "Starter");
    }

    proptest! {
        #[test]
        fn blocking_error_always_wins(
            has_upload in any::<bool>(),
            daily_used in 0u64..20,
            monthly_used in 0u64..20,
        ) {
            let blocking = ErrorSignal::new("boom", "generation");
            let upload = ErrorSignal::new("bad", "upload");
            let usage = report(Tier::Free, (daily_used, 3), (monthly_used, 10));
            let decision = selector().select(
                Some(&blocking),
                has_upload.then_some(&upload),
                Some(&usage),
            );
            prop_assert_eq!(decision.kind(), "blocking_error");
        }
    }
}
