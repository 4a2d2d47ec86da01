use colored::{control, ColoredString, Colorize};

use crate::core::formatter::{
    format_multiplier, format_remaining, format_usage_bar, format_used_percent,
};
use crate::core::models::notification::{NotificationDecision, Severity, UsageNotice};
use crate::core::models::tier::{CurrentLimits, TierLimitTable, UpgradeOffer};
use crate::core::models::usage::{Period, UsagePeriodView};
use crate::core::threshold::{is_blocking, is_warning, UsageReport};
use crate::core::upgrade::compute_multiplier;

const BAR_WIDTH: usize = 12;

/// Render the usage block followed by the selected notification.
///
/// Layout:
/// ```text
///  Usage (Free, http)
///   Monthly  80% used [██░░░░░░░░░░] 2 of 10 left
///            Resets in 2 days
///   Daily    33% used [████████░░░░] 2 of 3 left
///            Resets in 8 hours
///   Notice   Monthly usage at 80%: 2 left, resets in 2 days. Upgrade to Starter for 5x more.
/// ```
pub fn render_status(
    report: Option<&UsageReport>,
    tier_name: &str,
    source: &str,
    decision: &NotificationDecision,
    use_color: bool,
) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(" Usage ({}, {})", tier_name, source).bold().to_string());

    if let Some(report) = report {
        render_period(&mut lines, &report.monthly);
        render_period(&mut lines, &report.daily);
    } else {
        lines.push(format!("  {}", "No usage data".dimmed()));
    }

    lines.push(format!("  {}   {}", "Notice".cyan(), render_decision(decision)));
    lines.join("\n")
}

fn render_period(lines: &mut Vec<String>, view: &UsagePeriodView) {
    let percent = color_by_threshold(view, &format_used_percent(view.percentage));
    let bar = format_usage_bar(view.percentage, BAR_WIDTH).magenta();
    let padded_label = format!("{:<7}", view.period.label());

    lines.push(format!(
        "  {}  {} {} {}",
        padded_label.cyan(),
        percent,
        bar,
        format_remaining(view.remaining, view.limit)
    ));
    lines.push(format!("           {}", format!("Resets {}", view.reset_in).dimmed()));
}

fn color_by_threshold(view: &UsagePeriodView, text: &str) -> ColoredString {
    if is_blocking(view) {
        text.red()
    } else if is_warning(view) {
        text.yellow()
    } else {
        text.green()
    }
}

fn render_decision(decision: &NotificationDecision) -> String {
    match decision {
        NotificationDecision::BlockingError(err) => {
            format!("{} ({})", err.message, err.kind).red().to_string()
        }
        NotificationDecision::UploadError(err) => {
            format!("Upload failed: {}", err.message).yellow().to_string()
        }
        NotificationDecision::UsageWarning(notice) => render_usage_notice(notice),
        NotificationDecision::None => "none".dimmed().to_string(),
    }
}

fn render_usage_notice(notice: &UsageNotice) -> String {
    let view = &notice.view;
    let headline = match notice.severity {
        Severity::Warning => format!(
            "{} usage at {}%: {} left, resets {}.",
            view.period.label(),
            view.percentage,
            view.remaining,
            view.reset_in
        )
        .yellow(),
        Severity::Blocking => format!(
            "{} limit reached, resets {}.",
            view.period.label(),
            view.reset_in
        )
        .red(),
    };
    format!("{} {}", headline, render_offer(&notice.upgrade, view.period))
}

fn render_offer(offer: &UpgradeOffer, period: Period) -> String {
    match offer {
        UpgradeOffer::Available(path) => {
            let multiplier = match period {
                Period::Monthly => &path.monthly_multiplier,
                Period::Daily => &path.daily_multiplier,
            };
            format!(
                "Upgrade to {} for {}.",
                path.next_tier_name,
                format_multiplier(multiplier)
            )
        }
        UpgradeOffer::NoUpgradePath => "You are on the highest tier.".to_string(),
    }
}

/// Render the tier table with the upgrade multiplier from each tier.
pub fn render_tiers(table: &TierLimitTable, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = vec![" Tiers".bold().to_string()];
    for (tier, limits) in table.iter() {
        let current = CurrentLimits {
            daily_limit: limits.daily_limit,
            monthly_limit: limits.monthly_limit,
        };
        let upgrade = match compute_multiplier(tier, current, table) {
            UpgradeOffer::Available(path) => format!(
                "→ {}: {} daily, {} monthly",
                path.next_tier_name,
                format_multiplier(&path.daily_multiplier),
                format_multiplier(&path.monthly_multiplier)
            ),
            UpgradeOffer::NoUpgradePath => "highest tier".to_string(),
        };
        lines.push(format!(
            "  {}  {:>6}/day {:>7}/month  {}",
            format!("{:<10}", limits.display_name).cyan(),
            limits.daily_limit,
            limits.monthly_limit,
            upgrade.dimmed()
        ));
        if !limits.additional_features.is_empty() {
            lines.push(format!("              {}", limits.additional_features.join(", ")));
        }
    }
    lines.join("\n")
}
