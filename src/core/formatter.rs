use chrono::{DateTime, Utc};

use crate::core::models::tier::Multiplier;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Returns "in N days", "in N hours" or "in N minutes" using the largest whole
/// unit that fits. A reset that is less than a minute away, or already past
/// (stale snapshot), reads "in a few minutes".
pub fn format_reset_countdown(resets_at: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let total_seconds = (*resets_at - *now).num_seconds();

    if total_seconds < MINUTE {
        return "in a few minutes".to_string();
    }

    if total_seconds >= DAY {
        format!("in {}", plural(total_seconds / DAY, "day"))
    } else if total_seconds >= HOUR {
        format!("in {}", plural(total_seconds / HOUR, "hour"))
    } else {
        format!("in {}", plural(total_seconds / MINUTE, "minute"))
    }
}

/// Returns "{percentage}% used".
pub fn format_used_percent(percentage: u8) -> String {
    format!("{}% used", percentage.min(100))
}

/// Returns "2 of 10 left".
pub fn format_remaining(remaining: u64, limit: u64) -> String {
    format!("{} of {} left", remaining, limit)
}

/// Returns "[████████░░░░]" where █ = remaining portion, ░ = used portion.
pub fn format_usage_bar(percentage: u8, width: usize) -> String {
    let used = f64::from(percentage.min(100));
    let used_blocks = ((used / 100.0) * width as f64).round() as usize;
    let remaining_blocks = width.saturating_sub(used_blocks);

    let filled: String = "█".repeat(remaining_blocks);
    let empty: String = "░".repeat(used_blocks);

    format!("[{}{}]", filled, empty)
}

/// Returns "5x more", or "contact sales" when no ratio can be given.
pub fn format_multiplier(multiplier: &Multiplier) -> String {
    match multiplier {
        Multiplier::Times(n) => format!("{}x more", n),
        Multiplier::ContactSales => "contact sales".to_string(),
    }
}
