use serde::{Deserialize, Serialize};

use crate::core::models::tier::UpgradeOffer;
use crate::core::models::usage::{Tier, UsagePeriodView};

/// Error supplied by an upstream collaborator (generation API, file upload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSignal {
    pub message: String,
    pub kind: String,
}

impl ErrorSignal {
    pub fn new(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 80% banner.
    Warning,
    /// 100% modal.
    Blocking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageNotice {
    pub severity: Severity,
    pub tier: Tier,
    pub view: UsagePeriodView,
    pub upgrade: UpgradeOffer,
}

/// The single notification to present for one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "payload")]
pub enum NotificationDecision {
    BlockingError(ErrorSignal),
    UploadError(ErrorSignal),
    UsageWarning(UsageNotice),
    None,
}

impl NotificationDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BlockingError(_) => "blocking_error",
            Self::UploadError(_) => "upload_error",
            Self::UsageWarning(_) => "usage_warning",
            Self::None => "none",
        }
    }
}
