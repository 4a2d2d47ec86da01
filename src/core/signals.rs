use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::core::models::notification::{ErrorSignal, NotificationDecision};
use crate::core::models::usage::UsageSnapshot;
use crate::core::selector::NotificationSelector;
use crate::core::threshold::UsageReport;

#[derive(Default)]
struct Inputs {
    blocking_error: Option<ErrorSignal>,
    upload_error: Option<ErrorSignal>,
    usage: Option<UsageReport>,
}

/// Holds the latest value of each selector input and republishes the decision
/// whenever one of them changes. Each input channel is last-write-wins.
///
/// Subscribers see one decision replaced by the next; there is never an
/// intermediate `None` between two notifications.
pub struct NotificationCenter {
    selector: NotificationSelector,
    inputs: Mutex<Inputs>,
    decision: watch::Sender<NotificationDecision>,
}

impl NotificationCenter {
    pub fn new(selector: NotificationSelector) -> Self {
        let (decision, _) = watch::channel(NotificationDecision::None);
        Self {
            selector,
            inputs: Mutex::new(Inputs::default()),
            decision,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationDecision> {
        self.decision.subscribe()
    }

    pub fn current(&self) -> NotificationDecision {
        self.decision.borrow().clone()
    }

    pub fn set_blocking_error(&self, err: Option<ErrorSignal>) -> NotificationDecision {
        self.update(|inputs| inputs.blocking_error = err)
    }

    pub fn set_upload_error(&self, err: Option<ErrorSignal>) -> NotificationDecision {
        self.update(|inputs| inputs.upload_error = err)
    }

    pub fn set_usage(
        &self,
        snapshot: Option<&UsageSnapshot>,
        now: DateTime<Utc>,
    ) -> NotificationDecision {
        let report = snapshot.map(|s| UsageReport::evaluate(s, now));
        self.update(|inputs| inputs.usage = report)
    }

    /// Latest evaluated usage, if any snapshot has been seen.
    pub fn usage(&self) -> Option<UsageReport> {
        self.lock().usage.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inputs> {
        self.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut Inputs)) -> NotificationDecision {
        let mut inputs = self.lock();
        apply(&mut inputs);
        let next = self.selector.select(
            inputs.blocking_error.as_ref(),
            inputs.upload_error.as_ref(),
            inputs.usage.as_ref(),
        );
        // Publish while still holding the inputs so two racing updates cannot
        // publish out of order.
        self.decision.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = current.kind(), to = next.kind(), "notification decision changed");
            *current = next.clone();
            true
        });
        next
    }
}
