use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::core::models::usage::UsageSnapshot;
use crate::core::sources::{FetchError, QuotaSource, UserId};

type FetchOutcome = Result<Arc<UsageSnapshot>, FetchError>;
type PendingFetch = Shared<BoxFuture<'static, FetchOutcome>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    Ready,
    Failed,
}

struct InFlight {
    seq: u64,
    fetch: PendingFetch,
    task: AbortHandle,
}

struct State {
    pending: Option<InFlight>,
    last_started: u64,
    last_applied: u64,
    settled: Phase,
}

struct Inner {
    state: Mutex<State>,
    snapshot: watch::Sender<Option<Arc<UsageSnapshot>>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs exactly once per fetch, on the fetch task, whether or not anyone
    /// is still waiting for it.
    fn complete(&self, seq: u64, result: Result<UsageSnapshot, FetchError>) -> FetchOutcome {
        let mut state = self.lock();
        if matches!(&state.pending, Some(in_flight) if in_flight.seq == seq) {
            state.pending = None;
        }

        match result {
            Ok(snapshot) => {
                if seq <= state.last_applied {
                    warn!(
                        seq,
                        last_applied = state.last_applied,
                        "stale quota response discarded"
                    );
                    let current = self.snapshot.borrow().clone();
                    return Ok(current.unwrap_or_else(|| Arc::new(snapshot)));
                }
                let snapshot = Arc::new(snapshot);
                state.last_applied = seq;
                state.settled = Phase::Ready;
                self.snapshot.send_replace(Some(Arc::clone(&snapshot)));
                info!(seq, tier = %snapshot.tier(), "quota snapshot updated");
                Ok(snapshot)
            }
            Err(err) => {
                warn!(seq, error = %err, "quota fetch failed");
                if seq == state.last_started {
                    state.settled = Phase::Failed;
                }
                Err(err)
            }
        }
    }
}

/// Owns the current usage snapshot for one user.
///
/// Concurrent [`refresh`](Self::refresh) calls share a single in-flight
/// request. Each request carries a sequence number and a response older than
/// the last applied one is dropped instead of overwriting newer data.
pub struct SnapshotProvider {
    source: Arc<dyn QuotaSource>,
    user: UserId,
    inner: Arc<Inner>,
}

impl SnapshotProvider {
    pub fn new(source: Arc<dyn QuotaSource>, user: UserId) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            source,
            user,
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    pending: None,
                    last_started: 0,
                    last_applied: 0,
                    settled: Phase::Idle,
                }),
                snapshot,
            }),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Fetch a fresh snapshot and make it current, or join the fetch already
    /// in flight.
    pub async fn refresh(&self) -> FetchOutcome {
        let pending = {
            let mut state = self.inner.lock();
            let in_flight = state
                .pending
                .as_ref()
                .map(|in_flight| (in_flight.seq, in_flight.fetch.clone()));
            match in_flight {
                Some((seq, fetch)) => {
                    debug!(seq, "joining in-flight quota fetch");
                    fetch
                }
                None => {
                    state.last_started += 1;
                    let seq = state.last_started;
                    debug!(
                        seq,
                        source = self.source.name(),
                        user = %self.user,
                        "starting quota fetch"
                    );
                    let in_flight = self.start(seq);
                    let fetch = in_flight.fetch.clone();
                    state.pending = Some(in_flight);
                    fetch
                }
            }
        };
        pending.await
    }

    /// Spawn the fetch so it settles even if every waiter is dropped.
    fn start(&self, seq: u64) -> InFlight {
        let source = Arc::clone(&self.source);
        let user = self.user.clone();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let result = source.fetch_snapshot(&user).await;
            inner.complete(seq, result)
        });
        let task = handle.abort_handle();
        let fetch = handle
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(FetchError::Network(format!("quota fetch task failed: {}", e)))
                })
            })
            .boxed()
            .shared();
        InFlight { seq, fetch, task }
    }

    /// Forget the in-flight request. Callers still awaiting it get its result,
    /// but it is only applied if nothing newer has been applied meanwhile.
    pub fn cancel_pending(&self) -> bool {
        match self.inner.lock().pending.take() {
            Some(in_flight) => {
                debug!(seq = in_flight.seq, "abandoning in-flight quota fetch");
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<Arc<UsageSnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<UsageSnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    pub fn phase(&self) -> Phase {
        let state = self.inner.lock();
        if state.pending.is_some() {
            Phase::Fetching
        } else {
            state.settled
        }
    }
}

impl Drop for SnapshotProvider {
    fn drop(&mut self) {
        if let Some(in_flight) = self.inner.lock().pending.take() {
            in_flight.task.abort();
        }
    }
}
