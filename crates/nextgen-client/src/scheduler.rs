/*
[INPUT]:  TaskStore, a history source, polling interval, cancellation token
[OUTPUT]: Periodic reconciliation passes while non-terminal tasks exist
[POS]:    Sync layer - drives TaskStore toward the server's list
[UPDATE]: When changing polling cadence, skip rules, or start/stop semantics
*/

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::endpoint::EndpointConfig;
use crate::http::{NextgenClient, Result};
use crate::store::{PassTicket, TaskStore};
use crate::types::Task;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Where reconciliation passes read the server's task list from.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn try_fetch_history(&self) -> Result<Vec<Task>>;
}

#[async_trait]
impl HistorySource for NextgenClient {
    async fn try_fetch_history(&self) -> Result<Vec<Task>> {
        NextgenClient::try_fetch_history(self).await
    }
}

/// Always reads through the client that is current when the pass starts.
#[async_trait]
impl HistorySource for EndpointConfig {
    async fn try_fetch_history(&self) -> Result<Vec<Task>> {
        let client = self.client();
        client.try_fetch_history().await
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug)]
struct ActiveTimer {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Idle/Active polling state machine.
///
/// `start` is idempotent and `stop` is always safe. Stopping cancels future
/// ticks only; a pass already waiting on the network still lands in the
/// store if the store is alive.
pub struct SyncScheduler {
    store: Arc<TaskStore>,
    source: Arc<dyn HistorySource>,
    config: SchedulerConfig,
    timer: Mutex<Option<ActiveTimer>>,
}

impl SyncScheduler {
    pub fn new(store: Arc<TaskStore>, source: Arc<dyn HistorySource>) -> Self {
        Self::with_config(store, source, SchedulerConfig::default())
    }

    pub fn with_config(
        store: Arc<TaskStore>,
        source: Arc<dyn HistorySource>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
            timer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.lock_timer()
            .as_ref()
            .is_some_and(|timer| !timer.shutdown.is_cancelled() && !timer.handle.is_finished())
    }

    /// Go Active: one pass now, then one per interval while tasks are active.
    ///
    /// Returns `false` when already Active, or when called outside a Tokio
    /// runtime.
    pub fn start(&self) -> bool {
        let mut timer = self.lock_timer();
        if timer
            .as_ref()
            .is_some_and(|active| !active.shutdown.is_cancelled() && !active.handle.is_finished())
        {
            debug!("sync scheduler already active");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("SyncScheduler started without Tokio runtime; timer not armed");
                return false;
            }
        };

        let shutdown = CancellationToken::new();
        let handle = runtime.spawn(run_timer(
            Arc::downgrade(&self.store),
            self.source.clone(),
            self.config.interval,
            shutdown.clone(),
        ));
        *timer = Some(ActiveTimer { shutdown, handle });
        info!(interval_secs = self.config.interval.as_secs(), "sync scheduler started");
        true
    }

    /// Go Idle. Never fails; a no-op when already Idle.
    pub fn stop(&self) {
        if let Some(active) = self.lock_timer().take() {
            active.shutdown.cancel();
            info!("sync scheduler stopped");
        }
    }

    /// One reconciliation pass now, regardless of state or active tasks.
    /// Returns whether the server list was applied.
    pub async fn refresh(&self) -> bool {
        let ticket = self.store.begin_pass();
        let result = self.source.try_fetch_history().await;
        apply_result(&self.store, ticket, result)
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<ActiveTimer>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("config", &self.config)
            .field("active", &self.is_active())
            .finish()
    }
}

async fn run_timer(
    store: Weak<TaskStore>,
    source: Arc<dyn HistorySource>,
    period: Duration,
    shutdown: CancellationToken,
) {
    if shutdown.is_cancelled() || !timer_pass(&store, source.as_ref()).await {
        return;
    }

    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let has_active = match store.upgrade() {
            Some(store) => store.has_active(),
            None => break,
        };
        if !has_active {
            debug!("no active tasks; skipping reconciliation");
            continue;
        }

        if !timer_pass(&store, source.as_ref()).await {
            break;
        }
    }
    debug!("sync timer exited");
}

/// One pass that does not keep the store alive across the network wait.
/// Returns `false` once the store is gone.
async fn timer_pass(store: &Weak<TaskStore>, source: &dyn HistorySource) -> bool {
    let Some(ticket) = store.upgrade().map(|store| store.begin_pass()) else {
        return false;
    };
    let result = source.try_fetch_history().await;
    match store.upgrade() {
        Some(store) => {
            apply_result(&store, ticket, result);
            true
        }
        None => false,
    }
}

fn apply_result(store: &TaskStore, ticket: PassTicket, result: Result<Vec<Task>>) -> bool {
    match result {
        Ok(tasks) => {
            debug!(count = tasks.len(), "reconciliation pass fetched tasks");
            store.apply_pass(ticket, tasks);
            true
        }
        Err(err) => {
            warn!(error = %err, "reconciliation pass failed; keeping current tasks");
            false
        }
    }
}
