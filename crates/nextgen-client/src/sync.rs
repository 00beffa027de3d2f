/*
[INPUT]:  EndpointConfig, scheduler configuration, prompts from the UI collaborator
[OUTPUT]: One consistent task view plus submit/refresh/polling/diagnostics operations
[POS]:    Service layer - composes endpoint, store, scheduler, diagnostics (leaves first)
[UPDATE]: When wiring between components or the public service surface changes
*/

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::diagnostics::{DiagnosticReport, Diagnostics};
use crate::endpoint::EndpointConfig;
use crate::http::Result;
use crate::scheduler::{HistorySource, SchedulerConfig, SyncScheduler};
use crate::store::TaskStore;
use crate::types::{CreateTaskRequest, Task};

/// The task synchronization engine.
///
/// Construct once and hand out by reference; dropping it stops polling.
#[derive(Debug)]
pub struct TaskSync {
    endpoint: Arc<EndpointConfig>,
    store: Arc<TaskStore>,
    scheduler: SyncScheduler,
    diagnostics: Diagnostics,
}

impl TaskSync {
    /// Build the engine with an empty store and fire one background
    /// reconciliation pass (when a Tokio runtime is available).
    pub fn initialize(endpoint: Arc<EndpointConfig>, scheduler_config: SchedulerConfig) -> Self {
        let sync = Self::with_config(endpoint, scheduler_config);
        sync.spawn_initial_refresh();
        sync
    }

    /// Build the engine without touching the network.
    pub fn with_config(endpoint: Arc<EndpointConfig>, scheduler_config: SchedulerConfig) -> Self {
        let store = Arc::new(TaskStore::new());
        let source: Arc<dyn HistorySource> = endpoint.clone();
        let scheduler = SyncScheduler::with_config(store.clone(), source, scheduler_config);
        let diagnostics = Diagnostics::new(endpoint.clone());
        Self {
            endpoint,
            store,
            scheduler,
            diagnostics,
        }
    }

    fn spawn_initial_refresh(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("TaskSync initialized without Tokio runtime; initial refresh skipped");
            return;
        };
        let store = self.store.clone();
        let endpoint = self.endpoint.clone();
        runtime.spawn(async move {
            let ticket = store.begin_pass();
            match endpoint.try_fetch_history().await {
                Ok(tasks) => store.apply_pass(ticket, tasks),
                Err(err) => warn!(error = %err, "initial task refresh failed"),
            }
        });
    }

    pub fn endpoint(&self) -> &Arc<EndpointConfig> {
        &self.endpoint
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.store.subscribe()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.store.snapshot()
    }

    /// Submit a prompt; on success the server's task is placed first in the store.
    pub async fn submit(&self, prompt: &str, negative_prompt: Option<&str>) -> Result<Task> {
        let request = CreateTaskRequest::new(prompt, negative_prompt.map(str::to_string));
        self.submit_with(request).await
    }

    pub async fn submit_with(&self, request: CreateTaskRequest) -> Result<Task> {
        let client = self.endpoint.client();
        let task = client.submit_task_with(request).await?;
        self.store.prepend(task.clone());
        Ok(task)
    }

    /// One reconciliation pass now. Returns whether the server list was applied.
    pub async fn refresh(&self) -> bool {
        self.scheduler.refresh().await
    }

    pub fn start_polling(&self) -> bool {
        self.scheduler.start()
    }

    pub fn stop_polling(&self) {
        self.scheduler.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Change the service address. Later passes and submissions use the new
    /// client; the old one is invalidated.
    pub fn set_address(&self, input: &str) -> Result<bool> {
        let changed = self.endpoint.set_address(input)?;
        if changed {
            debug!(base_url = %self.endpoint.base_url(), "task sync now targets new address");
        }
        Ok(changed)
    }

    pub fn resolve_resource_url(&self, path: &str) -> String {
        self.endpoint.client().resolve_resource_url(path)
    }

    pub async fn diagnose(&self) -> DiagnosticReport {
        self.diagnostics.run().await
    }

    /// Mandatory cleanup: cancel the polling timer.
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }
}
