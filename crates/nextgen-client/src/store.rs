/*
[INPUT]:  Server task lists (reconciliation) and just-submitted tasks (optimistic)
[OUTPUT]: Ordered task snapshot, change notifications via `watch`, active-work predicate
[POS]:    State layer - the single local view of task state
[UPDATE]: When mutation primitives or optimistic-entry rules change
*/

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::types::Task;

/// Marks the moment a reconciliation pass began. See [`TaskStore::apply_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTicket(u64);

#[derive(Debug, Default)]
struct Optimistic {
    /// Bumped on every prepend
    revision: u64,
    /// (revision at prepend, task id) for prepends not yet confirmed by the server
    pending: Vec<(u64, String)>,
}

/// In-memory, most-recent-first task list.
///
/// Remote state only arrives wholesale (`replace_all` / `apply_pass`); the
/// only local mutation is `prepend`. Tasks are never removed one by one.
#[derive(Debug)]
pub struct TaskStore {
    tasks: watch::Sender<Vec<Task>>,
    optimistic: Mutex<Optimistic>,
}

impl TaskStore {
    pub fn new() -> Self {
        let (tasks, _rx) = watch::channel(Vec::new());
        Self {
            tasks,
            optimistic: Mutex::new(Optimistic::default()),
        }
    }

    /// Receive every future snapshot; the receiver starts at the current one.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.subscribe()
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.borrow().iter().find(|task| task.id == id).cloned()
    }

    /// True iff any held task is `submitted` or `processing`.
    pub fn has_active(&self) -> bool {
        self.tasks.borrow().iter().any(Task::is_active)
    }

    /// Replace the held list unconditionally.
    pub fn replace_all(&self, tasks: Vec<Task>) {
        let mut optimistic = self.lock_optimistic();
        optimistic.pending.clear();
        debug!(count = tasks.len(), "task store replaced");
        self.tasks.send_replace(tasks);
    }

    /// Put a just-submitted task at the front before any pass confirms it.
    pub fn prepend(&self, task: Task) {
        let mut optimistic = self.lock_optimistic();
        optimistic.revision += 1;
        let revision = optimistic.revision;
        optimistic.pending.push((revision, task.id.clone()));
        debug!(task_id = %task.id, "task prepended");
        self.tasks.send_modify(|tasks| tasks.insert(0, task));
    }

    /// Call before fetching the server list for a reconciliation pass.
    pub fn begin_pass(&self) -> PassTicket {
        PassTicket(self.lock_optimistic().revision)
    }

    /// Apply the server list fetched for `ticket`.
    ///
    /// The server list replaces everything the client knew when the pass
    /// began. Tasks prepended after that point and absent from `server_tasks`
    /// stay in front of it, since the server could not have known them yet.
    pub fn apply_pass(&self, ticket: PassTicket, server_tasks: Vec<Task>) {
        let mut optimistic = self.lock_optimistic();
        let server_ids: HashSet<&str> = server_tasks.iter().map(|task| task.id.as_str()).collect();

        let newer: HashSet<String> = optimistic
            .pending
            .iter()
            .filter(|(revision, id)| *revision > ticket.0 && !server_ids.contains(id.as_str()))
            .map(|(_, id)| id.clone())
            .collect();
        optimistic.pending.retain(|(_, id)| newer.contains(id));
        drop(server_ids);

        let kept = newer.len();
        self.tasks.send_modify(|tasks| {
            let mut merged: Vec<Task> = tasks
                .iter()
                .filter(|task| newer.contains(&task.id))
                .cloned()
                .collect();
            merged.extend(server_tasks);
            *tasks = merged;
        });
        debug!(kept_optimistic = kept, total = self.len(), "reconciliation applied");
    }

    fn lock_optimistic(&self) -> std::sync::MutexGuard<'_, Optimistic> {
        self.optimistic.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}
