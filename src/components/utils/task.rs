//! Deferred task runner.
//!
//! Each task sleeps in the background and then runs its job once.
//! Tasks live only in memory: a restart drops every pending task.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::{
    error::{Error, Result},
    log_error, log_info,
};

pub type TaskID = u64;

type Handles = Arc<Mutex<HashMap<TaskID, JoinHandle<()>>>>;

#[derive(Default)]
pub struct TaskManager {
    next_id: AtomicU64,
    handles: Handles,
}

fn lock(handles: &Handles) -> MutexGuard<'_, HashMap<TaskID, JoinHandle<()>>> {
    handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }
    /// Run `job` once after `delay`.
    pub fn add<F>(&self, delay: Duration, job: F) -> TaskID
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let handles = Arc::clone(&self.handles);
        // Held until the handle is stored so a task never outlives its own entry.
        let mut guard = lock(&self.handles);
        let handle = tokio::spawn(async move {
            log_info!("Task {}: sleeping for {} seconds", id, delay.as_secs());
            tokio::time::sleep(delay).await;
            log_info!("Task {}: running", id);
            if let Err(e) = job.await {
                log_error!("Task {} failed: {}", id, e);
            }
            lock(&handles).remove(&id);
        });
        guard.insert(id, handle);
        id
    }
    /// Cancel a pending task.
    pub fn remove(&self, id: TaskID) -> Result<()> {
        match lock(&self.handles).remove(&id) {
            Some(handle) => {
                handle.abort();
                log_info!("Task {}: cancelled", id);
                Ok(())
            }
            None => Err(Error::not_found(format!("Task {} not found", id))),
        }
    }
    pub fn pending(&self) -> usize {
        lock(&self.handles).len()
    }
    /// Cancel every pending task. Returns how many were cancelled.
    pub fn clear(&self) -> usize {
        let mut handles = lock(&self.handles);
        let count = handles.len();
        for (_, task) in handles.drain() {
            task.abort();
        }
        count
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.clear();
    }
}
