//! Bounded task supervisor
//!
//! All potentially slow work runs here, never on the authorization decision
//! path. Admission is bounded by max concurrency plus a queue bound; excess
//! submissions are rejected, not queued indefinitely. Every outstanding
//! task is tracked by name and can be cancelled cooperatively.

use crate::config::SupervisorConfig;
use crate::types::{SubmitError, TaskId};
use dashmap::DashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify, RwLock, Semaphore};
use tokio::time::{timeout, Duration};

/// Lifecycle of a supervised task
///
/// `Completed`, `Cancelled` and `Failed` are terminal: a task never
/// transitions again once it reaches one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    New,
    Running,
    Completed,
    Cancelled,
    Failed,
}

type WorkError = Box<dyn std::error::Error + Send + Sync>;

/// Cooperative cancellation handle passed to task work
///
/// Tasks must observe the signal at safe points; cancellation is requested,
/// never forced.
#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// A named, cancellable unit of background work
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

struct TaskInner {
    id: TaskId,
    name: String,
    state: Mutex<TaskState>,
    cancel_tx: watch::Sender<bool>,
}

impl Task {
    fn new(name: String) -> (Self, watch::Receiver<bool>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = Self {
            inner: Arc::new(TaskInner {
                id: TaskId::generate(),
                name,
                state: Mutex::new(TaskState::New),
                cancel_tx,
            }),
        };
        (task, cancel_rx)
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> TaskState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        let _ = self.inner.cancel_tx.send(true);
    }

    pub fn is_cancel_requested(&self) -> bool {
        *self.inner.cancel_tx.borrow()
    }

    /// Apply a state transition, ignoring it if the task is already in a
    /// terminal state
    fn transition(&self, to: TaskState) -> bool {
        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        let allowed = matches!(
            (*state, to),
            (TaskState::New, TaskState::Running)
                | (TaskState::New, TaskState::Cancelled)
                | (TaskState::Running, TaskState::Completed)
                | (TaskState::Running, TaskState::Cancelled)
                | (TaskState::Running, TaskState::Failed)
        );
        if allowed {
            *state = to;
        }
        allowed
    }
}

/// Bounded worker pool tracking named, cancellable background tasks
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    config: SupervisorConfig,
    tasks: DashMap<TaskId, Task>,
    /// Bounds total outstanding work: running + queued
    admission: Arc<Semaphore>,
    /// Bounds concurrently running work
    workers: Arc<Semaphore>,
    shutting_down: RwLock<bool>,
    idle: Notify,
}

impl Supervisor {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                admission: Arc::new(Semaphore::new(config.max_concurrent + config.queue_bound)),
                workers: Arc::new(Semaphore::new(config.max_concurrent)),
                config: config.clone(),
                tasks: DashMap::new(),
                shutting_down: RwLock::new(false),
                idle: Notify::new(),
            }),
        }
    }

    /// Submit a named unit of background work
    ///
    /// The work closure receives a [`CancelSignal`] it must observe at safe
    /// points. Submission fails with `CapacityExceeded` once running plus
    /// queued work reaches the configured bound, and with `ShuttingDown`
    /// after shutdown has begun.
    pub async fn submit<F, Fut>(
        &self,
        name: impl Into<String>,
        work: F,
    ) -> Result<Task, SubmitError>
    where
        F: FnOnce(CancelSignal) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
    {
        // Held for the whole admission so shutdown (write lock) cannot
        // interleave with a submission in progress.
        let gate = self.inner.shutting_down.read().await;
        if *gate {
            return Err(SubmitError::ShuttingDown);
        }

        let admission = Arc::clone(&self.inner.admission)
            .try_acquire_owned()
            .map_err(|_| SubmitError::CapacityExceeded)?;

        let (task, cancel_rx) = Task::new(name.into());
        self.inner.tasks.insert(task.id(), task.clone());
        tracing::debug!("Submitted task '{}' ({})", task.name(), task.id());

        let inner = Arc::clone(&self.inner);
        let handle = task.clone();
        tokio::spawn(async move {
            let _admission = admission;
            let mut queue_cancel = cancel_rx.clone();

            // Wait for a worker slot, bailing out if cancelled while queued
            let run_permit = tokio::select! {
                permit = Arc::clone(&inner.workers).acquire_owned() => permit.ok(),
                _ = queue_cancel.wait_for(|cancelled| *cancelled) => None,
            };

            match run_permit {
                Some(_permit) if !handle.is_cancel_requested() => {
                    handle.transition(TaskState::Running);
                    let outcome = work(CancelSignal { rx: cancel_rx }).await;
                    if handle.is_cancel_requested() {
                        handle.transition(TaskState::Cancelled);
                    } else {
                        match outcome {
                            Ok(()) => {
                                handle.transition(TaskState::Completed);
                            }
                            Err(e) => {
                                tracing::error!("Task '{}' failed: {}", handle.name(), e);
                                handle.transition(TaskState::Failed);
                            }
                        }
                    }
                }
                _ => {
                    handle.transition(TaskState::Cancelled);
                }
            }

            inner.tasks.remove(&handle.id());
            inner.idle.notify_waiters();
        });

        drop(gate);
        Ok(task)
    }

    /// Outstanding tasks, for introspection
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.tasks.iter().map(|e| e.value().clone()).collect()
    }

    pub fn outstanding(&self) -> usize {
        self.inner.tasks.len()
    }

    pub async fn is_shutting_down(&self) -> bool {
        *self.inner.shutting_down.read().await
    }

    /// Shut down: reject new submissions, cancel outstanding tasks, wait up
    /// to the grace period, abandon stragglers
    ///
    /// Idempotent; always returns within the grace period. Returns the
    /// number of tasks still running when the wait gave up.
    pub async fn shutdown(&self) -> usize {
        {
            let mut flag = self.inner.shutting_down.write().await;
            if *flag {
                tracing::warn!("Supervisor already shut down");
                return 0;
            }
            *flag = true;
        }

        let outstanding = self.tasks();
        if !outstanding.is_empty() {
            let names: Vec<&str> = outstanding.iter().map(Task::name).collect();
            tracing::info!(
                "Cancelling {} outstanding tasks: {}",
                outstanding.len(),
                names.join(", ")
            );
            for task in &outstanding {
                task.cancel();
            }
        }

        let grace = Duration::from_millis(self.inner.config.grace_period_ms);
        if timeout(grace, self.wait_idle()).await.is_err() {
            let stuck = self.tasks();
            let names: Vec<&str> = stuck.iter().map(Task::name).collect();
            tracing::warn!(
                "Shutdown grace period elapsed; abandoning {} tasks: {}",
                stuck.len(),
                names.join(", ")
            );
            return stuck.len();
        }

        tracing::info!("Supervisor shutdown complete");
        0
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.tasks.is_empty() {
                return;
            }
            notified.await;
        }
    }
}
