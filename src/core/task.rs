// src/core/task.rs
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// A spawned loop plus the switch that stops it.
///
/// The loop receives a `watch::Receiver<bool>` and is expected to leave its
/// `select!` once it changes. `cancel` also aborts the task, so a loop that
/// is parked inside a request is torn down at its next await point. Dropping
/// the handle cancels.
pub struct TaskHandle {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(task(shutdown_rx));
        debug!("Task {} started", name);
        Self {
            name,
            shutdown_tx,
            join,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub fn cancel(&self) {
        let _ = self.shutdown_tx.send(true);
        self.join.abort();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.join.is_finished() {
            debug!("Task {} cancelled", self.name);
        }
        self.cancel();
    }
}

/// Resolves once the owning `TaskHandle` asks the loop to stop.
pub async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        // A dropped sender means the handle is gone, which is also a stop.
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
