use super::types::{FileState, UploadProgress, UploadStatus};
use crate::events::{Subscription, UploadEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Highest percentage a file may show before it has completed.
pub const IN_FLIGHT_CEILING: f64 = 99.0;

/// Applies one event to the snapshot. Never fails.
///
/// `percentage == 100` holds exactly for completed entries.
pub fn fold(progress: &mut UploadProgress, event: &UploadEvent) {
    match event {
        UploadEvent::Progress(status) => {
            if progress.settled.contains(&status.filename) {
                debug!(file = %status.filename, "Ignoring progress for a finished file");
                return;
            }
            let mut status = status.clone();
            status.percentage = if status.status == FileState::Completed {
                100.0
            } else {
                status.percentage.clamp(0.0, IN_FLIGHT_CEILING)
            };
            progress.uploads.insert(status.filename.clone(), status);
        }
        UploadEvent::Complete { filename } => {
            let entry = entry_for(progress, filename);
            entry.status = FileState::Completed;
            entry.percentage = 100.0;
            entry.error = None;
            progress.settled.insert(filename.clone());
        }
        UploadEvent::Skipped => {
            progress.skipped_count += 1;
        }
        UploadEvent::Error { filename, error } => {
            let entry = entry_for(progress, filename);
            entry.status = FileState::Failed;
            entry.percentage = entry.percentage.min(IN_FLIGHT_CEILING);
            entry.error = Some(error.clone());
            progress.settled.insert(filename.clone());
        }
    }
}

fn entry_for<'a>(progress: &'a mut UploadProgress, filename: &str) -> &'a mut UploadStatus {
    progress
        .uploads
        .entry(filename.to_string())
        .or_insert_with(|| UploadStatus::new(filename))
}

/// Single writer of the upload snapshot.
pub struct ProgressAggregator {
    tx: watch::Sender<UploadProgress>,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressAggregator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(UploadProgress::default());
        Self { tx }
    }

    pub fn apply(&self, event: &UploadEvent) {
        self.tx.send_modify(|progress| fold(progress, event));
    }

    /// Clears all entries and the skipped counter. Callers must not reset
    /// while an upload is in flight.
    pub fn reset(&self) {
        self.tx.send_modify(UploadProgress::clear);
    }

    pub fn snapshot(&self) -> UploadProgress {
        self.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<UploadProgress> {
        self.tx.subscribe()
    }

    /// Folds events until the bus closes.
    pub async fn run(&self, mut subscription: Subscription) {
        while let Some(event) = subscription.recv().await {
            self.apply(&event);
        }
        info!("Upload event stream closed");
    }

    /// Runs [`ProgressAggregator::run`] on its own task.
    pub fn listen(self: &Arc<Self>, subscription: Subscription) -> ListenerGuard {
        let aggregator = Arc::clone(self);
        let handle = tokio::spawn(async move { aggregator.run(subscription).await });
        ListenerGuard {
            handle: Some(handle),
        }
    }
}

/// Owns the listener task; dropping it stops the task and releases its subscription.
pub struct ListenerGuard {
    handle: Option<JoinHandle<()>>,
}

impl ListenerGuard {
    /// Stops the listener and waits until its subscription has been dropped.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
