use super::aggregator::ProgressAggregator;
use crate::error::GatewayError;
use crate::session::SessionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub const NO_CAMERA: &str = "No camera connected";

/// Drives one camera transfer and the `isUploading` flag around it.
pub struct UploadController {
    session: Arc<SessionManager>,
    aggregator: Arc<ProgressAggregator>,
    uploading: watch::Sender<bool>,
    settle_delay: Duration,
}

impl UploadController {
    pub fn new(
        session: Arc<SessionManager>,
        aggregator: Arc<ProgressAggregator>,
        settle_delay: Duration,
    ) -> Self {
        let (uploading, _) = watch::channel(false);
        Self {
            session,
            aggregator,
            uploading,
            settle_delay,
        }
    }

    pub fn is_uploading(&self) -> bool {
        *self.uploading.borrow()
    }

    pub fn watch_uploading(&self) -> watch::Receiver<bool> {
        self.uploading.subscribe()
    }

    pub fn aggregator(&self) -> &Arc<ProgressAggregator> {
        &self.aggregator
    }

    /// Resets progress and asks the backend to transfer every camera file.
    /// A second call while one is running is ignored.
    pub async fn start_upload(&self) -> Result<(), GatewayError> {
        let started = self.uploading.send_if_modified(|uploading| {
            if *uploading {
                return false;
            }
            *uploading = true;
            true
        });
        if !started {
            warn!("Upload already in progress");
            return Ok(());
        }

        info!("Starting camera upload");
        self.aggregator.reset();

        let result = self
            .session
            .observe(self.session.gateway().get_camera_files().await);
        match &result {
            Ok(()) => info!("Camera upload finished"),
            Err(e) => error!("Upload failed: {}", e),
        }

        tokio::time::sleep(self.settle_delay).await;
        self.uploading.send_replace(false);
        result
    }

    /// Connected camera's port name, or `None` if there is none.
    pub async fn query_camera(&self) -> Option<String> {
        match self
            .session
            .observe(self.session.gateway().get_camera().await)
        {
            Ok(device) => Some(device),
            Err(e) => {
                info!("No camera available: {}", e);
                None
            }
        }
    }
}
