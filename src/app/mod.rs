mod state;
mod ui;

pub use state::ViewState;

use crate::session::{AuthState, SessionManager};
use crate::upload::{ListenerGuard, UploadController, UploadProgress};
use eframe::{egui, App};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{error, info};

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);

pub struct TacticUploader {
    runtime: Handle,
    session: Arc<SessionManager>,
    uploads: Arc<UploadController>,
    auth_rx: watch::Receiver<AuthState>,
    progress_rx: watch::Receiver<UploadProgress>,
    uploading_rx: watch::Receiver<bool>,
    camera_tx: Arc<watch::Sender<Option<String>>>,
    camera_rx: watch::Receiver<Option<String>>,
    initials_tx: Arc<watch::Sender<Option<String>>>,
    initials_rx: watch::Receiver<Option<String>>,
    state: ViewState,
    // Holds the upload event subscription for as long as the window is open.
    _listener: ListenerGuard,
}

impl TacticUploader {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        runtime: Handle,
        session: Arc<SessionManager>,
        uploads: Arc<UploadController>,
        listener: ListenerGuard,
    ) -> Self {
        info!("Initializing uploader window");
        let (camera_tx, camera_rx) = watch::channel(None);
        let (initials_tx, initials_rx) = watch::channel(None);
        let app = Self {
            runtime,
            auth_rx: session.watch(),
            progress_rx: uploads.aggregator().watch(),
            uploading_rx: uploads.watch_uploading(),
            session,
            uploads,
            camera_tx: Arc::new(camera_tx),
            camera_rx,
            initials_tx: Arc::new(initials_tx),
            initials_rx,
            state: ViewState::default(),
            _listener: listener,
        };
        app.refresh_camera();
        app
    }

    pub fn login(&mut self) {
        self.state.error_message = None;
        let session = Arc::clone(&self.session);
        self.runtime.spawn(async move {
            if let Err(e) = session.login().await {
                error!("Login failed: {}", e);
            }
        });
    }

    pub fn logout(&mut self) {
        let session = Arc::clone(&self.session);
        self.runtime.spawn(async move {
            let _ = session.logout().await;
        });
    }

    pub fn delete_data(&mut self) {
        let session = Arc::clone(&self.session);
        self.runtime.spawn(async move {
            let _ = session.delete_all_data().await;
        });
    }

    pub fn start_upload(&mut self) {
        self.state.error_message = None;
        self.state.show_details = true;
        let uploads = Arc::clone(&self.uploads);
        self.runtime.spawn(async move {
            let _ = uploads.start_upload().await;
        });
    }

    pub fn refresh_camera(&self) {
        let uploads = Arc::clone(&self.uploads);
        let camera_tx = Arc::clone(&self.camera_tx);
        self.runtime.spawn(async move {
            let camera = uploads.query_camera().await;
            camera_tx.send_replace(camera);
        });
    }

    /// Fetches the account initials for the header; cleared when logged out.
    fn refresh_initials(&self) {
        if !self.state.auth.is_logged_in() {
            self.initials_tx.send_replace(None);
            return;
        }
        let session = Arc::clone(&self.session);
        let initials_tx = Arc::clone(&self.initials_tx);
        self.runtime.spawn(async move {
            let initials = session.initials().await;
            initials_tx.send_replace(initials);
        });
    }

    /// Copies any newly published snapshots into the view state.
    pub fn update_state(&mut self) -> bool {
        let mut changed = false;

        if self.auth_rx.has_changed().unwrap_or(false) {
            self.state.auth = self.auth_rx.borrow_and_update().clone();
            self.refresh_initials();
            changed = true;
        }
        if self.progress_rx.has_changed().unwrap_or(false) {
            self.state.progress = self.progress_rx.borrow_and_update().clone();
            changed = true;
        }
        if self.uploading_rx.has_changed().unwrap_or(false) {
            self.state.is_uploading = *self.uploading_rx.borrow_and_update();
            changed = true;
        }
        if self.camera_rx.has_changed().unwrap_or(false) {
            self.state.camera = self.camera_rx.borrow_and_update().clone();
            changed = true;
        }
        if self.initials_rx.has_changed().unwrap_or(false) {
            self.state.initials = self.initials_rx.borrow_and_update().clone();
            changed = true;
        }

        if changed && !self.state.is_uploading {
            let failed = self
                .state
                .progress
                .count(crate::upload::FileState::Failed);
            self.state.error_message = (failed > 0)
                .then(|| format!("{} file(s) failed to upload. Check details.", failed));
        }
        changed
    }
}

impl App for TacticUploader {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.update_state() {
            ctx.request_repaint();
        }
        self.render(ctx);
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
