use eframe::CreationContext;
use std::process::ExitCode;
use std::sync::Arc;
use tactic_uploader::api::HttpIdentity;
use tactic_uploader::app::TacticUploader;
use tactic_uploader::config::AppConfig;
use tactic_uploader::events::EventBus;
use tactic_uploader::gateway::{CommandGateway, StdioService};
use tactic_uploader::logging::init_logging;
use tactic_uploader::session::{MemorySessionStore, SessionManager, SessionStore};
use tactic_uploader::upload::{ProgressAggregator, UploadController};
use tracing::{error, info};

fn main() -> ExitCode {
    init_logging();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let bus = EventBus::new();
    let service = {
        let _guard = runtime.enter();
        StdioService::spawn(&config.backend_program, &config.backend_args, bus.clone())
    };
    let service = match service {
        Ok(service) => service,
        Err(e) => {
            error!(
                "Failed to start backend '{}': {}",
                config.backend_program.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let gateway = CommandGateway::new(Arc::new(service));
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
    let identity = Arc::new(HttpIdentity::new(Arc::clone(&store)));
    let session = Arc::new(SessionManager::new(gateway, store, identity));
    let aggregator = Arc::new(ProgressAggregator::new());
    let uploads = Arc::new(UploadController::new(
        Arc::clone(&session),
        Arc::clone(&aggregator),
        config.upload_settle_delay,
    ));

    let listener = {
        let _guard = runtime.enter();
        aggregator.listen(bus.subscribe_all())
    };

    {
        let session = Arc::clone(&session);
        runtime.spawn(async move { session.restore().await });
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([600.0, 640.0])
            .with_min_inner_size([420.0, 500.0]),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    let result = eframe::run_native(
        "OpenSpace Camera Upload",
        options,
        Box::new(move |cc: &CreationContext| {
            Box::new(TacticUploader::new(cc, handle, session, uploads, listener))
        }),
    );

    match result {
        Ok(()) => {
            info!("Window closed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Window failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
