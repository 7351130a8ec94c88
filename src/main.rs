mod app;
mod config;
mod error;
mod event;
mod host;
mod model;
mod preferences;
mod storage;
mod store;
mod theme;
mod ui;

use std::sync::{mpsc, Arc, OnceLock};

use app::CoworkApp;
use config::{CoworkConfig, HostMode, DEFAULT_LOG_FILTER};
use eframe::egui;
use host::{paths, Host};
use preferences::Preferences;
use storage::{JsonFileStorage, KeyValueStorage, MemoryStorage};
use store::Stores;
use tracing_subscriber::EnvFilter;
use ui::Dispatcher;

fn open_storage(config: &CoworkConfig) -> Arc<dyn KeyValueStorage> {
    let path = config.storage_path();
    match JsonFileStorage::open(&path) {
        Ok(storage) => {
            tracing::info!(path = %storage.path().display(), "using local storage");
            Arc::new(storage)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "falling back to in-memory storage");
            Arc::new(MemoryStorage::new())
        }
    }
}

fn build_host(config: &CoworkConfig, storage: Arc<dyn KeyValueStorage>) -> Host {
    match config.host {
        HostMode::Mock => Host::mock(storage),
        HostMode::Local => Host::local(config).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "local host unavailable, using mock host");
            Host::mock(storage)
        }),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = CoworkConfig::from_env()?;
    let storage = open_storage(&config);
    let host = build_host(&config, storage.clone());
    tracing::info!(host = host.kind.label(), "host selected");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("cowork-runtime")
        .build()?;
    let (tx, rx) = mpsc::channel();
    let dispatcher = Dispatcher::new(runtime.handle().clone(), tx);

    let repaint: Arc<OnceLock<egui::Context>> = Arc::new(OnceLock::new());
    let hook_target = repaint.clone();
    let stores = Stores::new(
        &host,
        Arc::new(move || {
            if let Some(ctx) = hook_target.get() {
                ctx.request_repaint();
            }
        }),
    );
    stores.hydrate(storage.as_ref());

    let preferences = Preferences::new(storage.clone());
    if let Some(theme) = preferences.theme() {
        stores.app.set_theme(theme);
    }
    if let Some(language) = preferences.language() {
        stores.app.set_language(language);
    }

    let app = CoworkApp::new(rx, stores.clone(), dispatcher, storage.clone(), host.kind);
    app.start(paths::display(&config.workspace));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1024.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Cowork",
        native_options,
        Box::new(move |creation_context| {
            theme::install_fonts(&creation_context.egui_ctx);
            let _ = repaint.set(creation_context.egui_ctx.clone());
            Ok(Box::new(app))
        }),
    )?;

    stores.persist(storage.as_ref())?;
    drop(runtime);
    Ok(())
}
