use mmt_virtual_lab::cache::{ConfigStore, CONFIG_FILE};
use mmt_virtual_lab::experiments::ExperimentCatalog;
use mmt_virtual_lab::gui::{LauncherApp, APP_TITLE};
use mmt_virtual_lab::launcher::LaunchContext;
use mmt_virtual_lab::logging;
use mmt_virtual_lab::session::LaunchSession;
use mmt_virtual_lab::settings::{config_dir, Settings, SETTINGS_FILE};
use mmt_virtual_lab::status_log::STATUS_LOG_FILE;

use eframe::egui;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let dir = config_dir();
    let settings_path = dir.join(SETTINGS_FILE);
    let (settings, settings_err) = match Settings::load(&settings_path.to_string_lossy()) {
        Ok(s) => (s, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    logging::init(settings.debug_logging, settings.log_file_path());
    if let Some(e) = settings_err {
        tracing::warn!("ignoring unreadable {}: {e}", settings_path.display());
    }
    tracing::info!("config directory: {}", dir.display());

    let store = Arc::new(ConfigStore::load(dir.join(CONFIG_FILE)));
    let ctx = Arc::new(LaunchContext::standard(&settings, store));
    let mut session = LaunchSession::new(ctx, settings.feedback_config());
    if settings.status_log {
        session = session.with_status_log(dir.join(STATUS_LOG_FILE));
    }
    let catalog = ExperimentCatalog::new(settings.experiments.clone());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([900.0, 500.0])
            .with_min_inner_size([900.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        native_options,
        Box::new(move |_cc| Box::new(LauncherApp::new(session, catalog))),
    )
    .map_err(|e| anyhow::anyhow!("failed to run window: {e}"))
}
