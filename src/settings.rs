use crate::experiments::{default_experiments, ExperimentEntry};
use crate::feedback::FeedbackConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.json";

/// Per-user directory for settings, the location cache and logs:
/// `<config dir>/MMT/VirtualLab`, or the program directory when the platform
/// has no config dir.
pub fn config_dir() -> PathBuf {
    dirs_next::config_dir()
        .map(|d| d.join("MMT").join("VirtualLab"))
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Write log output to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Append every status bar message to `status.log`.
    #[serde(default = "default_status_log")]
    pub status_log: bool,
    /// How long the busy indicator stays up after a successful launch.
    #[serde(default = "default_success_grace_ms")]
    pub success_grace_ms: u64,
    #[serde(default = "default_status_secs")]
    pub status_secs: u64,
    #[serde(default = "default_error_status_secs")]
    pub error_status_secs: u64,
    /// Shortcut tried before any other discovery. An empty string disables it.
    #[serde(default = "default_preferred_shortcut")]
    pub preferred_shortcut: Option<String>,
    #[serde(default = "default_experiments")]
    pub experiments: Vec<ExperimentEntry>,
}

fn default_status_log() -> bool {
    true
}

fn default_success_grace_ms() -> u64 {
    1500
}

fn default_status_secs() -> u64 {
    8
}

fn default_error_status_secs() -> u64 {
    6
}

#[cfg(windows)]
fn default_preferred_shortcut() -> Option<String> {
    dirs_next::data_dir().map(|d| {
        d.join("Microsoft")
            .join("Windows")
            .join("Start Menu")
            .join("Programs")
            .join("GNU Radio 3.9.4")
            .join("GNU Radio.lnk")
            .to_string_lossy()
            .into_owned()
    })
}

#[cfg(not(windows))]
fn default_preferred_shortcut() -> Option<String> {
    None
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            status_log: default_status_log(),
            success_grace_ms: default_success_grace_ms(),
            status_secs: default_status_secs(),
            error_status_secs: default_error_status_secs(),
            preferred_shortcut: default_preferred_shortcut(),
            experiments: default_experiments(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn feedback_config(&self) -> FeedbackConfig {
        FeedbackConfig {
            success_grace: Duration::from_millis(self.success_grace_ms),
            status_duration: Duration::from_secs(self.status_secs),
            error_status_duration: Duration::from_secs(self.error_status_secs),
        }
    }

    pub fn preferred_shortcut_path(&self) -> Option<PathBuf> {
        self.preferred_shortcut
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}
