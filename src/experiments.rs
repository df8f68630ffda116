use crate::cache::{ConfigStore, LocationCache, EXPERIMENTS_DIR_KEY};
use crate::locator::ResolutionFailure;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const EXPERIMENTS_DIR_ENV: &str = "MMT_EXPERIMENTS_DIR";
pub const FLOWGRAPH_EXT: &str = "grc";
pub const EXPERIMENTS_DIR_NAME: &str = "experiments";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentEntry {
    pub label: String,
    pub file: String,
}

impl ExperimentEntry {
    fn new(label: &str, file: &str) -> Self {
        Self {
            label: label.into(),
            file: file.into(),
        }
    }
}

pub fn default_experiments() -> Vec<ExperimentEntry> {
    vec![
        ExperimentEntry::new("Experiment 1 (AM)", "am_signal.grc"),
        ExperimentEntry::new("Experiment 2 (FM)", "fm_signal.grc"),
        ExperimentEntry::new("Experiment 3 (2-FSK)", "fsk_signal.grc"),
        ExperimentEntry::new("Experiment 4 (QPSK)", "psk_qpsk.grc"),
        ExperimentEntry::new("Experiment 5 (16-QAM)", "qam_16.grc"),
    ]
}

/// Ordered experiment list shown in the selector.
#[derive(Debug, Clone)]
pub struct ExperimentCatalog {
    entries: Vec<ExperimentEntry>,
}

impl ExperimentCatalog {
    /// Empty input falls back to [`default_experiments`].
    pub fn new(entries: Vec<ExperimentEntry>) -> Self {
        if entries.is_empty() {
            Self::default()
        } else {
            Self { entries }
        }
    }

    pub fn entries(&self) -> &[ExperimentEntry] {
        &self.entries
    }

    pub fn file_for(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.file.as_str())
    }
}

impl Default for ExperimentCatalog {
    fn default() -> Self {
        Self {
            entries: default_experiments(),
        }
    }
}

/// A directory qualifies when it contains at least one flowgraph file.
pub fn looks_like_experiments_dir(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|e| {
        let path = e.path();
        path.is_file()
            && path
                .extension()
                .map(|x| x.eq_ignore_ascii_case(FLOWGRAPH_EXT))
                .unwrap_or(false)
    })
}

fn check_dir(dir: &Path) -> Result<PathBuf, ResolutionFailure> {
    if !dir.is_dir() {
        return Err(ResolutionFailure::Missing(dir.to_path_buf()));
    }
    if looks_like_experiments_dir(dir) {
        Ok(dir.to_path_buf())
    } else {
        Err(ResolutionFailure::Rejected(dir.to_path_buf()))
    }
}

fn program_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
}

#[derive(Debug, Clone, Default)]
pub struct ExperimentsSources {
    pub env_override: Option<PathBuf>,
    /// Directory of the running program; `experiments/` below it is tried.
    pub program_dir: Option<PathBuf>,
    pub fallbacks: Vec<PathBuf>,
}

impl ExperimentsSources {
    pub fn from_env() -> Self {
        let fallbacks = dirs_next::home_dir()
            .map(|home| {
                vec![
                    home.join("Downloads")
                        .join("mmt-virtual-lab")
                        .join(EXPERIMENTS_DIR_NAME),
                    home.join("mmt-virtual-lab").join(EXPERIMENTS_DIR_NAME),
                ]
            })
            .unwrap_or_default();
        Self {
            env_override: std::env::var_os(EXPERIMENTS_DIR_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            program_dir: program_dir(),
            fallbacks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentsTier {
    HotCache,
    EnvOverride,
    DiskCache,
    ProgramDir,
    Fallbacks,
}

impl ExperimentsTier {
    pub const ORDER: [ExperimentsTier; 5] = [
        ExperimentsTier::HotCache,
        ExperimentsTier::EnvOverride,
        ExperimentsTier::DiskCache,
        ExperimentsTier::ProgramDir,
        ExperimentsTier::Fallbacks,
    ];
}

/// Finds the folder holding the `.grc` flowgraphs.
pub struct ExperimentsResolver {
    sources: ExperimentsSources,
    hot: Arc<LocationCache>,
    store: Arc<ConfigStore>,
}

impl ExperimentsResolver {
    pub fn new(
        sources: ExperimentsSources,
        hot: Arc<LocationCache>,
        store: Arc<ConfigStore>,
    ) -> Self {
        Self { sources, hot, store }
    }

    /// `None` means "not configured", which callers report rather than
    /// treat as a fault.
    pub fn resolve(&self) -> Option<PathBuf> {
        for tier in ExperimentsTier::ORDER {
            match self.attempt(tier) {
                Ok(dir) => {
                    tracing::debug!("experiments dir via {:?}: {}", tier, dir.display());
                    self.hot.set_experiments_dir(&dir);
                    self.store.remember(EXPERIMENTS_DIR_KEY, &dir);
                    return Some(dir);
                }
                Err(e) => tracing::debug!("experiments tier {:?}: {e}", tier),
            }
        }
        tracing::warn!("experiments folder not found");
        None
    }

    pub fn attempt(&self, tier: ExperimentsTier) -> Result<PathBuf, ResolutionFailure> {
        match tier {
            ExperimentsTier::HotCache => {
                check_dir(&self.hot.experiments_dir().ok_or(ResolutionFailure::Unset)?)
            }
            ExperimentsTier::EnvOverride => check_dir(
                self.sources
                    .env_override
                    .as_deref()
                    .ok_or(ResolutionFailure::Unset)?,
            ),
            ExperimentsTier::DiskCache => {
                let value = self
                    .store
                    .get(EXPERIMENTS_DIR_KEY)
                    .ok_or(ResolutionFailure::Unset)?;
                check_dir(Path::new(&value))
            }
            ExperimentsTier::ProgramDir => {
                let base = self
                    .sources
                    .program_dir
                    .as_deref()
                    .ok_or(ResolutionFailure::Unset)?;
                check_dir(&base.join(EXPERIMENTS_DIR_NAME))
            }
            ExperimentsTier::Fallbacks => {
                let mut last = ResolutionFailure::Unset;
                for dir in &self.sources.fallbacks {
                    match check_dir(dir) {
                        Ok(d) => return Ok(d),
                        Err(e) => last = e,
                    }
                }
                Err(last)
            }
        }
    }
}
