use crate::cache::{ConfigStore, LocationCache, GRC_PATH_KEY};
use crate::recognizer::{is_launcher, LauncherCandidate, LauncherKind};
use crate::shortcut::ShortcutResolver;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const GRC_PATH_ENV: &str = "MMT_GRC_PATH";

pub const LOOKUP_NAMES: &[&str] = &[
    "gnuradio-companion.cmd",
    "gnuradio-companion",
    "gnuradio-companion.exe",
];

#[cfg(windows)]
pub const WELL_KNOWN_PATHS: &[&str] = &[
    r"C:\GNURadio-3.10\bin\gnuradio-companion.cmd",
    r"C:\GNURadio-3.10\bin\gnuradio-companion.exe",
    r"C:\GNURadio-3.9\bin\gnuradio-companion.cmd",
    r"C:\GNURadio-3.9\bin\gnuradio-companion.exe",
    r"C:\Program Files\GNURadio\bin\gnuradio-companion.exe",
    r"C:\Program Files\GNURadio\bin\gnuradio-companion.cmd",
];

#[cfg(not(windows))]
pub const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/bin/gnuradio-companion",
    "/usr/local/bin/gnuradio-companion",
];

/// Why a single resolution attempt produced nothing. Never shown to the
/// user; the chain just moves on to the next tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// The tier has no value configured.
    Unset,
    /// The candidate does not exist on disk.
    Missing(PathBuf),
    /// The candidate exists but is not what we are looking for.
    Rejected(PathBuf),
    /// A shortcut did not lead to an existing target.
    Unresolved(PathBuf),
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::Unset => write!(f, "not configured"),
            ResolutionFailure::Missing(p) => write!(f, "{} does not exist", p.display()),
            ResolutionFailure::Rejected(p) => write!(f, "{} rejected", p.display()),
            ResolutionFailure::Unresolved(p) => {
                write!(f, "{} has no existing target", p.display())
            }
        }
    }
}

impl std::error::Error for ResolutionFailure {}

/// Validate a launcher candidate, distinguishing missing from rejected.
pub(crate) fn check_launcher(path: &Path) -> Result<PathBuf, ResolutionFailure> {
    if !path.exists() {
        return Err(ResolutionFailure::Missing(path.to_path_buf()));
    }
    if is_launcher(path) {
        Ok(path.to_path_buf())
    } else {
        Err(ResolutionFailure::Rejected(path.to_path_buf()))
    }
}

/// Searches `PATH` for a program name.
pub trait ProgramLookup: Send + Sync {
    fn find(&self, name: &str) -> Option<PathBuf>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WhichLookup;

impl ProgramLookup for WhichLookup {
    fn find(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}

impl<F> ProgramLookup for F
where
    F: Fn(&str) -> Option<PathBuf> + Send + Sync,
{
    fn find(&self, name: &str) -> Option<PathBuf> {
        self(name)
    }
}

/// Inputs of the executable search that come from outside the process.
#[derive(Debug, Clone, Default)]
pub struct LocatorSources {
    pub preferred_shortcut: Option<PathBuf>,
    pub env_override: Option<PathBuf>,
    pub lookup_names: Vec<String>,
    pub well_known: Vec<PathBuf>,
}

impl LocatorSources {
    /// Standard sources: `preferred_shortcut` from settings, the
    /// `MMT_GRC_PATH` override and the built-in lookup lists.
    pub fn from_env(preferred_shortcut: Option<PathBuf>) -> Self {
        Self {
            preferred_shortcut,
            env_override: std::env::var_os(GRC_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            lookup_names: LOOKUP_NAMES.iter().map(|s| s.to_string()).collect(),
            well_known: WELL_KNOWN_PATHS.iter().map(PathBuf::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorTier {
    HotCache,
    PreferredShortcut,
    EnvOverride,
    DiskCache,
    PathLookup,
    WellKnown,
}

impl LocatorTier {
    pub const ORDER: [LocatorTier; 6] = [
        LocatorTier::HotCache,
        LocatorTier::PreferredShortcut,
        LocatorTier::EnvOverride,
        LocatorTier::DiskCache,
        LocatorTier::PathLookup,
        LocatorTier::WellKnown,
    ];
}

/// Finds GNU Radio Companion, trying each [`LocatorTier`] in order.
pub struct ExecutableLocator {
    sources: LocatorSources,
    hot: Arc<LocationCache>,
    store: Arc<ConfigStore>,
    shortcuts: Arc<dyn ShortcutResolver>,
    lookup: Arc<dyn ProgramLookup>,
}

impl ExecutableLocator {
    pub fn new(
        sources: LocatorSources,
        hot: Arc<LocationCache>,
        store: Arc<ConfigStore>,
        shortcuts: Arc<dyn ShortcutResolver>,
        lookup: Arc<dyn ProgramLookup>,
    ) -> Self {
        Self {
            sources,
            hot,
            store,
            shortcuts,
            lookup,
        }
    }

    pub fn locate(&self) -> Option<PathBuf> {
        for tier in LocatorTier::ORDER {
            match self.attempt(tier) {
                Ok(path) => {
                    if tier != LocatorTier::HotCache {
                        tracing::info!(
                            "located GNU Radio Companion via {:?}: {}",
                            tier,
                            path.display()
                        );
                    }
                    self.remember(&path);
                    return Some(path);
                }
                Err(e) => tracing::debug!("locator tier {:?}: {e}", tier),
            }
        }
        tracing::warn!("GNU Radio Companion not found by any locator tier");
        None
    }

    pub fn attempt(&self, tier: LocatorTier) -> Result<PathBuf, ResolutionFailure> {
        match tier {
            LocatorTier::HotCache => {
                let path = self.hot.executable().ok_or(ResolutionFailure::Unset)?;
                if path.exists() {
                    Ok(path)
                } else {
                    Err(ResolutionFailure::Missing(path))
                }
            }
            LocatorTier::PreferredShortcut => {
                let lnk = self
                    .sources
                    .preferred_shortcut
                    .as_deref()
                    .ok_or(ResolutionFailure::Unset)?;
                let candidate = LauncherCandidate::recognize(lnk)
                    .ok_or_else(|| ResolutionFailure::Rejected(lnk.to_path_buf()))?;
                if candidate.kind != LauncherKind::Shortcut {
                    return check_launcher(&candidate.path);
                }
                self.shortcuts
                    .resolve(&candidate.path)
                    .target
                    .filter(|t| t.exists())
                    .ok_or(ResolutionFailure::Unresolved(candidate.path))
            }
            LocatorTier::EnvOverride => {
                let path = self
                    .sources
                    .env_override
                    .as_deref()
                    .ok_or(ResolutionFailure::Unset)?;
                check_launcher(path)
            }
            LocatorTier::DiskCache => {
                let value = self.store.get(GRC_PATH_KEY).ok_or(ResolutionFailure::Unset)?;
                check_launcher(Path::new(&value))
            }
            LocatorTier::PathLookup => {
                let mut last = ResolutionFailure::Unset;
                for name in &self.sources.lookup_names {
                    let Some(found) = self.lookup.find(name) else {
                        continue;
                    };
                    match check_launcher(&found) {
                        Ok(p) => return Ok(p),
                        Err(e) => last = e,
                    }
                }
                Err(last)
            }
            LocatorTier::WellKnown => {
                let mut last = ResolutionFailure::Unset;
                for path in &self.sources.well_known {
                    match check_launcher(path) {
                        Ok(p) => return Ok(p),
                        Err(e) => last = e,
                    }
                }
                Err(last)
            }
        }
    }

    /// A shortcut target need not pass the recognizer. Such a target is only
    /// kept for this run; persisting it would fail the disk tier on every
    /// start.
    fn remember(&self, path: &Path) {
        self.hot.set_executable(path);
        if is_launcher(path) {
            self.store.remember(GRC_PATH_KEY, path);
        } else {
            tracing::debug!("not persisting unrecognized target {}", path.display());
        }
    }
}
