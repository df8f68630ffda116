use std::path::{Path, PathBuf};

/// File name fragments that mark installers and release bundles rather than
/// an installed GNU Radio Companion.
pub const DENY_MARKERS: &[&str] = &["setup", "installer", "release", "win64", "win32", "msi"];

/// Stem prefix of the companion executable and its wrapper scripts.
pub const COMPANION_STEM: &str = "gnuradio-companion";

/// Both tokens must appear in the stem of a shortcut.
pub const SHORTCUT_TOKENS: (&str, &str) = ("gnu", "radio");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherKind {
    /// `.exe`, or a bare file name as installed on POSIX systems.
    Executable,
    /// `.cmd` / `.bat` wrapper.
    Script,
    /// `.lnk` shell shortcut.
    Shortcut,
}

impl LauncherKind {
    /// Classify by extension only. Returns `None` for extensions that can
    /// never be a launcher.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            None => Some(LauncherKind::Executable),
            Some("exe") => Some(LauncherKind::Executable),
            Some("cmd") | Some("bat") => Some(LauncherKind::Script),
            Some("lnk") => Some(LauncherKind::Shortcut),
            Some(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherCandidate {
    pub path: PathBuf,
    pub kind: LauncherKind,
}

impl LauncherCandidate {
    /// Build a candidate if `path` exists and looks like GNU Radio Companion.
    pub fn recognize(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if !path.exists() {
            return None;
        }
        let kind = classify_name(&path)?;
        Some(Self { path, kind })
    }
}

/// Name-only half of the recognizer: deny-list plus the per-kind stem
/// pattern. Does not touch the filesystem.
pub fn classify_name(path: &Path) -> Option<LauncherKind> {
    let name = path.file_name()?.to_string_lossy().to_lowercase();
    if DENY_MARKERS.iter().any(|m| name.contains(m)) {
        return None;
    }
    let stem = path.file_stem()?.to_string_lossy().to_lowercase();
    match LauncherKind::from_path(path)? {
        LauncherKind::Shortcut => {
            let (a, b) = SHORTCUT_TOKENS;
            (stem.contains(a) && stem.contains(b)).then_some(LauncherKind::Shortcut)
        }
        kind => stem.starts_with(COMPANION_STEM).then_some(kind),
    }
}

/// `true` when `path` exists and passes [`classify_name`].
pub fn is_launcher(path: &Path) -> bool {
    LauncherCandidate::recognize(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_markers_win_over_extension() {
        for name in [
            "gnuradio-companion-setup.exe",
            "GNURadio-Installer.lnk",
            "gnuradio-companion-release.cmd",
            "gnuradio-companion-win64.exe",
            "gnu radio msi.lnk",
            "gnuradio-companion.msi",
            "GNU Radio WIN32.lnk",
        ] {
            assert_eq!(classify_name(Path::new(name)), None, "{name}");
        }
    }

    #[test]
    fn accepts_expected_patterns() {
        assert_eq!(
            classify_name(Path::new("GNU Radio.lnk")),
            Some(LauncherKind::Shortcut)
        );
        assert_eq!(
            classify_name(Path::new("gnuradio-companion.cmd")),
            Some(LauncherKind::Script)
        );
        assert_eq!(
            classify_name(Path::new("gnuradio-companion.BAT")),
            Some(LauncherKind::Script)
        );
        assert_eq!(
            classify_name(Path::new("GNURadio-Companion.exe")),
            Some(LauncherKind::Executable)
        );
        assert_eq!(
            classify_name(Path::new("/usr/bin/gnuradio-companion")),
            Some(LauncherKind::Executable)
        );
    }

    #[test]
    fn rejects_unrelated_names() {
        assert_eq!(classify_name(Path::new("Radio Shack.lnk")), None);
        assert_eq!(classify_name(Path::new("python.exe")), None);
        assert_eq!(classify_name(Path::new("gnuradio-companion.py")), None);
        assert_eq!(classify_name(Path::new("my-gnuradio-companion.exe")), None);
    }

    #[test]
    fn missing_file_is_not_a_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gnuradio-companion.exe");
        assert!(!is_launcher(&path));
        std::fs::write(&path, b"").unwrap();
        let candidate = LauncherCandidate::recognize(&path).unwrap();
        assert_eq!(candidate.kind, LauncherKind::Executable);
    }
}
