use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// What a `.lnk` file points at. Every field is optional because the shell
/// may report any subset of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutInfo {
    pub target: Option<PathBuf>,
    pub args: String,
    pub workdir: Option<PathBuf>,
}

pub trait ShortcutResolver: Send + Sync {
    /// Inspect `path`. Failures of any kind yield [`ShortcutInfo::default`].
    fn resolve(&self, path: &Path) -> ShortcutInfo;
}

/// Reads shortcuts through `WScript.Shell` in an out-of-process PowerShell.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerShellShortcuts;

impl ShortcutResolver for PowerShellShortcuts {
    fn resolve(&self, path: &Path) -> ShortcutInfo {
        if !path.exists() {
            return ShortcutInfo::default();
        }
        let mut cmd = Command::new("powershell");
        cmd.args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"])
            .arg(inspect_script(path))
            .stdin(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(crate::exec::CREATE_NO_WINDOW);
        }
        match cmd.output() {
            Ok(out) => {
                if !out.status.success() {
                    tracing::debug!(
                        "shortcut inspection of {} exited with {}",
                        path.display(),
                        out.status
                    );
                }
                parse_inspect_output(&String::from_utf8_lossy(&out.stdout))
            }
            Err(e) => {
                tracing::debug!("shortcut inspection of {} failed: {e}", path.display());
                ShortcutInfo::default()
            }
        }
    }
}

/// Quote `s` as a single-quoted PowerShell literal.
pub fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn inspect_script(path: &Path) -> String {
    let lnk = path.to_string_lossy().replace('\\', "/");
    format!(
        "$w=New-Object -ComObject WScript.Shell; \
         $s=$w.CreateShortcut({}); \
         [Console]::Out.WriteLine($s.TargetPath); \
         [Console]::Out.WriteLine($s.Arguments); \
         [Console]::Out.WriteLine($s.WorkingDirectory)",
        ps_quote(&lnk)
    )
}

/// Parse the three-line target/arguments/working-directory report.
/// Missing or blank lines become `None` / empty.
pub fn parse_inspect_output(stdout: &str) -> ShortcutInfo {
    let mut lines = stdout.lines().map(str::trim);
    let target = lines.next().filter(|l| !l.is_empty()).map(PathBuf::from);
    let args = lines.next().unwrap_or_default().to_string();
    let workdir = lines.next().filter(|l| !l.is_empty()).map(PathBuf::from);
    ShortcutInfo {
        target,
        args,
        workdir,
    }
}
