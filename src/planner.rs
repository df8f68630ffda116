use crate::launcher::LaunchError;
use crate::recognizer::LauncherKind;
use crate::shortcut::ShortcutResolver;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Interpreters looked up next to the launcher, windowless first.
#[cfg(windows)]
pub const INTERPRETERS: &[&str] = &["pythonw.exe", "python.exe"];
#[cfg(not(windows))]
pub const INTERPRETERS: &[&str] = &["python3", "python"];

pub const GRC_MODULE_ARGS: &[&str] = &["-m", "gnuradio.grc"];

/// A concrete process to start. The working directory existed when the plan
/// was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub workdir: PathBuf,
}

impl InvocationPlan {
    /// `workdir` defaults to the parent of `program`.
    pub fn new(
        program: PathBuf,
        args: Vec<String>,
        workdir: Option<PathBuf>,
    ) -> Result<Self, LaunchError> {
        let workdir = workdir
            .filter(|d| d.is_dir())
            .or_else(|| program.parent().map(Path::to_path_buf))
            .ok_or_else(|| LaunchError::NoWorkingDir(program.clone()))?;
        if !workdir.is_dir() {
            return Err(LaunchError::NoWorkingDir(workdir));
        }
        Ok(Self {
            program,
            args,
            workdir,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    Spawn(InvocationPlan),
    /// Hand the file to the desktop shell.
    ShellOpen(PathBuf),
}

/// Turns a located launcher plus an optional flowgraph into a [`LaunchPlan`].
pub struct Planner {
    shortcuts: Arc<dyn ShortcutResolver>,
}

impl Planner {
    pub fn new(shortcuts: Arc<dyn ShortcutResolver>) -> Self {
        Self { shortcuts }
    }

    pub fn plan(
        &self,
        launcher: &Path,
        flowgraph: Option<&Path>,
    ) -> Result<LaunchPlan, LaunchError> {
        let base = if LauncherKind::from_path(launcher) == Some(LauncherKind::Shortcut) {
            let info = self.shortcuts.resolve(launcher);
            let Some(target) = info.target.filter(|t| t.is_file()) else {
                // A `.lnk` cannot be executed directly; the shell can open it,
                // at the cost of any flowgraph argument.
                if flowgraph.is_some() {
                    tracing::warn!(
                        "shortcut {} has no usable target; opening it without the flowgraph",
                        launcher.display()
                    );
                } else {
                    tracing::debug!(
                        "shortcut {} has no usable target; using shell open",
                        launcher.display()
                    );
                }
                return Ok(LaunchPlan::ShellOpen(launcher.to_path_buf()));
            };
            if flowgraph.is_none() {
                let args = split_args(&info.args);
                let workdir = info
                    .workdir
                    .or_else(|| target.parent().map(Path::to_path_buf));
                return Ok(LaunchPlan::Spawn(InvocationPlan::new(target, args, workdir)?));
            }
            target
        } else {
            launcher.to_path_buf()
        };

        let bin_dir = base.parent().map(Path::to_path_buf);
        let artifact: Vec<String> = flowgraph
            .map(|f| vec![f.to_string_lossy().into_owned()])
            .unwrap_or_default();

        if let Some(interp) = bin_dir.as_deref().and_then(find_interpreter) {
            let mut args: Vec<String> = GRC_MODULE_ARGS.iter().map(|s| s.to_string()).collect();
            args.extend(artifact);
            return Ok(LaunchPlan::Spawn(InvocationPlan::new(interp, args, bin_dir)?));
        }

        // Some builds of the companion ignore a file argument; nothing better
        // is available without an interpreter.
        Ok(LaunchPlan::Spawn(InvocationPlan::new(base, artifact, bin_dir)?))
    }
}

pub fn find_interpreter(dir: &Path) -> Option<PathBuf> {
    INTERPRETERS
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Split a shortcut argument string like a shell would, degrading to
/// whitespace splitting when quotes are unbalanced.
pub fn split_args(args: &str) -> Vec<String> {
    let args = args.trim();
    if args.is_empty() {
        return Vec::new();
    }
    shlex::split(args).unwrap_or_else(|| args.split_whitespace().map(String::from).collect())
}
