use crate::launcher::LaunchError;
use crate::planner::InvocationPlan;
use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(windows)]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Starts processes without waiting on them.
pub trait Spawner: Send + Sync {
    /// Start `plan` and return a status line describing what was started.
    fn spawn(&self, plan: &InvocationPlan) -> Result<String, LaunchError>;

    /// Let the desktop shell open `path` with its default handler.
    fn shell_open(&self, path: &Path) -> Result<String, LaunchError>;
}

/// Fire-and-forget spawning. The child handle is dropped right away, so its
/// exit status and lifetime are never observed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSpawner;

impl Spawner for ProcessSpawner {
    fn spawn(&self, plan: &InvocationPlan) -> Result<String, LaunchError> {
        let mut command = Command::new(&plan.program);
        command
            .args(&plan.args)
            .current_dir(&plan.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(CREATE_NO_WINDOW);
        }
        tracing::debug!("spawning {:?}", command);
        match command.spawn() {
            Ok(child) => {
                tracing::debug!("started pid {}", child.id());
                drop(child);
                Ok(describe(plan))
            }
            Err(e) => Err(LaunchError::Spawn {
                program: plan.program.clone(),
                missing: e.kind() == std::io::ErrorKind::NotFound,
                detail: e.to_string(),
            }),
        }
    }

    fn shell_open(&self, path: &Path) -> Result<String, LaunchError> {
        open::that_detached(path)
            .map(|_| format!("Opened {} via the shell", file_name(path)))
            .map_err(|e| LaunchError::ShellOpen {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Status line for a started plan: program name, arguments, working dir.
pub fn describe(plan: &InvocationPlan) -> String {
    let name = file_name(&plan.program);
    if plan.args.is_empty() {
        format!("Started {name} (wd: {})", plan.workdir.display())
    } else {
        format!(
            "Started {name} {} (wd: {})",
            plan.args.join(" "),
            plan.workdir.display()
        )
    }
}
