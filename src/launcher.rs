use crate::cache::{ConfigStore, LocationCache};
use crate::exec::{ProcessSpawner, Spawner};
use crate::experiments::{ExperimentsResolver, ExperimentsSources};
use crate::locator::{ExecutableLocator, LocatorSources, WhichLookup};
use crate::planner::{LaunchPlan, Planner};
use crate::settings::Settings;
use crate::shortcut::{PowerShellShortcuts, ShortcutResolver};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    AppNotFound,
    ExperimentsDirNotFound,
    FlowgraphNotFound(PathBuf),
    NoWorkingDir(PathBuf),
    Spawn {
        program: PathBuf,
        missing: bool,
        detail: String,
    },
    ShellOpen {
        path: PathBuf,
        detail: String,
    },
    Unexpected(String),
    WorkerUnavailable(String),
}

impl LaunchError {
    /// Title of the error dialog.
    pub fn title(&self) -> &'static str {
        match self {
            LaunchError::AppNotFound => "App not found",
            LaunchError::ExperimentsDirNotFound => "Experiments not found",
            LaunchError::FlowgraphNotFound(_) => "Flowgraph missing",
            _ => "Launch failed",
        }
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::AppNotFound => {
                write!(f, "GNU Radio Companion was not found on this system.")
            }
            LaunchError::ExperimentsDirNotFound => write!(f, "Experiments folder not found."),
            LaunchError::FlowgraphNotFound(p) => write!(f, "Flowgraph not found: {}", p.display()),
            LaunchError::NoWorkingDir(p) => {
                write!(f, "No working directory available for {}", p.display())
            }
            LaunchError::Spawn {
                program,
                missing: true,
                detail,
            } => write!(f, "Program not found: {} ({detail})", program.display()),
            LaunchError::Spawn {
                program, detail, ..
            } => write!(f, "Could not start {}: {detail}", program.display()),
            LaunchError::ShellOpen { path, detail } => {
                write!(f, "Shell could not open {}: {detail}", path.display())
            }
            LaunchError::Unexpected(summary) => write!(f, "Unexpected error: {summary}"),
            LaunchError::WorkerUnavailable(detail) => {
                write!(f, "Could not start launch worker: {detail}")
            }
        }
    }
}

impl std::error::Error for LaunchError {}

/// Terminal result of one launch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub ok: bool,
    pub title: &'static str,
    pub message: String,
}

impl LaunchOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            title: "Launched",
            message: message.into(),
        }
    }

    pub fn failure(err: &LaunchError) -> Self {
        Self {
            ok: false,
            title: err.title(),
            message: err.to_string(),
        }
    }
}

impl From<Result<String, LaunchError>> for LaunchOutcome {
    fn from(result: Result<String, LaunchError>) -> Self {
        match result {
            Ok(msg) => LaunchOutcome::success(msg),
            Err(e) => LaunchOutcome::failure(&e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchRequest {
    /// Open GNU Radio Companion with a flowgraph from the experiments folder.
    Experiment { file_name: String },
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Requested,
    Resolving,
    Spawning,
}

impl LaunchPhase {
    pub fn label(self) -> &'static str {
        match self {
            LaunchPhase::Requested => "Opening GNU Radio…",
            LaunchPhase::Resolving => "Locating GNU Radio…",
            LaunchPhase::Spawning => "Starting GNU Radio…",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    Progress { id: RequestId, phase: LaunchPhase },
    /// Sent exactly once per request.
    Completed { id: RequestId, outcome: LaunchOutcome },
    /// Sent when the worker thread ends, however it ends.
    WorkerExited { id: RequestId },
}

/// Everything a launch worker needs. Shared between requests.
pub struct LaunchContext {
    pub locator: ExecutableLocator,
    pub experiments: ExperimentsResolver,
    pub planner: Planner,
    pub spawner: Arc<dyn Spawner>,
}

impl LaunchContext {
    /// Production wiring: PowerShell shortcut inspection, `PATH` lookup via
    /// `which`, environment overrides and real process spawning.
    pub fn standard(settings: &Settings, store: Arc<ConfigStore>) -> Self {
        let hot = Arc::new(LocationCache::new());
        let shortcuts: Arc<dyn ShortcutResolver> = Arc::new(PowerShellShortcuts);
        let locator = ExecutableLocator::new(
            LocatorSources::from_env(settings.preferred_shortcut_path()),
            Arc::clone(&hot),
            Arc::clone(&store),
            Arc::clone(&shortcuts),
            Arc::new(WhichLookup),
        );
        Self {
            locator,
            experiments: ExperimentsResolver::new(ExperimentsSources::from_env(), hot, store),
            planner: Planner::new(shortcuts),
            spawner: Arc::new(ProcessSpawner),
        }
    }

    /// Resolve and start one request. `progress` is told about phase changes.
    pub fn run(
        &self,
        request: &LaunchRequest,
        mut progress: impl FnMut(LaunchPhase),
    ) -> Result<String, LaunchError> {
        progress(LaunchPhase::Resolving);
        let launcher = self.locator.locate().ok_or(LaunchError::AppNotFound)?;
        let flowgraph = match request {
            LaunchRequest::Experiment { file_name } => {
                let dir = self
                    .experiments
                    .resolve()
                    .ok_or(LaunchError::ExperimentsDirNotFound)?;
                let file = dir.join(file_name);
                if !file.is_file() {
                    return Err(LaunchError::FlowgraphNotFound(file));
                }
                Some(absolutize(file))
            }
            LaunchRequest::Blank => None,
        };
        let plan = self.planner.plan(&launcher, flowgraph.as_deref())?;
        progress(LaunchPhase::Spawning);
        match plan {
            LaunchPlan::Spawn(plan) => self.spawner.spawn(&plan),
            LaunchPlan::ShellOpen(path) => self.spawner.shell_open(&path),
        }
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

/// Sends [`LaunchEvent::WorkerExited`] when dropped, including during unwind.
struct ExitSignal {
    id: RequestId,
    tx: Sender<LaunchEvent>,
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        let _ = self.tx.send(LaunchEvent::WorkerExited { id: self.id });
    }
}

fn panic_summary(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "launch worker panicked".to_string()
    }
}

/// Runs each request on its own short-lived thread and reports back through
/// a channel. There is no queue and no cancellation.
pub struct LaunchOrchestrator {
    ctx: Arc<LaunchContext>,
    tx: Sender<LaunchEvent>,
    next_id: u64,
}

impl LaunchOrchestrator {
    pub fn new(ctx: Arc<LaunchContext>, tx: Sender<LaunchEvent>) -> Self {
        Self { ctx, tx, next_id: 0 }
    }

    /// Allocate the id of the next request without starting it.
    pub fn next_id(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId(self.next_id)
    }

    pub fn submit(&mut self, request: LaunchRequest) -> RequestId {
        let id = self.next_id();
        self.dispatch(id, request);
        id
    }

    /// Start the worker for `id`. Exactly one [`LaunchEvent::Completed`] and
    /// one [`LaunchEvent::WorkerExited`] follow for it.
    pub fn dispatch(&self, id: RequestId, request: LaunchRequest) {
        tracing::debug!("launch request {:?}: {:?}", id, request);

        let ctx = Arc::clone(&self.ctx);
        let tx = self.tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("launch-{}", id.0))
            .spawn(move || {
                let _exit = ExitSignal { id, tx: tx.clone() };
                let progress_tx = tx.clone();
                let result = catch_unwind(AssertUnwindSafe(|| {
                    ctx.run(&request, |phase| {
                        let _ = progress_tx.send(LaunchEvent::Progress { id, phase });
                    })
                }));
                let outcome = match result {
                    Ok(r) => LaunchOutcome::from(r),
                    Err(payload) => {
                        let summary = panic_summary(payload.as_ref());
                        tracing::error!("launch worker {:?} panicked: {summary}", id);
                        LaunchOutcome::failure(&LaunchError::Unexpected(summary))
                    }
                };
                log_outcome(id, &outcome);
                let _ = tx.send(LaunchEvent::Completed { id, outcome });
            });

        if let Err(e) = spawned {
            tracing::error!("failed to spawn launch worker: {e}");
            let outcome = LaunchOutcome::failure(&LaunchError::WorkerUnavailable(e.to_string()));
            let _ = self.tx.send(LaunchEvent::Completed { id, outcome });
            let _ = self.tx.send(LaunchEvent::WorkerExited { id });
        }
    }
}

fn log_outcome(id: RequestId, outcome: &LaunchOutcome) {
    if outcome.ok {
        tracing::info!("launch {:?} succeeded: {}", id, outcome.message);
    } else {
        tracing::warn!("launch {:?} failed: {}", id, outcome.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_follow_error_kind() {
        assert_eq!(LaunchError::AppNotFound.title(), "App not found");
        assert_eq!(
            LaunchError::FlowgraphNotFound(PathBuf::from("x.grc")).title(),
            "Flowgraph missing"
        );
        assert_eq!(LaunchError::Unexpected("boom".into()).title(), "Launch failed");
    }

    #[test]
    fn spawn_errors_name_the_category() {
        let missing = LaunchError::Spawn {
            program: PathBuf::from("pythonw.exe"),
            missing: true,
            detail: "os error 2".into(),
        };
        assert!(missing.to_string().starts_with("Program not found"));
        let denied = LaunchError::Spawn {
            program: PathBuf::from("pythonw.exe"),
            missing: false,
            detail: "permission denied".into(),
        };
        assert!(denied.to_string().starts_with("Could not start"));
    }

    #[test]
    fn panic_payloads_are_summarised() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_summary(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_summary(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_summary(payload.as_ref()), "launch worker panicked");
    }
}
