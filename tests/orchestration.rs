use mmt_virtual_lab::cache::{ConfigStore, LocationCache};
use mmt_virtual_lab::exec::{describe, Spawner};
use mmt_virtual_lab::experiments::{ExperimentsResolver, ExperimentsSources};
use mmt_virtual_lab::feedback::FeedbackConfig;
use mmt_virtual_lab::launcher::{
    LaunchContext, LaunchError, LaunchEvent, LaunchOrchestrator, LaunchOutcome, LaunchRequest,
    RequestId,
};
use mmt_virtual_lab::locator::{ExecutableLocator, LocatorSources};
use mmt_virtual_lab::planner::{InvocationPlan, Planner, GRC_MODULE_ARGS, INTERPRETERS};
use mmt_virtual_lab::session::{LaunchSession, LaunchUi};
use mmt_virtual_lab::shortcut::{ShortcutInfo, ShortcutResolver};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

struct NoShortcuts;

impl ShortcutResolver for NoShortcuts {
    fn resolve(&self, _path: &Path) -> ShortcutInfo {
        ShortcutInfo::default()
    }
}

#[derive(Default)]
struct RecordingSpawner {
    plans: Mutex<Vec<InvocationPlan>>,
    panic: bool,
}

impl Spawner for RecordingSpawner {
    fn spawn(&self, plan: &InvocationPlan) -> Result<String, LaunchError> {
        if self.panic {
            panic!("spawner exploded");
        }
        self.plans.lock().unwrap().push(plan.clone());
        Ok(describe(plan))
    }

    fn shell_open(&self, path: &Path) -> Result<String, LaunchError> {
        Ok(format!("Opened {}", path.display()))
    }
}

struct Lab {
    _dir: TempDir,
    bin: PathBuf,
    experiments: PathBuf,
    launcher: PathBuf,
}

/// A fake installation: `bin/gnuradio-companion.exe` plus an experiments
/// folder with `am_signal.grc`.
fn lab(with_launcher: bool) -> Lab {
    let dir = tempdir().unwrap();
    let bin = dir.path().join("bin");
    let experiments = dir.path().join("experiments");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::create_dir_all(&experiments).unwrap();
    std::fs::write(experiments.join("am_signal.grc"), b"<flow_graph/>").unwrap();
    let launcher = bin.join("gnuradio-companion.exe");
    if with_launcher {
        std::fs::write(&launcher, b"").unwrap();
    }
    Lab {
        _dir: dir,
        bin,
        experiments,
        launcher,
    }
}

fn context(lab: &Lab, spawner: Arc<RecordingSpawner>) -> Arc<LaunchContext> {
    let hot = Arc::new(LocationCache::new());
    let store = Arc::new(ConfigStore::load(lab.bin.join("..").join("config.json")));
    let shortcuts: Arc<dyn ShortcutResolver> = Arc::new(NoShortcuts);
    let locator = ExecutableLocator::new(
        LocatorSources {
            well_known: vec![lab.launcher.clone()],
            ..Default::default()
        },
        Arc::clone(&hot),
        Arc::clone(&store),
        Arc::clone(&shortcuts),
        Arc::new(|_: &str| -> Option<PathBuf> { None }),
    );
    let experiments = ExperimentsResolver::new(
        ExperimentsSources {
            env_override: Some(lab.experiments.clone()),
            ..Default::default()
        },
        hot,
        store,
    );
    Arc::new(LaunchContext {
        locator,
        experiments,
        planner: Planner::new(shortcuts),
        spawner,
    })
}

/// Collect events for `id` until its worker reports exit.
fn drain(rx: &Receiver<LaunchEvent>, id: RequestId) -> Vec<LaunchEvent> {
    let mut events = Vec::new();
    loop {
        let ev = rx.recv_timeout(Duration::from_secs(5)).expect("worker stalled");
        let done = ev == LaunchEvent::WorkerExited { id };
        events.push(ev);
        if done {
            return events;
        }
    }
}

fn outcomes(events: &[LaunchEvent]) -> Vec<LaunchOutcome> {
    events
        .iter()
        .filter_map(|e| match e {
            LaunchEvent::Completed { outcome, .. } => Some(outcome.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn experiment_launch_passes_absolute_flowgraph() {
    let lab = lab(true);
    let spawner = Arc::new(RecordingSpawner::default());
    let (tx, rx) = channel();
    let mut orch = LaunchOrchestrator::new(context(&lab, spawner.clone()), tx);

    let id = orch.submit(LaunchRequest::Experiment {
        file_name: "am_signal.grc".into(),
    });
    let events = drain(&rx, id);
    let done = outcomes(&events);
    assert_eq!(done.len(), 1);
    assert!(done[0].ok, "{}", done[0].message);

    let plans = spawner.plans.lock().unwrap();
    assert_eq!(plans.len(), 1);
    let last = PathBuf::from(plans[0].args.last().unwrap());
    assert!(last.is_absolute());
    assert!(last.ends_with("am_signal.grc"));
    assert_eq!(plans[0].program, lab.launcher);
    assert_eq!(plans[0].workdir, lab.bin);
}

#[test]
fn interpreter_is_preferred_when_present() {
    let lab = lab(true);
    let interp = lab.bin.join(INTERPRETERS[0]);
    std::fs::write(&interp, b"").unwrap();
    let spawner = Arc::new(RecordingSpawner::default());
    let (tx, rx) = channel();
    let mut orch = LaunchOrchestrator::new(context(&lab, spawner.clone()), tx);

    let id = orch.submit(LaunchRequest::Blank);
    assert!(outcomes(&drain(&rx, id))[0].ok);

    let plans = spawner.plans.lock().unwrap();
    assert_eq!(plans[0].program, interp);
    assert_eq!(plans[0].args, GRC_MODULE_ARGS);
}

#[test]
fn interpreter_receives_module_args_then_flowgraph() {
    let lab = lab(true);
    let interp = lab.bin.join(INTERPRETERS[0]);
    std::fs::write(&interp, b"").unwrap();
    let spawner = Arc::new(RecordingSpawner::default());
    let (tx, rx) = channel();
    let mut orch = LaunchOrchestrator::new(context(&lab, spawner.clone()), tx);

    let id = orch.submit(LaunchRequest::Experiment {
        file_name: "am_signal.grc".into(),
    });
    assert!(outcomes(&drain(&rx, id))[0].ok);

    let plans = spawner.plans.lock().unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].program, interp);
    assert_eq!(
        plans[0].args,
        vec![
            "-m".to_string(),
            "gnuradio.grc".to_string(),
            lab.experiments
                .join("am_signal.grc")
                .to_string_lossy()
                .into_owned(),
        ]
    );
    assert_eq!(plans[0].workdir, lab.bin);
}

#[test]
fn missing_flowgraph_is_reported() {
    let lab = lab(true);
    let spawner = Arc::new(RecordingSpawner::default());
    let (tx, rx) = channel();
    let mut orch = LaunchOrchestrator::new(context(&lab, spawner.clone()), tx);

    let id = orch.submit(LaunchRequest::Experiment {
        file_name: "qam_16.grc".into(),
    });
    let done = outcomes(&drain(&rx, id));
    assert!(!done[0].ok);
    assert_eq!(done[0].title, "Flowgraph missing");
    assert!(done[0].message.contains("qam_16.grc"));
    assert!(spawner.plans.lock().unwrap().is_empty());
}

#[test]
fn panicking_worker_still_completes() {
    let lab = lab(true);
    let spawner = Arc::new(RecordingSpawner {
        panic: true,
        ..Default::default()
    });
    let (tx, rx) = channel();
    let mut orch = LaunchOrchestrator::new(context(&lab, spawner), tx);

    let id = orch.submit(LaunchRequest::Blank);
    let events = drain(&rx, id);
    let done = outcomes(&events);
    assert_eq!(done.len(), 1);
    assert!(!done[0].ok);
    assert!(done[0].message.contains("spawner exploded"));
    assert_eq!(events.last(), Some(&LaunchEvent::WorkerExited { id }));
}

#[derive(Default)]
struct RecordingUi {
    shown: Option<Instant>,
    hidden: Option<Instant>,
    statuses: Vec<String>,
    errors: Vec<(String, String)>,
}

impl LaunchUi for RecordingUi {
    fn show_indicator(&mut self, _label: &str) {
        self.shown.get_or_insert_with(Instant::now);
        self.hidden = None;
    }

    fn hide_indicator(&mut self) {
        self.hidden = Some(Instant::now());
    }

    fn status(&mut self, message: &str, _duration: Duration) {
        self.statuses.push(message.to_string());
    }

    fn error(&mut self, title: &str, message: &str) {
        self.errors.push((title.to_string(), message.to_string()));
    }
}

fn run_until_idle(session: &mut LaunchSession, ui: &mut RecordingUi) {
    let give_up = Instant::now() + Duration::from_secs(5);
    while session.busy() {
        assert!(Instant::now() < give_up, "indicator never dismissed");
        std::thread::sleep(Duration::from_millis(5));
        session.pump(Instant::now(), ui);
    }
}

#[test]
fn success_keeps_indicator_for_grace_period() {
    let lab = lab(true);
    let grace = Duration::from_millis(200);
    let config = FeedbackConfig {
        success_grace: grace,
        ..Default::default()
    };
    let mut session = LaunchSession::new(context(&lab, Arc::default()), config)
        .with_status_log(lab.bin.join("status.log"));
    let mut ui = RecordingUi::default();

    session.open_experiment("am_signal.grc", &mut ui);
    let shown = ui.shown.expect("indicator shown synchronously");
    run_until_idle(&mut session, &mut ui);

    let visible = ui.hidden.unwrap() - shown;
    assert!(visible >= grace, "dismissed after {visible:?}");
    assert!(visible < grace + Duration::from_secs(2), "dismissed after {visible:?}");
    assert!(ui.errors.is_empty());
    assert!(ui.statuses[0].starts_with("Started gnuradio-companion.exe"));

    let log = std::fs::read_to_string(lab.bin.join("status.log")).unwrap();
    assert!(log.contains("Started gnuradio-companion.exe"));
}

#[test]
fn missing_app_fails_fast_for_both_requests() {
    let lab = lab(false);
    let mut session = LaunchSession::new(context(&lab, Arc::default()), FeedbackConfig::default());

    for request in [
        LaunchRequest::Experiment {
            file_name: "am_signal.grc".into(),
        },
        LaunchRequest::Blank,
    ] {
        let mut ui = RecordingUi::default();
        session.request(request, &mut ui);
        run_until_idle(&mut session, &mut ui);
        let visible = ui.hidden.unwrap() - ui.shown.unwrap();
        assert!(visible < Duration::from_millis(1500), "{visible:?}");
        assert_eq!(ui.errors.len(), 1);
        assert_eq!(ui.errors[0].0, "App not found");
        assert!(ui.errors[0].1.contains("not found"));
        assert!(ui.statuses.iter().all(|s| s.contains("not found")));
    }
}

#[test]
fn closing_dismisses_during_grace() {
    let lab = lab(true);
    let config = FeedbackConfig {
        success_grace: Duration::from_secs(30),
        ..Default::default()
    };
    let mut session = LaunchSession::new(context(&lab, Arc::default()), config);
    let mut ui = RecordingUi::default();

    session.open_blank(&mut ui);
    let give_up = Instant::now() + Duration::from_secs(5);
    while ui.statuses.is_empty() {
        assert!(Instant::now() < give_up, "no outcome");
        std::thread::sleep(Duration::from_millis(5));
        session.pump(Instant::now(), &mut ui);
    }
    assert!(session.busy());
    session.close(&mut ui);
    assert!(!session.busy());
    assert!(ui.hidden.is_some());
}
