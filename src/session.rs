use crate::feedback::{FeedbackConfig, FeedbackController, FeedbackEffect};
use crate::launcher::{LaunchContext, LaunchEvent, LaunchOrchestrator, LaunchRequest, RequestId};
use crate::status_log::append_status_log;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The surface the launch machinery drives. Implemented by the window.
pub trait LaunchUi {
    /// Show the modal busy indicator, or update its label.
    fn show_indicator(&mut self, label: &str);
    /// Remove the indicator and any cursor override that came with it.
    fn hide_indicator(&mut self);
    fn status(&mut self, message: &str, duration: Duration);
    fn error(&mut self, title: &str, message: &str);
}

/// Foreground half of launching: issues requests, receives worker events
/// and turns them into UI updates.
pub struct LaunchSession {
    orchestrator: LaunchOrchestrator,
    events: Receiver<LaunchEvent>,
    feedback: FeedbackController,
    status_log: Option<PathBuf>,
}

impl LaunchSession {
    pub fn new(ctx: Arc<LaunchContext>, config: FeedbackConfig) -> Self {
        let (tx, rx) = channel();
        Self {
            orchestrator: LaunchOrchestrator::new(ctx, tx),
            events: rx,
            feedback: FeedbackController::new(config),
            status_log: None,
        }
    }

    /// Record every status line in `path`.
    pub fn with_status_log(mut self, path: PathBuf) -> Self {
        self.status_log = Some(path);
        self
    }

    pub fn open_experiment(&mut self, file_name: &str, ui: &mut dyn LaunchUi) -> RequestId {
        self.request(
            LaunchRequest::Experiment {
                file_name: file_name.to_string(),
            },
            ui,
        )
    }

    pub fn open_blank(&mut self, ui: &mut dyn LaunchUi) -> RequestId {
        self.request(LaunchRequest::Blank, ui)
    }

    /// The indicator is shown before the worker starts.
    pub fn request(&mut self, request: LaunchRequest, ui: &mut dyn LaunchUi) -> RequestId {
        let id = self.orchestrator.next_id();
        let effects = self.feedback.on_requested(id);
        self.apply(effects, ui);
        self.orchestrator.dispatch(id, request);
        id
    }

    /// Drain pending worker events and run the grace timer. Call once per
    /// frame.
    pub fn pump(&mut self, now: Instant, ui: &mut dyn LaunchUi) {
        loop {
            let event = match self.events.try_recv() {
                Ok(ev) => ev,
                Err(TryRecvError::Empty) => break,
                // The orchestrator keeps a sender, so this cannot happen
                // while `self` is alive.
                Err(TryRecvError::Disconnected) => break,
            };
            let effects = match event {
                LaunchEvent::Progress { id, phase } => self.feedback.on_progress(id, phase),
                LaunchEvent::Completed { id, outcome } => {
                    self.feedback.on_completed(id, &outcome, now)
                }
                LaunchEvent::WorkerExited { id } => self.feedback.on_worker_exited(id),
            };
            self.apply(effects, ui);
        }
        let effects = self.feedback.tick(now);
        self.apply(effects, ui);
    }

    /// The window is closing.
    pub fn close(&mut self, ui: &mut dyn LaunchUi) {
        let effects = self.feedback.close();
        self.apply(effects, ui);
    }

    pub fn busy(&self) -> bool {
        self.feedback.is_active()
    }

    /// Next instant at which [`LaunchSession::pump`] has timed work to do.
    pub fn deadline(&self) -> Option<Instant> {
        self.feedback.deadline()
    }

    fn apply(&self, effects: Vec<FeedbackEffect>, ui: &mut dyn LaunchUi) {
        for effect in effects {
            match effect {
                FeedbackEffect::ShowIndicator { label } => ui.show_indicator(&label),
                FeedbackEffect::HideIndicator => ui.hide_indicator(),
                FeedbackEffect::Status { message, duration } => {
                    if let Some(path) = &self.status_log {
                        append_status_log(path, &message);
                    }
                    ui.status(&message, duration);
                }
                FeedbackEffect::Error { title, message } => ui.error(&title, &message),
            }
        }
    }
}
