use crate::launcher::{LaunchOutcome, LaunchPhase, RequestId};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackConfig {
    /// How long the indicator stays up after a successful spawn.
    pub success_grace: Duration,
    pub status_duration: Duration,
    pub error_status_duration: Duration,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            success_grace: Duration::from_millis(1500),
            status_duration: Duration::from_secs(8),
            error_status_duration: Duration::from_secs(6),
        }
    }
}

/// What the UI has to do in response to a launch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEffect {
    /// Show the busy indicator, or relabel it if it is already visible.
    ShowIndicator { label: String },
    HideIndicator,
    Status { message: String, duration: Duration },
    Error { title: String, message: String },
}

#[derive(Debug, Clone, Copy)]
struct Indicator {
    request: RequestId,
    /// Set once an outcome arrived; from then on only the grace timer or
    /// [`FeedbackController::close`] may dismiss it.
    dismiss_at: Option<Instant>,
    completed: bool,
}

/// Owns the lifetime of the busy indicator.
///
/// The indicator goes up when a request is issued and comes down through
/// exactly one of: a failed outcome (immediately), a successful outcome
/// (after [`FeedbackConfig::success_grace`]), or the worker exiting without
/// any outcome. Events for requests other than the active one are ignored.
#[derive(Debug)]
pub struct FeedbackController {
    config: FeedbackConfig,
    indicator: Option<Indicator>,
}

impl FeedbackController {
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            indicator: None,
        }
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.indicator.is_some()
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.indicator.map(|i| i.request)
    }

    /// When the grace timer will fire, if it is running.
    pub fn deadline(&self) -> Option<Instant> {
        self.indicator.and_then(|i| i.dismiss_at)
    }

    fn active(&self, id: RequestId) -> Option<Indicator> {
        self.indicator.filter(|i| i.request == id)
    }

    pub fn on_requested(&mut self, id: RequestId) -> Vec<FeedbackEffect> {
        let mut effects = Vec::new();
        if let Some(prev) = self.indicator.take() {
            tracing::debug!("dismissing indicator of {:?} for new request", prev.request);
            effects.push(FeedbackEffect::HideIndicator);
        }
        self.indicator = Some(Indicator {
            request: id,
            dismiss_at: None,
            completed: false,
        });
        effects.push(FeedbackEffect::ShowIndicator {
            label: LaunchPhase::Requested.label().to_string(),
        });
        effects
    }

    pub fn on_progress(&mut self, id: RequestId, phase: LaunchPhase) -> Vec<FeedbackEffect> {
        match self.active(id) {
            Some(ind) if !ind.completed => vec![FeedbackEffect::ShowIndicator {
                label: phase.label().to_string(),
            }],
            _ => Vec::new(),
        }
    }

    pub fn on_completed(
        &mut self,
        id: RequestId,
        outcome: &LaunchOutcome,
        now: Instant,
    ) -> Vec<FeedbackEffect> {
        let Some(ind) = self.active(id) else {
            tracing::debug!("ignoring stale outcome of {:?}: {}", id, outcome.message);
            return Vec::new();
        };
        if ind.completed {
            return Vec::new();
        }
        if outcome.ok {
            self.indicator = Some(Indicator {
                dismiss_at: Some(now + self.config.success_grace),
                completed: true,
                ..ind
            });
            return vec![FeedbackEffect::Status {
                message: outcome.message.clone(),
                duration: self.config.status_duration,
            }];
        }
        self.indicator = None;
        vec![
            FeedbackEffect::HideIndicator,
            FeedbackEffect::Status {
                message: outcome.message.clone(),
                duration: self.config.error_status_duration,
            },
            FeedbackEffect::Error {
                title: outcome.title.to_string(),
                message: outcome.message.clone(),
            },
        ]
    }

    /// Safety net for workers that end without delivering an outcome.
    pub fn on_worker_exited(&mut self, id: RequestId) -> Vec<FeedbackEffect> {
        match self.active(id) {
            Some(ind) if !ind.completed => {
                tracing::warn!("launch worker {:?} exited without an outcome", id);
                self.indicator = None;
                vec![FeedbackEffect::HideIndicator]
            }
            _ => Vec::new(),
        }
    }

    /// Fire the grace timer if it is due.
    pub fn tick(&mut self, now: Instant) -> Vec<FeedbackEffect> {
        match self.deadline() {
            Some(at) if now >= at => {
                self.indicator = None;
                vec![FeedbackEffect::HideIndicator]
            }
            _ => Vec::new(),
        }
    }

    /// Window is closing: take the indicator down unconditionally.
    pub fn close(&mut self) -> Vec<FeedbackEffect> {
        match self.indicator.take() {
            Some(_) => vec![FeedbackEffect::HideIndicator],
            None => Vec::new(),
        }
    }
}
