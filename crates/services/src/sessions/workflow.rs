use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;

use hinter_core::Clock;
use hinter_core::model::{OptionId, Step, StepId};

use crate::api::{GenerationOptions, GuidanceApi};
use crate::sessions::progress::SessionProgress;
use crate::sessions::service::{SelectOutcome, SessionPhase, SessionService};

/// How long the success feedback is shown before the cursor advances.
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(1500);

/// Cheap copy of the UI-facing session state, taken under the lock.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub problem: Option<String>,
    pub current_index: usize,
    pub current_step: Option<Step>,
    pub progress: SessionProgress,
    pub last_error: Option<String>,
    pub show_success: bool,
    pub warning: Option<String>,
}

/// Orchestrates one session against the generation endpoint.
///
/// The session itself is synchronous and single-writer; this wrapper holds it
/// behind a single mutex and keeps every await point outside the lock, so an
/// in-flight fetch or a pending feedback delay never blocks a `reset` or a
/// superseding `submit`; the epoch checks inside the session decide who wins.
pub struct SessionWorkflow {
    session: Arc<Mutex<SessionService>>,
    api: Arc<dyn GuidanceApi>,
    feedback_delay: Duration,
}

impl SessionWorkflow {
    #[must_use]
    pub fn new(api: Arc<dyn GuidanceApi>, clock: Clock) -> Self {
        Self {
            session: Arc::new(Mutex::new(SessionService::new(clock))),
            api,
            feedback_delay: FEEDBACK_DELAY,
        }
    }

    /// Override the success-feedback delay, mainly for tests.
    #[must_use]
    pub fn with_feedback_delay(mut self, delay: Duration) -> Self {
        self.feedback_delay = delay;
        self
    }

    /// Submit a problem and load its flowchart into the session.
    ///
    /// A no-op when the trimmed problem text is empty. Supersedes any
    /// submission still in flight; the superseded response is dropped when
    /// it lands. Fetch and validation failures surface through the session's
    /// last-error message, never as a panic or an escaping error.
    pub async fn submit(&self, problem: &str, options: &GenerationOptions) {
        let epoch = {
            let mut session = self.session.lock().await;
            session.begin_submit(problem)
        };
        let Some(epoch) = epoch else {
            return;
        };

        let result = self.api.generate_flowchart(problem.trim(), options).await;
        self.session.lock().await.finish_submit(epoch, result);
    }

    /// Select an option for the active step.
    ///
    /// On a correct pick the session shows its success feedback for
    /// [`FEEDBACK_DELAY`] before the cursor advances; the lock is released
    /// during the wait, and the advance applies only if the session was not
    /// reset or resubmitted in the gap.
    pub async fn select_choice(&self, step_id: &StepId, choice_id: &OptionId) -> SelectOutcome {
        let outcome = self.session.lock().await.select_choice(step_id, choice_id);

        if let SelectOutcome::Correct { advance } = &outcome {
            sleep(self.feedback_delay).await;
            self.session.lock().await.apply_advance(*advance);
        }

        outcome
    }

    /// Discard the session and return to `Idle`.
    pub async fn reset(&self) {
        self.session.lock().await.reset();
    }

    /// Dismiss the current error message.
    pub async fn clear_error(&self) {
        self.session.lock().await.clear_error();
    }

    #[must_use]
    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock().await;
        SessionSnapshot {
            phase: session.phase(),
            problem: session.problem().map(str::to_owned),
            current_index: session.current_index(),
            current_step: session.current_step().cloned(),
            progress: session.progress(),
            last_error: session.last_error().map(str::to_owned),
            show_success: session.show_success(),
            warning: session
                .flowchart()
                .and_then(|fc| fc.warning())
                .map(str::to_owned),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
