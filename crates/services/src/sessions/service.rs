use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};

use hinter_core::Clock;
use hinter_core::model::{ChoiceOption, Flowchart, OptionId, Step, StepId};

use crate::error::{ApiError, SessionError};
use crate::sessions::progress::SessionProgress;

const DEFAULT_INCORRECT_MESSAGE: &str = "This choice is incorrect. Please try again.";

//
// ─── TOKENS ────────────────────────────────────────────────────────────────────
//

/// Monotonic token distinguishing successive submit/reset generations.
///
/// Anything scheduled on behalf of an earlier generation (an in-flight fetch,
/// a deferred cursor advance) carries the epoch it was issued for and is
/// discarded when it no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// Permission to advance the cursor once the UI-feedback delay has elapsed.
///
/// Valid only while the session still sits at the same step of the same
/// epoch, so a queued advance can never touch a session that was reset or
/// replaced in the meantime, and a duplicate ticket can never skip a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceTicket {
    epoch: Epoch,
    from_index: usize,
}

//
// ─── PHASE & OUTCOME ───────────────────────────────────────────────────────────
//

/// Lifecycle phase, derived entirely from the session fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Active,
    Completed,
}

/// Result of a selection against the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The pick was correct; the cursor advances once `advance` is applied
    /// after the UI-feedback delay.
    Correct { advance: AdvanceTicket },
    /// The pick was wrong; the step stays active and re-selectable.
    Incorrect,
    /// The selection referenced a stale step or unknown option; no state
    /// changed apart from the error message.
    Rejected(SessionError),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Single source of truth for one flowchart-walking session.
///
/// Only one step is active at a time, and a correct answer is the only way
/// to advance: the cursor is a monotonically non-decreasing counter that
/// moves forward exactly one position per correct pick. Completion is
/// derived from the cursor and the completed set, never stored separately.
///
/// All failures are local: a rejected selection or a failed fetch surfaces
/// through [`SessionService::last_error`], nothing propagates further.
pub struct SessionService {
    clock: Clock,
    problem: Option<String>,
    flowchart: Option<Flowchart>,
    current_index: usize,
    completed: HashSet<StepId>,
    choices: HashMap<StepId, OptionId>,
    loading: bool,
    last_error: Option<String>,
    show_success: bool,
    epoch: u64,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl SessionService {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            problem: None,
            flowchart: None,
            current_index: 0,
            completed: HashSet::new(),
            choices: HashMap::new(),
            loading: false,
            last_error: None,
            show_success: false,
            epoch: 0,
            started_at: None,
            completed_at: None,
        }
    }

    // ─── Submit ────────────────────────────────────────────────────────────

    /// Start a new submission, replacing the whole session outright.
    ///
    /// Returns `None` (a no-op) when the trimmed problem text is empty;
    /// disabling submission in that case is the caller's job. Otherwise the
    /// prior flowchart, cursor, completed set, choice map, and error are all
    /// cleared, the epoch is bumped so any in-flight fetch or queued advance
    /// is superseded, and the epoch for this submission is returned.
    pub fn begin_submit(&mut self, problem: &str) -> Option<Epoch> {
        let trimmed = problem.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.clear_session_fields();
        self.problem = Some(trimmed.to_owned());
        self.loading = true;
        self.epoch += 1;
        Some(Epoch(self.epoch))
    }

    /// Complete a submission started with [`Self::begin_submit`].
    ///
    /// Returns `false` and leaves the session untouched when `epoch` is
    /// stale: a later submit or reset owns the session now, and this
    /// response belongs to a session that no longer exists.
    pub fn finish_submit(
        &mut self,
        epoch: Epoch,
        result: Result<Flowchart, ApiError>,
    ) -> bool {
        if epoch.0 != self.epoch {
            tracing::debug!(stale = epoch.0, current = self.epoch, "dropping superseded response");
            return false;
        }

        self.loading = false;
        match result {
            Ok(flowchart) => {
                self.flowchart = Some(flowchart);
                self.current_index = 0;
                self.last_error = None;
                self.started_at = Some(self.clock.now());
            }
            Err(err) => {
                self.flowchart = None;
                self.problem = None;
                self.last_error = Some(err.to_string());
            }
        }
        true
    }

    // ─── Selection ─────────────────────────────────────────────────────────

    /// Select an option for the active step.
    ///
    /// The step id must match the active step exactly and the choice id must
    /// name one of its options; anything else is rejected without touching
    /// the cursor, completed set, or choice map. The choice is recorded
    /// whether or not it is correct, so a wrong pick stays reviewable.
    pub fn select_choice(&mut self, step_id: &StepId, choice_id: &OptionId) -> SelectOutcome {
        let Some(step) = self.current_step() else {
            return self.reject(SessionError::NotActive);
        };

        if step.id() != step_id {
            return self.reject(SessionError::InvalidStepReference {
                step_id: step_id.clone(),
            });
        }

        let Some(option) = step.option(choice_id) else {
            return self.reject(SessionError::InvalidChoiceReference {
                choice_id: choice_id.clone(),
            });
        };

        let option = option.clone();
        self.choices.insert(step_id.clone(), choice_id.clone());

        if option.is_correct() {
            self.show_success = true;
            self.last_error = None;
            self.completed.insert(step_id.clone());
            SelectOutcome::Correct {
                advance: AdvanceTicket {
                    epoch: Epoch(self.epoch),
                    from_index: self.current_index,
                },
            }
        } else {
            self.show_success = false;
            self.last_error = Some(incorrect_message(&option));
            SelectOutcome::Incorrect
        }
    }

    /// Apply a deferred cursor advance after the UI-feedback delay.
    ///
    /// Returns `false` when the ticket is stale: the session was reset or
    /// resubmitted, or this very ticket already advanced the cursor. On
    /// success the cursor moves forward exactly one position and the success
    /// flag and error are cleared.
    pub fn apply_advance(&mut self, ticket: AdvanceTicket) -> bool {
        if ticket.epoch.0 != self.epoch || ticket.from_index != self.current_index {
            return false;
        }
        let Some(flowchart) = &self.flowchart else {
            return false;
        };

        self.current_index += 1;
        self.show_success = false;
        self.last_error = None;
        if self.current_index >= flowchart.len() {
            self.completed_at = Some(self.clock.now());
        }
        true
    }

    // ─── Reset ─────────────────────────────────────────────────────────────

    /// Unconditionally return to `Idle`, clearing every session field.
    ///
    /// Bumps the epoch so in-flight fetches and queued advances issued for
    /// the old session are discarded when they land.
    pub fn reset(&mut self) {
        self.clear_session_fields();
        self.epoch += 1;
    }

    /// Clear the error message without altering any other field.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn clear_session_fields(&mut self) {
        self.problem = None;
        self.flowchart = None;
        self.current_index = 0;
        self.completed.clear();
        self.choices.clear();
        self.loading = false;
        self.last_error = None;
        self.show_success = false;
        self.started_at = None;
        self.completed_at = None;
    }

    fn reject(&mut self, err: SessionError) -> SelectOutcome {
        self.last_error = Some(err.to_string());
        SelectOutcome::Rejected(err)
    }

    // ─── Views ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            return SessionPhase::Loading;
        }
        let Some(flowchart) = &self.flowchart else {
            return SessionPhase::Idle;
        };

        let all_completed = flowchart
            .steps()
            .iter()
            .all(|step| self.completed.contains(step.id()));
        if self.current_index >= flowchart.len() && all_completed {
            SessionPhase::Completed
        } else {
            SessionPhase::Active
        }
    }

    #[must_use]
    pub fn problem(&self) -> Option<&str> {
        self.problem.as_deref()
    }

    #[must_use]
    pub fn flowchart(&self) -> Option<&Flowchart> {
        self.flowchart.as_ref()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.flowchart
            .as_ref()
            .and_then(|fc| fc.step(self.current_index))
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Transient flag driving the success animation between a correct pick
    /// and the deferred advance.
    #[must_use]
    pub fn show_success(&self) -> bool {
        self.show_success
    }

    #[must_use]
    pub fn completed_step_ids(&self) -> &HashSet<StepId> {
        &self.completed
    }

    /// The recorded choice for a step, correct or not.
    #[must_use]
    pub fn selected_choice(&self, step_id: &StepId) -> Option<&OptionId> {
        self.choices.get(step_id)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.flowchart.as_ref().map_or(0, Flowchart::len);
        SessionProgress::new(total, self.completed.len())
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("phase", &self.phase())
            .field("current_index", &self.current_index)
            .field("completed", &self.completed.len())
            .field("epoch", &self.epoch)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new(Clock::default())
    }
}

fn incorrect_message(option: &ChoiceOption) -> String {
    option
        .reason()
        .unwrap_or(DEFAULT_INCORRECT_MESSAGE)
        .to_owned()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use hinter_core::time::fixed_clock;
    use serde_json::json;

    fn two_step_flowchart() -> Flowchart {
        let value = json!({
            "steps": [
                {
                    "id": "s1",
                    "title": "Pick a traversal",
                    "description": "How do you walk the list?",
                    "options": [
                        {"id": "a", "label": "Iterate", "reason": "Walk with three pointers", "correct": true},
                        {"id": "b", "label": "Sort it", "reason": "Sorting loses the order", "correct": false}
                    ]
                },
                {
                    "id": "s2",
                    "title": "Fix the links",
                    "description": "What do you do per node?",
                    "options": [
                        {"id": "a", "label": "Point next backwards", "reason": "Exactly", "correct": true},
                        {"id": "b", "label": "Swap values", "reason": "Values are not the links", "correct": false}
                    ]
                }
            ]
        });
        Flowchart::from_value(&value).unwrap()
    }

    fn active_session() -> (SessionService, Epoch) {
        let mut session = SessionService::new(fixed_clock());
        let epoch = session.begin_submit("reverse a linked list").unwrap();
        assert!(session.finish_submit(epoch, Ok(two_step_flowchart())));
        (session, epoch)
    }

    fn advance(session: &mut SessionService, outcome: SelectOutcome) {
        match outcome {
            SelectOutcome::Correct { advance } => assert!(session.apply_advance(advance)),
            other => panic!("expected a correct pick, got {other:?}"),
        }
    }

    #[test]
    fn empty_problem_is_a_noop() {
        let mut session = SessionService::new(fixed_clock());
        assert!(session.begin_submit("   ").is_none());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn submit_transitions_through_loading_to_active() {
        let mut session = SessionService::new(fixed_clock());
        let epoch = session.begin_submit("reverse a linked list").unwrap();
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert!(session.is_loading());

        assert!(session.finish_submit(epoch, Ok(two_step_flowchart())));
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.problem(), Some("reverse a linked list"));
        assert!(session.started_at().is_some());
    }

    #[test]
    fn failed_submit_returns_to_idle_with_error() {
        let mut session = SessionService::new(fixed_clock());
        let epoch = session.begin_submit("p").unwrap();
        assert!(session.finish_submit(epoch, Err(ApiError::Timeout)));

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.flowchart().is_none());
        assert!(session.problem().is_none());
        assert!(session.last_error().unwrap().contains("timed out"));
    }

    #[test]
    fn correct_answers_in_order_complete_the_session() {
        let (mut session, _) = active_session();

        let outcome = session.select_choice(&"s1".into(), &"a".into());
        assert!(session.show_success());
        assert!(session.completed_step_ids().contains(&StepId::new("s1")));
        assert_eq!(session.current_index(), 0, "cursor moves only after the delay");
        advance(&mut session, outcome);
        assert_eq!(session.current_index(), 1);
        assert!(!session.show_success());

        let outcome = session.select_choice(&"s2".into(), &"a".into());
        advance(&mut session, outcome);

        assert_eq!(session.phase(), SessionPhase::Completed);
        assert_eq!(session.current_index(), 2);
        assert_eq!(session.completed_step_ids().len(), 2);
        assert!(session.completed_at().is_some());
    }

    #[test]
    fn incorrect_choice_keeps_step_active_and_reports_reason() {
        let (mut session, _) = active_session();

        let outcome = session.select_choice(&"s1".into(), &"b".into());
        assert_eq!(outcome, SelectOutcome::Incorrect);
        assert_eq!(session.last_error(), Some("Sorting loses the order"));
        assert_eq!(session.current_index(), 0);
        assert!(session.completed_step_ids().is_empty());
        assert!(!session.show_success());
        // The wrong pick stays reviewable.
        assert_eq!(
            session.selected_choice(&"s1".into()),
            Some(&OptionId::new("b"))
        );

        // The same step is still selectable.
        let outcome = session.select_choice(&"s1".into(), &"a".into());
        advance(&mut session, outcome);
        assert_eq!(session.current_index(), 1);
        assert_eq!(
            session.selected_choice(&"s1".into()),
            Some(&OptionId::new("a"))
        );
    }

    #[test]
    fn incorrect_choice_without_reason_uses_default_message() {
        let value = json!({
            "steps": [{
                "id": "s1",
                "title": "T",
                "options": [
                    {"id": "a", "label": "A", "correct": true},
                    {"id": "b", "label": "B", "correct": false}
                ]
            }]
        });
        let mut session = SessionService::new(fixed_clock());
        let epoch = session.begin_submit("p").unwrap();
        session.finish_submit(epoch, Ok(Flowchart::from_value(&value).unwrap()));

        session.select_choice(&"s1".into(), &"b".into());
        assert_eq!(session.last_error(), Some(DEFAULT_INCORRECT_MESSAGE));
    }

    #[test]
    fn stale_step_reference_is_a_noop() {
        let (mut session, _) = active_session();

        let outcome = session.select_choice(&"s2".into(), &"a".into());
        assert!(matches!(
            outcome,
            SelectOutcome::Rejected(SessionError::InvalidStepReference { .. })
        ));
        assert_eq!(session.current_index(), 0);
        assert!(session.completed_step_ids().is_empty());
        assert!(session.selected_choice(&"s2".into()).is_none());
        assert!(session.last_error().is_some());
    }

    #[test]
    fn unknown_choice_reference_is_a_noop() {
        let (mut session, _) = active_session();

        let outcome = session.select_choice(&"s1".into(), &"nope".into());
        assert!(matches!(
            outcome,
            SelectOutcome::Rejected(SessionError::InvalidChoiceReference { .. })
        ));
        assert_eq!(session.current_index(), 0);
        assert!(session.selected_choice(&"s1".into()).is_none());
    }

    #[test]
    fn select_without_flowchart_is_rejected() {
        let mut session = SessionService::new(fixed_clock());
        let outcome = session.select_choice(&"s1".into(), &"a".into());
        assert!(matches!(
            outcome,
            SelectOutcome::Rejected(SessionError::NotActive)
        ));
    }

    #[test]
    fn reset_returns_to_idle_from_any_state() {
        // Loading.
        let mut session = SessionService::new(fixed_clock());
        session.begin_submit("p").unwrap();
        session.reset();
        assert_eq!(session.phase(), SessionPhase::Idle);

        // Active with partial progress and a displayed error.
        let (mut session, _) = active_session();
        let outcome = session.select_choice(&"s1".into(), &"a".into());
        advance(&mut session, outcome);
        session.select_choice(&"s2".into(), &"b".into());
        session.reset();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.flowchart().is_none());
        assert_eq!(session.current_index(), 0);
        assert!(session.completed_step_ids().is_empty());
        assert!(session.selected_choice(&"s1".into()).is_none());
        assert!(session.last_error().is_none());
        assert!(session.problem().is_none());
        assert!(!session.show_success());
    }

    #[test]
    fn clear_error_touches_nothing_else() {
        let (mut session, _) = active_session();
        session.select_choice(&"s1".into(), &"b".into());
        assert!(session.last_error().is_some());

        session.clear_error();
        assert!(session.last_error().is_none());
        assert_eq!(session.current_index(), 0);
        assert_eq!(
            session.selected_choice(&"s1".into()),
            Some(&OptionId::new("b"))
        );
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn superseded_response_is_discarded() {
        let mut session = SessionService::new(fixed_clock());
        let first = session.begin_submit("first problem").unwrap();
        let second = session.begin_submit("second problem").unwrap();

        // The late first response must not be reflected.
        assert!(!session.finish_submit(first, Ok(two_step_flowchart())));
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert_eq!(session.problem(), Some("second problem"));

        assert!(session.finish_submit(second, Ok(two_step_flowchart())));
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn superseded_error_is_discarded_too() {
        let mut session = SessionService::new(fixed_clock());
        let first = session.begin_submit("first").unwrap();
        let second = session.begin_submit("second").unwrap();

        assert!(!session.finish_submit(first, Err(ApiError::Unreachable)));
        assert!(session.last_error().is_none());
        assert!(session.finish_submit(second, Ok(two_step_flowchart())));
    }

    #[test]
    fn queued_advance_does_not_apply_after_reset() {
        let (mut session, _) = active_session();
        let SelectOutcome::Correct { advance } = session.select_choice(&"s1".into(), &"a".into())
        else {
            panic!("expected correct pick");
        };

        session.reset();
        assert!(!session.apply_advance(advance));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn queued_advance_does_not_apply_after_resubmit() {
        let (mut session, _) = active_session();
        let SelectOutcome::Correct { advance } = session.select_choice(&"s1".into(), &"a".into())
        else {
            panic!("expected correct pick");
        };

        let epoch = session.begin_submit("another problem").unwrap();
        session.finish_submit(epoch, Ok(two_step_flowchart()));
        assert!(!session.apply_advance(advance));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn duplicate_ticket_never_skips_a_step() {
        let (mut session, _) = active_session();
        let SelectOutcome::Correct { advance } = session.select_choice(&"s1".into(), &"a".into())
        else {
            panic!("expected correct pick");
        };

        assert!(session.apply_advance(advance));
        assert!(!session.apply_advance(advance));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn reselecting_the_correct_option_before_the_advance_lands_is_safe() {
        let (mut session, _) = active_session();
        let first = session.select_choice(&"s1".into(), &"a".into());
        let second = session.select_choice(&"s1".into(), &"a".into());

        advance(&mut session, first);
        // The second ticket points at the old index and must be rejected.
        match second {
            SelectOutcome::Correct { advance } => assert!(!session.apply_advance(advance)),
            other => panic!("expected correct pick, got {other:?}"),
        }
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn progress_tracks_completed_share() {
        let (mut session, _) = active_session();
        assert_eq!(session.progress().percent, 0);

        let outcome = session.select_choice(&"s1".into(), &"a".into());
        advance(&mut session, outcome);
        let progress = session.progress();
        assert_eq!(progress.total, 2);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.percent, 50);
        assert!(!progress.is_complete);

        let outcome = session.select_choice(&"s2".into(), &"a".into());
        advance(&mut session, outcome);
        assert!(session.progress().is_complete);
        assert_eq!(session.progress().percent, 100);
    }

    #[test]
    fn resubmit_replaces_the_session_outright() {
        let (mut session, _) = active_session();
        let outcome = session.select_choice(&"s1".into(), &"a".into());
        advance(&mut session, outcome);

        let epoch = session.begin_submit("new problem").unwrap();
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert!(session.completed_step_ids().is_empty());
        assert!(session.selected_choice(&"s1".into()).is_none());

        session.finish_submit(epoch, Ok(two_step_flowchart()));
        assert_eq!(session.current_index(), 0);
    }
}
