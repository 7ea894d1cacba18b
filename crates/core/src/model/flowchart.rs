use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::ids::{OptionId, StepId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FlowchartError {
    #[error("invalid flowchart: expected an object with a steps array")]
    InvalidShape,

    #[error("invalid step at index {index}: missing or invalid id/title")]
    InvalidStep { index: usize },

    #[error("invalid step at index {index}: options must be a non-empty array")]
    InvalidOptions { index: usize },

    #[error("invalid option at step {step}, option {option}")]
    InvalidOption { step: usize, option: usize },

    #[error("invalid step at index {index}: must have at least one correct option")]
    MissingCorrectOption { index: usize },
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One selectable answer within a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    id: OptionId,
    label: String,
    reason: Option<String>,
    correct: bool,
}

impl ChoiceOption {
    #[must_use]
    pub fn id(&self) -> &OptionId {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Explanation shown once this option is selected, when the service provided one.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// One decision node in the sequence presented to the user.
///
/// Invariant: `options` is non-empty and contains at least one correct option.
/// Both are enforced by [`Flowchart::from_value`], the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    id: StepId,
    title: String,
    description: String,
    options: Vec<ChoiceOption>,
}

impl Step {
    #[must_use]
    pub fn id(&self) -> &StepId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn options(&self) -> &[ChoiceOption] {
        &self.options
    }

    /// Looks up an option of this step by id.
    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&ChoiceOption> {
        self.options.iter().find(|opt| opt.id() == id)
    }
}

//
// ─── FLOWCHART ─────────────────────────────────────────────────────────────────
//

/// The full generated artifact: an ordered sequence of steps.
///
/// Step order is meaningful: it is the required traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flowchart {
    steps: Vec<Step>,
    warning: Option<String>,
}

impl Flowchart {
    /// Validates a decoded generation response and builds a well-formed flowchart.
    ///
    /// Checks run in a fixed order so failures are deterministic: the shape of
    /// the `steps` array first, then each step's `id`/`title`, then its
    /// `options` array, then each option's fields, and finally that the step
    /// carries at least one correct option. The first violation wins.
    ///
    /// # Errors
    ///
    /// Returns the first `FlowchartError` encountered, carrying the offending
    /// step (and option) index.
    pub fn from_value(value: &Value) -> Result<Self, FlowchartError> {
        let Some(raw_steps) = value.as_object().and_then(|obj| obj.get("steps")) else {
            return Err(FlowchartError::InvalidShape);
        };
        let Some(raw_steps) = raw_steps.as_array() else {
            return Err(FlowchartError::InvalidShape);
        };

        let mut steps = Vec::with_capacity(raw_steps.len());
        for (index, raw_step) in raw_steps.iter().enumerate() {
            steps.push(parse_step(raw_step, index)?);
        }

        let warning = value
            .get("warning")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self { steps, warning })
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Advisory message attached by the generation service, non-fatal.
    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Total number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn parse_step(raw: &Value, index: usize) -> Result<Step, FlowchartError> {
    let id = non_empty_str(raw.get("id")).ok_or(FlowchartError::InvalidStep { index })?;
    let title = non_empty_str(raw.get("title")).ok_or(FlowchartError::InvalidStep { index })?;

    let options = raw
        .get("options")
        .and_then(Value::as_array)
        .filter(|opts| !opts.is_empty())
        .ok_or(FlowchartError::InvalidOptions { index })?;

    let mut parsed = Vec::with_capacity(options.len());
    for (opt_index, raw_option) in options.iter().enumerate() {
        parsed.push(parse_option(raw_option, index, opt_index)?);
    }

    if !parsed.iter().any(ChoiceOption::is_correct) {
        return Err(FlowchartError::MissingCorrectOption { index });
    }

    // The original contract never requires a description; default to empty.
    let description = raw
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    Ok(Step {
        id: StepId::new(id),
        title: title.to_owned(),
        description,
        options: parsed,
    })
}

fn parse_option(raw: &Value, step: usize, option: usize) -> Result<ChoiceOption, FlowchartError> {
    let invalid = FlowchartError::InvalidOption { step, option };

    let id = non_empty_str(raw.get("id")).ok_or(invalid.clone())?;
    let label = non_empty_str(raw.get("label")).ok_or(invalid.clone())?;
    // `correct` must be strictly boolean; truthy strings are rejected.
    let correct = raw.get("correct").and_then(Value::as_bool).ok_or(invalid)?;

    let reason = raw
        .get("reason")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    Ok(ChoiceOption {
        id: OptionId::new(id),
        label: label.to_owned(),
        reason,
        correct,
    })
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
