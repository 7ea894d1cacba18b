//! Shared error types for the services crate.

use thiserror::Error;

use hinter_core::model::{FlowchartError, OptionId, StepId};

/// Errors emitted by the guidance API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("request timed out; the server took too long to respond")]
    Timeout,

    #[error("unable to connect to the server")]
    Unreachable,

    #[error("request failed with status {status}: {detail}")]
    Http {
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("response body was not valid JSON")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] FlowchartError),

    #[error(transparent)]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unreachable
        } else {
            Self::Transport(err)
        }
    }
}

/// Caller-misuse errors reported by the session state machine.
///
/// These never escape the session boundary; they are folded into the
/// session's last-error message for the UI to render and dismiss.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no flowchart is active")]
    NotActive,

    #[error("selection does not match the active step: {step_id}")]
    InvalidStepReference { step_id: StepId },

    #[error("no such option in the active step: {choice_id}")]
    InvalidChoiceReference { choice_id: OptionId },
}
