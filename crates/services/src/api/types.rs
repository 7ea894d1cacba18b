use serde::{Deserialize, Serialize};

use hinter_core::model::StepLink;

/// Which solution style the generation service should lay out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    Naive,
    Optimized,
    Both,
}

/// App-specific knobs forwarded alongside the problem text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approach: Option<Approach>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl GenerationOptions {
    #[must_use]
    pub fn approach(approach: Approach) -> Self {
        Self {
            approach: Some(approach),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn difficulty(difficulty: impl Into<String>) -> Self {
        Self {
            difficulty: Some(difficulty.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FlowchartRequest<'a> {
    pub problem: &'a str,
    #[serde(flatten)]
    pub options: &'a GenerationOptions,
}

/// Request body for the per-step resource lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepLinksRequest {
    pub problem: String,
    pub step_title: String,
    pub step_description: String,
}

/// Response body for the per-step resource lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StepLinksResponse {
    #[serde(default)]
    pub links: Vec<StepLink>,
    #[serde(default)]
    pub warning: Option<String>,
}

/// Error payload shape used by the service on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_detail(self) -> Option<String> {
        self.detail.or(self.message)
    }
}
