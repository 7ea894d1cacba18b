use serde::{Deserialize, Serialize};
use url::Url;

/// A supplementary learning resource suggested for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLink {
    pub title: String,
    pub url: String,
    pub summary: String,
}

impl StepLink {
    /// True when `url` parses as an absolute URL. Links are model-generated,
    /// so consumers filter out the ones that do not.
    #[must_use]
    pub fn has_valid_url(&self) -> bool {
        Url::parse(&self.url).is_ok()
    }
}
