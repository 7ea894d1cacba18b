use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use hinter_core::model::{Step, StepId, StepLink};

use crate::api::{GuidanceApi, StepLinksRequest};

/// Best-effort lookup of supplementary resources for completed steps.
///
/// Decoupled from the session state machine: a failed lookup is logged and
/// yields an empty list, it never touches session state. Results are cached
/// per step id so each step is fetched at most once per problem.
pub struct StepLinksService {
    api: Arc<dyn GuidanceApi>,
    cache: Mutex<HashMap<StepId, Vec<StepLink>>>,
}

impl StepLinksService {
    #[must_use]
    pub fn new(api: Arc<dyn GuidanceApi>) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch (or replay) the resource links for one step.
    ///
    /// Links whose URLs do not parse are dropped; model output is not to be
    /// trusted with hrefs.
    pub async fn links_for_step(&self, problem: &str, step: &Step) -> Vec<StepLink> {
        if let Some(hit) = self.cache.lock().await.get(step.id()) {
            return hit.clone();
        }

        let request = StepLinksRequest {
            problem: problem.to_owned(),
            step_title: step.title().to_owned(),
            step_description: step.description().to_owned(),
        };

        match self.api.step_links(&request).await {
            Ok(response) => {
                if let Some(warning) = &response.warning {
                    tracing::debug!(step = %step.id(), warning = %warning, "step link lookup warned");
                }
                let links: Vec<StepLink> = response
                    .links
                    .into_iter()
                    .filter(StepLink::has_valid_url)
                    .collect();
                self.cache
                    .lock()
                    .await
                    .insert(step.id().clone(), links.clone());
                links
            }
            Err(err) => {
                tracing::warn!(step = %step.id(), error = %err, "step link lookup failed; continuing without links");
                Vec::new()
            }
        }
    }

    /// Drop cached links, e.g. when a new problem is submitted.
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
