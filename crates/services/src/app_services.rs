use std::sync::Arc;

use hinter_core::Clock;

use crate::api::{ApiConfig, GuidanceApi, GuidanceClient};
use crate::sessions::SessionWorkflow;
use crate::step_links::StepLinksService;

/// Assembles app-facing services around one shared API client.
#[derive(Clone)]
pub struct AppServices {
    client: Arc<GuidanceClient>,
    workflow: Arc<SessionWorkflow>,
    step_links: Arc<StepLinksService>,
}

impl AppServices {
    #[must_use]
    pub fn new(config: ApiConfig, clock: Clock) -> Self {
        let client = Arc::new(GuidanceClient::new(config));
        let api: Arc<dyn GuidanceApi> = Arc::clone(&client) as Arc<dyn GuidanceApi>;

        let workflow = Arc::new(SessionWorkflow::new(Arc::clone(&api), clock));
        let step_links = Arc::new(StepLinksService::new(api));

        Self {
            client,
            workflow,
            step_links,
        }
    }

    /// Build services against the endpoint named by `HINTER_API_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env(), Clock::default())
    }

    #[must_use]
    pub fn client(&self) -> Arc<GuidanceClient> {
        Arc::clone(&self.client)
    }

    #[must_use]
    pub fn workflow(&self) -> Arc<SessionWorkflow> {
        Arc::clone(&self.workflow)
    }

    #[must_use]
    pub fn step_links(&self) -> Arc<StepLinksService> {
        Arc::clone(&self.step_links)
    }
}
