#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod error;
pub mod sessions;
pub mod step_links;

pub use hinter_core::Clock;

pub use api::{
    ApiConfig, Approach, GenerationOptions, GuidanceApi, GuidanceClient, StepLinksRequest,
    StepLinksResponse,
};
pub use app_services::AppServices;
pub use error::{ApiError, SessionError};
pub use sessions::{
    SelectOutcome, SessionPhase, SessionProgress, SessionService, SessionSnapshot, SessionWorkflow,
};
pub use step_links::StepLinksService;
