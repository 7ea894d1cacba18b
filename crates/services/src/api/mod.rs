mod client;
mod types;

pub use client::{ApiConfig, DEFAULT_TIMEOUT, GuidanceApi, GuidanceClient};
pub use types::{Approach, GenerationOptions, StepLinksRequest, StepLinksResponse};
