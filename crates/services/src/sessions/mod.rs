mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{AdvanceTicket, Epoch, SelectOutcome, SessionPhase, SessionService};
pub use workflow::{FEEDBACK_DELAY, SessionSnapshot, SessionWorkflow};
