mod flowchart;
mod ids;
mod links;

pub use flowchart::{ChoiceOption, Flowchart, FlowchartError, Step};
pub use ids::{OptionId, StepId};
pub use links::StepLink;
