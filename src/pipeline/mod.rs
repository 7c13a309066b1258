pub mod analysis;
pub mod animation;
pub mod extract;
pub mod journal;
pub mod orchestrator;
pub mod policy;
pub mod system_design;
pub mod types;

pub use orchestrator::{Pipeline, Workflow};
pub use types::{GenerationRequest, PipelineResult, ProgressEvent, RenderOutcome, Stage};
