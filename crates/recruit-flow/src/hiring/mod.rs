//! Hiring workflow domain: stages and workflows, phases, custom fields and their per-stage
//! visibility, transition rules, candidates, and stage change events.

pub mod applications;
pub mod assignments;
pub mod candidates;
pub mod events;
pub mod fields;
pub mod ids;
pub mod memory;
pub mod phases;
pub mod positions;
pub mod stages;
pub mod transitions;
pub mod visibility;

pub use applications::{hiring_router, ErrorKind, HiringError, HiringPipelineService};
pub use events::{ApplicationStageChangedEvent, BroadcastStageEventPublisher, StageEventPublisher};
pub use memory::InMemoryHiringStore;
