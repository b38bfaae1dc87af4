//! Subscription search orchestration.
//!
//! Wires the discovery → dedup → filter → group → match → select flow and
//! exposes the queue retry entry points.

mod runner;
mod types;

pub use runner::SearchPipeline;
pub use types::{
    PipelineError, SearchReport, SelectedRelease, SubscriptionSearchRequest, TermError,
};
