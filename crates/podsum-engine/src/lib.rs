//! The show-summary recomputation engine: the daily computer, monthly
//! aggregator, audience reducer, and the phase coordinator tying them
//! together.

pub mod accumulator;
pub mod audience;
pub mod coordinator;
pub mod daily;
pub mod keys;
pub mod monthly;
pub mod tsv;

pub use coordinator::{run_job, JobOutcome};
