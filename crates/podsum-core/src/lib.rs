//! Core types, error handling, and job-request parsing for podsum.
//!
//! This crate has no I/O of its own; it is the shared vocabulary between
//! `podsum-store` (the blob adapter) and `podsum-engine` (the
//! recomputation pipeline).

pub mod error;
pub mod request;
pub mod types;

pub use error::{EngineError, Result};
pub use types::{
    parse_show_uuid, AudiencePart, AudienceSummary, EpisodeSummary, OverallEpisode,
    OverallSummary, Period, ShowSummary,
};
