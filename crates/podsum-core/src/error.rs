//! Error types for podsum
//!
//! This module defines the error kinds used throughout the recomputation
//! engine. All errors are derived from `thiserror` for convenient error
//! handling and automatic `From` implementations.
//!
//! # Example
//!
//! ```
//! use podsum_core::error::{EngineError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to EngineError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Main error type for podsum operations.
///
/// The variants map one-to-one onto the error kinds and policy table of
/// the recomputation engine: `InvalidInput`/`MissingInput`/`CorruptInput`
/// fail fast or fail the unit, `TransientStorage` is only ever raised
/// after retries are exhausted, and `DurableStorage` propagates
/// immediately.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad UUID, month, phase token, or unsupported `numParts`.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced daily blob key was not found.
    #[error("missing input: {key}")]
    MissingInput {
        /// The blob key that was expected but absent.
        key: String,
    },

    /// A TSV row was missing `time`, or a summary blob failed its shape check.
    #[error("corrupt input: {0}")]
    CorruptInput(String),

    /// The blob adapter flagged the fault as retryable and retries were exhausted.
    #[error("transient storage error: {0}")]
    TransientStorage(String),

    /// The blob adapter flagged the fault as non-retryable.
    #[error("durable storage error: {0}")]
    DurableStorage(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results in podsum.
pub type Result<T> = std::result::Result<T, EngineError>;
