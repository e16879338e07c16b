//! Error types for the z/Architecture reconstruction core.
//!
//! Only conditions that abort the pipeline before any result tree can be
//! produced are represented here. Non-fatal conditions (decode misses,
//! classification ambiguity, unresolved branches, orphan procedures) are
//! recorded as data on the result tree instead, per the error taxonomy in
//! the specification.

use thiserror::Error;

/// Errors that can abort analysis before a result tree is produced.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The input file could not be read.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    /// The configuration failed validation (e.g. thresholds out of range).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An internal invariant was violated; indicates a bug in the pipeline
    /// rather than a property of the input.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Result type alias used throughout the core.
pub type Result<T> = std::result::Result<T, AnalysisError>;
