//! Error types for recipe-miner-core.
//!
//! Two failure classes exist in the core:
//!
//! - [`CoreError::InvalidOperation`]: caller misuse of an API contract, e.g.
//!   asking a leaf-only recipe for its next cluster or popping an empty
//!   [`BoundedTopK`](crate::mining::BoundedTopK). Fail fast, never recovered
//!   silently.
//! - [`CoreError::Construction`]: malformed input detected eagerly at the
//!   point of construction or mutation, e.g. an empty cluster list or a
//!   duplicate identity pushed into a top-k structure.
//!
//! An infeasible solve is *not* an error. It is an expected outcome during
//! search and is represented as a [`Score`](crate::solve::Score) with
//! `solved == false`. Cancellation is a clean early-termination path, also
//! not an error.

use thiserror::Error;

/// Unified error type for the mining core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A programming-contract violation by the caller.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Malformed input rejected at construction time.
    #[error("construction error: {0}")]
    Construction(String),
}

impl CoreError {
    /// Create an [`CoreError::InvalidOperation`] from any message.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a [`CoreError::Construction`] from any message.
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
