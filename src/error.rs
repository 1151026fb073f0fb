//! Error types for trailmark.
//!
//! Every failure in this crate is local and recoverable: invalid input is
//! rejected or excluded, stale cluster ids are reported so the caller can
//! re-query the viewport, and nothing here is fatal to the process.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TrailmarkError>;

/// Errors produced by the clustering engine.
#[derive(Debug, Error)]
pub enum TrailmarkError {
    /// Input that cannot be accepted as-is: invalid configuration values,
    /// malformed composite ids, non-finite viewport bounds.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A children/leaves/expansion query named a cluster id that does not
    /// exist in the index it was issued against. Issued cluster ids go
    /// stale after a rebuild; the caller should re-query the viewport.
    #[error("cluster id {id} not found in this index")]
    ClusterNotFound { id: usize },

    /// A registry-level query named a group with no index.
    #[error("no index for group '{0}'")]
    GroupNotFound(String),
}
