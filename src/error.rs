//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::fmt::Debug;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache stores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The record source has no record for this id
    #[error("record id: {0} not found")]
    RecordNotFound(String),

    /// `get` re-entered for an id whose creator is still running
    #[error("circular construction of id: {0}")]
    CircularConstruction(String),
}

impl CacheError {
    pub fn record_not_found(id: &impl Debug) -> Self {
        CacheError::RecordNotFound(format!("{id:?}"))
    }

    pub fn circular_construction(id: &impl Debug) -> Self {
        CacheError::CircularConstruction(format!("{id:?}"))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
