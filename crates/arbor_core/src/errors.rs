//! Error Types
//!
//! This module defines the error types shared by every Arbor crate.
//!
//! # Overview
//!
//! [`ArborError`] only covers *contract violations* and backend failures.
//! Timing races (updating or removing an id that teardown already removed)
//! are not errors at all: those operations are silent no-ops and report
//! their outcome through `Option`/`bool` return values instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use arbor_core::errors::{ArborError, Result};
//!
//! fn register() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::id::ObjectId;

/// The main error type for Arbor.
///
/// Every variant is recoverable: the operation that produced it was
/// rejected and the prior state was preserved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArborError {
    // ========================================================================
    // Registry contract violations
    // ========================================================================
    /// An object with this id is already registered and attached.
    #[error("Object '{0}' is already registered")]
    DuplicateId(ObjectId),

    /// A structural parameter fixed at assembly time was changed afterwards.
    #[error("Parameter '{parameter}' of object '{id}' is immutable after assembly")]
    ImmutableParameter {
        /// Object whose parameter was targeted
        id: ObjectId,
        /// Name of the parameter
        parameter: &'static str,
    },

    // ========================================================================
    // Render loop contract violations
    // ========================================================================
    /// A keyed update callback with this id is already registered.
    #[error("An update callback keyed '{0}' is already registered")]
    DuplicateCallback(ObjectId),

    // ========================================================================
    // Backend failures
    // ========================================================================
    /// The render backend failed to release a GPU-side resource.
    #[error("Failed to dispose {resource}: {reason}")]
    Dispose {
        /// Human readable resource label
        resource: String,
        /// Backend supplied reason
        reason: String,
    },
}

impl ArborError {
    /// Convenience constructor for backend disposal failures.
    pub fn dispose(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Dispose {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, ArborError>`.
pub type Result<T> = std::result::Result<T, ArborError>;
