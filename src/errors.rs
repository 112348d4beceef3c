//! Unified error type for the fundraiser crate.
//!
//! Every fallible operation returns [`Result`]. The donation aggregator itself never
//! fails; errors only come from persistence, permissions, validation and the fetch
//! boundary.

use sea_orm::DbErr;
use thiserror::Error;

/// All errors surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings or environment could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// An amount that is zero, negative or not a finite number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Input that failed a field-level check
    #[error("Validation error: {message}")]
    Validation {
        /// Which check failed
        message: String,
    },

    /// No donation request exists with this id
    #[error("Donation request not found: {id}")]
    RequestNotFound {
        /// Requested id
        id: i64,
    },

    /// No user exists with this id
    #[error("User not found: {id}")]
    UserNotFound {
        /// Requested id
        id: i64,
    },

    /// The request exists but is not accepting donations
    #[error("Donation request {id} is not open for donations (status: {status})")]
    RequestNotOpen {
        /// Request id
        id: i64,
        /// Current verification status
        status: String,
    },

    /// A verification status change the state machine does not allow
    #[error("Invalid status transition for request {id}: {from} -> {to}")]
    InvalidTransition {
        /// Request id
        id: i64,
        /// Current status
        from: String,
        /// Attempted status
        to: String,
    },

    /// The session's role does not permit the operation
    #[error("Permission denied: {reason}")]
    PermissionDenied {
        /// Why access was refused
        reason: String,
    },

    /// A boundary fetch did not finish in time
    #[error("Fetch timed out after {millis}ms")]
    Timeout {
        /// Configured timeout
        millis: u64,
    },
}

impl Error {
    /// Whether retrying the failed operation could succeed.
    ///
    /// Connection failures, pool exhaustion and timeouts are transient; everything
    /// else (validation, permissions, missing rows, query errors) is permanent.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) | Self::Timeout { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
