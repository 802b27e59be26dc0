//! Error types raised while ranking stores.
#![forbid(unsafe_code)]

use pazar_core::RepositoryError;
use thiserror::Error;

/// Errors raised by [`RankingEngine`](crate::RankingEngine).
///
/// Data-quality problems never surface here: unknown terms, empty shelves
/// and unusable coordinates degrade to penalties instead.
#[derive(Debug, Error)]
pub enum RankingError {
    /// Reading from the repository failed.
    #[error("failed to read {operation} for ranking")]
    Query {
        /// Description of the failed read.
        operation: &'static str,
        /// Source error from the repository.
        #[source]
        source: RepositoryError,
    },
    /// A ranking setting was negative or not finite.
    #[error("ranking setting {field} must be a finite, non-negative number (got {value})")]
    InvalidConfig {
        /// Name of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
}
