//! Column metadata error types.

use thiserror::Error;

/// Errors raised while assembling result-set column metadata.
///
/// Both variants indicate that the metadata tracking has lost
/// synchronization with the wire stream, so they are fatal for the current
/// statement rather than recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    /// Two column sets describing the same result set disagree on the
    /// number of columns.
    #[error("mismatch in number of columns: {left} vs {right}")]
    ColumnCountMismatch {
        /// Column count of the receiving set.
        left: usize,
        /// Column count of the incoming set.
        right: usize,
    },

    /// Both sides of a merge carry a known value for the same field.
    ///
    /// Metadata fragments are expected to describe disjoint subsets of
    /// fields, so an overlap signals a protocol-tracking bug.
    #[error("conflicting data for column {column} field {field}")]
    ConflictingColumnData {
        /// 1-based column number.
        column: usize,
        /// Name of the conflicting field.
        field: &'static str,
    },
}
