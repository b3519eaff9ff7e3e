//! Error types for the chart engine.
//!
//! Loading and saving failures are [`ChartError`]. Rejected edits are
//! [`EditError`]; a rejected edit never touches the chart or the undo
//! history.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MIDI error: {0}")]
    Midi(#[from] midly::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("File not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ChartError>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    /// The cell lies outside the chart grid.
    #[error("cell ({row}, {lane}) is outside the chart")]
    OutOfBounds { row: usize, lane: usize },

    /// Move requested from a cell that holds no note.
    #[error("no note at ({row}, {lane})")]
    EmptySource { row: usize, lane: usize },

    /// Notes may only be dragged sideways within their own row.
    #[error("notes move within a row only (row {from} to row {to})")]
    CrossRowMove { from: usize, to: usize },

    #[error("clipboard is empty")]
    EmptyClipboard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_error_messages() {
        let err = EditError::CrossRowMove { from: 5, to: 7 };
        assert_eq!(err.to_string(), "notes move within a row only (row 5 to row 7)");
        assert_eq!(EditError::EmptyClipboard.to_string(), "clipboard is empty");
    }

    #[test]
    fn test_not_found_message() {
        let err = ChartError::NotFound(PathBuf::from("input.mid"));
        assert_eq!(err.to_string(), "File not found: input.mid");
    }
}
