//! Error types for rapor-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rapor-core
#[derive(Debug, Error)]
pub enum Error {
    /// Cell position outside the template grid
    #[error("Cell ({0}, {1}) out of bounds (grid is {2}x{3})")]
    CellOutOfBounds(usize, usize, usize, usize),

    /// Merge requires at least two selected cells
    #[error("Merge requires at least 2 selected cells, got {0}")]
    SelectionTooSmall(usize),

    /// Merge rectangle intersects an existing merge region
    #[error("Merge region {0} overlaps an existing merged region")]
    MergeConflict(String),

    /// Duplicate field keys found at save time
    #[error("Duplicate field keys: {}", .0.join(", "))]
    DuplicateKeys(Vec<String>),

    /// A fillable cell is missing its field key
    #[error("Cell ({0}, {1}) is a {2} cell but has no key")]
    MissingKey(usize, usize, &'static str),

    /// Spreadsheet import exceeds the accepted bounds
    #[error("Sheet too large: {rows}x{cols} exceeds {max_rows}x{max_cols}")]
    SheetTooLarge {
        rows: usize,
        cols: usize,
        max_rows: usize,
        max_cols: usize,
    },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
