//! Error types for rapor-formula

use thiserror::Error;

/// Result type alias using [`FormulaError`]
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors from formula parsing, compilation and evaluation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// Formula text could not be parsed
    #[error("Formula parse error: {0}")]
    Parse(String),

    /// Formula compiled but could not be evaluated
    #[error("Formula evaluation error: {0}")]
    Evaluation(String),

    /// RANK used with something other than a `$KEY` source
    #[error("RANK requires a $KEY reference as its first argument")]
    BadRankSource,
}
