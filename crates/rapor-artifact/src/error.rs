//! Error types for rapor-artifact

use thiserror::Error;

/// Result type alias using [`ArtifactError`]
pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Errors that can occur while generating a document
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Template is structurally invalid
    #[error(transparent)]
    Template(#[from] rapor_core::Error),

    /// A formula cell failed to compile
    #[error(transparent)]
    Formula(#[from] rapor_formula::FormulaError),

    /// No column declares a data/input/formula/dropdown cell, so there is no
    /// per-student band to repeat
    #[error("Template has no per-student band: no column declares a typed cell")]
    NoStudentBand,

    /// Compiled template could not be serialized for embedding
    #[error("Failed to embed compiled template: {0}")]
    Embed(#[from] serde_json::Error),
}
