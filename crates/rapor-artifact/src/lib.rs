//! # rapor-artifact
//!
//! Renders a template plus a target cohort into a single self-contained
//! interactive HTML document. The document carries its own frozen copy of
//! the evaluation engine (a JavaScript interpreter over the same serialized
//! expression ASTs the host engine executes), so filled-in formula and rank
//! cells recompute on every edit with no network connectivity.
//!
//! Cohort-level system keys are substituted once at generation time;
//! student-level keys are resolved independently per student so a document
//! spanning multiple class-groups renders correctly.

pub mod cohort;
pub mod error;
pub mod render;
pub mod runtime;
pub mod substitute;

pub use cohort::{Cohort, CohortScope, Student};
pub use error::{ArtifactError, Result};
pub use render::{generate, effective_defs};
pub use substitute::DocumentContext;

/// `meta.rombelId` value marking a whole-tier document whose submissions
/// need per-student class-group resolution on import
pub const ALL_ROMBEL_ID: i64 = 0;
