//! # rapor-core
//!
//! Core data structures for the rapor-sheets report-card system.
//!
//! This crate provides the fundamental types used throughout rapor-sheets:
//! - [`GridCell`] and [`RaporTemplate`] - the template cell matrix and its
//!   structural operations (merging, borders, row/column growth)
//! - [`SystemKey`] - the closed vocabulary of `$`-prefixed substitution tokens
//! - [`RaporRecord`] and [`RecordStore`] - collected results and the storage
//!   seam they are merged into
//!
//! ## Example
//!
//! ```rust
//! use rapor_core::{CellKind, RaporTemplate};
//!
//! let mut template = RaporTemplate::new("t1", "Rapor Tahfidz", 3, 4);
//! template.merge_cells(&[(0, 0), (0, 3)]).unwrap();
//! assert_eq!(template.cell(0, 0).unwrap().col_span, 4);
//!
//! let cell = template.cell_mut(2, 1).unwrap();
//! cell.kind = CellKind::Input;
//! cell.key = "NILAI_TAHFIDZ".into();
//! template.validate_keys().unwrap();
//! ```

pub mod cell;
pub mod error;
pub mod record;
pub mod sheet_import;
pub mod syskey;
pub mod template;

// Re-exports for convenience
pub use cell::{Align, Borders, CellKind, GridCell};
pub use error::{Error, Result};
pub use record::{
    MemoryStore, RaporRecord, RecordKey, RecordStore, RombelRef, Semester, SubjectScore,
};
pub use sheet_import::{import_from_sheet, MergeRange};
pub use syskey::SystemKey;
pub use template::{BorderEdge, BorderTarget, RaporTemplate};

/// Maximum number of rows accepted from a spreadsheet import
pub const MAX_IMPORT_ROWS: usize = 100;

/// Maximum number of columns accepted from a spreadsheet import
pub const MAX_IMPORT_COLS: usize = 30;
