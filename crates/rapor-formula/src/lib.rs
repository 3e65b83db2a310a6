//! # rapor-formula
//!
//! Formula compiler and evaluation engine for rapor-sheets templates.
//!
//! A formula cell holds an expression over `$KEY` references into the same
//! student's row. Compilation produces row-scoped expressions, except that
//! `RANK(...)` calls are extracted into separate ranking declarations and
//! evaluated in a cohort-wide second pass (see [`engine`]).
//!
//! ## Example
//!
//! ```rust
//! use rapor_formula::{evaluate, parse_formula, FieldValue};
//! use ahash::AHashMap;
//!
//! let expr = parse_formula("=AVERAGE($UTS, $UAS)").unwrap();
//! let mut fields = AHashMap::new();
//! fields.insert("UTS".to_string(), "80".to_string());
//! fields.insert("UAS".to_string(), "abc".to_string());
//! // Non-numeric arguments are excluded, not coerced to zero
//! assert_eq!(evaluate(&expr, &fields).unwrap(), FieldValue::Number(80.0));
//! ```

pub mod ast;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod eval;
pub mod parser;
pub mod value;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use compiler::{compile_cell, compile_template, CompiledCell, CompiledTemplate, RankSpec, RowFormula};
pub use engine::{CohortRow, Engine};
pub use error::{FormulaError, FormulaResult};
pub use eval::evaluate;
pub use parser::parse_formula;
pub use value::FieldValue;
