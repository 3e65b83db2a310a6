//! Template compilation
//!
//! Translates every formula cell of a template into either a row-scoped
//! compiled expression or, when the cell calls `RANK`, a ranking declaration
//! evaluated by the cohort-wide pass instead. The compiled form serializes to
//! JSON and is the contract shared with the generated document's embedded
//! runtime.

use log::debug;
use serde::{Deserialize, Serialize};

use rapor_core::{CellKind, RaporTemplate};

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::parser::parse_formula;

/// A row-scoped compiled formula writing into `key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFormula {
    pub key: String,
    pub expr: Expr,
}

/// A cohort-wide ranking declaration extracted from a `RANK` call.
///
/// `limit == 0` means unlimited; otherwise ranks beyond the limit are written
/// as blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSpec {
    pub target_key: String,
    pub source_key: String,
    #[serde(default)]
    pub limit: u32,
}

/// Result of compiling one formula cell
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledCell {
    Row(RowFormula),
    Ranking(RankSpec),
}

/// A fully compiled template: the per-row formula set plus the ranking
/// declarations removed from it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTemplate {
    pub row_formulas: Vec<RowFormula>,
    pub rankings: Vec<RankSpec>,
}

/// Compile one formula cell.
///
/// A `RANK($SRC[, limit])` call anywhere in the formula turns the whole cell
/// into a ranking declaration; the cell's own key names the rank target,
/// falling back to an auto-generated identifier when absent (`auto_seq`
/// supplies the sequence number).
pub fn compile_cell(key: &str, text: &str, auto_seq: &mut usize) -> FormulaResult<CompiledCell> {
    let expr = parse_formula(text)?;

    if let Some(Expr::Call { args, .. }) = expr.find_call("RANK") {
        let source_key = match args.first() {
            Some(Expr::Field { key }) => key.clone(),
            _ => return Err(FormulaError::BadRankSource),
        };
        let limit = match args.get(1) {
            None => 0,
            Some(Expr::Number { value }) if *value >= 0.0 => *value as u32,
            Some(_) => {
                return Err(FormulaError::Parse(
                    "RANK limit must be a non-negative number literal".into(),
                ))
            }
        };
        let target_key = if key.is_empty() {
            *auto_seq += 1;
            format!("PERINGKAT_{}", auto_seq)
        } else {
            key.to_string()
        };
        return Ok(CompiledCell::Ranking(RankSpec {
            target_key,
            source_key,
            limit,
        }));
    }

    let key = if key.is_empty() {
        *auto_seq += 1;
        format!("FORMULA_{}", auto_seq)
    } else {
        key.to_string()
    };
    Ok(CompiledCell::Row(RowFormula { key, expr }))
}

/// Compile every non-hidden formula cell of a template
pub fn compile_template(template: &RaporTemplate) -> FormulaResult<CompiledTemplate> {
    let mut compiled = CompiledTemplate::default();
    let mut auto_seq = 0usize;

    for cell in template.iter_cells() {
        if cell.hidden || cell.kind != CellKind::Formula || cell.value.trim().is_empty() {
            continue;
        }
        match compile_cell(&cell.key, &cell.value, &mut auto_seq)? {
            CompiledCell::Row(f) => compiled.row_formulas.push(f),
            CompiledCell::Ranking(r) => compiled.rankings.push(r),
        }
    }

    debug!(
        "compiled template '{}': {} row formulas, {} rankings",
        template.name,
        compiled.row_formulas.len(),
        compiled.rankings.len()
    );
    Ok(compiled)
}
