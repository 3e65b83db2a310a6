//! Two-pass evaluation engine
//!
//! Ordinary formulas are row-local; rank is a fan-in over the whole cohort.
//! Keeping them as two explicit passes (row pass, then rank pass after any
//! row changes) keeps every rank cell consistent without building a general
//! dependency graph.

use ahash::AHashMap;
use log::debug;

use rapor_core::RaporTemplate;

use crate::compiler::{compile_template, CompiledTemplate};
use crate::error::FormulaResult;
use crate::eval::evaluate;

/// One student's editable field row during evaluation
#[derive(Debug, Clone, Default)]
pub struct CohortRow {
    pub row_id: i64,
    pub fields: AHashMap<String, String>,
}

impl CohortRow {
    pub fn new(row_id: i64) -> Self {
        CohortRow {
            row_id,
            fields: AHashMap::new(),
        }
    }

    /// Set a field value (builder-style, used heavily in tests)
    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// The evaluation engine for one compiled template
#[derive(Debug, Clone)]
pub struct Engine {
    compiled: CompiledTemplate,
}

impl Engine {
    pub fn new(compiled: CompiledTemplate) -> Self {
        Engine { compiled }
    }

    /// Compile a template and build its engine
    pub fn from_template(template: &RaporTemplate) -> FormulaResult<Self> {
        Ok(Engine::new(compile_template(template)?))
    }

    /// The compiled template this engine executes
    pub fn compiled(&self) -> &CompiledTemplate {
        &self.compiled
    }

    /// Row pass: re-evaluate every row-local formula against the row's
    /// current field values.
    ///
    /// Best-effort by contract: a failed evaluation leaves the prior value in
    /// place and never fails the row.
    pub fn row_pass(&self, fields: &mut AHashMap<String, String>) {
        for formula in &self.compiled.row_formulas {
            match evaluate(&formula.expr, fields) {
                Ok(value) => {
                    fields.insert(formula.key.clone(), value.to_field_string());
                }
                Err(err) => {
                    debug!("formula '{}' not updated: {}", formula.key, err);
                }
            }
        }
    }

    /// Rank pass: recompute every ranking declaration across the whole
    /// cohort.
    ///
    /// Missing or non-numeric source values count as 0. Rows are stable
    /// sorted descending by source value and ranks are strictly positional
    /// (1-based); ties receive distinct, order-dependent ranks. When a limit
    /// is set, ranks beyond it are written as blank.
    pub fn rank_pass(&self, rows: &mut [CohortRow]) {
        for spec in &self.compiled.rankings {
            let mut order: Vec<(usize, f64)> = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    // "NaN"/"inf" parse as f64 but are not numeric field
                    // values; they coerce to 0 like any other text
                    let value = row
                        .fields
                        .get(&spec.source_key)
                        .and_then(|raw| raw.trim().parse::<f64>().ok())
                        .filter(|n| n.is_finite())
                        .unwrap_or(0.0);
                    (i, value)
                })
                .collect();

            // Stable sort keeps earlier rows ahead on equal values
            order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

            for (position, (row_index, _)) in order.into_iter().enumerate() {
                let rank = position + 1;
                let rendered = if spec.limit > 0 && rank > spec.limit as usize {
                    String::new()
                } else {
                    rank.to_string()
                };
                rows[row_index]
                    .fields
                    .insert(spec.target_key.clone(), rendered);
            }
        }
    }

    /// Full recomputation after any edit: row pass for every row, then the
    /// rank pass
    pub fn recompute(&self, rows: &mut [CohortRow]) {
        for row in rows.iter_mut() {
            self.row_pass(&mut row.fields);
        }
        self.rank_pass(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile_cell, CompiledCell, RankSpec};
    use pretty_assertions::assert_eq;

    fn engine_with(formulas: &[(&str, &str)], rankings: &[RankSpec]) -> Engine {
        let mut compiled = CompiledTemplate::default();
        let mut seq = 0;
        for (key, text) in formulas {
            match compile_cell(key, text, &mut seq).unwrap() {
                CompiledCell::Row(f) => compiled.row_formulas.push(f),
                CompiledCell::Ranking(r) => compiled.rankings.push(r),
            }
        }
        compiled.rankings.extend(rankings.iter().cloned());
        Engine::new(compiled)
    }

    #[test]
    fn test_row_pass_writes_formula_outputs() {
        let engine = engine_with(&[("RATA", "=AVERAGE($UTS,$UAS)")], &[]);
        let mut fields = AHashMap::new();
        fields.insert("UTS".to_string(), "70".to_string());
        fields.insert("UAS".to_string(), "90".to_string());

        engine.row_pass(&mut fields);
        assert_eq!(fields["RATA"], "80");
    }

    #[test]
    fn test_row_pass_failure_keeps_prior_value() {
        let engine = engine_with(&[("HASIL", "=$A/$B")], &[]);
        let mut fields = AHashMap::new();
        fields.insert("A".to_string(), "10".to_string());
        fields.insert("B".to_string(), "2".to_string());
        engine.row_pass(&mut fields);
        assert_eq!(fields["HASIL"], "5");

        // Division by zero fails; prior displayed value stays
        fields.insert("B".to_string(), "0".to_string());
        engine.row_pass(&mut fields);
        assert_eq!(fields["HASIL"], "5");
    }

    #[test]
    fn test_rank_pass_positional_ties() {
        let engine = engine_with(
            &[],
            &[RankSpec {
                target_key: "JUARA".into(),
                source_key: "RATA".into(),
                limit: 0,
            }],
        );
        let mut rows = vec![
            CohortRow::new(1).with_field("RATA", "90"),
            CohortRow::new(2).with_field("RATA", "70"),
            CohortRow::new(3).with_field("RATA", "90"),
        ];
        engine.rank_pass(&mut rows);

        // Stable sort: first 90 wins position 1, second 90 gets position 2
        assert_eq!(rows[0].fields["JUARA"], "1");
        assert_eq!(rows[1].fields["JUARA"], "3");
        assert_eq!(rows[2].fields["JUARA"], "2");
    }

    #[test]
    fn test_rank_limit_blanks_beyond() {
        let engine = engine_with(
            &[],
            &[RankSpec {
                target_key: "JUARA".into(),
                source_key: "X".into(),
                limit: 2,
            }],
        );
        let mut rows = vec![
            CohortRow::new(1).with_field("X", "40"),
            CohortRow::new(2).with_field("X", "30"),
            CohortRow::new(3).with_field("X", "20"),
            CohortRow::new(4).with_field("X", "10"),
        ];
        engine.rank_pass(&mut rows);

        assert_eq!(rows[0].fields["JUARA"], "1");
        assert_eq!(rows[1].fields["JUARA"], "2");
        assert_eq!(rows[2].fields["JUARA"], "");
        assert_eq!(rows[3].fields["JUARA"], "");
    }

    #[test]
    fn test_rank_nan_source_coerced_to_zero() {
        let engine = engine_with(
            &[],
            &[RankSpec {
                target_key: "R".into(),
                source_key: "X".into(),
                limit: 0,
            }],
        );
        // "NaN" parses as f64 but must rank like any other non-numeric value
        let mut rows = vec![
            CohortRow::new(1).with_field("X", "50"),
            CohortRow::new(2).with_field("X", "NaN"),
            CohortRow::new(3).with_field("X", "10"),
        ];
        engine.rank_pass(&mut rows);
        assert_eq!(rows[0].fields["R"], "1");
        assert_eq!(rows[1].fields["R"], "3");
        assert_eq!(rows[2].fields["R"], "2");
    }

    #[test]
    fn test_rank_missing_source_counts_as_zero() {
        let engine = engine_with(
            &[],
            &[RankSpec {
                target_key: "R".into(),
                source_key: "X".into(),
                limit: 0,
            }],
        );
        let mut rows = vec![
            CohortRow::new(1).with_field("X", "abc"),
            CohortRow::new(2).with_field("X", "10"),
        ];
        engine.rank_pass(&mut rows);
        assert_eq!(rows[0].fields["R"], "2");
        assert_eq!(rows[1].fields["R"], "1");
    }

    #[test]
    fn test_recompute_runs_ranks_after_rows() {
        let engine = engine_with(
            &[("RATA", "=AVERAGE($UTS,$UAS)"), ("JUARA", "=RANK($RATA)")],
            &[],
        );
        let mut rows = vec![
            CohortRow::new(1).with_field("UTS", "80").with_field("UAS", "100"),
            CohortRow::new(2).with_field("UTS", "70").with_field("UAS", "70"),
        ];
        engine.recompute(&mut rows);

        assert_eq!(rows[0].fields["RATA"], "90");
        assert_eq!(rows[1].fields["RATA"], "70");
        // Rank sees the freshly computed averages
        assert_eq!(rows[0].fields["JUARA"], "1");
        assert_eq!(rows[1].fields["JUARA"], "2");
    }
}
