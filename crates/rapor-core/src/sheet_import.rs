//! Spreadsheet import normalization
//!
//! Consumes decoded rows and merge ranges (the file parsing itself happens
//! upstream) and normalizes them into a [`RaporTemplate`]. Cell types are
//! auto-detected from the text:
//! - `=...` becomes a formula cell
//! - a `$` token in the system vocabulary becomes a data cell
//! - any other `$...` becomes an input cell keyed by the sanitized token
//! - everything else becomes a label
//!
//! Every populated cell receives all four borders.

use lazy_regex::regex_replace_all;
use log::debug;

use crate::cell::{Borders, CellKind};
use crate::error::{Error, Result};
use crate::syskey::SystemKey;
use crate::template::RaporTemplate;
use crate::{MAX_IMPORT_COLS, MAX_IMPORT_ROWS};

/// A source merge range in 0-based inclusive coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl MergeRange {
    fn corners(&self) -> [(usize, usize); 2] {
        [(self.start_row, self.start_col), (self.end_row, self.end_col)]
    }
}

/// Normalize an input field key: uppercase, stripped of anything outside
/// `[A-Z0-9_]`
pub fn sanitize_key(token: &str) -> String {
    let upper = token.to_uppercase();
    regex_replace_all!(r"[^A-Z0-9_]", &upper, "").into_owned()
}

/// Build a template from decoded spreadsheet rows and merge ranges.
///
/// Rejects sheets larger than 100x30 before any template is created.
/// Merge ranges are replayed with [`RaporTemplate::merge_cells`] semantics.
pub fn import_from_sheet<S1: Into<String>, S2: Into<String>>(
    id: S1,
    name: S2,
    rows: &[Vec<String>],
    merges: &[MergeRange],
) -> Result<RaporTemplate> {
    let row_count = rows.len();
    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);

    if row_count > MAX_IMPORT_ROWS || col_count > MAX_IMPORT_COLS {
        return Err(Error::SheetTooLarge {
            rows: row_count,
            cols: col_count,
            max_rows: MAX_IMPORT_ROWS,
            max_cols: MAX_IMPORT_COLS,
        });
    }

    let mut template = RaporTemplate::new(id.into(), name.into(), row_count, col_count);

    for (r, source_row) in rows.iter().enumerate() {
        for (c, text) in source_row.iter().enumerate() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let cell = template.cell_mut(r, c)?;
            if let Some(rest) = text.strip_prefix('=') {
                cell.kind = CellKind::Formula;
                cell.value = format!("={}", rest.trim());
            } else if text.starts_with('$') {
                if SystemKey::parse(text).is_some() {
                    cell.kind = CellKind::Data;
                    cell.value = text.to_string();
                } else {
                    // Content lives in the key, not the value
                    cell.kind = CellKind::Input;
                    cell.key = sanitize_key(text);
                }
            } else {
                cell.kind = CellKind::Label;
                cell.value = text.to_string();
            }
            cell.borders = Borders::all();
        }
    }

    for merge in merges {
        debug!("replaying merge range {:?}", merge);
        template.merge_cells(&merge.corners())?;
    }

    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_type_auto_detection() {
        let rows = sheet(&[
            &["Nama", "$NAMA_SANTRI", "$Nilai Ujian!", "=AVERAGE($A,$B)"],
        ]);
        let t = import_from_sheet("t", "imported", &rows, &[]).unwrap();

        assert_eq!(t.cell(0, 0).unwrap().kind, CellKind::Label);
        assert_eq!(t.cell(0, 0).unwrap().value, "Nama");

        assert_eq!(t.cell(0, 1).unwrap().kind, CellKind::Data);
        assert_eq!(t.cell(0, 1).unwrap().value, "$NAMA_SANTRI");

        let input = t.cell(0, 2).unwrap();
        assert_eq!(input.kind, CellKind::Input);
        assert_eq!(input.key, "NILAIUJIAN");
        assert!(input.value.is_empty(), "input content lives in key, not value");

        assert_eq!(t.cell(0, 3).unwrap().kind, CellKind::Formula);
        assert_eq!(t.cell(0, 3).unwrap().value, "=AVERAGE($A,$B)");
    }

    #[test]
    fn test_populated_cells_get_all_borders() {
        let rows = sheet(&[&["x", ""], &["", "y"]]);
        let t = import_from_sheet("t", "imported", &rows, &[]).unwrap();
        assert_eq!(t.cell(0, 0).unwrap().borders, Borders::all());
        assert_eq!(t.cell(0, 1).unwrap().borders, Borders::none());
        assert_eq!(t.cell(1, 0).unwrap().borders, Borders::none());
        assert_eq!(t.cell(1, 1).unwrap().borders, Borders::all());
    }

    #[test]
    fn test_merge_ranges_replayed() {
        let rows = sheet(&[&["Header", "", ""], &["a", "b", "c"]]);
        let merges = [MergeRange {
            start_row: 0,
            start_col: 0,
            end_row: 0,
            end_col: 2,
        }];
        let t = import_from_sheet("t", "imported", &rows, &merges).unwrap();
        assert_eq!(t.cell(0, 0).unwrap().col_span, 3);
        assert!(t.cell(0, 1).unwrap().hidden);
        assert!(t.cell(0, 2).unwrap().hidden);
    }

    #[test]
    fn test_oversized_sheet_rejected() {
        let rows: Vec<Vec<String>> = (0..101).map(|_| vec!["x".to_string()]).collect();
        assert!(matches!(
            import_from_sheet("t", "too big", &rows, &[]),
            Err(Error::SheetTooLarge { rows: 101, .. })
        ));

        let wide = vec![vec![String::new(); 31]];
        assert!(matches!(
            import_from_sheet("t", "too wide", &wide, &[]),
            Err(Error::SheetTooLarge { cols: 31, .. })
        ));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("$Nilai Ujian!"), "NILAIUJIAN");
        assert_eq!(sanitize_key("$nilai_akhir"), "NILAI_AKHIR");
        assert_eq!(sanitize_key("$A-1 b"), "A1B");
    }
}
