//! Template type and structural grid operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cell::{Borders, GridCell};
use crate::error::{Error, Result};

/// One border side of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderEdge {
    Top,
    Right,
    Bottom,
    Left,
}

/// What [`RaporTemplate::toggle_border`] should do to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderTarget {
    /// Flip one side per selected cell
    Edge(BorderEdge),
    /// Force-set all four sides on
    All,
    /// Force-set all four sides off
    None,
}

/// A named, reusable report-card layout: a matrix of [`GridCell`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaporTemplate {
    pub id: String,
    pub name: String,
    pub row_count: usize,
    pub col_count: usize,
    /// Row-major cell matrix, always `row_count` x `col_count`
    pub cells: Vec<Vec<GridCell>>,
    pub last_modified: DateTime<Utc>,
}

impl RaporTemplate {
    /// Create a template of blank label cells, all borders off
    pub fn new<S: Into<String>>(id: S, name: S, rows: usize, cols: usize) -> Self {
        let cells = (0..rows)
            .map(|r| (0..cols).map(|c| GridCell::blank(r, c)).collect())
            .collect();
        RaporTemplate {
            id: id.into(),
            name: name.into(),
            row_count: rows,
            col_count: cols,
            cells,
            last_modified: Utc::now(),
        }
    }

    /// Get a cell by position
    pub fn cell(&self, row: usize, col: usize) -> Result<&GridCell> {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or(Error::CellOutOfBounds(row, col, self.row_count, self.col_count))
    }

    /// Get a mutable cell by position
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut GridCell> {
        let (rows, cols) = (self.row_count, self.col_count);
        self.cells
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .ok_or(Error::CellOutOfBounds(row, col, rows, cols))
    }

    /// Iterate over all cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter().flat_map(|row| row.iter())
    }

    // === Merging ===

    /// Merge the bounding rectangle of the selection into one cell.
    ///
    /// Requires at least two selected cells. The selection need not be
    /// rectangular; the operation always expands to the bounding rectangle.
    /// The top-left cell becomes the master and every other cell in the
    /// rectangle is hidden with its content cleared.
    ///
    /// Rectangles intersecting an existing merge region are rejected.
    pub fn merge_cells(&mut self, selection: &[(usize, usize)]) -> Result<()> {
        if selection.len() < 2 {
            return Err(Error::SelectionTooSmall(selection.len()));
        }

        let min_row = selection.iter().map(|&(r, _)| r).min().unwrap_or(0);
        let max_row = selection.iter().map(|&(r, _)| r).max().unwrap_or(0);
        let min_col = selection.iter().map(|&(_, c)| c).min().unwrap_or(0);
        let max_col = selection.iter().map(|&(_, c)| c).max().unwrap_or(0);

        // Bounds check via the far corner
        self.cell(max_row, max_col)?;

        // Reject overlap with any existing merge region
        for r in min_row..=max_row {
            for c in min_col..=max_col {
                let cell = &self.cells[r][c];
                if cell.hidden || cell.is_merged() {
                    return Err(Error::MergeConflict(format!(
                        "({},{})-({},{})",
                        min_row, min_col, max_row, max_col
                    )));
                }
            }
        }

        for r in min_row..=max_row {
            for c in min_col..=max_col {
                if r == min_row && c == min_col {
                    continue;
                }
                self.cells[r][c].cover();
            }
        }

        let master = &mut self.cells[min_row][min_col];
        master.row_span = max_row - min_row + 1;
        master.col_span = max_col - min_col + 1;
        self.touch();
        Ok(())
    }

    /// Undo a merge: reset the master to 1x1 and un-hide every covered cell.
    ///
    /// No-op if the cell's span is 1x1. Covered cells come back empty;
    /// content cleared by the merge is not restored.
    pub fn unmerge_cells(&mut self, row: usize, col: usize) -> Result<()> {
        let cell = self.cell(row, col)?;
        if !cell.is_merged() {
            return Ok(());
        }
        let (row_span, col_span) = (cell.row_span, cell.col_span);

        for r in row..row + row_span {
            for c in col..col + col_span {
                self.cells[r][c].hidden = false;
                self.cells[r][c].row_span = 1;
                self.cells[r][c].col_span = 1;
            }
        }
        self.touch();
        Ok(())
    }

    // === Borders ===

    /// Toggle or force borders on every selected non-hidden cell
    pub fn toggle_border(&mut self, selection: &[(usize, usize)], target: BorderTarget) -> Result<()> {
        for &(row, col) in selection {
            let cell = self.cell_mut(row, col)?;
            if cell.hidden {
                continue;
            }
            match target {
                BorderTarget::Edge(BorderEdge::Top) => cell.borders.top = !cell.borders.top,
                BorderTarget::Edge(BorderEdge::Right) => cell.borders.right = !cell.borders.right,
                BorderTarget::Edge(BorderEdge::Bottom) => cell.borders.bottom = !cell.borders.bottom,
                BorderTarget::Edge(BorderEdge::Left) => cell.borders.left = !cell.borders.left,
                BorderTarget::All => cell.borders = Borders::all(),
                BorderTarget::None => cell.borders = Borders::none(),
            }
        }
        self.touch();
        Ok(())
    }

    // === Growth ===

    /// Append a row of blank cells
    pub fn add_row(&mut self) {
        let r = self.row_count;
        self.cells
            .push((0..self.col_count).map(|c| GridCell::blank(r, c)).collect());
        self.row_count += 1;
        self.touch();
    }

    /// Append a column of blank cells
    pub fn add_column(&mut self) {
        let c = self.col_count;
        for (r, row) in self.cells.iter_mut().enumerate() {
            row.push(GridCell::blank(r, c));
        }
        self.col_count += 1;
        self.touch();
    }

    // === Validation ===

    /// Validate field keys before save.
    ///
    /// Every non-hidden input/formula/dropdown cell must carry a key, and
    /// keys must be unique among those cells. Duplicates are rejected with
    /// the full list of offenders.
    pub fn validate_keys(&self) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        let mut duplicates: Vec<String> = Vec::new();

        for cell in self.iter_cells() {
            if cell.hidden || !cell.kind.is_field() {
                continue;
            }
            if cell.key.is_empty() {
                return Err(Error::MissingKey(cell.row, cell.col, cell.kind.name()));
            }
            if seen.contains(&cell.key.as_str()) {
                if !duplicates.contains(&cell.key) {
                    duplicates.push(cell.key.clone());
                }
            } else {
                seen.push(&cell.key);
            }
        }

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(Error::DuplicateKeys(duplicates))
        }
    }

    fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellKind;
    use pretty_assertions::assert_eq;

    fn selection_rect(r0: usize, c0: usize, r1: usize, c1: usize) -> Vec<(usize, usize)> {
        let mut sel = Vec::new();
        for r in r0..=r1 {
            for c in c0..=c1 {
                sel.push((r, c));
            }
        }
        sel
    }

    #[test]
    fn test_new_grid_is_blank() {
        let t = RaporTemplate::new("t", "test", 3, 4);
        assert_eq!(t.row_count, 3);
        assert_eq!(t.col_count, 4);
        assert_eq!(t.iter_cells().count(), 12);
        assert!(t.iter_cells().all(|c| c.kind == CellKind::Label && !c.hidden));
    }

    #[test]
    fn test_merge_requires_two_cells() {
        let mut t = RaporTemplate::new("t", "test", 3, 3);
        assert!(matches!(
            t.merge_cells(&[(0, 0)]),
            Err(Error::SelectionTooSmall(1))
        ));
    }

    #[test]
    fn test_merge_expands_to_bounding_rectangle() {
        let mut t = RaporTemplate::new("t", "test", 3, 3);
        // L-shaped selection still merges the full 2x2 rectangle
        t.merge_cells(&[(0, 0), (1, 1)]).unwrap();

        let master = t.cell(0, 0).unwrap();
        assert_eq!((master.row_span, master.col_span), (2, 2));
        assert!(!master.hidden);
        assert!(t.cell(0, 1).unwrap().hidden);
        assert!(t.cell(1, 0).unwrap().hidden);
        assert!(t.cell(1, 1).unwrap().hidden);
    }

    #[test]
    fn test_merge_clears_covered_content() {
        let mut t = RaporTemplate::new("t", "test", 2, 2);
        t.cell_mut(0, 1).unwrap().value = "gone".into();
        t.cell_mut(0, 1).unwrap().key = "GONE".into();
        t.merge_cells(&selection_rect(0, 0, 0, 1)).unwrap();
        let covered = t.cell(0, 1).unwrap();
        assert!(covered.hidden);
        assert!(covered.value.is_empty());
        assert!(covered.key.is_empty());
    }

    #[test]
    fn test_overlapping_merge_rejected() {
        let mut t = RaporTemplate::new("t", "test", 3, 3);
        t.merge_cells(&selection_rect(0, 0, 1, 1)).unwrap();
        assert!(matches!(
            t.merge_cells(&selection_rect(1, 1, 2, 2)),
            Err(Error::MergeConflict(_))
        ));
    }

    #[test]
    fn test_merge_unmerge_round_trip() {
        let mut t = RaporTemplate::new("t", "test", 4, 4);
        t.merge_cells(&selection_rect(1, 1, 2, 3)).unwrap();
        t.unmerge_cells(1, 1).unwrap();

        for cell in t.iter_cells() {
            assert!(!cell.hidden, "cell ({},{}) still hidden", cell.row, cell.col);
            assert_eq!((cell.row_span, cell.col_span), (1, 1));
        }
    }

    #[test]
    fn test_unmerge_non_merged_is_noop() {
        let mut t = RaporTemplate::new("t", "test", 2, 2);
        t.unmerge_cells(0, 0).unwrap();
        assert!(!t.cell(0, 0).unwrap().hidden);
    }

    #[test]
    fn test_hidden_plus_visible_covers_grid() {
        let mut t = RaporTemplate::new("t", "test", 5, 4);
        t.merge_cells(&selection_rect(0, 0, 1, 1)).unwrap();
        t.merge_cells(&selection_rect(3, 0, 4, 3)).unwrap();

        let hidden = t.iter_cells().filter(|c| c.hidden).count();
        let visible = t.iter_cells().filter(|c| !c.hidden).count();
        assert_eq!(hidden + visible, 20);
        assert_eq!(hidden, 3 + 7);
    }

    #[test]
    fn test_toggle_border() {
        let mut t = RaporTemplate::new("t", "test", 2, 2);
        t.toggle_border(&[(0, 0)], BorderTarget::Edge(BorderEdge::Top))
            .unwrap();
        assert!(t.cell(0, 0).unwrap().borders.top);
        t.toggle_border(&[(0, 0)], BorderTarget::Edge(BorderEdge::Top))
            .unwrap();
        assert!(!t.cell(0, 0).unwrap().borders.top);

        t.toggle_border(&[(0, 0), (1, 1)], BorderTarget::All).unwrap();
        assert_eq!(t.cell(1, 1).unwrap().borders, Borders::all());
        t.toggle_border(&[(1, 1)], BorderTarget::None).unwrap();
        assert_eq!(t.cell(1, 1).unwrap().borders, Borders::none());
    }

    #[test]
    fn test_add_row_and_column() {
        let mut t = RaporTemplate::new("t", "test", 2, 2);
        t.add_row();
        t.add_column();
        assert_eq!((t.row_count, t.col_count), (3, 3));
        assert_eq!(t.cells.len(), 3);
        assert!(t.cells.iter().all(|r| r.len() == 3));
        let corner = t.cell(2, 2).unwrap();
        assert_eq!((corner.row, corner.col), (2, 2));
    }

    #[test]
    fn test_duplicate_keys_rejected_with_offenders() {
        let mut t = RaporTemplate::new("t", "test", 2, 3);
        for (r, c, key) in [(0, 0, "NILAI"), (0, 1, "NILAI"), (1, 0, "CATATAN"), (1, 1, "CATATAN")] {
            let cell = t.cell_mut(r, c).unwrap();
            cell.kind = CellKind::Input;
            cell.key = key.into();
        }
        match t.validate_keys() {
            Err(Error::DuplicateKeys(keys)) => {
                assert_eq!(keys, vec!["NILAI".to_string(), "CATATAN".to_string()]);
            }
            other => panic!("expected DuplicateKeys, got {:?}", other),
        }
    }

    #[test]
    fn test_hidden_duplicate_key_ignored() {
        let mut t = RaporTemplate::new("t", "test", 2, 2);
        for (r, c) in [(0, 0), (1, 0)] {
            let cell = t.cell_mut(r, c).unwrap();
            cell.kind = CellKind::Input;
            cell.key = "NILAI".into();
        }
        // Hiding one of the two removes the conflict
        t.cell_mut(1, 0).unwrap().hidden = true;
        assert!(t.validate_keys().is_ok());
    }

    #[test]
    fn test_missing_key_rejected() {
        let mut t = RaporTemplate::new("t", "test", 1, 1);
        t.cell_mut(0, 0).unwrap().kind = CellKind::Dropdown;
        assert!(matches!(t.validate_keys(), Err(Error::MissingKey(0, 0, "dropdown"))));
    }

    #[test]
    fn test_template_serde_round_trip() {
        let mut t = RaporTemplate::new("t9", "Rapor", 2, 2);
        t.merge_cells(&selection_rect(0, 0, 0, 1)).unwrap();
        t.cell_mut(1, 0).unwrap().kind = CellKind::Formula;
        t.cell_mut(1, 0).unwrap().key = "RATA".into();
        t.cell_mut(1, 0).unwrap().value = "=AVERAGE($A,$B)".into();

        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"rowCount\":2"));
        assert!(json.contains("\"lastModified\""));
        let back: RaporTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cells, t.cells);
        assert_eq!(back.id, "t9");
    }
}
