//! Template cell types

use serde::{Deserialize, Serialize};

/// The role a cell plays in the template matrix.
///
/// The kind determines both how the cell renders in a generated document and
/// whether it participates in evaluation:
/// - `Label` cells are static text.
/// - `Data` cells hold a `$`-prefixed [`SystemKey`](crate::SystemKey) token
///   substituted at generation time.
/// - `Input` cells become editable fields.
/// - `Formula` cells hold an expression recomputed on every edit.
/// - `Dropdown` cells become choice fields seeded from [`GridCell::options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Label,
    Data,
    Input,
    Formula,
    Dropdown,
}

impl CellKind {
    /// Whether cells of this kind declare a per-student field
    pub fn is_field(&self) -> bool {
        matches!(self, CellKind::Input | CellKind::Formula | CellKind::Dropdown)
    }

    /// Whether cells of this kind define the per-student band of a column
    pub fn is_student_def(&self) -> bool {
        self.is_field() || matches!(self, CellKind::Data)
    }

    /// Kind name for error messages
    pub fn name(&self) -> &'static str {
        match self {
            CellKind::Label => "label",
            CellKind::Data => "data",
            CellKind::Input => "input",
            CellKind::Formula => "formula",
            CellKind::Dropdown => "dropdown",
        }
    }
}

/// Horizontal text alignment hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// CSS value for the generated document
    pub fn as_css(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

/// Four independent printable borders.
///
/// These are the borders rendered in the generated artifact, distinct from
/// any editor-only guide lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Borders {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Borders {
    /// All four borders on
    pub fn all() -> Self {
        Borders {
            top: true,
            right: true,
            bottom: true,
            left: true,
        }
    }

    /// All four borders off
    pub fn none() -> Self {
        Borders::default()
    }
}

/// One cell of the template matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// 0-based row position
    pub row: usize,
    /// 0-based column position
    pub col: usize,
    /// Rendering and evaluation role
    #[serde(rename = "type")]
    pub kind: CellKind,
    /// Literal text (label), `$` token (data), or formula expression (formula)
    #[serde(default)]
    pub value: String,
    /// Field identifier; required and unique for non-hidden fillable cells
    #[serde(default)]
    pub key: String,
    /// Merge extent in rows
    #[serde(default = "default_span")]
    pub row_span: usize,
    /// Merge extent in columns
    #[serde(default = "default_span")]
    pub col_span: usize,
    /// True if covered by another cell's merge region; carries no content
    #[serde(default)]
    pub hidden: bool,
    /// Printable borders
    #[serde(default)]
    pub borders: Borders,
    /// Column width hint in pixels (0 = automatic)
    #[serde(default)]
    pub width: u32,
    /// Horizontal alignment hint
    #[serde(default)]
    pub align: Align,
    /// Ordered choices, only meaningful for dropdown cells
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

fn default_span() -> usize {
    1
}

impl GridCell {
    /// Create a blank label cell at the given position, all borders off
    pub fn blank(row: usize, col: usize) -> Self {
        GridCell {
            row,
            col,
            kind: CellKind::Label,
            value: String::new(),
            key: String::new(),
            row_span: 1,
            col_span: 1,
            hidden: false,
            borders: Borders::none(),
            width: 0,
            align: Align::default(),
            options: Vec::new(),
        }
    }

    /// Whether this cell is a merge master (spans more than one cell)
    pub fn is_merged(&self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }

    /// Reset span to 1x1 and clear content, used when a cell becomes covered
    pub(crate) fn cover(&mut self) {
        self.hidden = true;
        self.row_span = 1;
        self.col_span = 1;
        self.value.clear();
        self.key.clear();
    }
}
