//! Shared sheet specification models.

use std::fmt;

use crate::conf::C_LABEL_ROW_INDEX_DEFAULT;

////////////////////////////////////////////////////////////////////////////////
// #region CellStyleSpecification

/// Backend-neutral cell style descriptor.
///
/// Every property is optional; `None` leaves the backend default in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellStyle {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Font color (`#RRGGBB`).
    pub font_color: Option<String>,

    /// Background fill color (`#RRGGBB`).
    pub bg_color: Option<String>,
    /// Border style for all sides (xlsxwriter numbering, `1` is thin).
    pub border: Option<i64>,
    /// Border color for all sides (`#RRGGBB`).
    pub border_color: Option<String>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Number format code.
    pub num_format: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
}

impl SpecCellStyle {
    /// Return a new style by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellStyle) -> SpecCellStyle {
        self.merge(&patch)
    }

    /// Merge two styles with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellStyle) -> SpecCellStyle {
        SpecCellStyle {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            border: other.border.or(self.border),
            border_color: other
                .border_color
                .clone()
                .or_else(|| self.border_color.clone()),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            text_wrap: other.text_wrap.or(self.text_wrap),
        }
    }
}

/// Named style roles; each cascades independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumStyleRole {
    /// Sheet title row.
    Title,
    /// Row-index column, header and content cells alike.
    RowIndex,
    /// Field header cells.
    Header,
    /// Field content cells.
    Content,
}

impl EnumStyleRole {
    /// All roles in cascade-table order.
    pub const ALL: [EnumStyleRole; 4] = [
        EnumStyleRole::Title,
        EnumStyleRole::RowIndex,
        EnumStyleRole::Header,
        EnumStyleRole::Content,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnumStyleRole::Title => "title",
            EnumStyleRole::RowIndex => "row_index",
            EnumStyleRole::Header => "header",
            EnumStyleRole::Content => "content",
        }
    }
}

/// Document-level style defaults, the third tier of the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecDocumentStyles {
    pub title: Option<SpecCellStyle>,
    pub row_index: Option<SpecCellStyle>,
    pub header: Option<SpecCellStyle>,
    pub content: Option<SpecCellStyle>,
}

impl SpecDocumentStyles {
    /// Return the document default for `role`, if one is set.
    pub fn get(&self, role: EnumStyleRole) -> Option<&SpecCellStyle> {
        match role {
            EnumStyleRole::Title => self.title.as_ref(),
            EnumStyleRole::RowIndex => self.row_index.as_ref(),
            EnumStyleRole::Header => self.header.as_ref(),
            EnumStyleRole::Content => self.content.as_ref(),
        }
    }

    /// Return a copy with the default for `role` replaced.
    pub fn with_role(mut self, role: EnumStyleRole, style: SpecCellStyle) -> Self {
        let slot = match role {
            EnumStyleRole::Title => &mut self.title,
            EnumStyleRole::RowIndex => &mut self.row_index,
            EnumStyleRole::Header => &mut self.header,
            EnumStyleRole::Content => &mut self.content,
        };
        *slot = Some(style);
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MergeSpecification

/// Rectangular merge plan item, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecMergeRange {
    /// First row (inclusive).
    pub row_start: usize,
    /// Last row (inclusive).
    pub row_end: usize,
    /// First column (inclusive).
    pub col_start: usize,
    /// Last column (inclusive).
    pub col_end: usize,
}

impl SpecMergeRange {
    pub fn new(row_start: usize, row_end: usize, col_start: usize, col_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.row_end + 1 - self.row_start
    }

    pub fn n_cols(&self) -> usize {
        self.col_end + 1 - self.col_start
    }

    pub fn is_single_cell(&self) -> bool {
        self.row_start == self.row_end && self.col_start == self.col_end
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..=self.row_end).contains(&row)
            && (self.col_start..=self.col_end).contains(&col)
    }

    pub fn overlaps(&self, other: &SpecMergeRange) -> bool {
        self.row_start <= other.row_end
            && other.row_start <= self.row_end
            && self.col_start <= other.col_end
            && other.col_start <= self.col_end
    }
}

impl fmt::Display for SpecMergeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}C{}:R{}C{}",
            self.row_start, self.col_start, self.row_end, self.col_end
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Per-document write options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetWriteOptions {
    /// Header text of the row-index column.
    pub row_index_label: String,
    /// Number of frozen columns; defaults to the row-index column.
    pub col_freeze: Option<usize>,
    /// Replacement for characters Excel rejects in sheet names.
    pub sheet_name_replacement: String,
}

impl Default for SpecSheetWriteOptions {
    fn default() -> Self {
        Self {
            row_index_label: C_LABEL_ROW_INDEX_DEFAULT.to_string(),
            col_freeze: None,
            sheet_name_replacement: "_".to_string(),
        }
    }
}

/// Autofit policy for column width inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Infer widths from written cell text.
    pub if_enabled: bool,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            if_enabled: true,
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Options of the xlsx backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxBackendOptions {
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-sheet write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSheetReport {
    /// Actual unique sheet name in the document.
    pub sheet_name: String,
    /// Title rows written (0 or 1).
    pub n_rows_title: usize,
    /// Header rows written.
    pub n_rows_header: usize,
    /// Content rows written.
    pub n_rows_content: usize,
    /// Grid columns occupied, row-index column included.
    pub n_cols: usize,
    /// Top-level instances rendered.
    pub n_instances: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Total rows written to the sheet.
    pub fn n_rows_total(&self) -> usize {
        self.n_rows_title + self.n_rows_header + self.n_rows_content
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
