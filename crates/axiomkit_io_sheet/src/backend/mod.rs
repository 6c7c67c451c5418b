//! Spreadsheet backends.
//!
//! The renderers address a backend through [`SpreadsheetBackend`] only, so a
//! layout can be rendered into a workbook or an inspectable in-memory grid.

use std::io::Write;

use crate::error::RenderError;
use crate::spec::{SpecCellStyle, SpecMergeRange};
use crate::value::{CellValue, ValueKind};

pub mod memory;
pub mod xlsx;

pub use memory::{MemoryBackend, MemorySheet, SpecMemoryCell};
pub use xlsx::{XlsxBackend, XlsxStyleId};

/// Handle of one sheet created in a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub usize);

/// Cell-level spreadsheet writer.
pub trait SpreadsheetBackend {
    /// Backend-native style handle.
    type Style: Clone;

    /// Create a sheet; `name` is already sanitized and unique.
    fn create_sheet(&mut self, name: &str) -> Result<SheetId, RenderError>;

    /// Write one value as `kind` at a zero-based position.
    fn write_cell(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: &CellValue,
        kind: ValueKind,
        style: &Self::Style,
    ) -> Result<(), RenderError>;

    /// Merge an inclusive rectangle; a single-cell range is a no-op.
    fn merge_range(
        &mut self,
        sheet: SheetId,
        range: SpecMergeRange,
        style: &Self::Style,
    ) -> Result<(), RenderError>;

    /// Freeze the top `n_rows` rows and left `n_cols` columns.
    fn freeze_panes(&mut self, sheet: SheetId, n_rows: usize, n_cols: usize)
    -> Result<(), RenderError>;

    /// Convert a neutral style into a backend handle.
    fn materialize_style(&mut self, style: &SpecCellStyle) -> Self::Style;

    /// Serialize every sheet into `out`.
    fn serialize(&mut self, out: &mut dyn Write) -> Result<(), RenderError>;
}
