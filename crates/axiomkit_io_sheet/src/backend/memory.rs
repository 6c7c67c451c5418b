//! In-memory grid backend.

use std::collections::BTreeMap;
use std::io::Write;

use crate::backend::{SheetId, SpreadsheetBackend};
use crate::error::RenderError;
use crate::spec::{SpecCellStyle, SpecMergeRange};
use crate::util::validate_cell_position;
use crate::value::{CellValue, ValueKind};

/// One written cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecMemoryCell {
    /// Value after coercion to `kind`.
    pub value: CellValue,
    pub kind: ValueKind,
    pub style: SpecCellStyle,
}

/// One in-memory sheet.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    name: String,
    dict_cells: BTreeMap<(usize, usize), SpecMemoryCell>,
    l_merges: Vec<(SpecMergeRange, SpecCellStyle)>,
    freeze: Option<(usize, usize)>,
}

impl MemorySheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&SpecMemoryCell> {
        self.dict_cells.get(&(row, col))
    }

    /// Display text at a position; empty when unwritten.
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col)
            .map(|cell| cell.value.to_string())
            .unwrap_or_default()
    }

    /// Merges in write order.
    pub fn merges(&self) -> Vec<SpecMergeRange> {
        self.l_merges.iter().map(|(range, _)| *range).collect()
    }

    /// Merge anchored at a position.
    pub fn merge_at(&self, row: usize, col: usize) -> Option<SpecMergeRange> {
        self.l_merges
            .iter()
            .map(|(range, _)| *range)
            .find(|range| range.row_start == row && range.col_start == col)
    }

    /// Frozen `(rows, cols)`.
    pub fn freeze(&self) -> Option<(usize, usize)> {
        self.freeze
    }

    /// Rows touched by cells or merges.
    pub fn n_rows(&self) -> usize {
        let n_cells = self.dict_cells.keys().map(|(r, _)| r + 1).max().unwrap_or(0);
        let n_merges = self.l_merges.iter().map(|(m, _)| m.row_end + 1).max().unwrap_or(0);
        n_cells.max(n_merges)
    }

    /// Columns touched by cells or merges.
    pub fn n_cols(&self) -> usize {
        let n_cells = self.dict_cells.keys().map(|(_, c)| c + 1).max().unwrap_or(0);
        let n_merges = self.l_merges.iter().map(|(m, _)| m.col_end + 1).max().unwrap_or(0);
        n_cells.max(n_merges)
    }
}

/// Backend recording every write for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    l_sheets: Vec<MemorySheet>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[MemorySheet] {
        &self.l_sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.l_sheets.iter().find(|sheet| sheet.name == name)
    }

    fn sheet_mut(&mut self, sheet: SheetId) -> Result<&mut MemorySheet, RenderError> {
        self.l_sheets
            .get_mut(sheet.0)
            .ok_or(RenderError::UnknownSheet { sheet: sheet.0 })
    }
}

impl SpreadsheetBackend for MemoryBackend {
    type Style = SpecCellStyle;

    fn create_sheet(&mut self, name: &str) -> Result<SheetId, RenderError> {
        self.l_sheets.push(MemorySheet {
            name: name.to_string(),
            ..Default::default()
        });
        Ok(SheetId(self.l_sheets.len() - 1))
    }

    fn write_cell(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: &CellValue,
        kind: ValueKind,
        style: &SpecCellStyle,
    ) -> Result<(), RenderError> {
        validate_cell_position(row, col)?;
        let value = value.coerce_to(kind)?;
        self.sheet_mut(sheet)?.dict_cells.insert(
            (row, col),
            SpecMemoryCell {
                value,
                kind,
                style: style.clone(),
            },
        );
        Ok(())
    }

    fn merge_range(
        &mut self,
        sheet: SheetId,
        range: SpecMergeRange,
        style: &SpecCellStyle,
    ) -> Result<(), RenderError> {
        if range.is_single_cell() {
            return Ok(());
        }
        validate_cell_position(range.row_end, range.col_end)?;
        let sheet = self.sheet_mut(sheet)?;
        if let Some((existing, _)) = sheet.l_merges.iter().find(|(m, _)| m.overlaps(&range)) {
            return Err(RenderError::MergeOverlap {
                range,
                existing: *existing,
            });
        }
        sheet.l_merges.push((range, style.clone()));
        Ok(())
    }

    fn freeze_panes(
        &mut self,
        sheet: SheetId,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<(), RenderError> {
        validate_cell_position(n_rows, n_cols)?;
        self.sheet_mut(sheet)?.freeze = Some((n_rows, n_cols));
        Ok(())
    }

    fn materialize_style(&mut self, style: &SpecCellStyle) -> SpecCellStyle {
        style.clone()
    }

    /// Tab-separated dump: a `[name]` line, the grid rows, then one `merge` line per merge.
    fn serialize(&mut self, out: &mut dyn Write) -> Result<(), RenderError> {
        for sheet in &self.l_sheets {
            writeln!(out, "[{}]", sheet.name)?;
            let n_cols = sheet.n_cols();
            for n_row in 0..sheet.n_rows() {
                let l_texts: Vec<String> = (0..n_cols).map(|n_col| sheet.text(n_row, n_col)).collect();
                writeln!(out, "{}", l_texts.join("\t"))?;
            }
            for (range, _) in &sheet.l_merges {
                writeln!(out, "merge\t{range}")?;
            }
        }
        Ok(())
    }
}
