//! Multi-row header planning and writing.
//!
//! The header block is planned into a [`HeaderGrid`] first: labels, resolved
//! styles and merge rectangles. Repeated adjacent labels are fused in a
//! second pass, and only then is the grid written to a backend.

use crate::backend::{SheetId, SpreadsheetBackend};
use crate::error::RenderError;
use crate::geometry::column_span;
use crate::layout::{FieldLayout, SheetLayout};
use crate::spec::{EnumStyleRole, SpecCellStyle, SpecMergeRange};
use crate::style::StyleResolver;
use crate::value::{CellValue, ValueKind};

/// One planned header cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecHeaderCell {
    pub text: String,
    pub style: SpecCellStyle,
}

/// Planned header block, positions relative to its top-left corner.
#[derive(Debug, Clone, Default)]
pub struct HeaderGrid {
    n_rows: usize,
    n_cols: usize,
    l_cells: Vec<Option<SpecHeaderCell>>,
    l_merges: Vec<SpecMergeRange>,
}

/// A free cell or a merge anchored in the scanned row.
struct SpecHeaderBlock {
    col_start: usize,
    col_end: usize,
    row_end: usize,
    idx_merge: Option<usize>,
}

impl HeaderGrid {
    fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            l_cells: vec![None; n_rows * n_cols],
            l_merges: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&SpecHeaderCell> {
        if row >= self.n_rows || col >= self.n_cols {
            return None;
        }
        self.l_cells[row * self.n_cols + col].as_ref()
    }

    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        self.cell(row, col).map(|cell| cell.text.as_str())
    }

    pub fn merges(&self) -> &[SpecMergeRange] {
        &self.l_merges
    }

    fn set(&mut self, row: usize, col: usize, text: &str, style: &SpecCellStyle) {
        self.l_cells[row * self.n_cols + col] = Some(SpecHeaderCell {
            text: text.to_string(),
            style: style.clone(),
        });
    }

    fn merge(&mut self, range: SpecMergeRange) {
        if !range.is_single_cell() {
            self.l_merges.push(range);
        }
    }

    fn derive_covering_merge(&self, row: usize, col: usize) -> Option<usize> {
        self.l_merges.iter().position(|m| m.contains(row, col))
    }

    /// Whether `(row, col)` lies inside a merge without being its anchor.
    fn is_covered(&self, row: usize, col: usize) -> bool {
        self.l_merges
            .iter()
            .any(|m| m.contains(row, col) && (m.row_start, m.col_start) != (row, col))
    }

    fn is_blank_at(&self, row: usize, col: usize) -> bool {
        self.text(row, col).is_none_or(|text| text.trim().is_empty())
    }
}

/// Plan the header block of `layout`, adjacent-label merges included.
pub fn plan_header_grid(
    layout: &SheetLayout,
    styles: &StyleResolver,
    row_index_label: &str,
) -> HeaderGrid {
    let n_rows = layout.row_span();
    if n_rows == 0 {
        return HeaderGrid::default();
    }
    let mut grid = HeaderGrid::new(n_rows, layout.column_span());

    let mut n_col = 0;
    if layout.show_row_index_column {
        let style = styles.resolve(EnumStyleRole::RowIndex, layout.row_index_style.as_ref());
        grid.set(0, 0, row_index_label, style);
        grid.merge(SpecMergeRange::new(0, n_rows - 1, 0, 0));
        n_col = 1;
    }
    plan_field_headers(&mut grid, styles, &layout.fields, 0, n_col, n_rows);
    merge_repeated_header_labels(&mut grid);
    grid
}

fn plan_field_headers(
    grid: &mut HeaderGrid,
    styles: &StyleResolver,
    fields: &[FieldLayout],
    top_row: usize,
    top_col: usize,
    n_rows_avail: usize,
) {
    let mut n_col = top_col;
    for field in fields {
        let style = styles.resolve(EnumStyleRole::Header, field.head_style.as_ref());
        let n_span = column_span(field);

        if !field.is_nested {
            for (n_offset, label) in field.header_labels.iter().enumerate() {
                grid.set(top_row + n_offset, n_col, label, style);
            }
            if let Some(n_row_last) = (top_row + field.header_labels.len()).checked_sub(1) {
                grid.merge(SpecMergeRange::new(
                    n_row_last,
                    top_row + n_rows_avail - 1,
                    n_col,
                    n_col,
                ));
            }
        } else {
            let mut n_row = top_row;
            if field.show_own_header_when_nested && n_span > 0 {
                for label in &field.header_labels {
                    grid.set(n_row, n_col, label, style);
                    grid.merge(SpecMergeRange::new(n_row, n_row, n_col, n_col + n_span - 1));
                    n_row += 1;
                }
            }
            plan_field_headers(
                grid,
                styles,
                &field.child_layout,
                n_row,
                n_col,
                n_rows_avail - (n_row - top_row),
            );
        }
        n_col += n_span;
    }
}

/// Fuse adjacent header blocks sharing identical, non-blank text.
///
/// Blocks fuse only when they also share their bottom row, so every fused
/// rectangle replaces exactly the merges it absorbs.
pub fn merge_repeated_header_labels(grid: &mut HeaderGrid) {
    for n_row in 0..grid.n_rows {
        let mut l_runs: Vec<Vec<SpecHeaderBlock>> = Vec::new();
        let mut l_run: Vec<SpecHeaderBlock> = Vec::new();

        let mut n_col = 0;
        while n_col < grid.n_cols {
            let block = match grid.derive_covering_merge(n_row, n_col) {
                Some(idx) => {
                    let merge = grid.l_merges[idx];
                    if merge.row_start != n_row || merge.col_start != n_col {
                        l_runs.push(std::mem::take(&mut l_run));
                        n_col = merge.col_end + 1;
                        continue;
                    }
                    SpecHeaderBlock {
                        col_start: n_col,
                        col_end: merge.col_end,
                        row_end: merge.row_end,
                        idx_merge: Some(idx),
                    }
                }
                None => SpecHeaderBlock {
                    col_start: n_col,
                    col_end: n_col,
                    row_end: n_row,
                    idx_merge: None,
                },
            };
            n_col = block.col_end + 1;

            if grid.is_blank_at(n_row, block.col_start) {
                l_runs.push(std::mem::take(&mut l_run));
                continue;
            }
            let if_extends = l_run.last().is_some_and(|last| {
                last.row_end == block.row_end
                    && grid.text(n_row, last.col_start) == grid.text(n_row, block.col_start)
            });
            if !if_extends {
                l_runs.push(std::mem::take(&mut l_run));
            }
            l_run.push(block);
        }
        l_runs.push(l_run);

        let mut l_idx_removed: Vec<usize> = Vec::new();
        let mut l_fused: Vec<SpecMergeRange> = Vec::new();
        for run in l_runs.into_iter().filter(|run| run.len() > 1) {
            l_idx_removed.extend(run.iter().filter_map(|block| block.idx_merge));
            if let (Some(first), Some(last)) = (run.first(), run.last()) {
                l_fused.push(SpecMergeRange::new(
                    n_row,
                    first.row_end,
                    first.col_start,
                    last.col_end,
                ));
            }
        }
        l_idx_removed.sort_unstable();
        for idx in l_idx_removed.into_iter().rev() {
            grid.l_merges.remove(idx);
        }
        grid.l_merges.extend(l_fused);
    }
}

/// Write a planned header block with its top edge at `top_row`.
pub fn write_header_grid<B: SpreadsheetBackend>(
    backend: &mut B,
    sheet: SheetId,
    grid: &HeaderGrid,
    top_row: usize,
) -> Result<(), RenderError> {
    let spec_blank = SpecCellStyle::default();
    for merge in &grid.l_merges {
        let spec = grid
            .cell(merge.row_start, merge.col_start)
            .map_or(&spec_blank, |cell| &cell.style);
        let style = backend.materialize_style(spec);
        backend.merge_range(
            sheet,
            SpecMergeRange::new(
                top_row + merge.row_start,
                top_row + merge.row_end,
                merge.col_start,
                merge.col_end,
            ),
            &style,
        )?;
    }

    for n_row in 0..grid.n_rows {
        for n_col in 0..grid.n_cols {
            let Some(cell) = grid.cell(n_row, n_col) else {
                continue;
            };
            if grid.is_covered(n_row, n_col) {
                continue;
            }
            let style = backend.materialize_style(&cell.style);
            backend.write_cell(
                sheet,
                top_row + n_row,
                n_col,
                &CellValue::Text(cell.text.clone()),
                ValueKind::Text,
                &style,
            )?;
        }
    }
    Ok(())
}
