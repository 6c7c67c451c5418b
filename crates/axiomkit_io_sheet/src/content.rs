//! Content rendering: record instances flattened into sheet rows.

use crate::backend::{SheetId, SpreadsheetBackend};
use crate::error::RenderError;
use crate::geometry::{column_span, derive_leaf_columns};
use crate::layout::{FieldLayout, SheetLayout};
use crate::schema::AnyRecord;
use crate::spec::{EnumStyleRole, SpecCellStyle, SpecMergeRange};
use crate::style::StyleResolver;
use crate::value::{CellValue, FieldValue, ValueKind};

/// Writes record blocks of one sheet into a backend.
pub struct ContentRenderer<'w, B: SpreadsheetBackend> {
    backend: &'w mut B,
    sheet: SheetId,
    styles: &'w StyleResolver,
}

impl<'w, B: SpreadsheetBackend> ContentRenderer<'w, B> {
    pub fn new(backend: &'w mut B, sheet: SheetId, styles: &'w StyleResolver) -> Self {
        Self {
            backend,
            sheet,
            styles,
        }
    }

    /// Render `instances` from `top_row` down; return the rows consumed.
    ///
    /// Each instance block gets a 1-based index in the row-index column,
    /// merged over the block, when the layout shows one.
    pub fn render_rows(
        &mut self,
        layout: &SheetLayout,
        top_row: usize,
        instances: &[&AnyRecord],
    ) -> Result<usize, RenderError> {
        let n_col_start = usize::from(layout.show_row_index_column);
        let style_row_index =
            self.materialize(EnumStyleRole::RowIndex, layout.row_index_style.as_ref());

        let mut n_row = top_row;
        for (n_idx, record) in instances.iter().enumerate() {
            let n_rows = self.render_row(&layout.fields, n_row, n_col_start, Some(*record))?;
            if layout.show_row_index_column {
                self.backend.write_cell(
                    self.sheet,
                    n_row,
                    0,
                    &CellValue::Integer(n_idx as i64 + 1),
                    ValueKind::Integer,
                    &style_row_index,
                )?;
                self.backend.merge_range(
                    self.sheet,
                    SpecMergeRange::new(n_row, n_row + n_rows - 1, 0, 0),
                    &style_row_index,
                )?;
            }
            n_row += n_rows;
        }
        Ok(n_row - top_row)
    }

    /// Render one record block; `None` renders blank leaves. Returns rows used, at least 1.
    pub fn render_row(
        &mut self,
        fields: &[FieldLayout],
        top_row: usize,
        top_col: usize,
        record: Option<&AnyRecord>,
    ) -> Result<usize, RenderError> {
        let mut n_rows = 1usize;
        let mut l_fixed: Vec<(usize, &FieldLayout)> = Vec::new();
        let mut l_padded: Vec<(usize, &FieldLayout, usize)> = Vec::new();

        let mut n_col = top_col;
        for field in fields {
            let value = record.map(|rec| field.read(rec)).transpose()?;

            if !field.is_nested && !field.is_multi_valued {
                let cell = match value {
                    None => CellValue::Empty,
                    Some(FieldValue::Scalar(cell)) => cell,
                    Some(_) => return Err(derive_shape_error(field)),
                };
                self.write_leaf(field, top_row, n_col, cell)?;
                l_fixed.push((n_col, field));
            } else if !field.is_nested {
                let l_cells = match value {
                    None | Some(FieldValue::List(None)) => Vec::new(),
                    Some(FieldValue::List(Some(l_cells))) => l_cells,
                    Some(FieldValue::Scalar(cell)) => vec![cell],
                    Some(_) => return Err(derive_shape_error(field)),
                };
                let n_written = usize::max(1, l_cells.len());
                if l_cells.is_empty() {
                    self.write_leaf(field, top_row, n_col, CellValue::Empty)?;
                }
                for (n_offset, cell) in l_cells.into_iter().enumerate() {
                    self.write_leaf(field, top_row + n_offset, n_col, cell)?;
                }
                n_rows = n_rows.max(n_written);
                l_padded.push((n_col, field, n_written));
            } else if !field.is_multi_valued {
                let child = derive_nested_record(field, value)?;
                self.render_row(&field.child_layout, top_row, n_col, child)?;
                l_fixed.extend(derive_leaf_columns(&field.child_layout, n_col));
            } else {
                let n_written = if field.is_collection {
                    match value {
                        None | Some(FieldValue::Records(None)) => {
                            self.render_row(&field.child_layout, top_row, n_col, None)?
                        }
                        Some(FieldValue::Records(Some(l_children))) => {
                            let mut n_written = 0;
                            for child in l_children {
                                n_written += self.render_row(
                                    &field.child_layout,
                                    top_row + n_written,
                                    n_col,
                                    Some(child),
                                )?;
                            }
                            n_written
                        }
                        Some(_) => return Err(derive_shape_error(field)),
                    }
                } else {
                    let child = derive_nested_record(field, value)?;
                    self.render_row(&field.child_layout, top_row, n_col, child)?
                };
                n_rows = n_rows.max(n_written);
                l_padded.extend(
                    derive_leaf_columns(&field.child_layout, n_col)
                        .into_iter()
                        .map(|(n_leaf_col, leaf)| (n_leaf_col, leaf, n_written)),
                );
            }
            n_col += column_span(field);
        }

        if n_rows > 1 {
            for (n_leaf_col, leaf) in l_fixed {
                let style = self.materialize(EnumStyleRole::Content, leaf.content_style.as_ref());
                self.backend.merge_range(
                    self.sheet,
                    SpecMergeRange::new(top_row, top_row + n_rows - 1, n_leaf_col, n_leaf_col),
                    &style,
                )?;
            }
        }
        for (n_leaf_col, leaf, n_written) in l_padded {
            if n_written >= n_rows {
                continue;
            }
            let style = self.materialize(EnumStyleRole::Content, leaf.content_style.as_ref());
            for n_row in (top_row + n_written)..(top_row + n_rows) {
                self.backend.write_cell(
                    self.sheet,
                    n_row,
                    n_leaf_col,
                    &CellValue::Empty,
                    ValueKind::Any,
                    &style,
                )?;
            }
        }
        Ok(n_rows)
    }

    fn write_leaf(
        &mut self,
        field: &FieldLayout,
        row: usize,
        col: usize,
        value: CellValue,
    ) -> Result<(), RenderError> {
        let value = field.apply_transform(value)?;
        let style = self.materialize(EnumStyleRole::Content, field.content_style.as_ref());
        self.backend
            .write_cell(self.sheet, row, col, &value, field.value_kind, &style)
    }

    fn materialize(&mut self, role: EnumStyleRole, field_override: Option<&SpecCellStyle>) -> B::Style {
        let styles = self.styles;
        self.backend
            .materialize_style(styles.resolve(role, field_override))
    }
}

fn derive_nested_record<'a>(
    field: &FieldLayout,
    value: Option<FieldValue<'a>>,
) -> Result<Option<&'a AnyRecord>, RenderError> {
    match value {
        None | Some(FieldValue::Record(None)) => Ok(None),
        Some(FieldValue::Record(Some(child))) => Ok(Some(child)),
        Some(_) => Err(derive_shape_error(field)),
    }
}

fn derive_shape_error(field: &FieldLayout) -> RenderError {
    RenderError::AccessorShapeMismatch {
        field: field.name.clone(),
    }
}
