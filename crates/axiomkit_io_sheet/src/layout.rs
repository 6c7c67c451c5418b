//! Resolved, immutable layout tree.

use std::fmt;
use std::sync::Arc;

use crate::error::RenderError;
use crate::geometry::{sheet_column_span, sheet_row_span};
use crate::schema::{AnyRecord, ErasedAccessor};
use crate::spec::SpecCellStyle;
use crate::value::{CellValue, FieldValue, ValueKind, ValueTransform};

/// Shared transform instance bound to a field.
#[derive(Clone)]
pub struct SpecValueTransform {
    /// Type name of the transform.
    pub name: &'static str,
    pub(crate) inner: Arc<dyn ValueTransform>,
}

impl SpecValueTransform {
    pub fn input_kind(&self) -> ValueKind {
        self.inner.input_kind()
    }

    pub fn output_kind(&self) -> ValueKind {
        self.inner.output_kind()
    }
}

impl fmt::Debug for SpecValueTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecValueTransform")
            .field("name", &self.name)
            .field("input_kind", &self.input_kind())
            .field("output_kind", &self.output_kind())
            .finish()
    }
}

/// One declared field's layout contract.
#[derive(Clone)]
pub struct FieldLayout {
    pub name: String,
    /// Ascending sort key among siblings.
    pub order: i32,
    /// One label per header row the field occupies.
    pub header_labels: Vec<String>,
    /// Declared collection, or nested over a multi-valued descendant.
    pub is_multi_valued: bool,
    /// Declared as a one-to-many collection.
    pub is_collection: bool,
    pub is_nested: bool,
    pub show_own_header_when_nested: bool,
    /// Fields of the nested type, sorted; empty for leaves.
    pub child_layout: Vec<FieldLayout>,
    /// Effective written kind, after any transform.
    pub value_kind: ValueKind,
    pub value_transform: Option<SpecValueTransform>,
    pub head_style: Option<SpecCellStyle>,
    pub content_style: Option<SpecCellStyle>,
    pub(crate) accessor: ErasedAccessor,
    pub(crate) owner_type_name: &'static str,
}

impl FieldLayout {
    /// Read this field from a record of the owning type.
    pub(crate) fn read<'a>(&self, record: &'a AnyRecord) -> Result<FieldValue<'a>, RenderError> {
        (self.accessor)(record).ok_or_else(|| RenderError::RecordTypeMismatch {
            field: self.name.clone(),
            expected: self.owner_type_name,
        })
    }

    /// Run the field transform over one non-empty value.
    pub(crate) fn apply_transform(&self, value: CellValue) -> Result<CellValue, RenderError> {
        match &self.value_transform {
            Some(transform) if !value.is_empty() => transform.inner.convert(&value),
            _ => Ok(value),
        }
    }
}

impl fmt::Debug for FieldLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldLayout")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("header_labels", &self.header_labels)
            .field("is_multi_valued", &self.is_multi_valued)
            .field("is_collection", &self.is_collection)
            .field("is_nested", &self.is_nested)
            .field(
                "show_own_header_when_nested",
                &self.show_own_header_when_nested,
            )
            .field("child_layout", &self.child_layout)
            .field("value_kind", &self.value_kind)
            .field("value_transform", &self.value_transform)
            .finish_non_exhaustive()
    }
}

/// Resolved description of one record type.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub title: String,
    pub show_title_row: bool,
    pub show_row_index_column: bool,
    pub freeze_header_and_title: bool,
    /// Per-type title style.
    pub title_style: Option<SpecCellStyle>,
    /// Per-type row-index style.
    pub row_index_style: Option<SpecCellStyle>,
    /// Fields sorted by `order`, declaration order on ties.
    pub fields: Vec<FieldLayout>,
    pub has_multi_valued_descendant: bool,
    /// Dotted path of the single multi-valued declaration, if any.
    pub multi_valued_path: Option<String>,
    pub type_name: &'static str,
    n_cols: usize,
    n_rows_header: usize,
}

impl SheetLayout {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        type_name: &'static str,
        title: String,
        show_title_row: bool,
        show_row_index_column: bool,
        freeze_header_and_title: bool,
        title_style: Option<SpecCellStyle>,
        row_index_style: Option<SpecCellStyle>,
        fields: Vec<FieldLayout>,
        multi_valued_path: Option<String>,
    ) -> Self {
        let n_cols = sheet_column_span(&fields, show_row_index_column);
        let n_rows_header = sheet_row_span(&fields);
        Self {
            title,
            show_title_row,
            show_row_index_column,
            freeze_header_and_title,
            title_style,
            row_index_style,
            fields,
            has_multi_valued_descendant: multi_valued_path.is_some(),
            multi_valued_path,
            type_name,
            n_cols,
            n_rows_header,
        }
    }

    /// Grid columns of the sheet, row-index column included.
    pub fn column_span(&self) -> usize {
        self.n_cols
    }

    /// Header rows of the sheet.
    pub fn row_span(&self) -> usize {
        self.n_rows_header
    }
}

#[cfg(test)]
impl FieldLayout {
    pub(crate) fn test_leaf(name: &str, labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            order: -1,
            header_labels: labels.iter().map(|s| s.to_string()).collect(),
            is_multi_valued: false,
            is_collection: false,
            is_nested: false,
            show_own_header_when_nested: false,
            child_layout: vec![],
            value_kind: ValueKind::Any,
            value_transform: None,
            head_style: None,
            content_style: None,
            accessor: crate::schema::erase(|_| None),
            owner_type_name: "test",
        }
    }

    pub(crate) fn test_nested(
        name: &str,
        labels: &[&str],
        if_show_own_header: bool,
        children: Vec<FieldLayout>,
    ) -> Self {
        Self {
            is_nested: true,
            show_own_header_when_nested: if_show_own_header,
            child_layout: children,
            ..Self::test_leaf(name, labels)
        }
    }
}
