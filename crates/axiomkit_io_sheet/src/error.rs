//! Error families raised while resolving layouts and writing sheets.

use std::path::PathBuf;

use thiserror::Error;

use crate::spec::SpecMergeRange;
use crate::value::ValueKind;

/// Non-retryable layout declaration errors, raised at resolution time.
///
/// A failing resolution never leaves a cached layout behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("type `{type_name}` carries no sheet layout metadata")]
    MissingSheetMetadata { type_name: &'static str },

    #[error("field `{field}` of `{type_name}` declares no value accessor")]
    MissingAccessor {
        type_name: &'static str,
        field: String,
    },

    #[error("field `{field}` of `{type_name}` declares an empty header label list")]
    MissingHeaderLabels {
        type_name: &'static str,
        field: String,
    },

    #[error(
        "`{type_name}` resolves more than one multi-valued field: `{first}` and `{second}`"
    )]
    DuplicateMultiValued {
        type_name: &'static str,
        first: String,
        second: String,
    },

    #[error(
        "transform `{transform}` on field `{field}` of `{type_name}` accepts {expected} input, \
         field is declared as {actual}"
    )]
    TransformTypeMismatch {
        type_name: &'static str,
        field: String,
        transform: &'static str,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("field `{field}` of `{type_name}` requires nested-capable element type `{element}`")]
    NestedTypeUnresolved {
        type_name: &'static str,
        field: String,
        element: &'static str,
    },

    #[error("nested type `{type_name}` declares no fields")]
    EmptyNestedLayout { type_name: &'static str },

    #[error("cyclic layout reference: {}", path.join(" -> "))]
    CyclicReference { path: Vec<String> },

    #[error("layout nesting deeper than {max_depth} at `{type_name}`")]
    DepthLimitExceeded {
        type_name: &'static str,
        max_depth: usize,
    },
}

/// Errors raised while materializing a sheet into a backend.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no cell writer for value type {kind}")]
    UnsupportedValueType { kind: ValueKind },

    #[error("cannot write {found} value as {expected}")]
    ValueKindMismatch {
        expected: ValueKind,
        found: &'static str,
    },

    #[error("field `{field}` read a record that is not a `{expected}`")]
    RecordTypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("accessor of field `{field}` returned a value of the wrong shape")]
    AccessorShapeMismatch { field: String },

    #[error("row index {row} exceeds the worksheet row limit")]
    RowOverflow { row: usize },

    #[error("column index {col} exceeds the worksheet column limit")]
    ColumnOverflow { col: usize },

    #[error("merge {range} overlaps existing merge {existing}")]
    MergeOverlap {
        range: SpecMergeRange,
        existing: SpecMergeRange,
    },

    #[error("unknown sheet handle {sheet}")]
    UnknownSheet { sheet: usize },

    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Caller misuse of the writer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unsupported output target `{}`: only .xlsx files are written", path.display())]
    UnsupportedOutputTarget { path: PathBuf },

    #[error("document is already finalized")]
    AlreadyFinalized,

    #[error("document is poisoned by an earlier render failure")]
    Poisoned,

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

/// Umbrella error of the public writer surface.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
