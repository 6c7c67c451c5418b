//! `axiomkit_io_sheet` v1:
//! Object-graph to spreadsheet layout engine.
//!
//! - `conf`     : constants and built-in style presets
//! - `spec`     : styles/options/reports
//! - `error`    : schema, render and configuration errors
//! - `value`    : cell values, value kinds and transforms
//! - `schema`   : per-type sheet declarations
//! - `layout`   : resolved, immutable layout trees
//! - `resolver` : declaration to layout resolution with caching
//! - `geometry` : column and row spans
//! - `style`    : style cascade
//! - `header`   : header block planning and writing
//! - `content`  : instance row rendering
//! - `backend`  : spreadsheet backends (xlsx, in-memory)
//! - `writer`   : document orchestrator
//! - `util`     : pure helper functions
pub mod backend;
pub mod conf;
pub mod content;
pub mod error;
pub mod geometry;
pub mod header;
pub mod layout;
pub mod resolver;
pub mod schema;
pub mod spec;
pub mod style;
pub mod util;
pub mod value;
pub mod writer;

#[cfg(test)]
mod testing;

pub use backend::{MemoryBackend, SheetId, SpreadsheetBackend, XlsxBackend};
pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use error::{ConfigurationError, ExportError, RenderError, SchemaError};
pub use layout::{FieldLayout, SheetLayout};
pub use resolver::SchemaResolver;
pub use schema::{AnyRecord, FieldDecl, SheetDecl, SheetRecord};
pub use spec::{
    EnumStyleRole, SpecAutofitCellsPolicy, SpecCellStyle, SpecDocumentStyles, SpecMergeRange,
    SpecSheetReport, SpecSheetWriteOptions, SpecXlsxBackendOptions,
};
pub use value::{BoolToMark, CellValue, DisplayText, IntegerToText, ValueKind, ValueTransform};
pub use writer::{EnumDocumentState, RenderDataset, SheetWriter};
