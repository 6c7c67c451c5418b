//! Writer orchestrator: queued datasets rendered into one document.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{SpreadsheetBackend, XlsxBackend};
use crate::conf::{N_NCOLS_EXCEL_MAX, TUP_EXCEL_ILLEGAL};
use crate::content::ContentRenderer;
use crate::error::{ConfigurationError, ExportError, RenderError};
use crate::header::{plan_header_grid, write_header_grid};
use crate::layout::SheetLayout;
use crate::resolver::SchemaResolver;
use crate::schema::{AnyRecord, SheetRecord};
use crate::spec::{
    EnumStyleRole, SpecDocumentStyles, SpecMergeRange, SpecSheetReport, SpecSheetWriteOptions,
};
use crate::style::StyleResolver;
use crate::util::{derive_unique_sheet_name, sanitize_sheet_name};
use crate::value::{CellValue, ValueKind};

/// One queued `(layout, instances)` pair.
pub struct RenderDataset<'d> {
    pub layout: Arc<SheetLayout>,
    pub instances: Vec<&'d AnyRecord>,
}

/// Lifecycle of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumDocumentState {
    /// Accepts datasets.
    Open,
    /// Serialized; terminal.
    Finalized,
    /// A render or serialize step failed; terminal.
    Poisoned,
}

/// Stateful document writer.
///
/// Datasets are queued by [`Self::render`] and written, one sheet each and
/// in registration order, by [`Self::finalize`].
pub struct SheetWriter<'d, B: SpreadsheetBackend = XlsxBackend> {
    resolver: Arc<SchemaResolver>,
    backend: B,
    styles: StyleResolver,
    options: SpecSheetWriteOptions,
    l_datasets: Vec<RenderDataset<'d>>,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecSheetReport>,
    state: EnumDocumentState,
}

impl<'d> SheetWriter<'d, XlsxBackend> {
    /// Create an xlsx document writer with default styles and options.
    pub fn new(resolver: Arc<SchemaResolver>) -> Self {
        Self::from_parts(
            resolver,
            XlsxBackend::new(),
            SpecDocumentStyles::default(),
            SpecSheetWriteOptions::default(),
        )
    }

    /// Finalize into an `.xlsx` file; other extensions are rejected.
    pub fn finalize_to_path(&mut self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let if_xlsx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        if !if_xlsx {
            return Err(ConfigurationError::UnsupportedOutputTarget {
                path: path.to_path_buf(),
            }
            .into());
        }
        self.validate_open()?;

        let file = File::create(path).map_err(RenderError::from)?;
        let mut writer = BufWriter::new(file);
        self.finalize(&mut writer)?;
        writer.flush().map_err(RenderError::from)?;
        Ok(())
    }
}

impl<'d, B: SpreadsheetBackend> SheetWriter<'d, B> {
    /// Create a writer over an explicit backend.
    pub fn with_backend(
        resolver: Arc<SchemaResolver>,
        backend: B,
        styles: SpecDocumentStyles,
        options: SpecSheetWriteOptions,
    ) -> Result<Self, ConfigurationError> {
        if TUP_EXCEL_ILLEGAL
            .iter()
            .any(|c_illegal| options.sheet_name_replacement.contains(c_illegal))
        {
            return Err(ConfigurationError::InvalidOption(format!(
                "sheet_name_replacement {:?} contains a character illegal in sheet names",
                options.sheet_name_replacement
            )));
        }
        Ok(Self::from_parts(resolver, backend, styles, options))
    }

    fn from_parts(
        resolver: Arc<SchemaResolver>,
        backend: B,
        styles: SpecDocumentStyles,
        options: SpecSheetWriteOptions,
    ) -> Self {
        Self {
            resolver,
            backend,
            styles: StyleResolver::new(styles),
            options,
            l_datasets: Vec::new(),
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            state: EnumDocumentState::Open,
        }
    }

    /// Queue `instances` as one sheet. Schema errors surface here.
    pub fn render<T: SheetRecord>(&mut self, instances: &'d [T]) -> Result<&mut Self, ExportError> {
        self.validate_open()?;
        let layout = self.resolver.get_layout::<T>()?;
        self.l_datasets.push(RenderDataset {
            layout,
            instances: instances
                .iter()
                .map(|instance| instance as &AnyRecord)
                .collect(),
        });
        Ok(self)
    }

    /// Write every queued dataset, then serialize the document into `output`.
    pub fn finalize(&mut self, output: &mut dyn Write) -> Result<(), ExportError> {
        self.validate_open()?;
        match self.write_document(output) {
            Ok(()) => {
                self.state = EnumDocumentState::Finalized;
                info!(
                    n_sheets = self.l_reports.len(),
                    n_rows = self.l_reports.iter().map(SpecSheetReport::n_rows_total).sum::<usize>(),
                    "finalized sheet document"
                );
                Ok(())
            }
            Err(err) => {
                self.state = EnumDocumentState::Poisoned;
                Err(err.into())
            }
        }
    }

    pub fn finalize_to_buffer(&mut self) -> Result<Vec<u8>, ExportError> {
        let mut v_buffer = Vec::new();
        self.finalize(&mut v_buffer)?;
        Ok(v_buffer)
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecSheetReport> {
        self.l_reports.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> EnumDocumentState {
        self.state
    }

    /// Datasets queued and not yet written.
    pub fn n_pending(&self) -> usize {
        self.l_datasets.len()
    }

    fn validate_open(&self) -> Result<(), ConfigurationError> {
        match self.state {
            EnumDocumentState::Open => Ok(()),
            EnumDocumentState::Finalized => Err(ConfigurationError::AlreadyFinalized),
            EnumDocumentState::Poisoned => Err(ConfigurationError::Poisoned),
        }
    }

    fn write_document(&mut self, output: &mut dyn Write) -> Result<(), RenderError> {
        let l_datasets = std::mem::take(&mut self.l_datasets);
        for dataset in &l_datasets {
            let report = self.write_sheet(dataset)?;
            self.l_reports.push(report);
        }
        self.backend.serialize(output)
    }

    fn write_sheet(&mut self, dataset: &RenderDataset<'_>) -> Result<SpecSheetReport, RenderError> {
        let layout = dataset.layout.as_ref();
        let n_cols = layout.column_span();
        if n_cols > N_NCOLS_EXCEL_MAX {
            return Err(RenderError::ColumnOverflow { col: n_cols - 1 });
        }

        let c_sheet_name_clean =
            sanitize_sheet_name(&layout.title, &self.options.sheet_name_replacement);
        let c_sheet_name =
            derive_unique_sheet_name(&c_sheet_name_clean, &mut self.set_sheet_names_existing);

        let mut report = SpecSheetReport {
            sheet_name: c_sheet_name.clone(),
            n_cols,
            n_instances: dataset.instances.len(),
            ..Default::default()
        };
        if c_sheet_name != layout.title {
            warn!(title = %layout.title, sheet_name = %c_sheet_name, "sheet name adjusted");
            report.warn(format!(
                "sheet name {:?} written as {:?}",
                layout.title, c_sheet_name
            ));
        }

        let sheet = self.backend.create_sheet(&c_sheet_name)?;
        let mut n_row = 0;

        if layout.show_title_row {
            let spec = self
                .styles
                .resolve(EnumStyleRole::Title, layout.title_style.as_ref());
            let style = self.backend.materialize_style(spec);
            self.backend.write_cell(
                sheet,
                0,
                0,
                &CellValue::Text(layout.title.clone()),
                ValueKind::Text,
                &style,
            )?;
            self.backend.merge_range(
                sheet,
                SpecMergeRange::new(0, 0, 0, n_cols.saturating_sub(1)),
                &style,
            )?;
            n_row = 1;
            report.n_rows_title = 1;
        }

        let grid = plan_header_grid(layout, &self.styles, &self.options.row_index_label);
        write_header_grid(&mut self.backend, sheet, &grid, n_row)?;
        n_row += grid.n_rows();
        report.n_rows_header = grid.n_rows();

        if layout.freeze_header_and_title {
            let n_cols_freeze = self
                .options
                .col_freeze
                .unwrap_or(usize::from(layout.show_row_index_column));
            self.backend.freeze_panes(sheet, n_row, n_cols_freeze)?;
        }

        report.n_rows_content = ContentRenderer::new(&mut self.backend, sheet, &self.styles)
            .render_rows(layout, n_row, &dataset.instances)?;

        debug!(
            sheet_name = %report.sheet_name,
            type_name = layout.type_name,
            n_instances = report.n_instances,
            n_rows = report.n_rows_total(),
            n_cols = report.n_cols,
            "wrote sheet"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::spec::SpecCellStyle;
    use crate::testing::{
        Blobby, Colleague, DoubleMulti, Quarterly, QuotedQuarter, SalesLower, SalesUpper, Student,
        Teacher, derive_teacher,
    };

    fn derive_memory_writer<'d>(
        styles: SpecDocumentStyles,
        options: SpecSheetWriteOptions,
    ) -> SheetWriter<'d, MemoryBackend> {
        SheetWriter::with_backend(
            Arc::new(SchemaResolver::new()),
            MemoryBackend::new(),
            styles,
            options,
        )
        .unwrap()
    }

    fn derive_row(sheet: &crate::backend::MemorySheet, n_row: usize) -> Vec<String> {
        (0..sheet.n_cols()).map(|c| sheet.text(n_row, c)).collect()
    }

    #[test]
    fn test_teacher_sheet_title_header_freeze_and_content() {
        let l_teachers = vec![derive_teacher(
            "Ada",
            41,
            Some(vec![Student::new("Bob", 10), Student::new("Cy", 11)]),
            Some(Colleague::new("Eve", 50)),
        )];
        let mut writer =
            derive_memory_writer(SpecDocumentStyles::default(), SpecSheetWriteOptions::default());
        writer.render(&l_teachers).unwrap();
        writer.finalize(&mut std::io::sink()).unwrap();

        let sheet = writer.backend().sheet("Teacher").unwrap();
        assert_eq!(sheet.text(0, 0), "Teacher");
        assert_eq!(sheet.merge_at(0, 0), Some(SpecMergeRange::new(0, 0, 0, 6)));
        assert_eq!(
            derive_row(sheet, 1),
            vec!["No.", "Age", "Students", "", "Name", "Mentor", ""]
        );
        assert_eq!(derive_row(sheet, 2), vec!["", "", "Name", "Age", "", "Age", "Name"]);
        assert_eq!(sheet.freeze(), Some((3, 1)));
        assert_eq!(
            derive_row(sheet, 3),
            vec!["1", "41", "Bob", "10", "Ada", "50", "Eve"]
        );
        assert_eq!(sheet.text(4, 2), "Cy");
        assert_eq!(sheet.merge_at(3, 4), Some(SpecMergeRange::new(3, 4, 4, 4)));

        let l_reports = writer.report();
        assert_eq!(l_reports.len(), 1);
        assert_eq!(
            l_reports[0],
            SpecSheetReport {
                sheet_name: "Teacher".to_string(),
                n_rows_title: 1,
                n_rows_header: 2,
                n_rows_content: 2,
                n_cols: 7,
                n_instances: 1,
                warnings: vec![],
            }
        );
        assert_eq!(writer.state(), EnumDocumentState::Finalized);
    }

    #[test]
    fn test_empty_instances_write_header_only() {
        let l_teachers: Vec<Teacher> = vec![];
        let mut writer =
            derive_memory_writer(SpecDocumentStyles::default(), SpecSheetWriteOptions::default());
        writer.render(&l_teachers).unwrap();
        writer.finalize(&mut std::io::sink()).unwrap();

        let report = &writer.report()[0];
        assert_eq!(report.n_rows_content, 0);
        assert_eq!(writer.backend().sheets()[0].n_rows(), 3);
    }

    #[test]
    fn test_sheet_names_are_sanitized_and_deduplicated() {
        let l_quarters = vec![Quarterly {
            region: "North".to_string(),
        }];
        let l_teachers: Vec<Teacher> = vec![];
        let mut writer =
            derive_memory_writer(SpecDocumentStyles::default(), SpecSheetWriteOptions::default());
        writer
            .render(&l_quarters)
            .unwrap()
            .render(&l_teachers)
            .unwrap()
            .render(&l_teachers)
            .unwrap();
        assert_eq!(writer.n_pending(), 3);
        writer.finalize(&mut std::io::sink()).unwrap();

        let l_names: Vec<String> = writer.report().into_iter().map(|r| r.sheet_name).collect();
        assert_eq!(l_names, vec!["Q1_Q2_ Sales", "Teacher", "Teacher__2"]);
        let l_reports = writer.report();
        assert_eq!(l_reports[0].warnings.len(), 1);
        assert!(l_reports[1].warnings.is_empty());
        assert_eq!(l_reports[2].warnings.len(), 1);
        assert_eq!(writer.n_pending(), 0);
    }

    #[test]
    fn test_document_styles_cascade_below_type_styles() {
        let red = SpecCellStyle {
            bg_color: Some("#FF0000".to_string()),
            ..Default::default()
        };
        let l_teachers: Vec<Teacher> = vec![];
        let mut writer = derive_memory_writer(
            SpecDocumentStyles::default().with_role(EnumStyleRole::Header, red.clone()),
            SpecSheetWriteOptions::default(),
        );
        writer.render(&l_teachers).unwrap();
        writer.finalize(&mut std::io::sink()).unwrap();

        let sheet = writer.backend().sheet("Teacher").unwrap();
        assert_eq!(sheet.cell(1, 1).map(|c| &c.style), Some(&red));
        assert_eq!(
            sheet.cell(2, 5).and_then(|c| c.style.bg_color.as_deref()),
            Some("#FFFF00")
        );
    }

    #[test]
    fn test_state_transitions() {
        let l_teachers: Vec<Teacher> = vec![];
        let l_double: Vec<DoubleMulti> = vec![];
        let mut writer =
            derive_memory_writer(SpecDocumentStyles::default(), SpecSheetWriteOptions::default());

        assert!(matches!(
            writer.render(&l_double),
            Err(ExportError::Schema(_))
        ));
        assert_eq!(writer.state(), EnumDocumentState::Open);

        writer.render(&l_teachers).unwrap();
        writer.finalize(&mut std::io::sink()).unwrap();
        assert!(matches!(
            writer.finalize(&mut std::io::sink()),
            Err(ExportError::Configuration(ConfigurationError::AlreadyFinalized))
        ));
        assert!(matches!(
            writer.render(&l_teachers),
            Err(ExportError::Configuration(ConfigurationError::AlreadyFinalized))
        ));
    }

    #[test]
    fn test_render_failure_poisons_document() {
        let l_blobs = vec![Blobby {
            payload: vec![1, 2],
        }];
        let mut writer =
            derive_memory_writer(SpecDocumentStyles::default(), SpecSheetWriteOptions::default());
        writer.render(&l_blobs).unwrap();

        assert!(matches!(
            writer.finalize(&mut std::io::sink()),
            Err(ExportError::Render(RenderError::UnsupportedValueType { .. }))
        ));
        assert_eq!(writer.state(), EnumDocumentState::Poisoned);
        assert!(matches!(
            writer.finalize(&mut std::io::sink()),
            Err(ExportError::Configuration(ConfigurationError::Poisoned))
        ));
    }

    #[test]
    fn test_options_control_freeze_and_row_index_label() {
        let l_teachers: Vec<Teacher> = vec![];
        let mut writer = derive_memory_writer(
            SpecDocumentStyles::default(),
            SpecSheetWriteOptions {
                row_index_label: "#".to_string(),
                col_freeze: Some(2),
                ..Default::default()
            },
        );
        writer.render(&l_teachers).unwrap();
        writer.finalize(&mut std::io::sink()).unwrap();

        let sheet = writer.backend().sheet("Teacher").unwrap();
        assert_eq!(sheet.text(1, 0), "#");
        assert_eq!(sheet.freeze(), Some((3, 2)));
    }

    #[test]
    fn test_illegal_replacement_is_rejected() {
        let result = SheetWriter::with_backend(
            Arc::new(SchemaResolver::new()),
            MemoryBackend::new(),
            SpecDocumentStyles::default(),
            SpecSheetWriteOptions {
                sheet_name_replacement: "/".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ConfigurationError::InvalidOption(_))));
    }

    #[test]
    fn test_finalize_to_path_accepts_only_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let l_teachers = vec![derive_teacher("Ada", 41, None, None)];

        let mut writer = SheetWriter::new(Arc::new(SchemaResolver::new()));
        writer.render(&l_teachers).unwrap();
        let path_csv = dir.path().join("out.csv");
        assert!(matches!(
            writer.finalize_to_path(&path_csv),
            Err(ExportError::Configuration(ConfigurationError::UnsupportedOutputTarget { .. }))
        ));
        assert!(!path_csv.exists());
        assert_eq!(writer.state(), EnumDocumentState::Open);

        let path_xlsx = dir.path().join("out.XLSX");
        writer.finalize_to_path(&path_xlsx).unwrap();
        let v_bytes = std::fs::read(&path_xlsx).unwrap();
        assert_eq!(&v_bytes[..2], b"PK");
    }

    #[test]
    fn test_shared_resolver_serves_many_documents() {
        let resolver = Arc::new(SchemaResolver::new());
        let l_teachers = vec![derive_teacher("Ada", 41, None, None)];

        for _ in 0..2 {
            let mut writer = SheetWriter::new(Arc::clone(&resolver));
            writer.render(&l_teachers).unwrap();
            assert!(!writer.finalize_to_buffer().unwrap().is_empty());
        }
        assert!(resolver.is_cached::<Teacher>());
    }

    #[test]
    fn test_xlsx_accepts_case_colliding_and_quoted_titles() {
        let l_upper = vec![SalesUpper {
            region: "North".to_string(),
        }];
        let l_lower = vec![SalesLower {
            region: "South".to_string(),
        }];
        let l_quoted = vec![QuotedQuarter {
            region: "East".to_string(),
        }];
        let mut writer = SheetWriter::new(Arc::new(SchemaResolver::new()));
        writer
            .render(&l_upper)
            .unwrap()
            .render(&l_lower)
            .unwrap()
            .render(&l_quoted)
            .unwrap();

        let v_bytes = writer.finalize_to_buffer().unwrap();
        assert_eq!(&v_bytes[..2], b"PK");
        assert_eq!(writer.state(), EnumDocumentState::Finalized);
        assert_eq!(writer.backend().sheet_names(), vec!["Sales", "sales__2", "Q1"]);

        let l_reports = writer.report();
        assert!(l_reports[0].warnings.is_empty());
        assert_eq!(l_reports[1].warnings.len(), 1);
        assert_eq!(l_reports[2].warnings.len(), 1);
    }

    #[test]
    fn test_many_datasets_with_one_title_get_distinct_sheets() {
        let l_teachers: Vec<Teacher> = vec![];
        let mut writer =
            derive_memory_writer(SpecDocumentStyles::default(), SpecSheetWriteOptions::default());
        for _ in 0..12 {
            writer.render(&l_teachers).unwrap();
        }
        writer.finalize(&mut std::io::sink()).unwrap();

        let l_names: Vec<String> = writer.report().into_iter().map(|r| r.sheet_name).collect();
        assert_eq!(l_names.len(), 12);
        assert_eq!(l_names[11], "Teacher__12");
        assert_eq!(l_names.iter().collect::<BTreeSet<_>>().len(), 12);
    }
}
