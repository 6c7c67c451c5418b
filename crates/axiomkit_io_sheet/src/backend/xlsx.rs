//! Workbook backend on `rust_xlsxwriter`.
//!
//! Writes are queued per sheet and replayed into a fresh workbook on
//! [`SpreadsheetBackend::serialize`], so the whole document reaches the
//! output stream in one piece.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use indexmap::IndexMap;
use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::backend::{SheetId, SpreadsheetBackend};
use crate::conf::{C_NUM_FORMAT_DATE, C_NUM_FORMAT_DATETIME};
use crate::error::{ConfigurationError, RenderError};
use crate::spec::{SpecCellStyle, SpecMergeRange, SpecXlsxBackendOptions};
use crate::util::{
    cast_col_num, cast_row_num, derive_autofit_width, estimate_width_len, validate_cell_position,
    validate_policy_autofit,
};
use crate::value::{CellValue, ValueKind};

/// Interned style handle of an [`XlsxBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XlsxStyleId(usize);

struct QueuedCell {
    value: CellValue,
    style: XlsxStyleId,
}

struct QueuedSheet {
    name: String,
    dict_cells: IndexMap<(usize, usize), QueuedCell>,
    l_merges: Vec<(SpecMergeRange, XlsxStyleId)>,
    freeze: Option<(usize, usize)>,
}

/// `.xlsx` workbook backend.
pub struct XlsxBackend {
    options: SpecXlsxBackendOptions,
    l_sheets: Vec<QueuedSheet>,
    l_styles: Vec<SpecCellStyle>,
    dict_style_ids: HashMap<SpecCellStyle, XlsxStyleId>,
}

impl XlsxBackend {
    pub fn new() -> Self {
        Self {
            options: SpecXlsxBackendOptions::default(),
            l_sheets: Vec::new(),
            l_styles: Vec::new(),
            dict_style_ids: HashMap::new(),
        }
    }

    pub fn with_options(options: SpecXlsxBackendOptions) -> Result<Self, ConfigurationError> {
        validate_policy_autofit(&options.policy_autofit).map_err(ConfigurationError::InvalidOption)?;
        Ok(Self {
            options,
            ..Self::new()
        })
    }

    /// Sheet names in creation order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.l_sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    fn sheet_mut(&mut self, sheet: SheetId) -> Result<&mut QueuedSheet, RenderError> {
        self.l_sheets
            .get_mut(sheet.0)
            .ok_or(RenderError::UnknownSheet { sheet: sheet.0 })
    }

    fn intern_style(&mut self, style: &SpecCellStyle) -> XlsxStyleId {
        if let Some(id) = self.dict_style_ids.get(style) {
            return *id;
        }
        let id = XlsxStyleId(self.l_styles.len());
        self.l_styles.push(style.clone());
        self.dict_style_ids.insert(style.clone(), id);
        id
    }

    fn write_sheet(
        &self,
        worksheet: &mut Worksheet,
        sheet: &QueuedSheet,
        formats: &mut FormatTable<'_>,
    ) -> Result<(), RenderError> {
        for (range, style) in &sheet.l_merges {
            worksheet
                .merge_range(
                    cast_row_num(range.row_start)?,
                    cast_col_num(range.col_start)?,
                    cast_row_num(range.row_end)?,
                    cast_col_num(range.col_end)?,
                    "",
                    formats.get(*style, None),
                )
                .map_err(derive_xlsx_error)?;
        }

        for ((n_row, n_col), cell) in &sheet.dict_cells {
            let format = formats.get(cell.style, Some(&cell.value));
            write_cell_with_format(worksheet, *n_row, *n_col, &cell.value, format)?;
        }

        if let Some((n_rows, n_cols)) = sheet.freeze
            && (n_rows > 0 || n_cols > 0)
        {
            worksheet
                .set_freeze_panes(cast_row_num(n_rows)?, cast_col_num(n_cols)?)
                .map_err(derive_xlsx_error)?;
        }

        if self.options.policy_autofit.if_enabled {
            for (n_col, n_width_recorded) in derive_column_widths(sheet) {
                let n_width_final = derive_autofit_width(&self.options.policy_autofit, n_width_recorded);
                worksheet
                    .set_column_width(cast_col_num(n_col)?, n_width_final as f64)
                    .map_err(derive_xlsx_error)?;
            }
        }
        Ok(())
    }
}

impl Default for XlsxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SpreadsheetBackend for XlsxBackend {
    type Style = XlsxStyleId;

    fn create_sheet(&mut self, name: &str) -> Result<SheetId, RenderError> {
        self.l_sheets.push(QueuedSheet {
            name: name.to_string(),
            dict_cells: IndexMap::new(),
            l_merges: Vec::new(),
            freeze: None,
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
        style: &XlsxStyleId,
    ) -> Result<(), RenderError> {
        validate_cell_position(row, col)?;
        let value = value.coerce_to(kind)?;
        self.sheet_mut(sheet)?.dict_cells.insert(
            (row, col),
            QueuedCell {
                value,
                style: *style,
            },
        );
        Ok(())
    }

    fn merge_range(
        &mut self,
        sheet: SheetId,
        range: SpecMergeRange,
        style: &XlsxStyleId,
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
        sheet.l_merges.push((range, *style));
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

    fn materialize_style(&mut self, style: &SpecCellStyle) -> XlsxStyleId {
        self.intern_style(style)
    }

    fn serialize(&mut self, out: &mut dyn Write) -> Result<(), RenderError> {
        let mut formats = FormatTable::new(&self.l_styles);
        let mut workbook = Workbook::new();

        for sheet in &self.l_sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name).map_err(derive_xlsx_error)?;
            self.write_sheet(worksheet, sheet, &mut formats)?;
        }

        let v_bytes = workbook.save_to_buffer().map_err(derive_xlsx_error)?;
        out.write_all(&v_bytes)?;
        debug!(
            n_sheets = self.l_sheets.len(),
            n_formats = formats.dict_formats.len(),
            n_bytes = v_bytes.len(),
            "serialized xlsx workbook"
        );
        Ok(())
    }
}

/// `Format` per interned style and default number format, built on first use.
struct FormatTable<'s> {
    l_styles: &'s [SpecCellStyle],
    dict_formats: HashMap<(XlsxStyleId, Option<&'static str>), Format>,
}

impl<'s> FormatTable<'s> {
    fn new(l_styles: &'s [SpecCellStyle]) -> Self {
        Self {
            l_styles,
            dict_formats: HashMap::new(),
        }
    }

    /// Format of `style`; date values without a style number format get the default one.
    fn get(&mut self, style: XlsxStyleId, value: Option<&CellValue>) -> &Format {
        let c_num_format_default = value.and_then(derive_num_format_default);
        let l_styles = self.l_styles;
        self.dict_formats
            .entry((style, c_num_format_default))
            .or_insert_with(|| derive_rust_xlsx_format(&l_styles[style.0], c_num_format_default))
    }
}

fn derive_num_format_default(value: &CellValue) -> Option<&'static str> {
    match value {
        CellValue::Date(_) => Some(C_NUM_FORMAT_DATE),
        CellValue::DateTime(_) => Some(C_NUM_FORMAT_DATETIME),
        _ => None,
    }
}

/// Widest written value per column; multi-column merge anchors are skipped.
fn derive_column_widths(sheet: &QueuedSheet) -> Vec<(usize, usize)> {
    let n_cols = sheet
        .dict_cells
        .keys()
        .map(|(_, n_col)| n_col + 1)
        .max()
        .unwrap_or(0);
    let mut l_width_by_col = vec![0usize; n_cols];
    let set_spanning_anchors: HashSet<(usize, usize)> = sheet
        .l_merges
        .iter()
        .filter(|(range, _)| range.n_cols() > 1)
        .map(|(range, _)| (range.row_start, range.col_start))
        .collect();

    for ((n_row, n_col), cell) in &sheet.dict_cells {
        if set_spanning_anchors.contains(&(*n_row, *n_col)) {
            continue;
        }
        l_width_by_col[*n_col] = usize::max(l_width_by_col[*n_col], estimate_width_len(&cell.value));
    }
    l_width_by_col.into_iter().enumerate().collect()
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &CellValue,
    format: &Format,
) -> Result<(), RenderError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        CellValue::Empty => {
            worksheet
                .write_blank(n_row, n_col, format)
                .map_err(derive_xlsx_error)?;
        }
        CellValue::Bool(val) => {
            worksheet
                .write_boolean_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
        CellValue::Integer(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val as f64, format)
                .map_err(derive_xlsx_error)?;
        }
        CellValue::Number(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
        CellValue::Text(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, val, format)
                .map_err(derive_xlsx_error)?;
        }
        CellValue::Date(val) => {
            let dt = derive_excel_date(val)?;
            worksheet
                .write_datetime_with_format(n_row, n_col, &dt, format)
                .map_err(derive_xlsx_error)?;
        }
        CellValue::DateTime(val) => {
            let dt = derive_excel_datetime(val)?;
            worksheet
                .write_datetime_with_format(n_row, n_col, &dt, format)
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn derive_excel_date(value: &NaiveDate) -> Result<ExcelDateTime, RenderError> {
    let n_year = u16::try_from(value.year())
        .map_err(|_| RenderError::Backend(format!("year out of range for xlsx: {value}")))?;
    ExcelDateTime::from_ymd(n_year, value.month() as u8, value.day() as u8)
        .map_err(derive_xlsx_error)
}

fn derive_excel_datetime(value: &NaiveDateTime) -> Result<ExcelDateTime, RenderError> {
    let f_seconds = f64::from(value.second()) + f64::from(value.nanosecond()) / 1e9;
    derive_excel_date(&value.date())?
        .and_hms(value.hour() as u16, value.minute() as u8, f_seconds)
        .map_err(derive_xlsx_error)
}

/// Build the xlsx format of a resolved style; `c_num_format_default` applies
/// when the style names no number format.
fn derive_rust_xlsx_format(spec: &SpecCellStyle, c_num_format_default: Option<&str>) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = spec.num_format.as_deref().or(c_num_format_default) {
        format = format.set_num_format(val);
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = &spec.border_color {
        format = format.set_border_color(val.as_str());
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

/// Border styles in xlsxwriter numbering; index 0 is no border.
const L_FORMAT_BORDERS: [FormatBorder; 14] = [
    FormatBorder::None,
    FormatBorder::Thin,
    FormatBorder::Medium,
    FormatBorder::Dashed,
    FormatBorder::Dotted,
    FormatBorder::Thick,
    FormatBorder::Double,
    FormatBorder::Hair,
    FormatBorder::MediumDashed,
    FormatBorder::DashDot,
    FormatBorder::MediumDashDot,
    FormatBorder::DashDotDot,
    FormatBorder::MediumDashDotDot,
    FormatBorder::SlantDashDot,
];

fn derive_format_border(border: i64) -> FormatBorder {
    usize::try_from(border)
        .ok()
        .and_then(|n_idx| L_FORMAT_BORDERS.get(n_idx).copied())
        .unwrap_or(FormatBorder::None)
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        "vjustify" | "vertical_justify" => Some(FormatAlign::VerticalJustify),
        "vdistributed" | "vertical_distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

fn derive_xlsx_error(err: XlsxError) -> RenderError {
    RenderError::Backend(format!("xlsx write error: {err}"))
}
