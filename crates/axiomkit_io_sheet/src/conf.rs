//! Sheet layout constants and default preset factories.

use crate::spec::{EnumStyleRole, SpecCellStyle};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Maximum record nesting depth followed while resolving a layout.
pub const N_DEPTH_LAYOUT_MAX: usize = 32;
/// Sort key of a field that declares no explicit order.
pub const N_ORDER_FIELD_DEFAULT: i32 = -1;

/// Header text of the row-index column.
pub const C_LABEL_ROW_INDEX_DEFAULT: &str = "No.";
/// Fallback sheet name when a title sanitizes to nothing.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet";

pub const C_COLOR_GREY_25: &str = "#C0C0C0";
pub const C_COLOR_GREY_40: &str = "#969696";
pub const C_COLOR_BLACK: &str = "#000000";
pub const C_COLOR_WHITE: &str = "#FFFFFF";

/// Number format applied to date cells without an explicit one.
pub const C_NUM_FORMAT_DATE: &str = "yyyy-mm-dd";
/// Number format applied to datetime cells without an explicit one.
pub const C_NUM_FORMAT_DATETIME: &str = "yyyy-mm-dd hh:mm:ss";

/// Build the built-in style of one role, the last tier of the style cascade.
///
/// All roles share a centred, thin black bordered base on white. Title, header
/// and row-index cells are bold on grey fills.
pub fn derive_builtin_cell_style(role: EnumStyleRole) -> SpecCellStyle {
    let cfg_base_style = SpecCellStyle {
        font_size: Some(11),
        font_color: Some(C_COLOR_BLACK.to_string()),
        bg_color: Some(C_COLOR_WHITE.to_string()),
        border: Some(1),
        border_color: Some(C_COLOR_BLACK.to_string()),
        align: Some("center".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    match role {
        EnumStyleRole::Title => cfg_base_style.with_(SpecCellStyle {
            bold: Some(true),
            bg_color: Some(C_COLOR_GREY_25.to_string()),
            ..Default::default()
        }),
        EnumStyleRole::Header | EnumStyleRole::RowIndex => cfg_base_style.with_(SpecCellStyle {
            bold: Some(true),
            bg_color: Some(C_COLOR_GREY_40.to_string()),
            ..Default::default()
        }),
        EnumStyleRole::Content => cfg_base_style,
    }
}
