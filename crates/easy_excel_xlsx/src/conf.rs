//! XLSX constants and default styling presets.

use crate::spec::SpecSheetStyle;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// Multiplier applied to the padded text width.
pub const N_CELL_EXPANSION_DEFAULT: f64 = 1.2;
/// Character units added to the longest text line before expansion.
pub const N_CELL_PADDING_DEFAULT: f64 = 2.0;
/// Excel default column width; computed widths never go below it.
pub const N_CELL_WIDTH_MIN_DEFAULT: f64 = 9.0;
/// Keyword selecting every column in a centering rule.
pub const C_CENTER_RULE_ALL: &str = "all";

/// File extension appended by [`crate::ExcelFile::create_file`].
pub const C_XLSX_EXTENSION: &str = "xlsx";

/// Build default sheet styling.
pub fn derive_default_sheet_style() -> SpecSheetStyle {
    SpecSheetStyle::default()
}
