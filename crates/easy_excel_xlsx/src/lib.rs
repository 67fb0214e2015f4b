//! `easy_excel_xlsx` v1:
//! Build Excel workbooks from in-memory tables.
//!
//! Architecture:
//! - `conf`     : Excel limits and default styling constants
//! - `spec`     : values/rules/styles/configs/reports and the error type
//! - `util`     : pure helper functions
//! - `sheet`    : `Sheet` model and worksheet materialization
//! - `workbook` : `ExcelFile` container and serialization
pub mod conf;
pub mod sheet;
pub mod spec;
pub mod util;
pub mod workbook;

pub use conf::{
    N_CELL_EXPANSION_DEFAULT, N_CELL_PADDING_DEFAULT, N_CELL_WIDTH_MIN_DEFAULT,
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use sheet::Sheet;
pub use spec::{
    EnumCellValue, EnumCenterRule, SpecSheetConfig, SpecSheetReport, SpecSheetStyle,
    XlsxBookError, XlsxBookResult,
};
pub use util::{
    derive_autofilter_ref, derive_column_width, estimate_text_width, validate_sheet_name,
};
pub use workbook::{EnumSheetSource, ExcelFile};
