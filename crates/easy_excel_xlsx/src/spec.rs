//! Shared sheet specification models and top-level error types.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::conf::{
    C_CENTER_RULE_ALL, N_CELL_EXPANSION_DEFAULT, N_CELL_PADDING_DEFAULT, N_CELL_WIDTH_MIN_DEFAULT,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// One logical cell value. Always written to the worksheet in text form.
///
/// Non-finite numbers serialize as their text form since JSON has no literal
/// for them.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Number(f64),
    /// Text value.
    String(String),
}

impl EnumCellValue {
    /// Text written into the cell.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Whether the value renders as an empty cell.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for EnumCellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Bool(val) => write!(f, "{}", if *val { "True" } else { "False" }),
            Self::Integer(val) => write!(f, "{val}"),
            Self::Number(val) => f.write_str(&format_float_text(*val)),
            Self::String(val) => write!(f, "{val}"),
        }
    }
}

impl Serialize for EnumCellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Bool(val) => serializer.serialize_bool(*val),
            Self::Integer(val) => serializer.serialize_i64(*val),
            Self::Number(val) if val.is_finite() => serializer.serialize_f64(*val),
            Self::Number(val) => serializer.serialize_str(&format_float_text(*val)),
            Self::String(val) => serializer.serialize_str(val),
        }
    }
}

/// Shortest round-trip float text: decimal for exponents in `-4..16` (always
/// with a fractional part), scientific with a signed two-digit exponent
/// otherwise. Non-finite values read `nan`, `inf` and `-inf`.
pub fn format_float_text(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let c_sci = format!("{value:e}");
    let (c_mantissa, c_exp) = c_sci.split_once('e').unwrap_or((c_sci.as_str(), "0"));
    let n_exp: i32 = c_exp.parse().unwrap_or(0);

    if (-4..16).contains(&n_exp) {
        let c_text = format!("{value}");
        if c_text.contains('.') {
            c_text
        } else {
            format!("{c_text}.0")
        }
    } else {
        let c_sign = if n_exp < 0 { '-' } else { '+' };
        format!("{c_mantissa}e{c_sign}{:02}", n_exp.unsigned_abs())
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for EnumCellValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<EnumCellValue>> From<Option<T>> for EnumCellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CenterRule

/// Column selection for centered alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCenterRule", into = "RawCenterRule")]
pub enum EnumCenterRule {
    /// Every column.
    All,
    /// Explicit zero-based column indices.
    Indexes(BTreeSet<usize>),
}

impl EnumCenterRule {
    /// Rule selecting no column.
    pub fn empty() -> Self {
        Self::Indexes(BTreeSet::new())
    }

    /// Whether `col_idx` is selected by this rule.
    pub fn contains(&self, col_idx: usize) -> bool {
        match self {
            Self::All => true,
            Self::Indexes(set_idx) => set_idx.contains(&col_idx),
        }
    }

    /// Whether `col_idx` is listed explicitly (never true for [`Self::All`]).
    pub fn lists(&self, col_idx: usize) -> bool {
        matches!(self, Self::Indexes(set_idx) if set_idx.contains(&col_idx))
    }

    /// Explicit indices that are `>= n_cols`.
    pub fn indexes_out_of_range(&self, n_cols: usize) -> Vec<usize> {
        match self {
            Self::All => vec![],
            Self::Indexes(set_idx) => set_idx.iter().copied().filter(|i| *i >= n_cols).collect(),
        }
    }
}

impl From<Vec<usize>> for EnumCenterRule {
    fn from(value: Vec<usize>) -> Self {
        Self::Indexes(value.into_iter().collect())
    }
}

impl FromIterator<usize> for EnumCenterRule {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::Indexes(iter.into_iter().collect())
    }
}

/// Wire form: `"all"`, a list of indices, or `null` (no column).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawCenterRule {
    Null,
    Keyword(String),
    Indexes(Vec<usize>),
}

impl TryFrom<RawCenterRule> for EnumCenterRule {
    type Error = String;

    fn try_from(value: RawCenterRule) -> Result<Self, Self::Error> {
        match value {
            RawCenterRule::Null => Ok(Self::empty()),
            RawCenterRule::Keyword(kw) if kw == C_CENTER_RULE_ALL => Ok(Self::All),
            RawCenterRule::Keyword(kw) => Err(format!(
                "centering rule must be {C_CENTER_RULE_ALL:?}, a list of column indexes or null, got {kw:?}"
            )),
            RawCenterRule::Indexes(l_idx) => Ok(l_idx.into()),
        }
    }
}

impl From<EnumCenterRule> for RawCenterRule {
    fn from(value: EnumCenterRule) -> Self {
        match value {
            EnumCenterRule::All => RawCenterRule::Keyword(C_CENTER_RULE_ALL.to_string()),
            EnumCenterRule::Indexes(set_idx) => {
                RawCenterRule::Indexes(set_idx.into_iter().collect())
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetStyle

fn default_true() -> bool {
    true
}

fn default_rule_all() -> EnumCenterRule {
    EnumCenterRule::All
}

fn default_rule_empty() -> EnumCenterRule {
    EnumCenterRule::empty()
}

fn default_cell_expansion() -> f64 {
    N_CELL_EXPANSION_DEFAULT
}

fn default_cell_padding() -> f64 {
    N_CELL_PADDING_DEFAULT
}

fn default_min_cell_width() -> f64 {
    N_CELL_WIDTH_MIN_DEFAULT
}

/// Sheet styling and width heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecSheetStyle {
    /// Bold header row.
    #[serde(default = "default_true")]
    pub bold_header: bool,
    /// Attach an autofilter over the header row.
    #[serde(default = "default_true")]
    pub auto_filter: bool,
    /// Centered body columns.
    #[serde(default = "default_rule_all")]
    pub center_cols_indexes: EnumCenterRule,
    /// Centered header columns.
    #[serde(default = "default_rule_all")]
    pub center_headers_indexes: EnumCenterRule,
    /// Body columns excluded from centering unless listed in `center_cols_indexes`.
    #[serde(default = "default_rule_empty")]
    pub not_center_cols_indexes: EnumCenterRule,
    /// Header columns excluded from centering unless listed in `center_headers_indexes`.
    #[serde(default = "default_rule_empty")]
    pub not_center_headers_indexes: EnumCenterRule,
    /// Width multiplier.
    #[serde(default = "default_cell_expansion")]
    pub cell_expansion: f64,
    /// Width padding added before expansion.
    #[serde(default = "default_cell_padding")]
    pub cell_padding: f64,
    /// Minimum final column width.
    #[serde(default = "default_min_cell_width")]
    pub min_cell_width: f64,
}

impl Default for SpecSheetStyle {
    fn default() -> Self {
        Self {
            bold_header: true,
            auto_filter: true,
            center_cols_indexes: EnumCenterRule::All,
            center_headers_indexes: EnumCenterRule::All,
            not_center_cols_indexes: EnumCenterRule::empty(),
            not_center_headers_indexes: EnumCenterRule::empty(),
            cell_expansion: N_CELL_EXPANSION_DEFAULT,
            cell_padding: N_CELL_PADDING_DEFAULT,
            min_cell_width: N_CELL_WIDTH_MIN_DEFAULT,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetConfig

/// Serializable sheet record (`name`, `headers`, `data` plus optional styling).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecSheetConfig {
    /// Sheet name.
    pub name: String,
    /// Header labels.
    pub headers: Vec<String>,
    /// Body rows, read as `data[row_idx][col_idx]`.
    pub data: Vec<Vec<EnumCellValue>>,
    /// See [`SpecSheetStyle::bold_header`].
    #[serde(default = "default_true")]
    pub bold_header: bool,
    /// See [`SpecSheetStyle::auto_filter`].
    #[serde(default = "default_true")]
    pub auto_filter: bool,
    /// See [`SpecSheetStyle::center_cols_indexes`].
    #[serde(default = "default_rule_all")]
    pub center_cols_indexes: EnumCenterRule,
    /// See [`SpecSheetStyle::center_headers_indexes`].
    #[serde(default = "default_rule_all")]
    pub center_headers_indexes: EnumCenterRule,
    /// See [`SpecSheetStyle::not_center_cols_indexes`].
    #[serde(default = "default_rule_empty")]
    pub not_center_cols_indexes: EnumCenterRule,
    /// See [`SpecSheetStyle::not_center_headers_indexes`].
    #[serde(default = "default_rule_empty")]
    pub not_center_headers_indexes: EnumCenterRule,
    /// See [`SpecSheetStyle::cell_expansion`].
    #[serde(default = "default_cell_expansion")]
    pub cell_expansion: f64,
    /// See [`SpecSheetStyle::cell_padding`].
    #[serde(default = "default_cell_padding")]
    pub cell_padding: f64,
    /// See [`SpecSheetStyle::min_cell_width`].
    #[serde(default = "default_min_cell_width")]
    pub min_cell_width: f64,
}

impl SpecSheetConfig {
    /// Config with default styling.
    pub fn new(
        name: impl Into<String>,
        headers: Vec<String>,
        data: Vec<Vec<EnumCellValue>>,
    ) -> Self {
        Self::from_parts(name.into(), headers, data, SpecSheetStyle::default())
    }

    /// Assemble a config from its table and style parts.
    pub fn from_parts(
        name: String,
        headers: Vec<String>,
        data: Vec<Vec<EnumCellValue>>,
        style: SpecSheetStyle,
    ) -> Self {
        Self {
            name,
            headers,
            data,
            bold_header: style.bold_header,
            auto_filter: style.auto_filter,
            center_cols_indexes: style.center_cols_indexes,
            center_headers_indexes: style.center_headers_indexes,
            not_center_cols_indexes: style.not_center_cols_indexes,
            not_center_headers_indexes: style.not_center_headers_indexes,
            cell_expansion: style.cell_expansion,
            cell_padding: style.cell_padding,
            min_cell_width: style.min_cell_width,
        }
    }

    /// Split into `(name, headers, data, style)`.
    pub fn into_parts(self) -> (String, Vec<String>, Vec<Vec<EnumCellValue>>, SpecSheetStyle) {
        let style = SpecSheetStyle {
            bold_header: self.bold_header,
            auto_filter: self.auto_filter,
            center_cols_indexes: self.center_cols_indexes,
            center_headers_indexes: self.center_headers_indexes,
            not_center_cols_indexes: self.not_center_cols_indexes,
            not_center_headers_indexes: self.not_center_headers_indexes,
            cell_expansion: self.cell_expansion,
            cell_padding: self.cell_padding,
            min_cell_width: self.min_cell_width,
        };
        (self.name, self.headers, self.data, style)
    }

    /// Parse one config from JSON text.
    pub fn from_json_str(text: &str) -> XlsxBookResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to JSON text.
    pub fn to_json_string(&self) -> XlsxBookResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-sheet materialization report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecSheetReport {
    /// Worksheet name.
    pub sheet_name: String,
    /// Rows written, header included.
    pub n_rows: usize,
    /// Columns written.
    pub n_cols: usize,
    /// Final width per column; `None` keeps the worksheet default.
    pub widths_by_col: Vec<Option<f64>>,
    /// Autofilter range, when attached.
    pub autofilter_ref: Option<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecSheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        tracing::warn!(sheet = %self.sheet_name, "{}", msg.as_ref());
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Result alias for workbook operations.
pub type XlsxBookResult<T> = std::result::Result<T, XlsxBookError>;

/// Errors raised while building sheets or producing workbooks.
#[derive(Debug, Error)]
pub enum XlsxBookError {
    /// A sheet with the same name is already registered.
    #[error("Sheet with name {0:?} already exists")]
    SheetNameConflict(String),

    /// Name rejected by Excel naming rules.
    #[error("Invalid sheet name {name:?}: {reason}")]
    InvalidSheetName {
        /// Offending name.
        name: String,
        /// Violated rule.
        reason: String,
    },

    /// Body row width differs from the header count.
    #[error("Sheet {sheet:?}: row {row_idx} has {actual} cells, expected {expected}")]
    ShapeMismatch {
        /// Sheet name.
        sheet: String,
        /// Zero-based body row index.
        row_idx: usize,
        /// Header count.
        expected: usize,
        /// Row length.
        actual: usize,
    },

    /// Table does not fit into one worksheet.
    #[error("Sheet {sheet:?}: {n_rows} rows x {n_cols} cols exceeds Excel limits")]
    ExcelLimitExceeded {
        /// Sheet name.
        sheet: String,
        /// Rows, header included.
        n_rows: usize,
        /// Columns.
        n_cols: usize,
    },

    /// Width heuristic parameters out of range.
    #[error("Invalid sheet style: {0}")]
    InvalidStyle(String),

    /// Malformed config record.
    #[error("Invalid sheet config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// DataFrame input could not be read.
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),

    /// Workbook creation requested without any sheet.
    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    /// Spreadsheet engine failure.
    #[error("xlsx write error: {0}")]
    Engine(#[from] rust_xlsxwriter::XlsxError),

    /// Output file could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
