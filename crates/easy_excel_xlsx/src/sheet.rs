//! Sheet model and its worksheet materialization.

use std::fmt;
use std::io::Cursor;

use polars::prelude::{DataFrame, IpcReader, SerReader};
use rust_xlsxwriter::{Format, FormatAlign, Worksheet};

use crate::spec::{
    EnumCellValue, EnumCenterRule, SpecSheetConfig, SpecSheetReport, SpecSheetStyle,
    XlsxBookResult,
};
use crate::util::{
    cast_col_num, cast_row_num, derive_autofilter_ref, derive_cell_value_from_any_value,
    derive_column_width, estimate_text_width, validate_sheet_name, validate_sheet_shape,
    validate_sheet_style,
};

/// One header row plus body rows, and how to render them.
///
/// Construction validates the sheet name, the style parameters and that every
/// row has exactly one cell per header.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    data: Vec<Vec<EnumCellValue>>,
    style: SpecSheetStyle,
}

impl Sheet {
    pub fn new(
        name: impl Into<String>,
        headers: Vec<String>,
        data: Vec<Vec<EnumCellValue>>,
        style: SpecSheetStyle,
    ) -> XlsxBookResult<Self> {
        let name = name.into();
        validate_sheet_name(&name)?;
        validate_sheet_style(&style)?;
        validate_sheet_shape(&name, headers.len(), &data)?;
        Ok(Self {
            name,
            headers,
            data,
            style,
        })
    }

    /// Build from a config record; omitted styling keys take their defaults.
    pub fn from_config(config: SpecSheetConfig) -> XlsxBookResult<Self> {
        let (name, headers, data, style) = config.into_parts();
        Self::new(name, headers, data, style)
    }

    /// Build from a JSON config record.
    pub fn from_json_str(text: &str) -> XlsxBookResult<Self> {
        Self::from_config(SpecSheetConfig::from_json_str(text)?)
    }

    /// Build from a DataFrame: column names become headers.
    pub fn from_dataframe(
        name: impl Into<String>,
        df: &DataFrame,
        style: SpecSheetStyle,
    ) -> XlsxBookResult<Self> {
        let headers: Vec<String> = df
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();

        let l_cols = df.get_columns();
        let mut data = Vec::with_capacity(df.height());
        for n_idx_row in 0..df.height() {
            let mut row = Vec::with_capacity(l_cols.len());
            for col in l_cols {
                row.push(derive_cell_value_from_any_value(col.get(n_idx_row)?));
            }
            data.push(row);
        }

        Self::new(name, headers, data, style)
    }

    /// Build from Polars IPC-serialized DataFrame bytes.
    pub fn from_ipc_bytes(
        name: impl Into<String>,
        v_ipc_df: &[u8],
        style: SpecSheetStyle,
    ) -> XlsxBookResult<Self> {
        let df = IpcReader::new(Cursor::new(v_ipc_df)).finish()?;
        Self::from_dataframe(name, &df, style)
    }

    /// Inverse of [`Self::from_config`].
    pub fn to_config(&self) -> SpecSheetConfig {
        SpecSheetConfig::from_parts(
            self.name.clone(),
            self.headers.clone(),
            self.data.clone(),
            self.style.clone(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn data(&self) -> &[Vec<EnumCellValue>] {
        &self.data
    }

    pub fn style(&self) -> &SpecSheetStyle {
        &self.style
    }

    /// Row count including the header row.
    pub fn max_row(&self) -> usize {
        self.data.len() + 1
    }

    /// Column count (header count).
    pub fn max_col(&self) -> usize {
        self.headers.len()
    }

    /// Header row followed by the body rows.
    pub fn full_data(&self) -> Vec<Vec<EnumCellValue>> {
        let mut l_rows = Vec::with_capacity(self.max_row());
        l_rows.push(
            self.headers
                .iter()
                .map(|header| EnumCellValue::String(header.clone()))
                .collect(),
        );
        l_rows.extend(self.data.iter().cloned());
        l_rows
    }

    /// Whether the cell at (`row_idx`, `col_idx`) is center aligned.
    ///
    /// Row 0 follows the header rules, every other row the body rules. A rule of
    /// `All` centers every column regardless of exclusions; otherwise an excluded
    /// column stays left unless its centering rule lists it explicitly.
    pub fn need_center(&self, col_idx: usize, row_idx: usize) -> bool {
        let (rule_center, rule_not_center) = if row_idx == 0 {
            (
                &self.style.center_headers_indexes,
                &self.style.not_center_headers_indexes,
            )
        } else {
            (
                &self.style.center_cols_indexes,
                &self.style.not_center_cols_indexes,
            )
        };

        if matches!(rule_center, EnumCenterRule::All) {
            return true;
        }
        if rule_not_center.contains(col_idx) && !rule_center.lists(col_idx) {
            return false;
        }
        rule_center.contains(col_idx)
    }

    /// Write the sheet into `worksheet`: names it, writes every cell as text,
    /// applies header bold and centering, sizes columns and attaches the autofilter.
    pub fn write_to_worksheet(&self, worksheet: &mut Worksheet) -> XlsxBookResult<SpecSheetReport> {
        let mut report = SpecSheetReport {
            sheet_name: self.name.clone(),
            n_rows: self.max_row(),
            n_cols: self.max_col(),
            ..Default::default()
        };
        self.collect_style_warnings(&mut report);

        worksheet.set_name(&self.name)?;

        let fmts = SheetFormats::new();
        let mut l_width_by_col = vec![0usize; self.max_col()];

        let iter_rows = std::iter::once(self.headers.clone()).chain(
            self.data
                .iter()
                .map(|row| row.iter().map(EnumCellValue::to_text).collect::<Vec<_>>()),
        );

        for (row_idx, l_row_text) in iter_rows.enumerate() {
            let if_bold = row_idx == 0 && self.style.bold_header;
            for (col_idx, c_text) in l_row_text.iter().enumerate() {
                l_width_by_col[col_idx] =
                    usize::max(l_width_by_col[col_idx], estimate_text_width(c_text));

                let fmt = fmts.select(if_bold, self.need_center(col_idx, row_idx));
                let n_row = cast_row_num(row_idx)?;
                let n_col = cast_col_num(col_idx)?;
                if c_text.is_empty() {
                    worksheet.write_blank(n_row, n_col, fmt)?;
                } else {
                    worksheet.write_string_with_format(n_row, n_col, c_text, fmt)?;
                }
            }
        }

        for (col_idx, n_width_text) in l_width_by_col.into_iter().enumerate() {
            let n_width = derive_column_width(n_width_text, &self.style);
            if let Some(val) = n_width {
                worksheet.set_column_width(cast_col_num(col_idx)?, val)?;
            }
            report.widths_by_col.push(n_width);
        }

        if self.style.auto_filter {
            match derive_autofilter_ref(self.max_col()) {
                Some(c_ref) => {
                    worksheet.autofilter(0, 0, 0, cast_col_num(self.max_col() - 1)?)?;
                    report.autofilter_ref = Some(c_ref);
                }
                None => report.warn("auto_filter skipped: sheet has no columns"),
            }
        }

        tracing::debug!(
            sheet = %self.name,
            n_rows = report.n_rows,
            n_cols = report.n_cols,
            "sheet written to worksheet"
        );
        Ok(report)
    }

    fn collect_style_warnings(&self, report: &mut SpecSheetReport) {
        let n_cols = self.max_col();
        for (c_field, rule) in [
            ("center_cols_indexes", &self.style.center_cols_indexes),
            ("center_headers_indexes", &self.style.center_headers_indexes),
            ("not_center_cols_indexes", &self.style.not_center_cols_indexes),
            (
                "not_center_headers_indexes",
                &self.style.not_center_headers_indexes,
            ),
        ] {
            let l_idx = rule.indexes_out_of_range(n_cols);
            if !l_idx.is_empty() {
                report.warn(format!(
                    "{c_field} {l_idx:?} out of range for {n_cols} columns"
                ));
            }
        }
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Sheet name:{}>", self.name)
    }
}

/// The four cell formats a sheet can need.
struct SheetFormats {
    plain: Format,
    bold: Format,
    center: Format,
    bold_center: Format,
}

impl SheetFormats {
    fn new() -> Self {
        let center = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        Self {
            plain: Format::new(),
            bold: Format::new().set_bold(),
            bold_center: center.clone().set_bold(),
            center,
        }
    }

    fn select(&self, if_bold: bool, if_center: bool) -> &Format {
        match (if_bold, if_center) {
            (false, false) => &self.plain,
            (true, false) => &self.bold,
            (false, true) => &self.center,
            (true, true) => &self.bold_center,
        }
    }
}
