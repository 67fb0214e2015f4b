//! Stateless helper utilities used by sheet materialization.

use polars::prelude::AnyValue;
use rust_xlsxwriter::XlsxError;
use rust_xlsxwriter::utility::column_number_to_name;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, SpecSheetStyle, XlsxBookError, XlsxBookResult};

////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Character count of the longest `\n`-separated line.
pub fn estimate_text_width(text: &str) -> usize {
    text.split('\n')
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
}

/// Final column width for the widest observed text, `None` for empty columns.
///
/// `max((width + padding) * expansion, min_cell_width)`.
pub fn derive_column_width(width_text_max: usize, style: &SpecSheetStyle) -> Option<f64> {
    if width_text_max == 0 {
        return None;
    }
    let n_width = (width_text_max as f64 + style.cell_padding) * style.cell_expansion;
    Some(f64::max(n_width, style.min_cell_width))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellReferences

/// Autofilter range over the header row, e.g. `A1:C1`. `None` without columns.
pub fn derive_autofilter_ref(n_cols: usize) -> Option<String> {
    let n_col_last = n_cols.checked_sub(1)?;
    let n_col_last = u16::try_from(n_col_last).ok()?;
    Some(format!("A1:{}1", column_number_to_name(n_col_last)))
}

pub(crate) fn cast_row_num(value: usize) -> Result<u32, XlsxError> {
    u32::try_from(value).map_err(|_| XlsxError::RowColumnLimitError)
}

pub(crate) fn cast_col_num(value: usize) -> Result<u16, XlsxError> {
    u16::try_from(value).map_err(|_| XlsxError::RowColumnLimitError)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetValidation

/// Validate an Excel worksheet name.
pub fn validate_sheet_name(name: &str) -> XlsxBookResult<()> {
    let reject = |reason: String| {
        Err(XlsxBookError::InvalidSheetName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("name must not be empty".to_string());
    }
    let n_len = name.chars().count();
    if n_len > N_LEN_EXCEL_SHEET_NAME_MAX {
        return reject(format!(
            "name has {n_len} characters, at most {N_LEN_EXCEL_SHEET_NAME_MAX} allowed"
        ));
    }
    if let Some(chr) = name.chars().find(|chr| TUP_EXCEL_ILLEGAL.contains(chr)) {
        return reject(format!("character {chr:?} is not allowed"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return reject("name must not start or end with an apostrophe".to_string());
    }
    if name.eq_ignore_ascii_case("History") {
        return reject("name is reserved by Excel".to_string());
    }
    Ok(())
}

/// Check that every row matches the header count and the table fits one worksheet.
pub fn validate_sheet_shape(
    name: &str,
    n_headers: usize,
    data: &[Vec<EnumCellValue>],
) -> XlsxBookResult<()> {
    if let Some((row_idx, row)) = data
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != n_headers)
    {
        return Err(XlsxBookError::ShapeMismatch {
            sheet: name.to_string(),
            row_idx,
            expected: n_headers,
            actual: row.len(),
        });
    }

    let n_rows = data.len() + 1;
    if n_rows > N_NROWS_EXCEL_MAX || n_headers > N_NCOLS_EXCEL_MAX {
        return Err(XlsxBookError::ExcelLimitExceeded {
            sheet: name.to_string(),
            n_rows,
            n_cols: n_headers,
        });
    }
    Ok(())
}

/// Validate width heuristic parameters.
pub fn validate_sheet_style(style: &SpecSheetStyle) -> XlsxBookResult<()> {
    if !style.cell_expansion.is_finite() || style.cell_expansion <= 0.0 {
        return Err(XlsxBookError::InvalidStyle(format!(
            "cell_expansion must be finite and > 0, got {}",
            style.cell_expansion
        )));
    }
    if !style.cell_padding.is_finite() || style.cell_padding < 0.0 {
        return Err(XlsxBookError::InvalidStyle(format!(
            "cell_padding must be finite and >= 0, got {}",
            style.cell_padding
        )));
    }
    if !style.min_cell_width.is_finite() || style.min_cell_width < 0.0 {
        return Err(XlsxBookError::InvalidStyle(format!(
            "min_cell_width must be finite and >= 0, got {}",
            style.min_cell_width
        )));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameConversion

/// Convert one polars value into a cell value.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::Boolean(val) => EnumCellValue::Bool(val),
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::UInt8(val) => EnumCellValue::Integer(val.into()),
        AnyValue::UInt16(val) => EnumCellValue::Integer(val.into()),
        AnyValue::UInt32(val) => EnumCellValue::Integer(val.into()),
        AnyValue::UInt64(val) => match i64::try_from(val) {
            Ok(val) => EnumCellValue::Integer(val),
            Err(_) => EnumCellValue::String(val.to_string()),
        },
        AnyValue::Int8(val) => EnumCellValue::Integer(val.into()),
        AnyValue::Int16(val) => EnumCellValue::Integer(val.into()),
        AnyValue::Int32(val) => EnumCellValue::Integer(val.into()),
        AnyValue::Int64(val) => EnumCellValue::Integer(val),
        AnyValue::Float32(val) => EnumCellValue::Number(val.into()),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_text_width_uses_longest_line() {
        assert_eq!(estimate_text_width(""), 0);
        assert_eq!(estimate_text_width("abc"), 3);
        assert_eq!(estimate_text_width("a\nabcd\nab"), 4);
        assert_eq!(estimate_text_width("ёжик"), 4);
    }

    #[test]
    fn test_derive_column_width_applies_padding_expansion_and_floor() {
        let style = SpecSheetStyle::default();
        assert_eq!(derive_column_width(0, &style), None);
        assert_eq!(derive_column_width(1, &style), Some(9.0));
        assert_eq!(derive_column_width(2, &style), Some(9.0));

        let n_width = derive_column_width(10, &style).unwrap();
        assert!((n_width - 14.4).abs() < 1e-9);

        let style = SpecSheetStyle {
            cell_expansion: 1.0,
            cell_padding: 0.0,
            min_cell_width: 0.0,
            ..Default::default()
        };
        assert_eq!(derive_column_width(3, &style), Some(3.0));
    }

    #[test]
    fn test_derive_autofilter_ref() {
        assert_eq!(derive_autofilter_ref(0), None);
        assert_eq!(derive_autofilter_ref(1).as_deref(), Some("A1:A1"));
        assert_eq!(derive_autofilter_ref(2).as_deref(), Some("A1:B1"));
        assert_eq!(derive_autofilter_ref(28).as_deref(), Some("A1:AB1"));
    }

    #[test]
    fn test_validate_sheet_name() {
        assert!(validate_sheet_name("Report").is_ok());
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name("a/b").is_err());
        assert!(validate_sheet_name("'quoted'").is_err());
        assert!(validate_sheet_name("history").is_err());
        assert!(validate_sheet_name(&"x".repeat(31)).is_ok());
        assert!(validate_sheet_name(&"x".repeat(32)).is_err());
    }

    #[test]
    fn test_validate_sheet_shape_reports_first_bad_row() {
        let data = vec![
            vec![EnumCellValue::from("a"), EnumCellValue::from("b")],
            vec![EnumCellValue::from("c")],
        ];
        match validate_sheet_shape("S", 2, &data) {
            Err(XlsxBookError::ShapeMismatch {
                row_idx,
                expected,
                actual,
                ..
            }) => {
                assert_eq!((row_idx, expected, actual), (1, 2, 1));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(validate_sheet_shape("S", 2, &data[..1]).is_ok());
    }

    #[test]
    fn test_validate_sheet_style_rejects_bad_numbers() {
        assert!(validate_sheet_style(&SpecSheetStyle::default()).is_ok());
        let style = SpecSheetStyle {
            cell_expansion: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            validate_sheet_style(&style),
            Err(XlsxBookError::InvalidStyle(_))
        ));
        let style = SpecSheetStyle {
            min_cell_width: f64::NAN,
            ..Default::default()
        };
        assert!(validate_sheet_style(&style).is_err());
    }

    #[test]
    fn test_derive_cell_value_from_any_value() {
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Null),
            EnumCellValue::None
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Int32(7)),
            EnumCellValue::Integer(7)
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Float64(0.5)),
            EnumCellValue::Number(0.5)
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::String("x")),
            EnumCellValue::from("x")
        );
        assert_eq!(
            derive_cell_value_from_any_value(AnyValue::Boolean(false)),
            EnumCellValue::Bool(false)
        );
    }
}
