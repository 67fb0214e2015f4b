//! Named sheet container and workbook serialization.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rust_xlsxwriter::Workbook;

use crate::conf::C_XLSX_EXTENSION;
use crate::sheet::Sheet;
use crate::spec::{SpecSheetConfig, SpecSheetReport, XlsxBookError, XlsxBookResult};

/// Anything [`ExcelFile::add_sheet`] accepts.
#[derive(Debug, Clone)]
pub enum EnumSheetSource {
    /// Already validated sheet.
    Sheet(Sheet),
    /// Config record, converted through [`Sheet::from_config`].
    Config(SpecSheetConfig),
}

impl From<Sheet> for EnumSheetSource {
    fn from(value: Sheet) -> Self {
        Self::Sheet(value)
    }
}

impl From<SpecSheetConfig> for EnumSheetSource {
    fn from(value: SpecSheetConfig) -> Self {
        Self::Config(value)
    }
}

impl TryFrom<EnumSheetSource> for Sheet {
    type Error = XlsxBookError;

    fn try_from(value: EnumSheetSource) -> XlsxBookResult<Self> {
        match value {
            EnumSheetSource::Sheet(sheet) => Ok(sheet),
            EnumSheetSource::Config(config) => Sheet::from_config(config),
        }
    }
}

/// Ordered collection of uniquely named sheets.
///
/// Sheets are materialized in insertion order. Not synchronized: share across
/// threads only through external locking, or build one container per thread.
#[derive(Debug, Clone, Default)]
pub struct ExcelFile {
    dict_sheets: IndexMap<String, Sheet>,
}

impl ExcelFile {
    /// Build a container from sheets or configs. Fails on the first invalid or
    /// duplicate entry.
    pub fn new<I, S>(sheets: I) -> XlsxBookResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<EnumSheetSource>,
    {
        let mut excel_file = Self::default();
        excel_file.set_sheets(sheets)?;
        Ok(excel_file)
    }

    /// Parse a JSON array of sheet configs.
    pub fn from_json_str(text: &str) -> XlsxBookResult<Self> {
        let l_configs: Vec<SpecSheetConfig> = serde_json::from_str(text)?;
        Self::new(l_configs)
    }

    /// Replace all sheets.
    ///
    /// Not atomic: when a later entry fails, the earlier ones stay installed.
    pub fn set_sheets<I, S>(&mut self, sheets: I) -> XlsxBookResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<EnumSheetSource>,
    {
        self.clear_sheets();
        for sheet in sheets {
            self.add_sheet(sheet)?;
        }
        Ok(())
    }

    /// Append a sheet. A name already present is rejected and the existing
    /// sheet is kept.
    pub fn add_sheet(&mut self, sheet: impl Into<EnumSheetSource>) -> XlsxBookResult<()> {
        let sheet = Sheet::try_from(sheet.into())?;
        if self.dict_sheets.contains_key(sheet.name()) {
            return Err(XlsxBookError::SheetNameConflict(sheet.name().to_string()));
        }

        tracing::debug!(sheet = %sheet.name(), "sheet added");
        self.dict_sheets.insert(sheet.name().to_string(), sheet);
        Ok(())
    }

    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.dict_sheets.get(name)
    }

    /// Remove and return a sheet; remaining sheets keep their order.
    pub fn delete_sheet(&mut self, name: &str) -> Option<Sheet> {
        let sheet = self.dict_sheets.shift_remove(name);
        if sheet.is_some() {
            tracing::debug!(sheet = %name, "sheet deleted");
        }
        sheet
    }

    pub fn clear_sheets(&mut self) {
        self.dict_sheets.clear();
    }

    /// Sheets in insertion order.
    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.dict_sheets.values()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.dict_sheets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.dict_sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_sheets.is_empty()
    }

    /// Build a workbook and return the per-sheet reports.
    ///
    /// The workbook starts with zero worksheets; every sheet adds exactly one.
    pub fn create_workbook_with_report(
        &self,
    ) -> XlsxBookResult<(Workbook, Vec<SpecSheetReport>)> {
        let mut workbook = Workbook::new();
        let mut l_reports = Vec::with_capacity(self.len());
        for sheet in self.sheets() {
            let worksheet = workbook.add_worksheet();
            l_reports.push(sheet.write_to_worksheet(worksheet)?);
        }
        Ok((workbook, l_reports))
    }

    /// Build the in-memory workbook.
    pub fn create_workbook(&self) -> XlsxBookResult<Workbook> {
        let (workbook, _) = self.create_workbook_with_report()?;
        Ok(workbook)
    }

    /// Build the workbook and serialize it to xlsx bytes.
    ///
    /// An empty container is rejected since the engine would otherwise save a
    /// placeholder sheet.
    pub fn create_bytes(&self) -> XlsxBookResult<Vec<u8>> {
        if self.is_empty() {
            return Err(XlsxBookError::EmptyWorkbook);
        }
        let mut workbook = self.create_workbook()?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Write `{output_path}/{output_name}.xlsx` and return its path.
    pub fn create_file(
        &self,
        output_name: &str,
        output_path: impl AsRef<Path>,
    ) -> XlsxBookResult<PathBuf> {
        let v_bytes = self.create_bytes()?;
        let path_file_out = output_path
            .as_ref()
            .join(format!("{output_name}.{C_XLSX_EXTENSION}"));

        std::fs::write(&path_file_out, &v_bytes).map_err(|source| XlsxBookError::Io {
            path: path_file_out.clone(),
            source,
        })?;

        tracing::info!(
            path = %path_file_out.display(),
            n_sheets = self.len(),
            n_bytes = v_bytes.len(),
            "workbook written"
        );
        Ok(path_file_out)
    }

    /// Config records of all sheets, in order.
    pub fn to_config(&self) -> Vec<SpecSheetConfig> {
        self.sheets().map(Sheet::to_config).collect()
    }

    /// JSON array of sheet configs.
    pub fn to_json_string(&self) -> XlsxBookResult<String> {
        Ok(serde_json::to_string(&self.to_config())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{EnumCellValue, SpecSheetStyle};

    fn create_sheet(name: &str, marker: &str) -> Sheet {
        Sheet::new(
            name,
            vec!["h".to_string()],
            vec![vec![EnumCellValue::from(marker)]],
            SpecSheetStyle::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_sheet_rejects_duplicate_and_keeps_first() {
        let mut excel_file = ExcelFile::default();
        excel_file.add_sheet(create_sheet("S", "first")).unwrap();

        let res = excel_file.add_sheet(create_sheet("S", "second"));
        assert!(matches!(res, Err(XlsxBookError::SheetNameConflict(ref name)) if name == "S"));
        assert_eq!(excel_file.len(), 1);
        assert_eq!(
            excel_file.get_sheet("S").unwrap().data()[0][0],
            EnumCellValue::from("first")
        );
    }

    #[test]
    fn test_add_sheet_accepts_config() {
        let mut excel_file = ExcelFile::default();
        excel_file
            .add_sheet(SpecSheetConfig::new(
                "Cfg",
                vec!["a".to_string()],
                vec![vec![1.into()]],
            ))
            .unwrap();
        assert!(excel_file.get_sheet("Cfg").is_some());
    }

    #[test]
    fn test_set_sheets_clears_and_is_not_atomic() {
        let mut excel_file = ExcelFile::new([create_sheet("Old", "o")]).unwrap();

        let res = excel_file.set_sheets([
            create_sheet("A", "1"),
            create_sheet("B", "2"),
            create_sheet("A", "3"),
        ]);
        assert!(res.is_err());
        assert_eq!(excel_file.sheet_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_get_and_delete_missing_are_none() {
        let mut excel_file = ExcelFile::default();
        assert!(excel_file.get_sheet("nope").is_none());
        assert!(excel_file.delete_sheet("nope").is_none());
    }

    #[test]
    fn test_delete_sheet_preserves_order() {
        let mut excel_file = ExcelFile::new([
            create_sheet("A", "1"),
            create_sheet("B", "2"),
            create_sheet("C", "3"),
        ])
        .unwrap();

        let sheet = excel_file.delete_sheet("B").unwrap();
        assert_eq!(sheet.name(), "B");
        assert_eq!(excel_file.sheet_names(), vec!["A", "C"]);

        excel_file.clear_sheets();
        assert!(excel_file.is_empty());
    }

    #[test]
    fn test_empty_container_builds_workbook_but_is_not_saved() {
        let excel_file = ExcelFile::default();

        let (mut workbook, l_reports) = excel_file.create_workbook_with_report().unwrap();
        assert!(l_reports.is_empty());
        assert!(workbook.worksheet_from_index(0).is_err());

        assert!(matches!(
            excel_file.create_bytes(),
            Err(XlsxBookError::EmptyWorkbook)
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            excel_file.create_file("out", dir.path()),
            Err(XlsxBookError::EmptyWorkbook)
        ));
        assert!(!dir.path().join("out.xlsx").exists());
    }

    #[test]
    fn test_create_workbook_with_report_in_insertion_order() {
        let excel_file =
            ExcelFile::new([create_sheet("Second", "x"), create_sheet("First", "y")]).unwrap();

        let (mut workbook, l_reports) = excel_file.create_workbook_with_report().unwrap();
        let l_names: Vec<&str> = l_reports.iter().map(|r| r.sheet_name.as_str()).collect();
        assert_eq!(l_names, vec!["Second", "First"]);
        assert!(workbook.worksheet_from_name("First").is_ok());
        assert!(workbook.worksheet_from_index(1).is_ok());
        assert!(workbook.worksheet_from_index(2).is_err());
    }

    #[test]
    fn test_create_bytes_is_zip_payload() {
        let excel_file = ExcelFile::new([create_sheet("S", "v")]).unwrap();
        let v_bytes = excel_file.create_bytes().unwrap();
        assert!(v_bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_config_round_trip_through_json() {
        let excel_file = ExcelFile::new([create_sheet("A", "1"), create_sheet("B", "2")]).unwrap();
        let c_json = excel_file.to_json_string().unwrap();
        let excel_file_back = ExcelFile::from_json_str(&c_json).unwrap();
        assert_eq!(excel_file_back.to_config(), excel_file.to_config());
        assert_eq!(excel_file_back.sheet_names(), vec!["A", "B"]);
    }
}
