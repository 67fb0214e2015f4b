use easy_excel_xlsx::conf::derive_default_sheet_style;
use easy_excel_xlsx::{
    ExcelFile as RsExcelFile, Sheet, SpecSheetConfig, SpecSheetStyle, XlsxBookError,
};
use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyAny, PyBytes, PyDict, PyList, PyString};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "easy_excel.xlsx.workbook.v1";
const C_BRIDGE_TRANSPORT: &str = "json";

#[pyclass(name = "ExcelFile")]
struct PyExcelFile {
    inner: RsExcelFile,
}

#[pymethods]
impl PyExcelFile {
    #[new]
    #[pyo3(signature = (sheets = None))]
    fn new(py: Python<'_>, sheets: Option<&Bound<'_, PyAny>>) -> PyResult<Self> {
        let mut slf = Self {
            inner: RsExcelFile::default(),
        };
        if let Some(sheets) = sheets
            && !sheets.is_none()
        {
            slf.set_sheets(py, sheets)?;
        }
        Ok(slf)
    }

    fn __repr__(&self) -> String {
        format!("<ExcelFile sheets:{:?}>", self.inner.sheet_names())
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn set_sheets(&mut self, py: Python<'_>, sheets: &Bound<'_, PyAny>) -> PyResult<()> {
        let l_configs: Vec<SpecSheetConfig> = parse_json_object(py, sheets)?;
        self.inner.set_sheets(l_configs).map_err(convert_book_error)
    }

    fn add_sheet(&mut self, py: Python<'_>, sheet: &Bound<'_, PyAny>) -> PyResult<()> {
        let config: SpecSheetConfig = parse_json_object(py, sheet)?;
        self.inner.add_sheet(config).map_err(convert_book_error)
    }

    /// Add a sheet from a polars DataFrame (or anything `polars.DataFrame` accepts).
    #[pyo3(signature = (name, df, style = None))]
    fn add_sheet_from_dataframe(
        &mut self,
        py: Python<'_>,
        name: String,
        df: &Bound<'_, PyAny>,
        style: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<()> {
        let style: SpecSheetStyle = match style {
            Some(obj) if !obj.is_none() => parse_json_object(py, obj)?,
            _ => derive_default_sheet_style(),
        };

        let v_ipc_df = derive_ipc_bytes_from_any_dataframe(py, df)?;
        let sheet = Sheet::from_ipc_bytes(name, &v_ipc_df, style).map_err(convert_book_error)?;
        self.inner.add_sheet(sheet).map_err(convert_book_error)
    }

    fn get_sheet(&self, py: Python<'_>, name: &str) -> PyResult<Option<Py<PyAny>>> {
        self.inner
            .get_sheet(name)
            .map(|sheet| create_json_object(py, &sheet.to_config()))
            .transpose()
    }

    fn delete_sheet(&mut self, py: Python<'_>, name: &str) -> PyResult<Option<Py<PyAny>>> {
        self.inner
            .delete_sheet(name)
            .map(|sheet| create_json_object(py, &sheet.to_config()))
            .transpose()
    }

    fn clear_sheets(&mut self) {
        self.inner.clear_sheets();
    }

    fn sheet_names<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        PyList::new(py, self.inner.sheet_names())
    }

    fn to_dict(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        create_json_object(py, &self.inner.to_config())
    }

    fn create_bytes<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let v_bytes = self.inner.create_bytes().map_err(convert_book_error)?;
        Ok(PyBytes::new(py, &v_bytes))
    }

    fn create_file(&self, output_name: &str, output_path: &str) -> PyResult<String> {
        let path_file_out = self
            .inner
            .create_file(output_name, output_path)
            .map_err(convert_book_error)?;
        Ok(path_file_out.to_string_lossy().to_string())
    }
}

fn convert_book_error(err: XlsxBookError) -> PyErr {
    match err {
        XlsxBookError::Io { .. } => PyOSError::new_err(err.to_string()),
        XlsxBookError::Engine(_) => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Decode a Python object through `json`; values `json` cannot encode fall
/// back to their `str()` form.
fn parse_json_object<T>(py: Python<'_>, obj: &Bound<'_, PyAny>) -> PyResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let module_json = py.import("json")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("default", py.get_type::<PyString>())?;
    let c_json = module_json
        .call_method("dumps", (obj,), Some(&kwargs))?
        .extract::<String>()?;
    serde_json::from_str(&c_json)
        .map_err(|err| PyValueError::new_err(format!("Invalid sheet config: {err}")))
}

fn create_json_object<T>(py: Python<'_>, value: &T) -> PyResult<Py<PyAny>>
where
    T: serde::Serialize,
{
    let c_json = serde_json::to_string(value)
        .map_err(|err| PyRuntimeError::new_err(format!("Failed to serialize config: {err}")))?;
    let module_json = py.import("json")?;
    Ok(module_json.call_method1("loads", (c_json,))?.unbind())
}

fn derive_ipc_bytes_from_any_dataframe(
    py: Python<'_>,
    df: &Bound<'_, PyAny>,
) -> PyResult<Vec<u8>> {
    let module_polars = py.import("polars")?;
    let cls_dataframe = module_polars.getattr("DataFrame")?;

    let df_polars = if df.is_instance(&cls_dataframe)? {
        df.clone()
    } else {
        cls_dataframe.call1((df,))?
    };

    let obj_buffer = df_polars.call_method1("write_ipc", (py.None(),))?;
    let obj_bytes = obj_buffer.call_method0("getvalue")?;
    Ok(obj_bytes.downcast::<PyBytes>()?.as_bytes().to_vec())
}

#[pymodule]
fn _easy_excel_xlsx_rs(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyExcelFile>()?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
