use std::collections::BTreeMap;

use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString};
use rowbook_io_xlsx::{
    EnumCellValue, EnumSheetSelector, RowbookError, SpecRecord, SpecUploadLocation,
    SpecWorkbookData, SpecXlsxReadOptions, SpecXlsxWriteOptions, array_to_xlsx as rs_array_to_xlsx,
    xlsx_to_array as rs_xlsx_to_array,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "rowbook.xlsx.convert.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

const C_MSG_DATA_NOT_DICT: &str = "Invalid data structure for Excel (Array is required)";
const C_MSG_WORKSHEET_NOT_LIST: &str = "Invalid data structure for Excel (1st level of array is \
                                        worksheet name, and 2nd level of array is worksheet data)";

/// Export `{worksheet_name: [ {column: value, ...}, ... ]}` to an XLSX file.
///
/// Returns `{"path": ..., "url": ...}`. `file_data` and `file_path` may be passed
/// in either order.
#[pyfunction]
#[pyo3(signature = (
    file_data,
    file_path,
    show_record_count = false,
    column_width = None,
    show_elapsed_sheet = true,
    upload_dir = None,
    upload_url = None
))]
#[allow(clippy::too_many_arguments)]
fn array_to_xlsx<'py>(
    py: Python<'py>,
    file_data: &Bound<'py, PyAny>,
    file_path: &Bound<'py, PyAny>,
    show_record_count: bool,
    column_width: Option<BTreeMap<String, Vec<f64>>>,
    show_elapsed_sheet: bool,
    upload_dir: Option<String>,
    upload_url: Option<String>,
) -> PyResult<Bound<'py, PyDict>> {
    let (file_data, file_path) = fix_swapped_arguments(file_data, file_path);
    let c_file_path: String = file_path.extract().map_err(|_| {
        PyValueError::new_err("file_path must be a str relative to the upload directory.")
    })?;
    let workbook_data = parse_workbook_data(file_data)?;

    let location = match upload_dir {
        Some(dir) => SpecUploadLocation::new(
            dir,
            upload_url.unwrap_or_else(|| "/upload".to_string()),
        ),
        None => {
            let mut location = SpecUploadLocation::from_env().map_err(convert_error)?;
            if let Some(url) = upload_url {
                location.url = url;
            }
            location
        }
    };

    let write_options = SpecXlsxWriteOptions {
        show_record_count,
        column_width: column_width.unwrap_or_default(),
        show_elapsed_sheet,
        ..Default::default()
    };

    let (output, _) = py
        .allow_threads(|| rs_array_to_xlsx(&workbook_data, &c_file_path, &location, &write_options))
        .map_err(convert_error)?;

    let dict_result = PyDict::new(py);
    dict_result.set_item("path", output.path.to_string_lossy().to_string())?;
    dict_result.set_item("url", output.url)?;
    Ok(dict_result)
}

/// Parse an XLSX/XLS/ODS/CSV file into a list of dicts keyed by header.
#[pyfunction]
#[pyo3(signature = (
    file,
    sheet = None,
    has_header = true,
    header_snake_case = false,
    skip_empty_rows = true,
    csv_delimiter = ",",
    infer_csv_types = false
))]
#[allow(clippy::too_many_arguments)]
fn xlsx_to_array<'py>(
    py: Python<'py>,
    file: String,
    sheet: Option<&Bound<'py, PyAny>>,
    has_header: bool,
    header_snake_case: bool,
    skip_empty_rows: bool,
    csv_delimiter: &str,
    infer_csv_types: bool,
) -> PyResult<Bound<'py, PyList>> {
    let read_options = SpecXlsxReadOptions {
        sheet: parse_sheet_selector(sheet)?,
        if_has_header: has_header,
        if_header_snake_case: header_snake_case,
        if_skip_empty_rows: skip_empty_rows,
        csv_delimiter: parse_delimiter(csv_delimiter)?,
        if_infer_csv_types: infer_csv_types,
        ..Default::default()
    };

    let l_records = py
        .allow_threads(|| rs_xlsx_to_array(&file, &read_options))
        .map_err(convert_error)?;

    let l_dicts = PyList::empty(py);
    for record in &l_records {
        let dict_row = PyDict::new(py);
        for (c_key, value) in record {
            dict_row.set_item(c_key, create_py_value(py, value))?;
        }
        l_dicts.append(dict_row)?;
    }
    Ok(l_dicts)
}

fn fix_swapped_arguments<'a, 'py>(
    file_data: &'a Bound<'py, PyAny>,
    file_path: &'a Bound<'py, PyAny>,
) -> (&'a Bound<'py, PyAny>, &'a Bound<'py, PyAny>) {
    if file_data.is_instance_of::<PyString>() && file_path.is_instance_of::<PyDict>() {
        (file_path, file_data)
    } else {
        (file_data, file_path)
    }
}

fn parse_workbook_data(file_data: &Bound<'_, PyAny>) -> PyResult<SpecWorkbookData> {
    let dict_data = file_data
        .downcast::<PyDict>()
        .map_err(|_| PyValueError::new_err(C_MSG_DATA_NOT_DICT))?;

    let mut workbook_data = SpecWorkbookData::new();
    for (n_idx, (key, value)) in dict_data.iter().enumerate() {
        let l_rows = value.downcast::<PyList>().map_err(|_| {
            if n_idx == 0 {
                PyValueError::new_err(C_MSG_WORKSHEET_NOT_LIST)
            } else {
                PyValueError::new_err(format!("Worksheet {key} data must be a list of dicts."))
            }
        })?;

        let mut l_records = Vec::with_capacity(l_rows.len());
        for row in l_rows.iter() {
            l_records.push(parse_record(&row)?);
        }
        workbook_data.push_worksheet(key.str()?.to_string(), l_records);
    }
    Ok(workbook_data)
}

fn parse_record(row: &Bound<'_, PyAny>) -> PyResult<SpecRecord> {
    let dict_row = row
        .downcast::<PyDict>()
        .map_err(|_| PyValueError::new_err("Each worksheet row must be a dict."))?;

    let mut record = SpecRecord::with_capacity(dict_row.len());
    for (key, value) in dict_row.iter() {
        record.insert(key.str()?.to_string(), parse_cell_value(&value)?);
    }
    Ok(record)
}

fn parse_cell_value(value: &Bound<'_, PyAny>) -> PyResult<EnumCellValue> {
    if value.is_none() {
        return Ok(EnumCellValue::None);
    }
    if value.is_instance_of::<PyBool>() {
        return Ok(EnumCellValue::Bool(value.extract()?));
    }
    if value.is_instance_of::<PyInt>() || value.is_instance_of::<PyFloat>() {
        return Ok(EnumCellValue::Number(value.extract()?));
    }
    Ok(EnumCellValue::String(value.str()?.to_string()))
}

fn parse_sheet_selector(sheet: Option<&Bound<'_, PyAny>>) -> PyResult<EnumSheetSelector> {
    let Some(sheet) = sheet else {
        return Ok(EnumSheetSelector::default());
    };
    if sheet.is_none() {
        return Ok(EnumSheetSelector::default());
    }
    if let Ok(n_idx) = sheet.extract::<usize>() {
        return Ok(EnumSheetSelector::Index(n_idx));
    }
    if let Ok(c_name) = sheet.extract::<String>() {
        return Ok(EnumSheetSelector::Name(c_name));
    }
    Err(PyValueError::new_err(
        "sheet must be a non-negative int index, a str name, or None.",
    ))
}

fn parse_delimiter(delimiter: &str) -> PyResult<u8> {
    match delimiter.as_bytes() {
        [n_byte] => Ok(*n_byte),
        _ => Err(PyValueError::new_err(
            "csv_delimiter must be a single ASCII character.",
        )),
    }
}

fn create_py_value(py: Python<'_>, value: &EnumCellValue) -> PyObject {
    match value {
        EnumCellValue::None => py.None(),
        EnumCellValue::Bool(val) => PyBool::new(py, *val).to_owned().into_any().unbind(),
        EnumCellValue::Number(val) => PyFloat::new(py, *val).into_any().unbind(),
        EnumCellValue::String(val) => PyString::new(py, val).into_any().unbind(),
    }
}

fn convert_error(err: RowbookError) -> PyErr {
    match err {
        RowbookError::Io(_) => PyOSError::new_err(err.to_string()),
        RowbookError::InvalidData(_)
        | RowbookError::InvalidPath(_)
        | RowbookError::MissingUploadDir
        | RowbookError::ColumnOverflow { .. }
        | RowbookError::SheetNotFound(_)
        | RowbookError::UnsupportedFormat(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

#[pymodule]
fn _rowbook_io_xlsx_rs(_py: Python<'_>, module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_function(wrap_pyfunction!(array_to_xlsx, module)?)?;
    module.add_function(wrap_pyfunction!(xlsx_to_array, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive_error_message(py: Python<'_>, err: PyErr) -> String {
        assert!(err.is_instance_of::<PyValueError>(py));
        err.value(py).to_string()
    }

    #[test]
    fn test_fix_swapped_arguments() {
        Python::with_gil(|py| {
            let dict_data = PyDict::new(py);
            let c_path = PyString::new(py, "report.xlsx");

            let (file_data, file_path) = fix_swapped_arguments(c_path.as_any(), dict_data.as_any());
            assert!(file_data.is_instance_of::<PyDict>());
            assert!(file_path.is_instance_of::<PyString>());

            let (file_data, file_path) = fix_swapped_arguments(dict_data.as_any(), c_path.as_any());
            assert!(file_data.is_instance_of::<PyDict>());
            assert!(file_path.is_instance_of::<PyString>());

            let c_other = PyString::new(py, "other.xlsx");
            let (file_data, _) = fix_swapped_arguments(c_path.as_any(), c_other.as_any());
            assert_eq!(file_data.extract::<String>().unwrap(), "report.xlsx");
        });
    }

    #[test]
    fn test_parse_workbook_data_rejects_non_dict() {
        Python::with_gil(|py| {
            let l_data = PyList::empty(py);
            let err = parse_workbook_data(l_data.as_any()).unwrap_err();
            assert_eq!(derive_error_message(py, err), C_MSG_DATA_NOT_DICT);
        });
    }

    #[test]
    fn test_parse_workbook_data_rejects_non_list_worksheets() {
        Python::with_gil(|py| {
            let dict_data = PyDict::new(py);
            dict_data.set_item("Users", "not rows").unwrap();
            let err = parse_workbook_data(dict_data.as_any()).unwrap_err();
            assert_eq!(derive_error_message(py, err), C_MSG_WORKSHEET_NOT_LIST);

            let dict_data = PyDict::new(py);
            dict_data.set_item("Users", PyList::empty(py)).unwrap();
            dict_data.set_item("Orders", 3).unwrap();
            let err = parse_workbook_data(dict_data.as_any()).unwrap_err();
            assert_eq!(
                derive_error_message(py, err),
                "Worksheet Orders data must be a list of dicts."
            );
        });
    }

    #[test]
    fn test_parse_workbook_data_keeps_order_and_values() {
        Python::with_gil(|py| {
            let dict_row = PyDict::new(py);
            dict_row.set_item("name", "Ada").unwrap();
            dict_row.set_item("age", 36).unwrap();
            dict_row.set_item("active", true).unwrap();
            dict_row.set_item("note", py.None()).unwrap();
            let l_rows = PyList::empty(py);
            l_rows.append(dict_row).unwrap();

            let dict_data = PyDict::new(py);
            dict_data.set_item("Users", l_rows).unwrap();
            dict_data.set_item("Empty", PyList::empty(py)).unwrap();

            let workbook_data = parse_workbook_data(dict_data.as_any()).unwrap();
            assert_eq!(workbook_data.len(), 2);
            assert_eq!(workbook_data.worksheets[0].name, "Users");
            assert!(workbook_data.worksheets[1].rows.is_empty());

            let record = &workbook_data.worksheets[0].rows[0];
            assert_eq!(
                record.keys().collect::<Vec<_>>(),
                vec!["name", "age", "active", "note"]
            );
            assert_eq!(record["name"], EnumCellValue::from("Ada"));
            assert_eq!(record["age"], EnumCellValue::Number(36.0));
            assert_eq!(record["active"], EnumCellValue::Bool(true));
            assert_eq!(record["note"], EnumCellValue::None);
        });
    }

    #[test]
    fn test_parse_record_rejects_non_dict_rows() {
        Python::with_gil(|py| {
            let l_rows = PyList::empty(py);
            l_rows.append("row").unwrap();
            let dict_data = PyDict::new(py);
            dict_data.set_item("Users", l_rows).unwrap();

            let err = parse_workbook_data(dict_data.as_any()).unwrap_err();
            assert_eq!(derive_error_message(py, err), "Each worksheet row must be a dict.");
        });
    }

    #[test]
    fn test_parse_sheet_selector_and_delimiter() {
        Python::with_gil(|py| {
            let n_idx = 2i64.into_pyobject(py).unwrap();
            assert_eq!(
                parse_sheet_selector(Some(n_idx.as_any())).unwrap(),
                EnumSheetSelector::Index(2)
            );
            let c_name = PyString::new(py, "Users");
            assert_eq!(
                parse_sheet_selector(Some(c_name.as_any())).unwrap(),
                EnumSheetSelector::Name("Users".to_string())
            );
            assert_eq!(parse_sheet_selector(None).unwrap(), EnumSheetSelector::Index(0));
            let n_negative = (-1i64).into_pyobject(py).unwrap();
            assert!(parse_sheet_selector(Some(n_negative.as_any())).is_err());

            assert_eq!(parse_delimiter(";").unwrap(), b';');
            assert!(parse_delimiter(";;").is_err());
        });
    }
}
