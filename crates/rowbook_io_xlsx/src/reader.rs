//! Spreadsheet / CSV reader kernel producing row records keyed by header name.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::{RowbookError, RowbookResult};
use crate::spec::{EnumCellValue, EnumSheetSelector, SpecRecord, SpecXlsxReadOptions};
use crate::util::{
    convert_header_to_snake_case, derive_column_letter, derive_unique_headers, detect_field_type,
};

/// Source file family, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSourceFormat {
    /// Delimited text with the configured delimiter.
    Csv,
    /// Tab-delimited text.
    Tsv,
    /// Any workbook format calamine opens (xlsx, xlsm, xlsb, xls, ods).
    Workbook,
}

impl EnumSourceFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> RowbookResult<Self> {
        let c_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match c_ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Ok(Self::Workbook),
            _ => Err(RowbookError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Parse a spreadsheet or CSV file into row records keyed by header name.
pub fn xlsx_to_array(
    path: impl AsRef<Path>,
    options: &SpecXlsxReadOptions,
) -> RowbookResult<Vec<SpecRecord>> {
    let path = path.as_ref();
    let source_format = EnumSourceFormat::from_path(path)?;
    if !path.is_file() {
        return Err(RowbookError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let grid = match source_format {
        EnumSourceFormat::Csv => read_grid_from_csv(File::open(path)?, options.csv_delimiter, options)?,
        EnumSourceFormat::Tsv => read_grid_from_csv(File::open(path)?, b'\t', options)?,
        EnumSourceFormat::Workbook => read_grid_from_workbook(path, &options.sheet)?,
    };

    let l_records = convert_grid_to_records(grid, options)?;
    log::debug!("Read {} records from {}", l_records.len(), path.display());
    Ok(l_records)
}

/// Read one worksheet as a cell grid anchored at column `A`.
pub fn read_grid_from_workbook(
    path: &Path,
    sheet: &EnumSheetSelector,
) -> RowbookResult<Vec<Vec<EnumCellValue>>> {
    let mut workbook = open_workbook_auto(path)?;
    let l_sheet_names = workbook.sheet_names();

    let c_sheet_name = match sheet {
        EnumSheetSelector::Index(n_idx) => l_sheet_names
            .get(*n_idx)
            .cloned()
            .ok_or_else(|| RowbookError::SheetNotFound(format!("#{n_idx}")))?,
        EnumSheetSelector::Name(c_name) => {
            if !l_sheet_names.iter().any(|c_existing| c_existing == c_name) {
                return Err(RowbookError::SheetNotFound(c_name.clone()));
            }
            c_name.clone()
        }
    };

    let range = workbook.worksheet_range(&c_sheet_name)?;
    let n_col_offset = range.start().map_or(0, |(_, n_col)| n_col as usize);

    Ok(range
        .rows()
        .map(|row| {
            let mut l_cells = vec![EnumCellValue::None; n_col_offset];
            l_cells.extend(row.iter().map(derive_cell_value_from_data));
            l_cells
        })
        .collect())
}

/// Read delimited text as a cell grid; every line is a row (no header handling).
pub fn read_grid_from_csv<R: Read>(
    reader: R,
    delimiter: u8,
    options: &SpecXlsxReadOptions,
) -> RowbookResult<Vec<Vec<EnumCellValue>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quote(options.csv_quote)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut l_rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        l_rows.push(
            record
                .iter()
                .map(|field| {
                    if options.if_infer_csv_types {
                        detect_field_type(field)
                    } else if field.is_empty() {
                        EnumCellValue::None
                    } else {
                        EnumCellValue::String(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(l_rows)
}

/// Turn a cell grid into records.
///
/// With a header row, blank header cells fall back to their column letter;
/// without one, every key is a column letter. Short rows are padded with blanks.
pub fn convert_grid_to_records(
    grid: Vec<Vec<EnumCellValue>>,
    options: &SpecXlsxReadOptions,
) -> RowbookResult<Vec<SpecRecord>> {
    let n_width = grid.iter().map(Vec::len).max().unwrap_or(0);
    if n_width == 0 {
        return Ok(vec![]);
    }

    let mut it_rows = grid.into_iter();
    let l_headers_raw = if options.if_has_header {
        let row_header = it_rows.next().unwrap_or_default();
        derive_header_names(&row_header, n_width, options.if_header_snake_case)?
    } else {
        (0..n_width)
            .map(derive_column_letter)
            .collect::<RowbookResult<Vec<_>>>()?
    };
    let l_headers = derive_unique_headers(l_headers_raw);

    let mut l_records = Vec::new();
    for row in it_rows {
        if options.if_skip_empty_rows && row.iter().all(EnumCellValue::is_blank) {
            continue;
        }

        let mut it_cells = row.into_iter();
        let record: SpecRecord = l_headers
            .iter()
            .map(|c_header| (c_header.clone(), it_cells.next().unwrap_or_default()))
            .collect();
        l_records.push(record);
    }

    Ok(l_records)
}

fn derive_header_names(
    row_header: &[EnumCellValue],
    n_width: usize,
    if_snake_case: bool,
) -> RowbookResult<Vec<String>> {
    (0..n_width)
        .map(|n_idx_col| {
            let c_text = row_header
                .get(n_idx_col)
                .map(|cell| cell.to_text().trim().to_string())
                .unwrap_or_default();
            let c_text = if if_snake_case {
                convert_header_to_snake_case(&c_text)
            } else {
                c_text
            };
            if c_text.is_empty() {
                derive_column_letter(n_idx_col)
            } else {
                Ok(c_text)
            }
        })
        .collect()
}

fn derive_cell_value_from_data(cell: &Data) -> EnumCellValue {
    match cell {
        Data::Empty => EnumCellValue::None,
        Data::Int(val) => EnumCellValue::Number(*val as f64),
        Data::Float(val) => EnumCellValue::Number(*val),
        Data::Bool(val) => EnumCellValue::Bool(*val),
        Data::String(val) => EnumCellValue::String(val.clone()),
        Data::DateTime(val) => EnumCellValue::Number(val.as_f64()),
        Data::DateTimeIso(val) | Data::DurationIso(val) => EnumCellValue::String(val.clone()),
        Data::Error(err) => EnumCellValue::String(err.to_string()),
    }
}
