//! `rowbook_io_xlsx` v1:
//! Rust-side kernel converting between row records and spreadsheet files.
//!
//! - `conf`     : constants and default presets
//! - `spec`     : specs/models/options
//! - `util`     : pure helper functions (column letters, header canonicalization)
//! - `location` : upload directory path/URL resolution
//! - `frame`    : polars dataframe interop
//! - `writer`   : records -> XLSX (`array_to_xlsx`)
//! - `reader`   : XLSX/XLS/ODS/CSV -> records (`xlsx_to_array`)
//! - `error`    : crate error type
pub mod conf;
pub mod error;
pub mod frame;
pub mod location;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_LETTER_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_body_format, derive_default_header_format, derive_default_xlsx_read_options,
    derive_default_xlsx_write_options,
};
pub use error::{RowbookError, RowbookResult};
pub use frame::{
    convert_records_to_dataframe, derive_workbook_from_dataframes, derive_worksheet_from_dataframe,
};
pub use location::resolve_output;
pub use reader::{EnumSourceFormat, convert_grid_to_records, xlsx_to_array};
pub use spec::{
    EnumCellValue, EnumSheetSelector, SpecCellFormat, SpecRecord, SpecSheetReport,
    SpecUploadLocation, SpecWorkbookData, SpecWorksheetData, SpecXlsxOutput, SpecXlsxReadOptions,
    SpecXlsxReport, SpecXlsxWriteOptions,
};
pub use util::{
    convert_header_to_snake_case, derive_column_letter, derive_column_letters, sanitize_sheet_name,
};
pub use writer::{XlsxWriter, array_to_xlsx};
