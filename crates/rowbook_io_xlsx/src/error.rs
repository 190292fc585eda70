//! Error types shared by the writer and reader kernels.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type RowbookResult<T> = std::result::Result<T, RowbookError>;

/// Errors raised while converting between row records and spreadsheet files.
#[derive(Debug, Error)]
pub enum RowbookError {
    /// Input data does not have the worksheet -> rows -> record shape.
    #[error("Invalid data structure for Excel ({0})")]
    InvalidData(String),

    /// Writer was used after the workbook had been saved.
    #[error("Cannot write after close().")]
    WriterClosed,

    /// Output path escapes the upload directory or is otherwise unusable.
    #[error("Invalid output path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// No upload directory configured.
    #[error("Upload directory is not configured (set ROWBOOK_UPLOAD_DIR)")]
    MissingUploadDir,

    /// Column index beyond the `A..ZZ` letter range.
    #[error("Column index {index} exceeds the supported range A..ZZ ({max} columns)")]
    ColumnOverflow { index: usize, max: usize },

    /// Requested worksheet does not exist in the source workbook.
    #[error("Worksheet not found: {0:?}")]
    SheetNotFound(String),

    /// Source file extension is not a known spreadsheet or CSV format.
    #[error("Unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("workbook read error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
