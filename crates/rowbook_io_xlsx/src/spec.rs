//! Shared specification models: cell values, records, formats, options and reports.

use std::collections::BTreeMap;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::conf::{derive_default_body_format, derive_default_header_format};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueSpecification

/// Normalized cell value shared by the writer and reader pipelines.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    String(String),
}

impl EnumCellValue {
    /// Whether the value is blank (missing or empty text).
    pub fn is_blank(&self) -> bool {
        match self {
            Self::None => true,
            Self::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the value as display text; blank for `None`.
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
        }
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

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<EnumCellValue>> From<Option<T>> for EnumCellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

/// One row keyed by column name, in insertion order.
pub type SpecRecord = IndexMap<String, EnumCellValue>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookDataSpecification

/// Rows destined for one worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecWorksheetData {
    /// Worksheet name as given by the caller (before decoration/sanitizing).
    pub name: String,
    /// Data rows; the header is derived from their keys.
    pub rows: Vec<SpecRecord>,
}

impl SpecWorksheetData {
    pub fn new(name: impl Into<String>, rows: Vec<SpecRecord>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// Ordered collection of worksheets to export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecWorkbookData {
    pub worksheets: Vec<SpecWorksheetData>,
}

impl SpecWorkbookData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style worksheet append.
    pub fn with_worksheet(mut self, name: impl Into<String>, rows: Vec<SpecRecord>) -> Self {
        self.push_worksheet(name, rows);
        self
    }

    pub fn push_worksheet(&mut self, name: impl Into<String>, rows: Vec<SpecRecord>) {
        self.worksheets.push(SpecWorksheetData::new(name, rows));
    }

    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.worksheets.len()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification; every field is an optional overlay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Border style for all sides.
    pub border: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color (solid pattern).
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            text_wrap: other.text_wrap.or(self.text_wrap),
            border: other.border.or(self.border),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Upload directory and its public URL; output paths are resolved below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecUploadLocation {
    /// Filesystem directory receiving generated files.
    pub dir: PathBuf,
    /// URL prefix under which `dir` is served.
    pub url: String,
}

/// Options for [`crate::writer::array_to_xlsx`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpecXlsxWriteOptions {
    /// Append ` (N)` to the title of each non-empty worksheet.
    pub show_record_count: bool,
    /// Column widths per worksheet name; index 0 is column `A`.
    pub column_width: BTreeMap<String, Vec<f64>>,
    /// Append a trailing `et (<ms>ms)` worksheet recording the elapsed time.
    pub show_elapsed_sheet: bool,
    /// Write numeric-looking strings as numbers.
    pub if_infer_numeric_strings: bool,
    /// Write strings starting with `=` as formulas.
    pub if_write_formulas: bool,
    /// Format for columns `A:ZZ`.
    pub fmt_body: SpecCellFormat,
    /// Format for the header row.
    pub fmt_header: SpecCellFormat,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            show_record_count: false,
            column_width: BTreeMap::new(),
            show_elapsed_sheet: true,
            if_infer_numeric_strings: true,
            if_write_formulas: false,
            fmt_body: derive_default_body_format(),
            fmt_header: derive_default_header_format(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReadOptions

/// Worksheet selection for reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumSheetSelector {
    /// Zero-based worksheet position.
    Index(usize),
    /// Worksheet name (exact match).
    Name(String),
}

impl Default for EnumSheetSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// Options for [`crate::reader::xlsx_to_array`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxReadOptions {
    /// Worksheet to read (ignored for CSV).
    pub sheet: EnumSheetSelector,
    /// First row holds the headers; otherwise keys are column letters.
    pub if_has_header: bool,
    /// Canonicalize header names to snake_case.
    pub if_header_snake_case: bool,
    /// Drop rows whose cells are all blank.
    pub if_skip_empty_rows: bool,
    /// CSV field delimiter; `.tsv` files always use tab.
    pub csv_delimiter: u8,
    /// CSV quote character.
    pub csv_quote: u8,
    /// Detect numbers and booleans in CSV fields.
    pub if_infer_csv_types: bool,
}

impl Default for SpecXlsxReadOptions {
    fn default() -> Self {
        Self {
            sheet: EnumSheetSelector::default(),
            if_has_header: true,
            if_header_snake_case: false,
            if_skip_empty_rows: true,
            csv_delimiter: b',',
            csv_quote: b'"',
            if_infer_csv_types: false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Saved workbook location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxOutput {
    /// Absolute/filesystem path of the saved file.
    pub path: PathBuf,
    /// Public URL of the saved file.
    pub url: String,
}

/// One worksheet emitted to the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetReport {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Data rows written (header excluded).
    pub n_rows: usize,
    /// Header columns written.
    pub n_cols: usize,
}

/// Per-workbook write report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Worksheets written, in workbook order (elapsed sheet excluded).
    pub sheets: Vec<SpecSheetReport>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Milliseconds spent building the workbook.
    pub elapsed_ms: u128,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        log::warn!("{}", msg.as_ref());
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
