//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecXlsxReadOptions, SpecXlsxWriteOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Number of columns addressable by one- and two-letter names (`A..ZZ`).
pub const N_NCOLS_LETTER_MAX: usize = 26 + 26 * 26;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Header row fill colour.
pub const C_COLOR_HEADER_FILL: &str = "#DDDDDD";
/// Body font size in points.
pub const N_FONT_SIZE_BODY: i64 = 10;

/// Environment variable holding the upload directory.
pub const C_ENV_UPLOAD_DIR: &str = "ROWBOOK_UPLOAD_DIR";
/// Environment variable holding the public URL of the upload directory.
pub const C_ENV_UPLOAD_URL: &str = "ROWBOOK_UPLOAD_URL";
/// Upload URL used when [`C_ENV_UPLOAD_URL`] is unset.
pub const C_UPLOAD_URL_DEFAULT: &str = "/upload";

/// Format applied to every column in `A:ZZ`.
pub fn derive_default_body_format() -> SpecCellFormat {
    SpecCellFormat {
        font_size: Some(N_FONT_SIZE_BODY),
        align: Some("left".to_string()),
        valign: Some("top".to_string()),
        text_wrap: Some(true),
        ..Default::default()
    }
}

/// Format applied to the header row (row 1).
pub fn derive_default_header_format() -> SpecCellFormat {
    derive_default_body_format().with_(SpecCellFormat {
        bold: Some(true),
        bg_color: Some(C_COLOR_HEADER_FILL.to_string()),
        ..Default::default()
    })
}

/// Build default write options.
pub fn derive_default_xlsx_write_options() -> SpecXlsxWriteOptions {
    SpecXlsxWriteOptions::default()
}

/// Build default read options.
pub fn derive_default_xlsx_read_options() -> SpecXlsxReadOptions {
    SpecXlsxReadOptions::default()
}
