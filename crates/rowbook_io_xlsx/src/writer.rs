//! XLSX writer kernel that turns worksheet row records into a styled workbook.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::DataFrame;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatPattern, Workbook, Worksheet};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_LETTER_MAX, N_NROWS_EXCEL_MAX};
use crate::error::{RowbookError, RowbookResult};
use crate::frame::derive_worksheet_from_dataframe;
use crate::location::resolve_output;
use crate::spec::{
    EnumCellValue, SpecCellFormat, SpecSheetReport, SpecUploadLocation, SpecWorkbookData,
    SpecWorksheetData, SpecXlsxOutput, SpecXlsxReport, SpecXlsxWriteOptions,
};
use crate::util::{
    convert_cell_value, derive_column_letter, derive_sheet_title, plan_header_columns,
    sanitize_sheet_name,
};

/// Export worksheets into an XLSX file below the upload directory.
///
/// `file_path` is relative to `location.dir`. Returns the saved file's path and
/// URL together with the per-sheet write report.
pub fn array_to_xlsx(
    data: &SpecWorkbookData,
    file_path: impl AsRef<Path>,
    location: &SpecUploadLocation,
    options: &SpecXlsxWriteOptions,
) -> RowbookResult<(SpecXlsxOutput, SpecXlsxReport)> {
    let output = resolve_output(location, file_path)?;

    let mut writer = XlsxWriter::new(output.path.clone(), options.clone());
    for worksheet in &data.worksheets {
        writer.write_worksheet(worksheet)?;
    }
    writer.close()?;

    Ok((output, writer.report()))
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecXlsxReport,
    time_start: Instant,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and options.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    /// Elapsed time reported by the trailing `et` sheet is measured from here.
    pub fn new(path_file_out: PathBuf, write_options: SpecXlsxWriteOptions) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            report: SpecXlsxReport::default(),
            time_start: Instant::now(),
            if_closed: false,
        }
    }

    /// Return snapshot of the write report.
    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Append the elapsed-time sheet (when enabled) and flush to disk. Idempotent.
    pub fn close(&mut self) -> RowbookResult<()> {
        if self.if_closed {
            return Ok(());
        }

        let n_elapsed_ms = self.time_start.elapsed().as_millis();
        self.report.elapsed_ms = n_elapsed_ms;

        if self.write_options.show_elapsed_sheet {
            let sheet_name = self.derive_unique_sheet_name(&format!("et ({n_elapsed_ms}ms)"));
            self.workbook.add_worksheet().set_name(&sheet_name)?;
        } else if self.report.sheets.is_empty() {
            self.workbook.add_worksheet();
        }

        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;

        log::info!(
            "Saved {} ({} worksheets, {n_elapsed_ms}ms)",
            self.path_file_out.display(),
            self.report.sheets.len()
        );
        Ok(())
    }

    /// Write one worksheet from a polars dataframe; column names become headers.
    pub fn write_dataframe(&mut self, sheet_name: &str, df: &DataFrame) -> RowbookResult<()> {
        let worksheet = derive_worksheet_from_dataframe(sheet_name, df)?;
        self.write_worksheet(&worksheet)
    }

    /// Write one worksheet: styled header row from record keys, then one row per record.
    pub fn write_worksheet(&mut self, data: &SpecWorksheetData) -> RowbookResult<()> {
        if self.if_closed {
            return Err(RowbookError::WriterClosed);
        }

        let n_rows = data.rows.len();
        if n_rows >= N_NROWS_EXCEL_MAX {
            return Err(RowbookError::InvalidData(format!(
                "worksheet {:?} has {n_rows} rows; at most {} fit below the header",
                data.name,
                N_NROWS_EXCEL_MAX - 1
            )));
        }

        let l_headers = plan_header_columns(&data.rows);
        if l_headers.len() > N_NCOLS_LETTER_MAX {
            return Err(RowbookError::ColumnOverflow {
                index: l_headers.len() - 1,
                max: N_NCOLS_LETTER_MAX,
            });
        }

        let sheet_title = derive_sheet_title(&data.name, n_rows, self.write_options.show_record_count);
        let l_widths = self.plan_column_widths(&data.name, &sheet_title);
        if l_widths.len() > N_NCOLS_LETTER_MAX {
            return Err(RowbookError::ColumnOverflow {
                index: l_widths.len() - 1,
                max: N_NCOLS_LETTER_MAX,
            });
        }

        let sheet_name_sanitized = sanitize_sheet_name(&sheet_title, "_");
        let sheet_name_unique = self.derive_unique_sheet_name(&sheet_name_sanitized);
        if sheet_name_unique != sheet_title || !sheet_title.starts_with(data.name.as_str()) {
            self.report.warn(format!(
                "Worksheet {:?} renamed to {sheet_name_unique:?}.",
                data.name
            ));
        }

        let fmt_body = derive_rust_xlsx_format(&self.write_options.fmt_body);
        let fmt_header = derive_rust_xlsx_format(
            &self
                .write_options
                .fmt_body
                .merge(&self.write_options.fmt_header),
        );
        let if_infer_numeric_strings = self.write_options.if_infer_numeric_strings;
        let if_write_formulas = self.write_options.if_write_formulas;
        let if_first_sheet = self.report.sheets.is_empty();

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;
        if if_first_sheet {
            worksheet.set_active(true);
        }

        worksheet.set_column_range_format(0, cast_col_num(N_NCOLS_LETTER_MAX - 1)?, &fmt_body)?;
        worksheet.set_row_format(0, &fmt_header)?;

        for (n_idx_col, n_width) in l_widths.iter().enumerate() {
            worksheet.set_column_width(cast_col_num(n_idx_col)?, *n_width)?;
        }

        for (n_idx_col, c_header) in l_headers.iter().enumerate() {
            worksheet.write_string_with_format(0, cast_col_num(n_idx_col)?, c_header, &fmt_header)?;
        }

        for (n_idx_row, row) in data.rows.iter().enumerate() {
            let n_row = cast_row_num(n_idx_row + 1)?;
            for (n_idx_col, c_header) in l_headers.iter().enumerate() {
                let value = row
                    .get(c_header)
                    .map(|val| convert_cell_value(val, if_infer_numeric_strings))
                    .unwrap_or_default();
                write_cell_with_format(
                    worksheet,
                    n_row,
                    cast_col_num(n_idx_col)?,
                    &value,
                    &fmt_body,
                    if_write_formulas,
                )?;
            }
        }

        if let Some(n_idx_col_last) = l_headers.len().checked_sub(1) {
            log::debug!(
                "Wrote worksheet {sheet_name_unique:?} A1:{}{}",
                derive_column_letter(n_idx_col_last)?,
                n_rows + 1
            );
        } else {
            log::debug!("Wrote empty worksheet {sheet_name_unique:?}");
        }

        self.report.sheets.push(SpecSheetReport {
            sheet_name: sheet_name_unique,
            n_rows,
            n_cols: l_headers.len(),
        });
        Ok(())
    }

    /// Column widths for a worksheet: its data key first, then the decorated title.
    fn plan_column_widths(&self, name: &str, sheet_title: &str) -> Vec<f64> {
        self.write_options
            .column_width
            .get(name)
            .or_else(|| self.write_options.column_width.get(sheet_title))
            .cloned()
            .unwrap_or_default()
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if self.set_sheet_names_existing.insert(name.to_lowercase()) {
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let c_suffix = format!("__{n_idx}");
            let n_len_base = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.chars().count());
            let candidate = format!(
                "{}{c_suffix}",
                name.chars().take(n_len_base).collect::<String>()
            );
            if self.set_sheet_names_existing.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n_idx += 1;
        }
    }
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    value: &EnumCellValue,
    format: &Format,
    if_write_formulas: bool,
) -> RowbookResult<()> {
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::Bool(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::String(val) if if_write_formulas && val.len() > 1 && val.starts_with('=') => {
            worksheet.write_formula_with_format(n_row, n_col, val.as_str(), format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> RowbookResult<u32> {
    u32::try_from(value)
        .map_err(|_| RowbookError::InvalidData(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> RowbookResult<u16> {
    u16::try_from(value).map_err(|_| RowbookError::ColumnOverflow {
        index: value,
        max: N_NCOLS_LETTER_MAX,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecRecord;
    use calamine::{Reader, open_workbook_auto};
    use polars::prelude::{NamedFrom, Series};
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, EnumCellValue)]) -> SpecRecord {
        pairs
            .iter()
            .map(|(key, val)| (key.to_string(), val.clone()))
            .collect()
    }

    #[test]
    fn test_write_worksheet_reports_decorated_unique_names() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = SpecXlsxWriteOptions {
            show_record_count: true,
            show_elapsed_sheet: false,
            ..Default::default()
        };
        let mut writer = XlsxWriter::new(tmp.path().join("out.xlsx"), options);

        let rows = vec![
            record(&[("id", 1.0.into()), ("name", "a".into())]),
            record(&[("id", 2.0.into()), ("extra", true.into())]),
        ];
        writer
            .write_worksheet(&SpecWorksheetData::new("Users", rows.clone()))
            .expect("write users");
        writer
            .write_worksheet(&SpecWorksheetData::new("Users", rows))
            .expect("write duplicate");
        writer
            .write_worksheet(&SpecWorksheetData::new("Empty", vec![]))
            .expect("write empty");
        writer.close().expect("close");
        writer.close().expect("close twice");

        let report = writer.report();
        let l_names: Vec<&str> = report
            .sheets
            .iter()
            .map(|sheet| sheet.sheet_name.as_str())
            .collect();
        assert_eq!(l_names, vec!["Users (2)", "Users (2)__2", "Empty"]);
        assert_eq!(report.sheets[0].n_cols, 3);
        assert_eq!(report.sheets[0].n_rows, 2);
        assert_eq!(report.sheets[2].n_cols, 0);
        assert_eq!(report.warnings.len(), 1);
        assert!(tmp.path().join("out.xlsx").is_file());
    }

    #[test]
    fn test_write_after_close_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut writer =
            XlsxWriter::new(tmp.path().join("out.xlsx"), SpecXlsxWriteOptions::default());
        writer.close().expect("close");

        let err = writer
            .write_worksheet(&SpecWorksheetData::new("Late", vec![]))
            .unwrap_err();
        assert!(matches!(err, RowbookError::WriterClosed));
    }

    #[test]
    fn test_column_width_beyond_zz_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut options = SpecXlsxWriteOptions::default();
        options
            .column_width
            .insert("Wide".to_string(), vec![12.0; N_NCOLS_LETTER_MAX + 1]);
        let mut writer = XlsxWriter::new(tmp.path().join("out.xlsx"), options);

        let err = writer
            .write_worksheet(&SpecWorksheetData::new("Wide", vec![]))
            .unwrap_err();
        assert!(matches!(
            err,
            RowbookError::ColumnOverflow { index: 702, .. }
        ));
    }

    #[test]
    fn test_colliding_long_sheet_names_stay_unique() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = SpecXlsxWriteOptions {
            show_elapsed_sheet: false,
            ..Default::default()
        };
        let mut writer = XlsxWriter::new(tmp.path().join("out.xlsx"), options);

        for n_idx in 0..12 {
            let c_name = format!("{}{n_idx:02}", "A".repeat(40));
            writer
                .write_worksheet(&SpecWorksheetData::new(c_name, vec![]))
                .expect("write worksheet");
        }
        writer.close().expect("close");

        let report = writer.report();
        let l_names: Vec<&str> = report
            .sheets
            .iter()
            .map(|sheet| sheet.sheet_name.as_str())
            .collect();
        assert_eq!(l_names[0], "A".repeat(31));
        assert_eq!(l_names[1], format!("{}__2", "A".repeat(28)));
        assert_eq!(l_names[11], format!("{}__12", "A".repeat(27)));
        assert_eq!(l_names.iter().collect::<BTreeSet<_>>().len(), 12);
        assert!(l_names.iter().all(|c_name| c_name.chars().count() <= 31));
        assert_eq!(report.warnings.len(), 12);
    }

    #[test]
    fn test_long_name_keeps_record_count() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = SpecXlsxWriteOptions {
            show_record_count: true,
            show_elapsed_sheet: false,
            ..Default::default()
        };
        let mut writer = XlsxWriter::new(tmp.path().join("out.xlsx"), options);

        let c_name = "Quarterly revenue by region and product";
        writer
            .write_worksheet(&SpecWorksheetData::new(
                c_name,
                vec![record(&[("id", 1.0.into())])],
            ))
            .expect("write worksheet");

        let report = writer.report();
        assert_eq!(report.sheets[0].sheet_name, "Quarterly revenue by region (1)");
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_width_overflow_leaves_no_partial_sheet() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("out.xlsx");
        let mut options = SpecXlsxWriteOptions {
            show_elapsed_sheet: false,
            ..Default::default()
        };
        options
            .column_width
            .insert("Wide".to_string(), vec![12.0; N_NCOLS_LETTER_MAX + 1]);
        let mut writer = XlsxWriter::new(path_out.clone(), options);

        assert!(writer
            .write_worksheet(&SpecWorksheetData::new("Wide", vec![]))
            .is_err());
        writer
            .write_worksheet(&SpecWorksheetData::new("Narrow", vec![]))
            .expect("write narrow");
        writer.close().expect("close");

        assert_eq!(writer.report().sheets.len(), 1);
        let workbook = open_workbook_auto(&path_out).expect("open");
        assert_eq!(workbook.sheet_names(), vec!["Narrow".to_string()]);
    }

    #[test]
    fn test_column_widths_fall_back_to_decorated_title() {
        let mut options = SpecXlsxWriteOptions::default();
        options
            .column_width
            .insert("Users (2)".to_string(), vec![10.0, 20.0]);
        options.column_width.insert("Orders".to_string(), vec![5.0]);
        let writer = XlsxWriter::new(PathBuf::from("unused.xlsx"), options);

        assert_eq!(writer.plan_column_widths("Users", "Users (2)"), vec![10.0, 20.0]);
        assert_eq!(writer.plan_column_widths("Orders", "Orders (3)"), vec![5.0]);
        assert!(writer.plan_column_widths("Other", "Other").is_empty());
    }

    #[test]
    fn test_write_dataframe_round_trips_through_calamine() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("frame.xlsx");
        let df = DataFrame::new(vec![
            Series::new("id".into(), &[1i64, 2]).into(),
            Series::new("name".into(), &[Some("a"), None]).into(),
        ])
        .expect("dataframe");

        let mut writer = XlsxWriter::new(path_out.clone(), SpecXlsxWriteOptions::default());
        writer.write_dataframe("Frame", &df).expect("write dataframe");
        writer.close().expect("close");

        assert_eq!(writer.report().sheets[0].n_cols, 2);
        let mut workbook = open_workbook_auto(&path_out).expect("open");
        let range = workbook.worksheet_range("Frame").expect("range");
        assert_eq!(range.get_size(), (3, 2));
        assert_eq!(
            range.get_value((0, 1)),
            Some(&calamine::Data::String("name".to_string()))
        );
        assert_eq!(range.get_value((2, 0)), Some(&calamine::Data::Float(2.0)));
        assert_eq!(range.get_value((2, 1)), Some(&calamine::Data::Empty));
    }
}
