//! Conversions between row records and polars dataframes.

use polars::prelude::{AnyValue, Column, DataFrame, NamedFrom, Series};

use crate::error::RowbookResult;
use crate::spec::{EnumCellValue, SpecRecord, SpecWorkbookData, SpecWorksheetData};
use crate::util::plan_header_columns;

/// Build worksheet rows from a dataframe; column names become record keys.
pub fn derive_worksheet_from_dataframe(
    sheet_name: &str,
    df: &DataFrame,
) -> RowbookResult<SpecWorksheetData> {
    let l_cols = df.get_columns();
    let mut l_rows = Vec::with_capacity(df.height());

    for n_idx_row in 0..df.height() {
        let mut record = SpecRecord::with_capacity(l_cols.len());
        for col in l_cols {
            record.insert(
                col.name().to_string(),
                derive_cell_value_from_any_value(col.get(n_idx_row)?),
            );
        }
        l_rows.push(record);
    }

    Ok(SpecWorksheetData::new(sheet_name, l_rows))
}

/// Build a workbook from `(sheet name, dataframe)` pairs, keeping their order.
pub fn derive_workbook_from_dataframes(
    sheets: &[(&str, &DataFrame)],
) -> RowbookResult<SpecWorkbookData> {
    let worksheets = sheets
        .iter()
        .map(|(sheet_name, df)| derive_worksheet_from_dataframe(sheet_name, df))
        .collect::<RowbookResult<Vec<_>>>()?;
    Ok(SpecWorkbookData { worksheets })
}

/// Collect records into a dataframe of nullable string columns.
///
/// Columns follow [`plan_header_columns`] order; missing keys become nulls.
pub fn convert_records_to_dataframe(records: &[SpecRecord]) -> RowbookResult<DataFrame> {
    let l_columns: Vec<Column> = plan_header_columns(records)
        .iter()
        .map(|c_header| {
            let l_values: Vec<Option<String>> = records
                .iter()
                .map(|record| match record.get(c_header) {
                    None | Some(EnumCellValue::None) => None,
                    Some(value) => Some(value.to_text()),
                })
                .collect();
            Series::new(c_header.as_str().into(), l_values).into()
        })
        .collect();

    Ok(DataFrame::new(l_columns)?)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => EnumCellValue::Bool(val),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        other if other.dtype().is_numeric() => other
            .extract::<f64>()
            .map_or(EnumCellValue::None, EnumCellValue::Number),
        other => EnumCellValue::String(other.to_string()),
    }
}
