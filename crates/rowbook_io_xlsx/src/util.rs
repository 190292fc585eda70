//! Stateless helper utilities shared by the writer and reader kernels.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_LETTER_MAX, TUP_EXCEL_ILLEGAL};
use crate::error::{RowbookError, RowbookResult};
use crate::spec::{EnumCellValue, SpecRecord};

static RE_CAMEL_LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\p{Ll}\p{N}])(\p{Lu})").expect("valid regex"));
static RE_CAMEL_ACRONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Lu}+)(\p{Lu}\p{Ll})").expect("valid regex"));
static RE_NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));
static RE_NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("valid regex")
});

////////////////////////////////////////////////////////////////////////////////
// #region ColumnLetters

/// Spreadsheet column name for a zero-based index: `0 -> A`, `26 -> AA`, `701 -> ZZ`.
pub fn derive_column_letter(idx: usize) -> RowbookResult<String> {
    if idx >= N_NCOLS_LETTER_MAX {
        return Err(RowbookError::ColumnOverflow {
            index: idx,
            max: N_NCOLS_LETTER_MAX,
        });
    }

    let mut n_rest = idx + 1;
    let mut l_chars = Vec::with_capacity(2);
    while n_rest > 0 {
        n_rest -= 1;
        l_chars.push(char::from(b'A' + (n_rest % 26) as u8));
        n_rest /= 26;
    }
    Ok(l_chars.into_iter().rev().collect())
}

/// First `n` column names (`A`, `B`, ..., `Z`, `AA`, ...).
pub fn derive_column_letters(n: usize) -> RowbookResult<Vec<String>> {
    (0..n).map(derive_column_letter).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderNormalization

/// Canonicalize a header label to snake_case.
///
/// camelCase and acronym boundaries are split first, then every run of
/// non-alphanumeric characters collapses to `_`.
pub fn convert_header_to_snake_case(text: &str) -> String {
    let c_text = RE_CAMEL_LOWER_UPPER.replace_all(text, "${1}_${2}");
    let c_text = RE_CAMEL_ACRONYM.replace_all(&c_text, "${1}_${2}");
    let c_text = RE_NON_WORD.replace_all(&c_text, "_");
    c_text.trim_matches('_').to_lowercase()
}

/// Ordered union of record keys: first row keys, then unseen keys of later rows.
pub fn plan_header_columns(rows: &[SpecRecord]) -> Vec<String> {
    let mut set_headers: IndexSet<&str> = IndexSet::new();
    for row in rows {
        for key in row.keys() {
            set_headers.insert(key.as_str());
        }
    }
    set_headers.into_iter().map(ToString::to_string).collect()
}

/// Suffix repeated header names with `_2`, `_3`, ... so every key is unique.
pub fn derive_unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut set_seen: BTreeSet<String> = BTreeSet::new();
    let mut dict_next_suffix: BTreeMap<String, usize> = BTreeMap::new();
    let mut l_headers = Vec::with_capacity(headers.len());

    for c_header in headers {
        if set_seen.insert(c_header.clone()) {
            l_headers.push(c_header);
            continue;
        }

        let n_suffix = dict_next_suffix.entry(c_header.clone()).or_insert(2);
        loop {
            let candidate = format!("{c_header}_{n_suffix}");
            *n_suffix += 1;
            if set_seen.insert(candidate.clone()) {
                l_headers.push(candidate);
                break;
            }
        }
    }

    l_headers
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Worksheet title, optionally decorated with the record count.
///
/// The name is shortened so a ` (N)` suffix always fits the sheet-name limit.
pub fn derive_sheet_title(name: &str, n_rows: usize, show_record_count: bool) -> String {
    if !(show_record_count && n_rows > 0) {
        return name.to_string();
    }

    let c_suffix = format!(" ({n_rows})");
    let n_len_base = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.chars().count());
    let c_base: String = name.chars().take(n_len_base).collect();
    format!("{}{c_suffix}", c_base.trim_end())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Whether `text` reads as a plain decimal/scientific number.
///
/// Leading-zero integers (`007`, `-0123`) stay text so codes keep their zeros.
pub fn is_numeric_text(text: &str) -> bool {
    if !RE_NUMERIC.is_match(text) {
        return false;
    }
    let c_digits = text.trim_start_matches(['+', '-']);
    let mut it_chars = c_digits.chars();
    !matches!(
        (it_chars.next(), it_chars.next()),
        (Some('0'), Some(chr)) if chr.is_ascii_digit()
    )
}

/// Render `NaN`/`Inf` as text; finite numbers return `None`.
pub fn convert_nan_inf_to_str(x: f64) -> Option<String> {
    if x.is_nan() {
        return Some("NaN".to_string());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() { "Inf" } else { "-Inf" }.to_string());
    }
    None
}

/// Normalize a cell value for writing.
pub fn convert_cell_value(value: &EnumCellValue, if_infer_numeric_strings: bool) -> EnumCellValue {
    match value {
        EnumCellValue::Number(n) => match convert_nan_inf_to_str(*n) {
            Some(c_text) => EnumCellValue::String(c_text),
            None => EnumCellValue::Number(*n),
        },
        EnumCellValue::String(s) if if_infer_numeric_strings && is_numeric_text(s) => {
            match s.parse::<f64>() {
                Ok(n) if n.is_finite() => EnumCellValue::Number(n),
                _ => EnumCellValue::String(s.clone()),
            }
        }
        _ => value.clone(),
    }
}

/// Detect the value type of a raw CSV field.
pub fn detect_field_type(field: &str) -> EnumCellValue {
    let c_field = field.trim();
    if c_field.is_empty() {
        return EnumCellValue::None;
    }

    if c_field.eq_ignore_ascii_case("true") {
        return EnumCellValue::Bool(true);
    }
    if c_field.eq_ignore_ascii_case("false") {
        return EnumCellValue::Bool(false);
    }

    if is_numeric_text(c_field)
        && let Ok(n) = c_field.parse::<f64>()
    {
        return EnumCellValue::Number(n);
    }

    EnumCellValue::String(field.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
