// Value Normalizer - pure conversions for loosely formatted import cells

use crate::aliases::AliasTable;
use crate::transaction::TransactionType;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("static regex"));
static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("static regex"));
static DASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})$").expect("static regex"));
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));
static RP_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)rp").expect("static regex"));

/// Header cell → mapping key.
///
/// "Jenis Transaksi" → "jenis_transaksi", " Nominal (Rp) " → "nominal_rp"
pub fn normalize_column_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(&lower, "_");
    NON_WORD.replace_all(&underscored, "").into_owned()
}

/// `DD/MM/YYYY` and `DD-MM-YYYY` become zero-padded `YYYY-MM-DD`.
/// Anything else comes back unchanged so the validator can reject it.
pub fn normalize_date(input: &str) -> String {
    let trimmed = input.trim();
    let caps = SLASH_DATE
        .captures(trimmed)
        .or_else(|| DASH_DATE.captures(trimmed));

    match caps {
        Some(caps) => format!("{}-{:0>2}-{:0>2}", &caps[3], &caps[2], &caps[1]),
        None => trimmed.to_string(),
    }
}

/// Digit-pattern check only; see `parse_iso_date` for calendar validity
pub fn is_iso_date(s: &str) -> bool {
    ISO_DATE.is_match(s)
}

/// `YYYY-MM-DD` that is also a real calendar day
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if !is_iso_date(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// "Rp50.000" → 50000.0, "1.234,5" → 1234.5, "abc" → NaN.
///
/// `.` is always a thousands separator and `,` the decimal mark.
pub fn clean_amount(input: &str) -> f64 {
    let without_marker = RP_MARKER.replace_all(input, "");
    let cleaned: String = without_marker
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    cleaned.parse::<f64>().unwrap_or(f64::NAN)
}

/// Resolve a free-form type label with the built-in label table
pub fn resolve_type(label: &str) -> Option<TransactionType> {
    AliasTable::builtin().resolve_type(label)
}

/// Canonical type label, or the input unchanged when it cannot be resolved
pub fn convert_type(label: &str) -> String {
    AliasTable::builtin().convert_type(label)
}
