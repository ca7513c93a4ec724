// 📤 CSV export and the blank import template
// Every value is double-quoted; records are joined with '\n'

use crate::error::ExportError;
use crate::transaction::Transaction;
use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const FULL_HEADERS: [&str; 6] = ["Tanggal", "Kategori", "Tipe", "Nominal", "Keterangan", "Dibuat"];
pub const TEMPLATE_HEADERS: [&str; 4] = ["Tanggal", "Jenis Transaksi", "Kategori", "Nominal"];
pub const BLANK_TEMPLATE_HEADERS: [&str; 5] = ["tanggal", "kategori", "nominal", "tipe", "keterangan"];

const BLANK_TEMPLATE_ROWS: [[&str; 5]; 3] = [
    ["2026-01-27", "Makanan", "50000", "Pengeluaran", "Makan siang"],
    ["2026-01-27", "Gaji", "5000000", "Pemasukan", "Gaji bulan 1"],
    ["2026-01-26", "Transport", "25000", "Pengeluaran", "Grab"],
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportLayout {
    /// Six columns, ISO dates, creation timestamp included
    #[default]
    Full,
    /// Four columns in the spreadsheet import convention, dates as DD/MM/YYYY
    Template,
}

impl FromStr for ExportLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(ExportLayout::Full),
            "template" => Ok(ExportLayout::Template),
            other => Err(format!("unknown export layout: {}", other)),
        }
    }
}

/// Whole amounts without decimals; fractions with a decimal comma so the
/// importer's amount cleaning reads them back unchanged
pub fn format_nominal(nominal: f64) -> String {
    if nominal.fract() == 0.0 {
        format!("{:.0}", nominal)
    } else {
        nominal.to_string().replace('.', ",")
    }
}

fn write_records<I>(headers: &[&str], records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for record in records {
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

pub fn export_csv(transactions: &[Transaction], layout: ExportLayout) -> Result<String, ExportError> {
    if transactions.is_empty() {
        return Err(ExportError::Empty);
    }

    match layout {
        ExportLayout::Full => write_records(
            &FULL_HEADERS,
            transactions.iter().map(|t| {
                vec![
                    t.tanggal.format("%Y-%m-%d").to_string(),
                    t.kategori.clone(),
                    t.tipe.as_str().to_string(),
                    format_nominal(t.nominal),
                    t.keterangan.clone(),
                    t.created_at.to_rfc3339(),
                ]
            }),
        ),
        ExportLayout::Template => write_records(
            &TEMPLATE_HEADERS,
            transactions.iter().map(|t| {
                vec![
                    t.tanggal.format("%d/%m/%Y").to_string(),
                    t.tipe.as_str().to_string(),
                    t.kategori.clone(),
                    format_nominal(t.nominal),
                ]
            }),
        ),
    }
}

/// Header plus three sample rows users can overwrite
pub fn import_template() -> Result<String, ExportError> {
    write_records(
        &BLANK_TEMPLATE_HEADERS,
        BLANK_TEMPLATE_ROWS
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect()),
    )
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("transaksi-{}.csv", date.format("%Y-%m-%d"))
}

pub fn template_file_name(date: NaiveDate) -> String {
    format!("template-transaksi-{}.csv", date.format("%Y-%m-%d"))
}
