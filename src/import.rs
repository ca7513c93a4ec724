// ✅ Row Validator
// Parsed import rows → accepted NewTransactions + per-row error messages

use crate::aliases::AliasTable;
use crate::error::StoreError;
use crate::normalize::{clean_amount, normalize_date, parse_iso_date};
use crate::parser::{CellValue, ImportRow};
use crate::schema::MAX_KETERANGAN_LEN;
use crate::store::TransactionStore;
use crate::transaction::{NewTransaction, Transaction, TransactionType};
use serde::Serialize;
use tracing::{info, warn};

/// Header row occupies row 1, so the first data row is row 2
pub const FIRST_DATA_ROW: usize = 2;

pub const CORE_FIELDS: [&str; 4] = ["tanggal", "kategori", "nominal", "tipe"];

// ============================================================================
// RESULT TYPES
// ============================================================================

/// A row that passed every rule, with normalized cells and its typed record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidRow {
    pub row: usize,
    pub fields: ImportRow,
    pub transaction: NewTransaction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

/// Complete partition of the input: every row lands in exactly one list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportResult {
    pub valid: Vec<ValidRow>,
    pub errors: Vec<RowError>,
}

impl ImportResult {
    pub fn total(&self) -> usize {
        self.valid.len() + self.errors.len()
    }

    pub fn transactions(&self) -> Vec<NewTransaction> {
        self.valid.iter().map(|v| v.transaction.clone()).collect()
    }
}

// ============================================================================
// ROW VALIDATOR
// ============================================================================

/// Validation pipeline parameterized by alias table and required-field set.
/// The four core fields are always required.
pub struct RowValidator<'a> {
    aliases: &'a AliasTable,
    extra_required: Vec<String>,
}

impl<'a> RowValidator<'a> {
    pub fn new(aliases: &'a AliasTable) -> Self {
        RowValidator {
            aliases,
            extra_required: Vec::new(),
        }
    }

    /// Builder pattern: require another column to be present and non-empty
    pub fn with_required(mut self, field: &str) -> Self {
        let key = self.aliases.canonical_key(field);
        if !CORE_FIELDS.contains(&key.as_str()) && !self.extra_required.contains(&key) {
            self.extra_required.push(key);
        }
        self
    }

    pub fn required_fields(&self) -> Vec<&str> {
        CORE_FIELDS
            .iter()
            .copied()
            .chain(self.extra_required.iter().map(String::as_str))
            .collect()
    }

    /// Evaluate every row; never stops early
    pub fn validate(&self, rows: Vec<ImportRow>) -> ImportResult {
        let mut result = ImportResult::default();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + FIRST_DATA_ROW;
            match self.validate_row(row) {
                Ok((fields, transaction)) => result.valid.push(ValidRow {
                    row: row_number,
                    fields,
                    transaction,
                }),
                Err(messages) => {
                    let message = messages.join("; ");
                    warn!(row = row_number, %message, "rejected import row");
                    result.errors.push(RowError {
                        row: row_number,
                        message,
                    });
                }
            }
        }

        info!(
            valid = result.valid.len(),
            rejected = result.errors.len(),
            "validated import rows"
        );
        result
    }

    fn validate_row(&self, row: ImportRow) -> Result<(ImportRow, NewTransaction), Vec<String>> {
        let mut row: ImportRow = row
            .into_iter()
            .map(|(key, value)| (self.aliases.canonical_key(&key), value))
            .collect();
        let mut errors = Vec::new();

        let tanggal = match text_field(&row, "tanggal") {
            None => {
                errors.push(empty_column("tanggal"));
                None
            }
            Some(raw) => {
                let parsed = parse_iso_date(&normalize_date(&raw));
                if parsed.is_none() {
                    errors.push("invalid date format".to_string());
                }
                parsed
            }
        };

        let kategori = text_field(&row, "kategori");
        if kategori.is_none() {
            errors.push(empty_column("kategori"));
        }

        let nominal = match row.get("nominal") {
            None => {
                errors.push(empty_column("nominal"));
                None
            }
            Some(cell) => {
                let amount = match cell {
                    CellValue::Number(n) => *n,
                    CellValue::Text(s) => clean_amount(s),
                };
                if amount.is_finite() && amount > 0.0 {
                    Some(amount)
                } else {
                    errors.push("amount must be a positive number".to_string());
                    None
                }
            }
        };

        let tipe = match text_field(&row, "tipe") {
            None => {
                errors.push(empty_column("tipe"));
                None
            }
            Some(raw) => {
                let parsed = self.aliases.convert_type(&raw).parse::<TransactionType>().ok();
                if parsed.is_none() {
                    errors.push(
                        "type must be \"Pemasukan\" or \"Pengeluaran\" (or \"Uang Masuk\"/\"Uang Keluar\")"
                            .to_string(),
                    );
                }
                parsed
            }
        };

        let keterangan = text_field(&row, "keterangan").unwrap_or_default();
        if keterangan.chars().count() > MAX_KETERANGAN_LEN {
            errors.push(format!(
                "note must be at most {} characters",
                MAX_KETERANGAN_LEN
            ));
        }

        for key in &self.extra_required {
            if !row.contains_key(key) {
                errors.push(empty_column(key));
            }
        }

        match (tanggal, kategori, nominal, tipe) {
            (Some(tanggal), Some(kategori), Some(nominal), Some(tipe)) if errors.is_empty() => {
                row.insert("tanggal".to_string(), CellValue::Text(tanggal.format("%Y-%m-%d").to_string()));
                row.insert("kategori".to_string(), CellValue::Text(kategori.clone()));
                row.insert("nominal".to_string(), CellValue::Number(nominal));
                row.insert("tipe".to_string(), CellValue::Text(tipe.as_str().to_string()));

                let transaction =
                    NewTransaction::new(tanggal, kategori, nominal, tipe).with_keterangan(keterangan);
                Ok((row, transaction))
            }
            _ => Err(errors),
        }
    }
}

/// Trimmed non-empty text of a cell
fn text_field(row: &ImportRow, key: &str) -> Option<String> {
    row.get(key)
        .map(|cell| cell.as_text().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn empty_column(key: &str) -> String {
    format!("column \"{}\" must not be empty", key)
}

/// Validate with the given alias table and the default required fields
pub fn validate_rows(rows: Vec<ImportRow>, aliases: &AliasTable) -> ImportResult {
    RowValidator::new(aliases).validate(rows)
}

/// Materialize accepted rows and hand them to the store in one batch
pub fn commit(store: &mut dyn TransactionStore, result: &ImportResult) -> Result<usize, StoreError> {
    let records: Vec<Transaction> = result
        .valid
        .iter()
        .map(|v| Transaction::from_new(v.transaction.clone()))
        .collect();

    let inserted = store.bulk_insert(records)?;
    info!(inserted, "committed imported transactions");
    Ok(inserted)
}

// ============================================================================
// TESTS
// ============================================================================
