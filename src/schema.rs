// 📐 Shape Layer - Direct-Entry Validation
// Field rules for transactions typed in by hand (CLI add/edit, HTTP create/update)

use crate::transaction::{NewTransaction, Transaction, TransactionPatch};
use chrono::NaiveDate;

pub const MAX_KETERANGAN_LEN: usize = 500;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// One line per error, for CLI and API messages
pub fn describe_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// VALIDATORS
// ============================================================================

/// Validate a draft before it reaches the store
pub fn validate_transaction(tx: &NewTransaction) -> ValidationResult {
    let mut errors = Vec::new();

    if tx.kategori.trim().is_empty() {
        errors.push(ValidationError::new("kategori", "Kategori harus diisi"));
    }

    if !tx.nominal.is_finite() || tx.nominal <= 0.0 {
        errors.push(ValidationError::new("nominal", "Nominal harus lebih dari 0"));
    }

    if tx.keterangan.chars().count() > MAX_KETERANGAN_LEN {
        errors.push(ValidationError::new(
            "keterangan",
            format!("Keterangan maksimal {} karakter", MAX_KETERANGAN_LEN),
        ));
    }

    if tx.is_recurring {
        if let Err(e) = validate_recurring_date(tx.tanggal, tx.recurring_end_date) {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An end date, when present, must not fall before the start date
pub fn validate_recurring_date(
    tanggal: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match end_date {
        Some(end) if end < tanggal => Err(ValidationError::new(
            "recurring_end_date",
            "Tanggal berakhir harus setelah tanggal transaksi",
        )),
        _ => Ok(()),
    }
}

/// Validate the record a patch would produce, without touching the original
pub fn validate_patch(current: &Transaction, patch: &TransactionPatch) -> ValidationResult {
    let mut preview = current.clone();
    patch.apply(&mut preview);
    validate_transaction(&NewTransaction::from(&preview))
}

// ============================================================================
// TESTS
// ============================================================================
