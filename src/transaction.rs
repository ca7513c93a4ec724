// Transaction model: the canonical record, its creation input and partial updates

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// ENUMS
// ============================================================================

/// Direction of money: income or expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Pemasukan,
    Pengeluaran,
}

impl TransactionType {
    pub const ALL: [TransactionType; 2] = [TransactionType::Pemasukan, TransactionType::Pengeluaran];

    /// Canonical label, also used on the wire and in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Pemasukan => "Pemasukan",
            TransactionType::Pengeluaran => "Pengeluaran",
        }
    }

    pub fn is_income(&self) -> bool {
        matches!(self, TransactionType::Pemasukan)
    }

    /// Category suggestions offered on direct entry
    pub fn default_categories(&self) -> &'static [&'static str] {
        match self {
            TransactionType::Pemasukan => &["Gaji", "Transfer", "Tabungan", "Lainnya"],
            TransactionType::Pengeluaran => &[
                "Mama", "Transport", "Jajan", "Admin", "Hadiah", "Bensin", "Makan", "Kuota",
                "Pakaian", "Tabungan", "Lainnya", "Paket",
            ],
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction type: {0:?}")]
pub struct UnknownType(pub String);

impl FromStr for TransactionType {
    type Err = UnknownType;

    /// Exact match on the canonical label. Synonyms are resolved by the normalizer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pemasukan" => Ok(TransactionType::Pemasukan),
            "Pengeluaran" => Ok(TransactionType::Pengeluaran),
            other => Err(UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringFrequency::Daily => "daily",
            RecurringFrequency::Weekly => "weekly",
            RecurringFrequency::Monthly => "monthly",
            RecurringFrequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for RecurringFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown recurring frequency: {0:?}")]
pub struct UnknownFrequency(pub String);

impl FromStr for RecurringFrequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurringFrequency::Daily),
            "weekly" => Ok(RecurringFrequency::Weekly),
            "monthly" => Ok(RecurringFrequency::Monthly),
            "yearly" => Ok(RecurringFrequency::Yearly),
            _ => Err(UnknownFrequency(s.to_string())),
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// A stored income/expense record.
///
/// `id`, `created_at` and `updated_at` are owned by the store; everything else
/// changes only through `TransactionPatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tanggal: NaiveDate,
    pub kategori: String,
    #[serde(default)]
    pub keterangan: String,
    pub nominal: f64,
    pub tipe: TransactionType,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_frequency: Option<RecurringFrequency>,
    #[serde(default)]
    pub recurring_end_date: Option<NaiveDate>,
    // Older saved lists may lack timestamps; back-fill with "now" on read
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Materialize a new record with a fresh UUID and matching timestamps
    pub fn from_new(new: NewTransaction) -> Self {
        let now = Utc::now();
        let new = new.normalized();
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            tanggal: new.tanggal,
            kategori: new.kategori,
            keterangan: new.keterangan,
            nominal: new.nominal,
            tipe: new.tipe,
            is_recurring: new.is_recurring,
            recurring_frequency: new.recurring_frequency,
            recurring_end_date: new.recurring_end_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_income(&self) -> bool {
        self.tipe.is_income()
    }

    /// `YYYY-MM` bucket used by monthly rollups
    pub fn month_key(&self) -> String {
        self.tanggal.format("%Y-%m").to_string()
    }
}

// ============================================================================
// CREATE / UPDATE INPUTS
// ============================================================================

/// Everything needed to create a transaction; the store assigns the rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub tanggal: NaiveDate,
    pub kategori: String,
    #[serde(default)]
    pub keterangan: String,
    pub nominal: f64,
    pub tipe: TransactionType,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_frequency: Option<RecurringFrequency>,
    #[serde(default)]
    pub recurring_end_date: Option<NaiveDate>,
}

impl NewTransaction {
    pub fn new(tanggal: NaiveDate, kategori: impl Into<String>, nominal: f64, tipe: TransactionType) -> Self {
        NewTransaction {
            tanggal,
            kategori: kategori.into(),
            keterangan: String::new(),
            nominal,
            tipe,
            is_recurring: false,
            recurring_frequency: None,
            recurring_end_date: None,
        }
    }

    /// Builder pattern: add a note
    pub fn with_keterangan(mut self, keterangan: impl Into<String>) -> Self {
        self.keterangan = keterangan.into();
        self
    }

    /// Builder pattern: mark as recurring
    pub fn recurring(mut self, frequency: RecurringFrequency, end_date: Option<NaiveDate>) -> Self {
        self.is_recurring = true;
        self.recurring_frequency = Some(frequency);
        self.recurring_end_date = end_date;
        self
    }

    /// Recurrence details only survive when the flag is set
    pub fn normalized(mut self) -> Self {
        if !self.is_recurring {
            self.recurring_frequency = None;
            self.recurring_end_date = None;
        }
        self
    }
}

impl From<&Transaction> for NewTransaction {
    fn from(tx: &Transaction) -> Self {
        NewTransaction {
            tanggal: tx.tanggal,
            kategori: tx.kategori.clone(),
            keterangan: tx.keterangan.clone(),
            nominal: tx.nominal,
            tipe: tx.tipe,
            is_recurring: tx.is_recurring,
            recurring_frequency: tx.recurring_frequency,
            recurring_end_date: tx.recurring_end_date,
        }
    }
}

/// Partial update. `None` leaves a field untouched; for the nullable
/// recurrence fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(default)]
    pub tanggal: Option<NaiveDate>,
    #[serde(default)]
    pub kategori: Option<String>,
    #[serde(default)]
    pub keterangan: Option<String>,
    #[serde(default)]
    pub nominal: Option<f64>,
    #[serde(default)]
    pub tipe: Option<TransactionType>,
    #[serde(default)]
    pub is_recurring: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurring_frequency: Option<Option<RecurringFrequency>>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurring_end_date: Option<Option<NaiveDate>>,
}

// Distinguishes an explicit `null` (clear) from a missing key (keep)
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TransactionPatch {
    pub fn is_empty(&self) -> bool {
        *self == TransactionPatch::default()
    }

    /// Apply the patch in place. Does not touch `updated_at`; stores do that.
    pub fn apply(&self, tx: &mut Transaction) {
        if let Some(tanggal) = self.tanggal {
            tx.tanggal = tanggal;
        }
        if let Some(kategori) = &self.kategori {
            tx.kategori = kategori.clone();
        }
        if let Some(keterangan) = &self.keterangan {
            tx.keterangan = keterangan.clone();
        }
        if let Some(nominal) = self.nominal {
            tx.nominal = nominal;
        }
        if let Some(tipe) = self.tipe {
            tx.tipe = tipe;
        }
        if let Some(is_recurring) = self.is_recurring {
            tx.is_recurring = is_recurring;
        }
        if let Some(frequency) = self.recurring_frequency {
            tx.recurring_frequency = frequency;
        }
        if let Some(end_date) = self.recurring_end_date {
            tx.recurring_end_date = end_date;
        }
        if !tx.is_recurring {
            tx.recurring_frequency = None;
            tx.recurring_end_date = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_type_labels_round_trip() {
        for tipe in TransactionType::ALL {
            assert_eq!(tipe.as_str().parse::<TransactionType>().unwrap(), tipe);
        }
        assert!("pemasukan".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_from_new_assigns_identity() {
        let new = NewTransaction::new(date(2026, 1, 27), "Makan", 50000.0, TransactionType::Pengeluaran)
            .with_keterangan("Makan siang");
        let a = Transaction::from_new(new.clone());
        let b = Transaction::from_new(new);

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(a.keterangan, "Makan siang");
        assert_eq!(a.month_key(), "2026-01");
    }

    #[test]
    fn test_non_recurring_drops_recurrence_details() {
        let mut new = NewTransaction::new(date(2026, 1, 1), "Gaji", 1.0, TransactionType::Pemasukan)
            .recurring(RecurringFrequency::Monthly, Some(date(2026, 12, 1)));
        new.is_recurring = false;

        let tx = Transaction::from_new(new);
        assert_eq!(tx.recurring_frequency, None);
        assert_eq!(tx.recurring_end_date, None);
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut tx = Transaction::from_new(
            NewTransaction::new(date(2026, 1, 1), "Gaji", 100.0, TransactionType::Pemasukan)
                .recurring(RecurringFrequency::Monthly, Some(date(2026, 6, 1))),
        );

        let patch = TransactionPatch {
            nominal: Some(250.0),
            recurring_end_date: Some(None),
            ..Default::default()
        };
        patch.apply(&mut tx);

        assert_eq!(tx.nominal, 250.0);
        assert_eq!(tx.kategori, "Gaji");
        assert_eq!(tx.recurring_frequency, Some(RecurringFrequency::Monthly));
        assert_eq!(tx.recurring_end_date, None);
    }

    #[test]
    fn test_patch_json_null_clears_but_missing_keeps() {
        let patch: TransactionPatch =
            serde_json::from_str(r#"{"recurring_frequency": null}"#).unwrap();
        assert_eq!(patch.recurring_frequency, Some(None));
        assert_eq!(patch.recurring_end_date, None);

        let empty: TransactionPatch = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_missing_timestamps_are_backfilled() {
        let json = r#"{
            "id": "abc",
            "tanggal": "2026-01-05",
            "kategori": "Gaji",
            "nominal": 1000,
            "tipe": "Pemasukan"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.keterangan, "");
        assert!(!tx.is_recurring);
        assert!(tx.created_at <= Utc::now());
    }
}
