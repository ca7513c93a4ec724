// 🔍 Filter Engine
// AND-combined predicates over a transaction snapshot; never reorders

use crate::transaction::{Transaction, TransactionType};
use chrono::NaiveDate;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Every criterion is optional; an absent or empty one passes everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub kategori: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub tipe: Option<TransactionType>,
    #[serde(default)]
    pub search_query: Option<String>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        TransactionFilter::default()
    }

    /// Builder pattern: inclusive lower bound
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Builder pattern: inclusive upper bound
    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn with_kategori(mut self, kategori: impl Into<String>) -> Self {
        self.kategori = Some(kategori.into());
        self
    }

    pub fn with_tipe(mut self, tipe: TransactionType) -> Self {
        self.tipe = Some(tipe);
        self
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && non_empty(&self.kategori).is_none()
            && self.tipe.is_none()
            && non_empty(&self.search_query).is_none()
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if self.start_date.is_some_and(|start| tx.tanggal < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| tx.tanggal > end) {
            return false;
        }
        if let Some(kategori) = non_empty(&self.kategori) {
            if tx.kategori != kategori {
                return false;
            }
        }
        if self.tipe.is_some_and(|tipe| tx.tipe != tipe) {
            return false;
        }
        if let Some(query) = non_empty(&self.search_query) {
            let query = query.to_lowercase();
            let in_kategori = tx.kategori.to_lowercase().contains(&query);
            let in_keterangan = tx.keterangan.to_lowercase().contains(&query);
            if !in_kategori && !in_keterangan {
                return false;
            }
        }
        true
    }

    /// Matching records, in their original relative order
    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        transactions.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}

/// Query-string field where `""` means "not given"
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) if !s.trim().is_empty() => T::deserialize(s.into_deserializer()).map(Some),
        _ => Ok(None),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub fn filter_transactions(transactions: &[Transaction], filter: &TransactionFilter) -> Vec<Transaction> {
    filter.apply(transactions)
}

/// Distinct categories present in the data, sorted
pub fn categories(transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .map(|t| t.kategori.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::tests::tx;
    use crate::transaction::TransactionType::{Pemasukan, Pengeluaran};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample() -> Vec<Transaction> {
        let mut with_note = tx("2026-01-12", "Transport", 25.0, Pengeluaran);
        with_note.keterangan = "Grab ke kantor".to_string();

        vec![
            tx("2026-01-05", "Gaji", 1000.0, Pemasukan),
            tx("2026-01-10", "Makan", 400.0, Pengeluaran),
            with_note,
            tx("2026-02-01", "Transfer", 300.0, Pemasukan),
        ]
    }

    fn kategori_of(txs: &[Transaction]) -> Vec<&str> {
        txs.iter().map(|t| t.kategori.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_passes_everything() {
        let txs = sample();
        let filter = TransactionFilter::new().with_kategori("").with_search("");
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&txs), txs);
    }

    #[test]
    fn test_filter_by_tipe_preserves_order() {
        let result = filter_transactions(&sample(), &TransactionFilter::new().with_tipe(Pemasukan));
        assert_eq!(kategori_of(&result), vec!["Gaji", "Transfer"]);
    }

    #[test]
    fn test_date_bounds_inclusive() {
        let filter = TransactionFilter::new()
            .with_start_date(date("2026-01-10"))
            .with_end_date(date("2026-01-12"));
        assert_eq!(kategori_of(&filter.apply(&sample())), vec!["Makan", "Transport"]);
    }

    #[test]
    fn test_kategori_exact_match() {
        let filter = TransactionFilter::new().with_kategori("Makan");
        assert_eq!(filter.apply(&sample()).len(), 1);
        let filter = TransactionFilter::new().with_kategori("makan");
        assert!(filter.apply(&sample()).is_empty());
    }

    #[test]
    fn test_search_kategori_or_keterangan() {
        let by_note = TransactionFilter::new().with_search("GRAB");
        assert_eq!(kategori_of(&by_note.apply(&sample())), vec!["Transport"]);

        let by_kategori = TransactionFilter::new().with_search("trans");
        assert_eq!(kategori_of(&by_kategori.apply(&sample())), vec!["Transport", "Transfer"]);
    }

    #[test]
    fn test_criteria_are_and_combined() {
        let filter = TransactionFilter::new().with_tipe(Pengeluaran).with_search("trans");
        assert_eq!(kategori_of(&filter.apply(&sample())), vec!["Transport"]);
    }

    #[test]
    fn test_blank_query_values_are_absent() {
        let filter: TransactionFilter = serde_json::from_str(
            r#"{"start_date": "", "end_date": " ", "tipe": "", "kategori": "", "search_query": ""}"#,
        )
        .unwrap();
        assert_eq!(filter.start_date, None);
        assert_eq!(filter.tipe, None);
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&sample()).len(), 4);
    }

    #[test]
    fn test_query_values_still_parse() {
        let filter: TransactionFilter =
            serde_json::from_str(r#"{"start_date": "2026-01-10", "tipe": "Pengeluaran"}"#).unwrap();
        assert_eq!(filter.start_date, Some(date("2026-01-10")));
        assert_eq!(filter.tipe, Some(Pengeluaran));

        let bad: Result<TransactionFilter, _> = serde_json::from_str(r#"{"tipe": "Transfer"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_categories_distinct_sorted() {
        let mut txs = sample();
        txs.push(tx("2026-02-02", "Makan", 5.0, Pengeluaran));
        assert_eq!(categories(&txs), vec!["Gaji", "Makan", "Transfer", "Transport"]);
    }
}
