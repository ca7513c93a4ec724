// 🗄️ Transaction Store - the save/load/update/delete contract
// Backends are interchangeable: in-memory, JSON file, SQLite (see db.rs)

use crate::error::StoreError;
use crate::transaction::{NewTransaction, Transaction, TransactionPatch};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Owner of the canonical transaction list.
///
/// `list` returns records in insertion order. `create` assigns id and
/// timestamps; `update` always refreshes `updated_at`.
pub trait TransactionStore: Send {
    fn list(&self) -> Result<Vec<Transaction>, StoreError>;

    fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError>;

    fn create(&mut self, new: NewTransaction) -> Result<Transaction, StoreError>;

    /// `StoreError::NotFound` when no record has this id
    fn update(&mut self, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError>;

    /// Returns true if a record was removed
    fn delete(&mut self, id: &str) -> Result<bool, StoreError>;

    /// Insert already-materialized records. Records whose id is already
    /// present are skipped; returns how many were inserted. Any other
    /// failure is an error and leaves the store unchanged.
    fn bulk_insert(&mut self, transactions: Vec<Transaction>) -> Result<usize, StoreError>;

    fn clear(&mut self) -> Result<(), StoreError>;

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.list()?.len())
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    transactions: Vec<Transaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        MemoryStore { transactions }
    }
}

impl TransactionStore for MemoryStore {
    fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.transactions.clone())
    }

    fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.iter().find(|t| t.id == id).cloned())
    }

    fn create(&mut self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let tx = Transaction::from_new(new);
        self.transactions.push(tx.clone());
        Ok(tx)
    }

    fn update(&mut self, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        patch.apply(tx);
        tx.updated_at = Utc::now();
        Ok(tx.clone())
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        Ok(self.transactions.len() < before)
    }

    fn bulk_insert(&mut self, transactions: Vec<Transaction>) -> Result<usize, StoreError> {
        let mut inserted = 0;
        let mut duplicates = 0;

        for tx in transactions {
            if self.transactions.iter().any(|t| t.id == tx.id) {
                duplicates += 1;
                continue;
            }
            self.transactions.push(tx);
            inserted += 1;
        }

        debug!(inserted, duplicates, "bulk insert");
        Ok(inserted)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.transactions.clear();
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.transactions.len())
    }
}

// ============================================================================
// JSON FILE
// ============================================================================

/// Whole list kept as one JSON array in a single file, rewritten after
/// every mutation. Records saved without timestamps get "now" on load.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open (or start) the file at `path`. A missing or blank file is an empty list.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let transactions = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), count = transactions.len(), "opened JSON store");
        Ok(JsonFileStore {
            path,
            inner: MemoryStore::with_transactions(transactions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.inner.transactions)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Apply `op` and write the file; the in-memory list is restored if either fails
    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let snapshot = self.inner.transactions.clone();
        let result = op(&mut self.inner).and_then(|value| self.persist().map(|()| value));
        if result.is_err() {
            self.inner.transactions = snapshot;
        }
        result
    }
}

impl TransactionStore for JsonFileStore {
    fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        self.inner.list()
    }

    fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        self.inner.get(id)
    }

    fn create(&mut self, new: NewTransaction) -> Result<Transaction, StoreError> {
        self.mutate(|inner| inner.create(new))
    }

    fn update(&mut self, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError> {
        self.mutate(|inner| inner.update(id, patch))
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        if self.inner.get(id)?.is_none() {
            return Ok(false);
        }
        self.mutate(|inner| inner.delete(id))
    }

    fn bulk_insert(&mut self, transactions: Vec<Transaction>) -> Result<usize, StoreError> {
        self.mutate(|inner| inner.bulk_insert(transactions))
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.mutate(|inner| inner.clear())
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.inner.count()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transaction::TransactionType;
    use chrono::NaiveDate;

    pub(crate) fn sample(day: u32, kategori: &str, nominal: f64, tipe: TransactionType) -> NewTransaction {
        NewTransaction::new(NaiveDate::from_ymd_opt(2026, 1, day).unwrap(), kategori, nominal, tipe)
    }

    /// Contract checks shared by every backend
    pub(crate) fn exercise_store(store: &mut dyn TransactionStore) {
        assert_eq!(store.count().unwrap(), 0);

        let a = store.create(sample(5, "Gaji", 1000.0, TransactionType::Pemasukan)).unwrap();
        let b = store.create(sample(10, "Makan", 400.0, TransactionType::Pengeluaran)).unwrap();
        assert_ne!(a.id, b.id);

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id.clone(), b.id.clone()]);

        let patch = TransactionPatch {
            nominal: Some(1200.0),
            keterangan: Some("bonus".to_string()),
            ..Default::default()
        };
        let updated = store.update(&a.id, &patch).unwrap();
        assert_eq!(updated.nominal, 1200.0);
        assert_eq!(updated.kategori, "Gaji");
        assert_eq!(updated.created_at, a.created_at);
        assert!(updated.updated_at >= a.updated_at);
        assert_eq!(store.get(&a.id).unwrap().unwrap().keterangan, "bonus");

        assert!(matches!(
            store.update("missing", &patch),
            Err(StoreError::NotFound(_))
        ));

        assert!(store.delete(&b.id).unwrap());
        assert!(!store.delete(&b.id).unwrap());
        assert_eq!(store.get(&b.id).unwrap(), None);

        let batch = vec![
            Transaction::from_new(sample(11, "Transport", 25.0, TransactionType::Pengeluaran)),
            store.get(&a.id).unwrap().unwrap(),
        ];
        assert_eq!(store.bulk_insert(batch).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 2);

        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_contract() {
        exercise_store(&mut MemoryStore::new());
    }

    #[test]
    fn test_json_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise_store(&mut JsonFileStore::open(dir.path().join("tx.json")).unwrap());
    }

    #[test]
    fn test_json_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tx.json");

        let created = {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.create(sample(5, "Gaji", 1000.0, TransactionType::Pemasukan)).unwrap()
        };

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap(), vec![created]);
    }

    #[test]
    fn test_json_store_backfills_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.json");
        fs::write(
            &path,
            r#"[{"id":"old-1","tanggal":"2025-12-01","kategori":"Gaji","nominal":5,"tipe":"Pemasukan"}]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let tx = store.get("old-1").unwrap().unwrap();
        assert!(tx.created_at <= Utc::now());
    }

    #[test]
    fn test_json_store_failed_write_leaves_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        let kept = store.create(sample(5, "Gaji", 1000.0, TransactionType::Pemasukan)).unwrap();

        // A directory in place of the file makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.create(sample(6, "Makan", 40.0, TransactionType::Pengeluaran)).is_err());
        assert!(store.bulk_insert(vec![Transaction::from_new(sample(7, "Jajan", 5.0, TransactionType::Pengeluaran))]).is_err());
        assert!(store.delete(&kept.id).is_err());
        assert!(store.clear().is_err());

        let patch = TransactionPatch {
            nominal: Some(1.0),
            ..Default::default()
        };
        assert!(store.update(&kept.id, &patch).is_err());

        assert_eq!(store.list().unwrap(), vec![kept]);
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Serialization(_))
        ));
    }
}
