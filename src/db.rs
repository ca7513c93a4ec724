use crate::error::StoreError;
use crate::store::TransactionStore;
use crate::transaction::{NewTransaction, RecurringFrequency, Transaction, TransactionPatch, TransactionType};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

const SELECT_COLUMNS: &str = "SELECT id, tanggal, kategori, keterangan, nominal, tipe,
        is_recurring, recurring_frequency, recurring_end_date, created_at, updated_at
     FROM transactions";

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Transactions Table
    // seq keeps insertion order; id is the public identity
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            tanggal TEXT NOT NULL,
            kategori TEXT NOT NULL,
            keterangan TEXT NOT NULL DEFAULT '',
            nominal REAL NOT NULL CHECK (nominal > 0),
            tipe TEXT NOT NULL CHECK (tipe IN ('Pemasukan', 'Pengeluaran')),
            is_recurring INTEGER NOT NULL DEFAULT 0,
            recurring_frequency TEXT,
            recurring_end_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tanggal ON transactions(tanggal)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tipe_kategori ON transactions(tipe, kategori)",
        [],
    )?;

    Ok(())
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn parse_date(column: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| conversion_error(column, e))
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let tanggal: String = row.get(1)?;
    let tipe: String = row.get(5)?;
    let frequency: Option<String> = row.get(7)?;
    let end_date: Option<String> = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(Transaction {
        id: row.get(0)?,
        tanggal: parse_date(1, &tanggal)?,
        kategori: row.get(2)?,
        keterangan: row.get(3)?,
        nominal: row.get(4)?,
        tipe: tipe.parse::<TransactionType>().map_err(|e| conversion_error(5, e))?,
        is_recurring: row.get(6)?,
        recurring_frequency: frequency
            .map(|f| f.parse::<RecurringFrequency>().map_err(|e| conversion_error(7, e)))
            .transpose()?,
        recurring_end_date: end_date.map(|d| parse_date(8, &d)).transpose()?,
        created_at: parse_timestamp(9, &created_at)?,
        updated_at: parse_timestamp(10, &updated_at)?,
    })
}

fn insert_row(conn: &Connection, tx: &Transaction) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO transactions (
            id, tanggal, kategori, keterangan, nominal, tipe,
            is_recurring, recurring_frequency, recurring_end_date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            tx.id,
            tx.tanggal.format("%Y-%m-%d").to_string(),
            tx.kategori,
            tx.keterangan,
            tx.nominal,
            tx.tipe.as_str(),
            tx.is_recurring,
            tx.recurring_frequency.map(|f| f.as_str()),
            tx.recurring_end_date.map(|d| d.format("%Y-%m-%d").to_string()),
            tx.created_at.to_rfc3339(),
            tx.updated_at.to_rfc3339(),
        ],
    )
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// `TransactionStore` backed by a single SQLite file
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened SQLite store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }
}

impl TransactionStore for SqliteStore {
    fn list(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("{} ORDER BY seq", SELECT_COLUMNS))?;
        let transactions = stmt
            .query_map([], row_to_transaction)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    fn get(&self, id: &str) -> Result<Option<Transaction>, StoreError> {
        let tx = self
            .conn
            .query_row(&format!("{} WHERE id = ?1", SELECT_COLUMNS), [id], row_to_transaction)
            .optional()?;

        Ok(tx)
    }

    fn create(&mut self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let tx = Transaction::from_new(new);
        insert_row(&self.conn, &tx)?;
        debug!(id = %tx.id, "created transaction");
        Ok(tx)
    }

    fn update(&mut self, id: &str, patch: &TransactionPatch) -> Result<Transaction, StoreError> {
        let mut tx = self
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        patch.apply(&mut tx);
        tx.updated_at = Utc::now();

        self.conn.execute(
            "UPDATE transactions
             SET tanggal = ?2, kategori = ?3, keterangan = ?4, nominal = ?5, tipe = ?6,
                 is_recurring = ?7, recurring_frequency = ?8, recurring_end_date = ?9,
                 updated_at = ?10
             WHERE id = ?1",
            params![
                tx.id,
                tx.tanggal.format("%Y-%m-%d").to_string(),
                tx.kategori,
                tx.keterangan,
                tx.nominal,
                tx.tipe.as_str(),
                tx.is_recurring,
                tx.recurring_frequency.map(|f| f.as_str()),
                tx.recurring_end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                tx.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(tx)
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let removed = self.conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    fn bulk_insert(&mut self, transactions: Vec<Transaction>) -> Result<usize, StoreError> {
        let db_tx = self.conn.transaction()?;
        let mut inserted = 0;
        let mut duplicates = 0;

        for tx in &transactions {
            match insert_row(&db_tx, tx) {
                Ok(_) => inserted += 1,
                // Only an existing id is a duplicate; CHECK / NOT NULL failures propagate
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    duplicates += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        db_tx.commit()?;
        info!(inserted, duplicates, "bulk insert");
        Ok(inserted)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM transactions", [])?;
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
