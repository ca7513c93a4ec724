// Dompet - Personal Finance Tracker Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod transaction;
pub mod normalize;      // Value Normalizer
pub mod aliases;        // Column and type-label synonym tables
pub mod parser;         // Tabular Parser
pub mod import;         // Row Validator
pub mod schema;         // Direct-entry validation
pub mod stats;          // Aggregator
pub mod health;
pub mod filter;         // Filter Engine
pub mod export;
pub mod format;
pub mod store;
pub mod db;             // SQLite store
pub mod config;

// Re-export commonly used types
pub use error::{ExportError, ParseError, StoreError};
pub use transaction::{
    NewTransaction, RecurringFrequency, Transaction, TransactionPatch, TransactionType,
};
pub use normalize::{clean_amount, convert_type, normalize_column_name, normalize_date, resolve_type};
pub use aliases::{AliasTable, ColumnAlias, TypeLabelRule};
pub use parser::{
    CellValue, GridReader, ImportRow, SourceFormat,
    detect_format, get_reader, parse_bytes, parse_file, parse_text, DelimitedReader,
};
#[cfg(feature = "spreadsheet")]
pub use parser::SpreadsheetReader;
pub use import::{commit, validate_rows, ImportResult, RowError, RowValidator, ValidRow};
pub use schema::{validate_transaction, ValidationError, ValidationResult};
pub use stats::{
    category_breakdown, expense_trend, monthly_summary, statistics, with_percentages,
    CategoryShare, CategoryTotal, MonthlySummary, Statistics, TrendPoint,
};
pub use health::{financial_health, HealthReport, HealthStatus};
pub use filter::{categories, filter_transactions, TransactionFilter};
pub use export::{export_csv, import_template, ExportLayout};
pub use format::{format_rupiah, format_rupiah_short};
pub use store::{JsonFileStore, MemoryStore, TransactionStore};
pub use db::SqliteStore;
pub use config::{Config, StorageBackend};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
