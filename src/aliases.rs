// 🏷️ Alias Tables - Synonyms as Data
// Column-header aliases and transaction-type label rules, loadable from JSON

use crate::normalize::normalize_column_name;
use crate::transaction::TransactionType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

// ============================================================================
// TABLE ENTRIES
// ============================================================================

/// One canonical column and every header spelling that maps onto it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAlias {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ColumnAlias {
    pub fn new(canonical: &str, aliases: &[&str]) -> Self {
        ColumnAlias {
            canonical: canonical.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Header is compared after column-name normalization on both sides
    pub fn matches(&self, normalized_header: &str) -> bool {
        normalize_column_name(&self.canonical) == normalized_header
            || self
                .aliases
                .iter()
                .any(|alias| normalize_column_name(alias) == normalized_header)
    }
}

/// Case-insensitive substring rule: any label containing `pattern` is `tipe`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeLabelRule {
    pub pattern: String,
    pub tipe: TransactionType,
}

impl TypeLabelRule {
    pub fn new(pattern: &str, tipe: TransactionType) -> Self {
        TypeLabelRule {
            pattern: pattern.to_string(),
            tipe,
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        label.to_lowercase().contains(&self.pattern.to_lowercase())
    }
}

// ============================================================================
// ALIAS TABLE
// ============================================================================

static BUILTIN: LazyLock<AliasTable> = LazyLock::new(AliasTable::builtin_table);

/// Single source of truth for header synonyms and type-label synonyms.
///
/// Both header conventions (`tanggal,kategori,nominal,tipe,keterangan` and
/// `Tanggal,Jenis Transaksi,Kategori,Nominal`) resolve through this table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasTable {
    #[serde(default)]
    pub columns: Vec<ColumnAlias>,
    #[serde(default)]
    pub type_labels: Vec<TypeLabelRule>,
}

impl AliasTable {
    /// Empty table: headers pass through normalized, no label resolves
    pub fn new() -> Self {
        AliasTable {
            columns: Vec::new(),
            type_labels: Vec::new(),
        }
    }

    /// Shared read-only instance of the built-in table
    pub fn builtin() -> &'static AliasTable {
        &BUILTIN
    }

    fn builtin_table() -> Self {
        use TransactionType::{Pemasukan, Pengeluaran};

        AliasTable {
            columns: vec![
                ColumnAlias::new("tanggal", &["date", "tgl"]),
                ColumnAlias::new("kategori", &["category", "kat"]),
                ColumnAlias::new("nominal", &["amount", "jumlah"]),
                ColumnAlias::new("tipe", &["type", "jenis transaksi"]),
                ColumnAlias::new("keterangan", &["deskripsi", "desc", "note"]),
            ],
            // Income rules first: a label is checked against them in order
            type_labels: vec![
                TypeLabelRule::new("masuk", Pemasukan),
                TypeLabelRule::new("income", Pemasukan),
                TypeLabelRule::new("pemasukan", Pemasukan),
                TypeLabelRule::new("keluar", Pengeluaran),
                TypeLabelRule::new("expense", Pengeluaran),
                TypeLabelRule::new("pengeluaran", Pengeluaran),
            ],
        }
    }

    /// Parse a JSON table
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse alias table JSON")
    }

    /// Load a JSON override file and merge it over the built-in table
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read alias file: {:?}", path.as_ref()))?;

        let overrides = AliasTable::from_json(&content)?;
        let mut table = AliasTable::default();
        table.merge(overrides);
        Ok(table)
    }

    /// Extend this table with another one's entries.
    /// Aliases for an existing canonical column are appended to it.
    pub fn merge(&mut self, other: AliasTable) {
        for column in other.columns {
            for alias in &column.aliases {
                self.add_column_alias(&column.canonical, alias);
            }
            if !self.columns.iter().any(|c| c.canonical == column.canonical) {
                self.columns.push(ColumnAlias::new(&column.canonical, &[]));
            }
        }
        for rule in other.type_labels {
            self.add_type_label(rule);
        }
    }

    pub fn add_column_alias(&mut self, canonical: &str, alias: &str) {
        match self.columns.iter_mut().find(|c| c.canonical == canonical) {
            Some(column) => {
                if !column.aliases.iter().any(|a| a == alias) {
                    column.aliases.push(alias.to_string());
                }
            }
            None => self.columns.push(ColumnAlias::new(canonical, &[alias])),
        }
    }

    pub fn add_type_label(&mut self, rule: TypeLabelRule) {
        if !self.type_labels.contains(&rule) {
            self.type_labels.push(rule);
        }
    }

    /// Raw header → mapping key. Unknown headers keep their normalized name.
    pub fn canonical_key(&self, header: &str) -> String {
        let normalized = normalize_column_name(header);

        self.columns
            .iter()
            .find(|c| c.matches(&normalized))
            .map(|c| c.canonical.clone())
            .unwrap_or(normalized)
    }

    /// First matching label rule wins
    pub fn resolve_type(&self, label: &str) -> Option<TransactionType> {
        let label = label.trim();
        self.type_labels
            .iter()
            .find(|rule| rule.matches(label))
            .map(|rule| rule.tipe)
    }

    /// Canonical label, or `label` unchanged when no rule matches
    pub fn convert_type(&self, label: &str) -> String {
        match self.resolve_type(label) {
            Some(tipe) => tipe.as_str().to_string(),
            None => label.to_string(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn label_count(&self) -> usize {
        self.type_labels.len()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        AliasTable::builtin().clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_convention_a_headers() {
        let table = AliasTable::default();
        assert_eq!(table.canonical_key("date"), "tanggal");
        assert_eq!(table.canonical_key("TGL"), "tanggal");
        assert_eq!(table.canonical_key("Category"), "kategori");
        assert_eq!(table.canonical_key("jumlah"), "nominal");
        assert_eq!(table.canonical_key("Type"), "tipe");
        assert_eq!(table.canonical_key("desc"), "keterangan");
        assert_eq!(table.canonical_key("note"), "keterangan");
    }

    #[test]
    fn test_convention_b_headers() {
        let table = AliasTable::default();
        assert_eq!(table.canonical_key("Tanggal"), "tanggal");
        assert_eq!(table.canonical_key("Jenis Transaksi"), "tipe");
        assert_eq!(table.canonical_key("Kategori"), "kategori");
        assert_eq!(table.canonical_key("Nominal"), "nominal");
    }

    #[test]
    fn test_unknown_header_passes_through_normalized() {
        let table = AliasTable::default();
        assert_eq!(table.canonical_key("Dibuat Pada"), "dibuat_pada");
    }

    #[test]
    fn test_canonical_key_is_idempotent() {
        let table = AliasTable::default();
        let once = table.canonical_key("Jenis Transaksi");
        assert_eq!(table.canonical_key(&once), once);
    }

    #[test]
    fn test_empty_table_resolves_nothing() {
        let table = AliasTable::new();
        assert_eq!(table.canonical_key("Date"), "date");
        assert_eq!(table.resolve_type("income"), None);
        assert_eq!(table.convert_type("income"), "income");
    }

    #[test]
    fn test_merge_adds_aliases_and_labels() {
        let overrides = AliasTable::from_json(
            r#"{
                "columns": [
                    {"canonical": "nominal", "aliases": ["harga"]},
                    {"canonical": "akun", "aliases": ["rekening"]}
                ],
                "type_labels": [{"pattern": "gaji", "tipe": "Pemasukan"}]
            }"#,
        )
        .unwrap();

        let mut table = AliasTable::default();
        table.merge(overrides);

        assert_eq!(table.canonical_key("Harga"), "nominal");
        assert_eq!(table.canonical_key("amount"), "nominal");
        assert_eq!(table.canonical_key("Rekening"), "akun");
        assert_eq!(table.resolve_type("Gaji Bulanan"), Some(TransactionType::Pemasukan));
        assert_eq!(table.column_count(), 6);
    }

    #[test]
    fn test_from_file_keeps_builtins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"columns": [{{"canonical": "kategori", "aliases": ["pos"]}}]}}"#).unwrap();

        let table = AliasTable::from_file(file.path()).unwrap();
        assert_eq!(table.canonical_key("pos"), "kategori");
        assert_eq!(table.canonical_key("category"), "kategori");
        assert_eq!(table.label_count(), AliasTable::builtin().label_count());
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(AliasTable::from_file("/nonexistent/aliases.json").is_err());
    }
}
