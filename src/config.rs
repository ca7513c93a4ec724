// ⚙️ Configuration - dompet.toml, logging setup and store selection

use crate::aliases::AliasTable;
use crate::db::SqliteStore;
use crate::store::{JsonFileStore, MemoryStore, TransactionStore};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_FILE: &str = "dompet.toml";
pub const CONFIG_ENV: &str = "DOMPET_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageSection,
    pub import: ImportSection,
    pub server: ServerSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Json,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    /// JSON alias-table overrides, merged over the built-in table
    pub aliases: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub filter: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("dompet.db"),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn open_store(&self) -> Result<Box<dyn TransactionStore>> {
        let path = &self.storage.path;
        let store: Box<dyn TransactionStore> = match self.storage.backend {
            StorageBackend::Sqlite => Box::new(
                SqliteStore::open(path)
                    .with_context(|| format!("open SQLite store {}", path.display()))?,
            ),
            StorageBackend::Json => Box::new(
                JsonFileStore::open(path)
                    .with_context(|| format!("open JSON store {}", path.display()))?,
            ),
            StorageBackend::Memory => Box::new(MemoryStore::new()),
        };
        Ok(store)
    }

    pub fn alias_table(&self) -> Result<AliasTable> {
        match &self.import.aliases {
            Some(path) => AliasTable::from_file(path),
            None => Ok(AliasTable::default()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// `--config` wins, then `$DOMPET_CONFIG`, then ./dompet.toml
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Missing file means defaults
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the configured filter
pub fn init_logging(cfg: &LoggingSection) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.filter))
        .with_context(|| format!("invalid log filter {:?}", cfg.filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("initialise logging: {}", e))
}
