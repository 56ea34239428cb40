use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{AttrError, Result};

/// Texts longer than this persist as blobs so the value column never
/// overflows its intended width.
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 1024;

/// Where the store keeps its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    InMemory,
    File(String),
}

/// Store configuration, loadable from a file with environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the database file; absent means an in-memory store.
    pub database: Option<String>,
    pub max_text_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: None,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }
}

impl StoreConfig {
    /// Layers an optional config file under `ATTRARIUM_*` environment
    /// variables (e.g. `ATTRARIUM_MAX_TEXT_LENGTH=64`).
    pub fn load(path: Option<&str>) -> Result<StoreConfig> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(Environment::with_prefix("ATTRARIUM").try_parsing(true));
        let settings = builder
            .build()
            .map_err(|e| AttrError::Config(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| AttrError::Config(e.to_string()))
    }

    pub fn storage(&self) -> StorageMode {
        match &self.database {
            Some(path) => StorageMode::File(path.clone()),
            None => StorageMode::InMemory,
        }
    }
}

/// Installs the fmt subscriber filtered by `RUST_LOG`. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
