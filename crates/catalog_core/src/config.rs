//! Configuration file handling for the catalog.
//!
//! Loads settings from `catalog.config.toml` with the following search order:
//! 1. Current directory
//! 2. ~/.config/catalog/catalog.config.toml (Linux), the platform config dir elsewhere
//! 3. ~/.catalog/catalog.config.toml

use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `catalog.db` (default: platform data dir).
    pub path: Option<PathBuf>,
}

/// Search index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Use the keyword index. When off, every search is fallback-ranked.
    pub enabled: bool,
    /// Index directory (default: `<storage>/search_index`).
    pub path: Option<PathBuf>,
    /// Index writer heap in MB.
    pub writer_heap_mb: usize,
    /// Upper bound on a single index call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            writer_heap_mb: 50,
            timeout_ms: 2000,
        }
    }
}

impl IndexConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn writer_heap_bytes(&self) -> usize {
        self.writer_heap_mb * 1024 * 1024
    }
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of results returned by a search.
    pub results_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { results_limit: 20 }
    }
}

impl CatalogConfig {
    /// Config file name.
    pub const FILENAME: &'static str = "catalog.config.toml";

    /// Load configuration from file, searching standard locations.
    /// Returns default config if no file found.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::find_config_file() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: CatalogConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Find config file in standard locations.
    pub fn find_config_file() -> Option<PathBuf> {
        // 1. Current directory
        let current = PathBuf::from(Self::FILENAME);
        if current.exists() {
            return Some(current);
        }

        // 2. Config directory (~/.config/catalog/ on Linux)
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("catalog").join(Self::FILENAME);
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Home directory fallback
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".catalog").join(Self::FILENAME);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Get the default config file path for the current platform.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("catalog").join(Self::FILENAME))
    }

    /// Directory holding the product database.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("catalog")
        })
    }

    /// Directory holding the search index.
    pub fn index_dir(&self) -> PathBuf {
        self.index
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("search_index"))
    }

    /// Generate a default config file with comments.
    pub fn generate_default_config() -> String {
        r#"# Product Catalog Configuration
# Place this file at:
#   - ./catalog.config.toml (current directory)
#   - ~/.config/catalog/catalog.config.toml (Linux)
#   - ~/.catalog/catalog.config.toml

[storage]
# Directory for catalog.db (default: ~/.local/share/catalog)
# path = "/var/lib/catalog"

[index]
# Use the keyword search index; when disabled every search is fallback-ranked
enabled = false

# Index directory (default: <storage>/search_index)
# path = "/var/lib/catalog/search_index"

# Index writer heap in MB
writer_heap_mb = 50

# Give up on a single index call after this many milliseconds
timeout_ms = 2000

[search]
# Maximum number of results per search
results_limit = 20
"#.to_string()
    }
}
