//! Project configuration: the on-disk knobs for index location, HNSW
//! tuning, chunking strategy, include/exclude globs and the embedding
//! collaborator, loaded from a YAML file with environment variable
//! overrides layered on top.
//!
//! Follows the same load-or-default, env-override shape the rest of the
//! codebase uses for its ad-hoc settings (see [`crate::constants`]), just
//! collected into one struct instead of scattered `std::env::var` calls.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{CONFIG_DIR_NAME, DB_DIR_NAME, HNSW_DIR_NAME, HNSW_SIDECAR_FILE};
use crate::error::{PrismError, Result};
use crate::hnsw::{DEFAULT_DIMENSION, DEFAULT_EF_CONSTRUCTION, DEFAULT_EF_SEARCH, DEFAULT_M, DEFAULT_MAX_ELEMENTS};

/// Name of the per-project config file, read from the project root.
pub const CONFIG_FILE_NAME: &str = "prism.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    pub m: usize,
    #[serde(rename = "efConstruction")]
    pub ef_construction: usize,
    #[serde(rename = "efSearch")]
    pub ef_search: usize,
    #[serde(rename = "maxElements")]
    pub max_elements: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

/// `hybrid` means AST-based chunking with a fallback to the fixed-window
/// strategy when parsing fails or the language has no grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    Ast,
    Line,
    Hybrid,
}

impl Default for ChunkingStrategy {
    fn default() -> Self {
        ChunkingStrategy::Hybrid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    #[serde(rename = "maxLines")]
    pub max_lines: usize,
    #[serde(rename = "minLines")]
    pub min_lines: usize,
    pub strategy: ChunkingStrategy,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_lines: 2000,
            min_lines: 100,
            strategy: ChunkingStrategy::Hybrid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub primary: String,
    pub fallback: Option<String>,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            primary: "bge-small-en-v1.5".to_string(),
            fallback: None,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismConfig {
    #[serde(rename = "indexPath")]
    pub index_path: Option<PathBuf>,
    #[serde(rename = "hnswIndexPath")]
    pub hnsw_index_path: Option<PathBuf>,
    #[serde(rename = "hnswMappingPath")]
    pub hnsw_mapping_path: Option<PathBuf>,
    pub dimension: usize,
    pub hnsw: HnswConfig,
    pub chunking: ChunkingConfig,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    #[serde(rename = "batchSize")]
    pub batch_size: usize,
    pub embedding: EmbeddingConfig,
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            hnsw_index_path: None,
            hnsw_mapping_path: None,
            dimension: DEFAULT_DIMENSION,
            hnsw: HnswConfig::default(),
            chunking: ChunkingConfig::default(),
            include: Vec::new(),
            exclude: Vec::new(),
            batch_size: 32,
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl PrismConfig {
    /// Load `prism.yaml` from `project_root` if present, falling back to
    /// defaults, then apply `PRISM_*` environment overrides on top.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| PrismError::io(&config_path, e.to_string()))?;
            serde_yaml_ng::from_str(&content)
                .map_err(|e| PrismError::config(format!("invalid {}: {e}", CONFIG_FILE_NAME)))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PRISM_DIMENSION") {
            if let Ok(parsed) = v.parse() {
                self.dimension = parsed;
            }
        }
        if let Ok(v) = std::env::var("PRISM_HNSW_EF_SEARCH") {
            if let Ok(parsed) = v.parse() {
                self.hnsw.ef_search = parsed;
            }
        }
        if let Ok(v) = std::env::var("PRISM_HNSW_MAX_ELEMENTS") {
            if let Ok(parsed) = v.parse() {
                self.hnsw.max_elements = parsed;
            }
        }
        if let Ok(v) = std::env::var("PRISM_BATCH_SIZE") {
            if let Ok(parsed) = v.parse() {
                self.batch_size = parsed;
            }
        }
        if let Ok(v) = std::env::var("PRISM_INDEX_PATH") {
            self.index_path = Some(PathBuf::from(v));
        }
    }

    pub fn resolved_index_path(&self, project_root: &Path) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| project_root.join(DB_DIR_NAME))
    }

    pub fn resolved_hnsw_index_path(&self, db_path: &Path) -> PathBuf {
        self.hnsw_index_path
            .clone()
            .unwrap_or_else(|| db_path.join(HNSW_DIR_NAME))
    }

    pub fn resolved_hnsw_mapping_path(&self, db_path: &Path) -> PathBuf {
        self.hnsw_mapping_path
            .clone()
            .unwrap_or_else(|| db_path.join(HNSW_DIR_NAME).join(HNSW_SIDECAR_FILE))
    }

    /// Write this configuration to `project_root/prism.yaml`, creating the
    /// directory if needed. Used by `prism init`-style flows.
    pub fn save(&self, project_root: &Path) -> Result<()> {
        let config_path = project_root.join(CONFIG_FILE_NAME);
        let yaml = serde_yaml_ng::to_string(self)
            .map_err(|e| PrismError::config(format!("failed to serialize config: {e}")))?;
        std::fs::write(&config_path, yaml).map_err(|e| PrismError::io(&config_path, e.to_string()))?;
        Ok(())
    }
}

/// Global `~/.prism/repos.json`-style directory, kept separate from the
/// per-project `prism.yaml` above.
pub fn global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_sane_values() {
        let config = PrismConfig::default();
        assert_eq!(config.dimension, DEFAULT_DIMENSION);
        assert_eq!(config.chunking.strategy, ChunkingStrategy::Hybrid);
        assert_eq!(config.hnsw.max_elements, DEFAULT_MAX_ELEMENTS);
    }

    #[test]
    fn load_falls_back_to_defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        let config = PrismConfig::load(tmp.path()).unwrap();
        assert_eq!(config.dimension, DEFAULT_DIMENSION);
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let mut config = PrismConfig::default();
        config.batch_size = 64;
        config.chunking.strategy = ChunkingStrategy::Ast;
        config.save(tmp.path()).unwrap();

        let loaded = PrismConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded.batch_size, 64);
        assert_eq!(loaded.chunking.strategy, ChunkingStrategy::Ast);
    }

    #[test]
    fn resolved_index_path_defaults_under_project_root() {
        let tmp = TempDir::new().unwrap();
        let config = PrismConfig::default();
        let resolved = config.resolved_index_path(tmp.path());
        assert_eq!(resolved, tmp.path().join(DB_DIR_NAME));
    }
}
