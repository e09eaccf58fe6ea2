//! Loading and handling the companion's YAML configuration.
//!
//! Every field has a default, so a config file only needs the values that
//! differ from a stock local setup (Ollama on `localhost:11434`).
//!
//! # Examples
//!
//! ```no_run
//! use archive_companion::config::load_config;
//!
//! let config = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::tagging::default_vocabulary;

/// Runtime configuration for every `companion` command.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct CompanionConfig {
    /// Full URL of the Ollama `generate` endpoint.
    pub generation_url: String,

    /// Generation model name.
    pub model: String,

    /// Archive file. Relative paths resolve against the config directory.
    pub archive_path: PathBuf,

    /// Chunks retrieved per query.
    pub top_k: usize,

    /// Per-request timeout for the generation service.
    pub request_timeout_secs: u64,

    /// Hugging Face repo id of the sentence-embedding model.
    pub embedding_model: String,

    pub embedding_revision: String,

    /// Local model directory; when set the hub is never contacted.
    pub embedding_model_dir: Option<PathBuf>,

    /// Controlled vocabulary used when building archives.
    pub tag_vocabulary: Vec<String>,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            generation_url: "http://localhost:11434/api/generate".to_string(),
            model: "llama3:8b".to_string(),
            archive_path: PathBuf::from("embedded_chunks.bin"),
            top_k: crate::pipeline::DEFAULT_TOP_K,
            request_timeout_secs: 120,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            embedding_revision: "main".to_string(),
            embedding_model_dir: None,
            tag_vocabulary: default_vocabulary(),
        }
    }
}

impl CompanionConfig {
    /// The archive path, resolved against `base` when relative.
    pub fn resolve_archive_path(&self, base: &Path) -> PathBuf {
        resolve(base, &self.archive_path)
    }

    /// The local model directory, resolved against `base` when relative.
    pub fn resolve_model_dir(&self, base: &Path) -> Option<PathBuf> {
        self.embedding_model_dir.as_deref().map(|dir| resolve(base, dir))
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load a [`CompanionConfig`] from the YAML file at `file`.
///
/// # Errors
/// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`] if it
/// is not valid YAML for this struct.
pub fn load_config(file: impl AsRef<Path>) -> Result<CompanionConfig, ConfigError> {
    let path = file.as_ref();
    debug!("Loading config from {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CompanionConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}
