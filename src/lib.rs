//! # Archive Companion (library root)
//!
//! A retrieval-augmented writing companion over a personal archive of tagged,
//! embedded text chunks. A query is embedded, the closest chunks are ranked by
//! exact cosine similarity, the chunks and query are rendered into a prompt,
//! and a local generation model answers with a main response plus follow-up
//! questions separated by a fixed marker.
//!
//! ## Modules
//! - [`archive`]: chunk records and the immutable [`archive::ChunkStore`].
//! - [`embedder`]: the [`embedder::Embedder`] seam and the Candle BERT model.
//! - [`ranker`]: exact top-k cosine ranking.
//! - [`template`], [`assembler`]: prompt wording and payload rendering.
//! - [`generation`], [`response`]: the Ollama client and reply splitting.
//! - [`pipeline`]: [`pipeline::Companion`], the end-to-end query path.
//! - [`segment`], [`tagging`], [`builder`]: the offline archive builder.
//! - [`session`]: essay sessions saved to disk.
//! - [`commands`], [`config`], [`display`]: the `companion` CLI.
//!
//! ## Configuration directory
//! Config, templates, and (by default) the archive live under the
//! per-platform directory returned by [`config_dir`], e.g.
//! `~/.config/companion` on Linux.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub mod archive;
pub mod assembler;
pub mod builder;
pub mod commands;
pub mod config;
pub mod display;
pub mod embedder;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod ranker;
pub mod response;
pub mod segment;
pub mod session;
pub mod tagging;
pub mod template;

use config::CompanionConfig;
use embedder::SentenceEmbeddingsModel;
use error::{ConfigError, EmbedError};

/// Return the per-platform configuration directory.
///
/// The directory is **not** created by this function.
///
/// # Errors
/// [`ConfigError::NoConfigDir`] if the platform directory cannot be determined.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("com", "archive-companion", "companion").ok_or(ConfigError::NoConfigDir)?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Load the embedding model named by `config`.
///
/// A configured `embedding_model_dir` (resolved against `base`) is used as is;
/// otherwise the model is fetched from the hub cache.
pub fn load_embedder(config: &CompanionConfig, base: &Path) -> Result<SentenceEmbeddingsModel, EmbedError> {
    match config.resolve_model_dir(base) {
        Some(dir) => SentenceEmbeddingsModel::from_dir(dir),
        None => SentenceEmbeddingsModel::from_hub(&config.embedding_model, &config.embedding_revision),
    }
}
