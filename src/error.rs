//! # Error types
//!
//! One error enum per component, so callers can match on exactly the failures a
//! stage can produce. [`PipelineError`] aggregates them for the end-to-end
//! [`Companion`](crate::pipeline::Companion) calls.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading, validating, or saving a [`ChunkStore`](crate::archive::ChunkStore).
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode archive {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("failed to encode archive: {0}")]
    Encode(String),

    #[error("record {id} has embedding dimension {actual}, expected {expected}")]
    InconsistentDimension {
        id: u64,
        expected: usize,
        actual: usize,
    },

    #[error("record {id} has an empty embedding")]
    EmptyEmbedding { id: u64 },

    #[error("duplicate record id {0}")]
    DuplicateId(u64),

    #[error("record {0} has no text")]
    EmptyText(u64),
}

/// Failures raised by an [`Embedder`](crate::embedder::Embedder).
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("cannot embed empty text")]
    InvalidInput,

    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("inference error: {0}")]
    Inference(#[from] candle_core::Error),

    #[error("embedding model lock poisoned")]
    Poisoned,
}

/// Failures raised by [`top_k`](crate::ranker::top_k).
#[derive(Error, Debug, PartialEq)]
pub enum RankError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("chunk store is empty")]
    EmptyStore,

    #[error("query has dimension {actual}, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failures raised by a [`Generator`](crate::generation::Generator).
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("generation service returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
}

/// Failures while loading or validating a [`PromptTemplate`](crate::template::PromptTemplate).
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("template field `{0}` must not contain the follow-up marker")]
    ContainsMarker(&'static str),
}

/// Failures while loading the YAML configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unable to determine config directory")]
    NoConfigDir,
}

/// Failures while persisting an [`EssaySession`](crate::session::EssaySession).
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("a filename base is required")]
    MissingFilename,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the offline archive builder.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("no chunks found in the input text")]
    EmptyInput,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Store(#[from] LoadError),

    #[error("embedding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Any failure of the end-to-end retrieval pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("embedding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
