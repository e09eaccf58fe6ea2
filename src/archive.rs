//! # Chunk store
//!
//! The read-only archive of embedded writing that retrieval runs against.
//!
//! An archive is produced offline (see [`crate::builder`]) and loaded once at
//! process start. After [`ChunkStore::load`] returns, nothing mutates the
//! records: share the store behind an `Arc` and read it from as many queries
//! as you like.
//!
//! ## On-disk layout
//! - `*.json`: a JSON array of records. `tags` may be a list of strings or a
//!   single comma-separated string.
//! - anything else: `bincode` (standard config) encoding of `Vec<ChunkRecord>`.
//!
//! ## Example
//! ```no_run
//! use archive_companion::archive::ChunkStore;
//!
//! let store = ChunkStore::load("embedded_chunks.bin").unwrap();
//! println!("{} chunks of dimension {:?}", store.len(), store.dimension());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::LoadError;

/// One archived unit of writing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier within the store.
    pub id: u64,
    /// The literal excerpt.
    pub text: String,
    /// Thematic labels, in the order the tagger produced them.
    pub tags: Vec<String>,
    /// Why the tags were chosen. May be empty.
    pub reasoning: String,
    /// Semantic vector; every record in a store shares its length.
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(
        id: u64,
        text: impl Into<String>,
        tags: Vec<String>,
        reasoning: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            tags,
            reasoning: reasoning.into(),
            embedding,
        }
    }
}

/// JSON archives written by other tools store tags as one comma-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTags {
    List(Vec<String>),
    Joined(String),
}

impl JsonTags {
    fn into_list(self) -> Vec<String> {
        match self {
            JsonTags::List(tags) => tags,
            JsonTags::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct JsonRecord {
    id: u64,
    text: String,
    #[serde(default)]
    tags: Option<JsonTags>,
    #[serde(default)]
    reasoning: Option<String>,
    embedding: Vec<f32>,
}

impl From<JsonRecord> for ChunkRecord {
    fn from(r: JsonRecord) -> Self {
        ChunkRecord {
            id: r.id,
            text: r.text,
            tags: r.tags.map(JsonTags::into_list).unwrap_or_default(),
            reasoning: r.reasoning.unwrap_or_default(),
            embedding: r.embedding,
        }
    }
}

/// Immutable, ordered collection of [`ChunkRecord`]s.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    records: Vec<ChunkRecord>,
    dimension: Option<usize>,
}

impl ChunkStore {
    /// Read and validate an archive.
    ///
    /// # Errors
    /// [`LoadError`] when the file is missing or unreadable, cannot be decoded,
    /// or breaks a store invariant (mixed dimensions, duplicate ids, blank text).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!("Loading archive: {}", path.display());

        let bytes = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let records = if is_json(path) {
            let raw: Vec<JsonRecord> =
                serde_json::from_slice(&bytes).map_err(|e| LoadError::Decode {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            raw.into_iter().map(ChunkRecord::from).collect()
        } else {
            let (records, _read): (Vec<ChunkRecord>, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                    |e| LoadError::Decode {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    },
                )?;
            records
        };

        let store = Self::from_records(records)?;
        info!(
            "Archive loaded: {} records, dimension {:?}",
            store.len(),
            store.dimension
        );
        Ok(store)
    }

    /// Build a store from records already in memory, applying the same checks as [`load`](Self::load).
    pub fn from_records(records: Vec<ChunkRecord>) -> Result<Self, LoadError> {
        let mut dimension: Option<usize> = None;
        let mut seen = HashSet::with_capacity(records.len());

        for record in &records {
            if !seen.insert(record.id) {
                return Err(LoadError::DuplicateId(record.id));
            }
            if record.text.trim().is_empty() {
                return Err(LoadError::EmptyText(record.id));
            }
            if record.embedding.is_empty() {
                return Err(LoadError::EmptyEmbedding { id: record.id });
            }
            match dimension {
                None => dimension = Some(record.embedding.len()),
                Some(expected) if expected != record.embedding.len() => {
                    return Err(LoadError::InconsistentDimension {
                        id: record.id,
                        expected,
                        actual: record.embedding.len(),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self { records, dimension })
    }

    /// Write the store in the format implied by the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let bytes = if is_json(path) {
            serde_json::to_vec_pretty(&self.records).map_err(|e| LoadError::Encode(e.to_string()))?
        } else {
            bincode::serde::encode_to_vec(&self.records, bincode::config::standard())
                .map_err(|e| LoadError::Encode(e.to_string()))?
        };
        fs::write(path, bytes).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Wrote {} records to {}", self.len(), path.display());
        Ok(())
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn get(&self, id: u64) -> Option<&ChunkRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Embedding dimension shared by every record, `None` for an empty store.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
