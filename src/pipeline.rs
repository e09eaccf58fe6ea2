//! # Retrieval pipeline
//!
//! [`Companion`] wires the stages together for one query:
//!
//! ```text
//! query ─▶ Embedder ─▶ top_k (ChunkStore) ─▶ ContextAssembler ─▶ Generator ─▶ split_response
//! ```
//!
//! Stages run strictly in that order and nothing is exposed mid-pipeline.
//! Embedding is CPU-bound inference, so it runs on tokio's blocking pool;
//! ranking and assembly are fast and run inline; generation is an async HTTP
//! call.
//!
//! Both long-lived resources, the [`ChunkStore`] and the [`Embedder`], are
//! built before the `Companion` and passed in by `Arc`. Several companions (or
//! several concurrent queries through one) can share them without locking.

use std::sync::Arc;
use tracing::{debug, info};

use crate::archive::ChunkStore;
use crate::assembler::{ContextAssembler, Mode, Payload};
use crate::embedder::Embedder;
use crate::error::{EmbedError, PipelineError};
use crate::generation::Generator;
use crate::ranker::{RankedChunk, top_k};
use crate::response::{GeneratedResponse, split_response};

/// Chunks retrieved per query unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// One query's complete result.
#[derive(Debug, Clone)]
pub struct Answer {
    pub ranked: Vec<RankedChunk>,
    pub response: GeneratedResponse,
}

/// The assembled retrieval-augmented pipeline.
pub struct Companion<E, G> {
    store: Arc<ChunkStore>,
    embedder: Arc<E>,
    generator: G,
    assembler: ContextAssembler,
    top_k: usize,
}

impl<E, G> Companion<E, G>
where
    E: Embedder + 'static,
    G: Generator,
{
    pub fn new(store: Arc<ChunkStore>, embedder: Arc<E>, generator: G) -> Self {
        Self {
            store,
            embedder,
            generator,
            assembler: ContextAssembler::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Embed `text` on the blocking pool.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        if text.trim().is_empty() {
            return Err(EmbedError::InvalidInput.into());
        }
        let embedder = Arc::clone(&self.embedder);
        let text = text.to_owned();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text)).await??;
        Ok(vector)
    }

    /// Embed `query` and rank the store against it.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RankedChunk>, PipelineError> {
        let vector = self.embed_query(query).await?;
        let ranked = top_k(&vector, &self.store, self.top_k)?;
        debug!(
            "Retrieved ids {:?}",
            ranked.iter().map(|r| r.record.id).collect::<Vec<_>>()
        );
        Ok(ranked)
    }

    /// Retrieve and assemble, without calling the generator.
    pub async fn prepare(
        &self,
        query: &str,
        mode: Mode,
    ) -> Result<(Vec<RankedChunk>, Payload), PipelineError> {
        let ranked = self.retrieve(query).await?;
        let payload = self.assembler.assemble(query, &ranked, mode);
        Ok((ranked, payload))
    }

    /// Run the whole pipeline and split the reply on the follow-up marker.
    pub async fn respond(&self, query: &str, mode: Mode) -> Result<Answer, PipelineError> {
        let (ranked, payload) = self.prepare(query, mode).await?;
        info!("Generating {:?} response from {} chunks", mode, ranked.len());
        let raw = self.generator.generate(&payload).await?;
        Ok(Answer {
            ranked,
            response: split_response(&raw),
        })
    }
}
