//! # Archive builder
//!
//! The offline pass that turns raw writing into a [`ChunkStore`]:
//!
//! 1. [`segment_text`] splits the text into chunks of a few sentences.
//! 2. A [`Tagger`] labels each chunk through the generation service.
//! 3. The [`Embedder`] embeds each chunk's text.
//!
//! If the generation service is unreachable the build stops, since every
//! remaining chunk would fail the same way. Any other tagging failure is
//! logged and the chunk is kept untagged.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{info, warn};

use crate::archive::{ChunkRecord, ChunkStore};
use crate::embedder::Embedder;
use crate::error::{BuildError, GenerationError};
use crate::generation::Generator;
use crate::segment::segment_text;
use crate::tagging::{Classification, Tagger};

fn progress(len: usize, label: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{msg:>10} [{bar:40}] {pos}/{len}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(label);
    bar
}

/// Segment, tag, and embed `text` into a new store.
pub async fn build_archive<G, E>(
    text: &str,
    max_sentences: usize,
    tagger: &Tagger<'_, G>,
    embedder: Arc<E>,
) -> Result<ChunkStore, BuildError>
where
    G: Generator,
    E: Embedder + 'static,
{
    let segments = segment_text(text, max_sentences);
    if segments.is_empty() {
        return Err(BuildError::EmptyInput);
    }
    info!("Segmented input into {} chunks", segments.len());

    let bar = progress(segments.len(), "tagging");
    let mut classifications = Vec::with_capacity(segments.len());
    for segment in &segments {
        let classification = match tagger.classify(&segment.text).await {
            Ok(c) => c,
            Err(e @ GenerationError::ServiceUnavailable(_)) => {
                bar.abandon();
                return Err(e.into());
            }
            Err(e) => {
                warn!("Leaving chunk {} untagged: {e}", segment.id);
                Classification::default()
            }
        };
        classifications.push(classification);
        bar.inc(1);
    }
    bar.finish();

    let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
    let embeddings = tokio::task::spawn_blocking(move || {
        let bar = progress(texts.len(), "embedding");
        let vectors = texts
            .iter()
            .map(|t| {
                let v = embedder.embed(t);
                bar.inc(1);
                v
            })
            .collect::<Result<Vec<_>, _>>();
        bar.finish();
        vectors
    })
    .await??;

    let records = segments
        .into_iter()
        .zip(classifications)
        .zip(embeddings)
        .map(|((segment, classification), embedding)| {
            ChunkRecord::new(
                segment.id,
                segment.text,
                classification.tags,
                classification.reasoning,
                embedding,
            )
        })
        .collect();

    Ok(ChunkStore::from_records(records)?)
}
