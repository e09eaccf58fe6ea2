//! # Embedder
//!
//! Turns text into vectors in the same space as the archive's embeddings.
//!
//! [`SentenceEmbeddingsModel`] runs `all-MiniLM-L6-v2` through Candle (pure Rust,
//! CPU) with mean pooling and L2 normalisation, producing 384-d vectors. The
//! model is loaded **once** by an explicit constructor and then shared by handle
//! (`Arc<SentenceEmbeddingsModel>`) with every component that embeds text.
//!
//! Inference checks the model out through a mutex for the duration of one call,
//! so the same instance can be used from several threads at once.
//!
//! ```no_run
//! use archive_companion::embedder::{Embedder, SentenceEmbeddingsModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = SentenceEmbeddingsModel::from_hub(
//!     "sentence-transformers/all-MiniLM-L6-v2",
//!     "main",
//! )?;
//! let v = model.embed("How do African values shape ethical AI?")?;
//! assert_eq!(v.len(), model.dimension());
//! # Ok(()) }
//! ```

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::error::EmbedError;

/// Longest input, in tokens, that the BERT encoder accepts.
const MAX_SEQUENCE_TOKENS: usize = 512;

/// Anything that can embed text for retrieval.
///
/// Implementations must be deterministic: identical input yields identical
/// output for the lifetime of the process.
pub trait Embedder: Send + Sync {
    /// Embed `text`, which must be non-empty after trimming.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;
}

struct LoadedBert {
    model: BertModel,
    tokenizer: Tokenizer,
}

/// Sentence embeddings model using Candle.
pub struct SentenceEmbeddingsModel {
    inner: Mutex<LoadedBert>,
    device: Device,
    dimension: usize,
}

impl SentenceEmbeddingsModel {
    /// Load the model from the Hugging Face hub (or its local cache).
    pub fn from_hub(model_id: &str, revision: &str) -> Result<Self, EmbedError> {
        info!("Loading embedding model {model_id}@{revision} from the hub");
        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, revision.to_string());
        let api = Api::new().map_err(|e| EmbedError::ModelLoad(e.to_string()))?;
        let api_repo = api.repo(repo);

        let fetch = |name: &str| {
            api_repo
                .get(name)
                .map_err(|e| EmbedError::ModelLoad(format!("{name}: {e}")))
        };

        Self::from_files(
            &fetch("config.json")?,
            &fetch("tokenizer.json")?,
            &fetch("model.safetensors")?,
        )
    }

    /// Load the model from a directory holding `config.json`, `tokenizer.json`
    /// and `model.safetensors`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, EmbedError> {
        let dir = dir.as_ref();
        info!("Loading embedding model from {}", dir.display());
        let file = |name: &str| -> Result<PathBuf, EmbedError> {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(EmbedError::ModelLoad(format!("missing {}", path.display())))
            }
        };
        Self::from_files(
            &file("config.json")?,
            &file("tokenizer.json")?,
            &file("model.safetensors")?,
        )
    }

    fn from_files(config: &Path, tokenizer: &Path, weights: &Path) -> Result<Self, EmbedError> {
        let device = Device::Cpu;

        let config = std::fs::read_to_string(config)
            .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", config.display())))?;
        let config: Config =
            serde_json::from_str(&config).map_err(|e| EmbedError::ModelLoad(e.to_string()))?;

        let mut tokenizer =
            Tokenizer::from_file(tokenizer).map_err(|e| EmbedError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(None);

        // SAFETY: the weights file is not modified while the model is alive.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            inner: Mutex::new(LoadedBert { model, tokenizer }),
            device,
            dimension: config.hidden_size,
        })
    }

    /// Mean pooling over token embeddings, considering the attention mask.
    fn mean_pooling(&self, embeddings: &Tensor, attention_mask: &[u32]) -> Result<Tensor, EmbedError> {
        // embeddings: [1, seq_len, hidden]; mask becomes [1, seq_len, 1]
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;
        Ok(sum.broadcast_div(&count)?.squeeze(0)?)
    }

    fn normalize(tensor: &Tensor) -> Result<Tensor, EmbedError> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Embedder for SentenceEmbeddingsModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::InvalidInput);
        }

        let guard = self.inner.lock().map_err(|_| EmbedError::Poisoned)?;
        let tokens = guard
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;
        debug!("Embedding {} tokens", tokens.get_ids().len());

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let output = guard.model.forward(&token_ids, &token_type_ids, None)?;
        drop(guard);

        let pooled = self.mean_pooling(&output, tokens.get_attention_mask())?;
        Ok(Self::normalize(&pooled)?.to_vec1::<f32>()?)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "downloads all-MiniLM-L6-v2 from the Hugging Face hub"]
    fn test_minilm_is_deterministic_and_normalised() -> Result<(), Box<dyn std::error::Error>> {
        let model = SentenceEmbeddingsModel::from_hub("sentence-transformers/all-MiniLM-L6-v2", "main")?;
        let a = model.embed("Rust is cool.")?;
        let b = model.embed("Rust is cool.")?;
        assert_eq!(a.len(), 384);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert!(matches!(model.embed("  \n"), Err(EmbedError::InvalidInput)));
        Ok(())
    }

    #[test]
    fn test_from_dir_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = SentenceEmbeddingsModel::from_dir(dir.path()).err().unwrap();
        assert!(matches!(err, EmbedError::ModelLoad(msg) if msg.contains("config.json")));
    }
}
