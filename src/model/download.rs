//! HuggingFace Hub model downloader.
//!
//! Resolves a checkpoint id through the registry, downloads `config.json`,
//! the tokenizer files and the ONNX graph from its ONNX export repository,
//! then constructs a [`VitsOnnx`].

use std::path::PathBuf;

use anyhow::Context;
use hf_hub::api::sync::Api;
use serde::Deserialize;
use tracing::{debug, info};

use super::{lookup, ModelKind, SpeechModel, VitsOnnx};
use crate::{tokenize::VitsTokenizer, Error, Result};

const ONNX_FILE: &str = "onnx/model.onnx";

// ─────────────────────────────────────────────────────────────────────────────
// Hub file schemas
// ─────────────────────────────────────────────────────────────────────────────

/// The fields of a VITS `config.json` this crate reads.
#[derive(Debug, Deserialize)]
pub struct VitsConfig {
    #[serde(default)]
    pub model_type: Option<String>,

    /// Output sample rate of the waveform.
    #[serde(default)]
    pub sampling_rate: Option<u32>,
}

/// The fields of `tokenizer_config.json` this crate reads.
#[derive(Debug, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default = "default_true")]
    pub add_blank: bool,

    /// MMS tokenizers lowercase input when `normalize` is set.
    #[serde(default = "default_true")]
    pub normalize: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { add_blank: true, normalize: true }
    }
}

fn default_true() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Download helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Download a single file from a HuggingFace repository.
fn hf_download(api: &Api, repo_id: &str, filename: &str) -> anyhow::Result<PathBuf> {
    let repo = api.model(repo_id.to_string());
    repo.get(filename)
        .with_context(|| format!("Failed to download '{}' from '{}'", filename, repo_id))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Download and initialise `name` from the HuggingFace Hub.
///
/// Files are cached in the HuggingFace Hub cache directory
/// (`~/.cache/huggingface/hub` by default). Checkpoints without an ONNX
/// runner here return [`Error::Unsupported`].
///
/// # Example
/// ```no_run
/// use text2audio::model::{download::load_from_hub, SpeechModel};
///
/// let model = load_from_hub("facebook/mms-tts-eng").unwrap();
/// let audio = model.synthesize("Hello world").unwrap();
/// ```
pub fn load_from_hub(name: &str) -> Result<Box<dyn SpeechModel>> {
    let spec = lookup(name).ok_or_else(|| Error::Unsupported(format!("Unknown model '{name}'")))?;

    let repo_id = match (spec.kind, spec.onnx_repo.as_deref()) {
        (ModelKind::Vits, Some(repo)) => repo.to_string(),
        (kind, _) => {
            return Err(Error::Unsupported(format!(
                "{name} is a {kind} model; only VITS models can run here"
            )))
        }
    };

    info!(model = name, repo = %repo_id, "Downloading model files");
    let api = Api::new().context("Failed to initialise HuggingFace Hub client")?;

    // ── config.json ──────────────────────────────────────────────────────────
    let config_path = hf_download(&api, &repo_id, "config.json")?;
    let config: VitsConfig = read_json(&config_path)?;
    if let Some(model_type) = config.model_type.as_deref().filter(|t| *t != "vits") {
        return Err(Error::Unsupported(format!(
            "{repo_id} declares model_type '{model_type}', expected 'vits'"
        )));
    }
    let sample_rate = config.sampling_rate.unwrap_or(spec.sample_rate);

    // ── tokenizer ────────────────────────────────────────────────────────────
    let tok_config = match hf_download(&api, &repo_id, "tokenizer_config.json") {
        Ok(path) => read_json(&path)?,
        Err(e) => {
            debug!("No tokenizer_config.json, using defaults: {e:#}");
            TokenizerConfig::default()
        }
    };
    let vocab_path = hf_download(&api, &repo_id, "vocab.json")?;
    let tokenizer = VitsTokenizer::from_vocab_file(&vocab_path, tok_config.add_blank, tok_config.normalize)?;

    // ── ONNX model ───────────────────────────────────────────────────────────
    info!(file = ONNX_FILE, "Downloading ONNX graph");
    let model_path = hf_download(&api, &repo_id, ONNX_FILE)?;

    info!(sample_rate, vocab = tokenizer.vocab_size(), "Loading model");
    let model = VitsOnnx::load(name, &model_path, tokenizer, sample_rate)?;
    Ok(Box::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_config_defaults() {
        let cfg: TokenizerConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.add_blank);
        assert!(cfg.normalize);

        let cfg: TokenizerConfig =
            serde_json::from_str(r#"{"add_blank": false, "normalize": false, "phonemize": false}"#).unwrap();
        assert!(!cfg.add_blank);
        assert!(!cfg.normalize);
    }

    #[test]
    fn test_vits_config_parse() {
        let cfg: VitsConfig =
            serde_json::from_str(r#"{"model_type": "vits", "sampling_rate": 16000, "hidden_size": 192}"#).unwrap();
        assert_eq!(cfg.sampling_rate, Some(16_000));
        assert_eq!(cfg.model_type.as_deref(), Some("vits"));
    }

    #[test]
    fn test_unsupported_architecture_fails_before_download() {
        assert!(matches!(load_from_hub("microsoft/speecht5_tts"), Err(Error::Unsupported(_))));
        assert!(matches!(load_from_hub("openai/whisper-tiny"), Err(Error::Unsupported(_))));
    }
}
