//! Speech model registry, the [`SpeechModel`] seam, and [`TtsModelManager`].
//!
//! The acoustic model itself is an opaque pretrained network pulled from the
//! HuggingFace Hub. This module only knows which checkpoints exist, which of
//! them have an ONNX runner here, and how to call one.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::{audio::dsp, Error, Result};

pub mod download;
pub mod vits;

pub use vits::VitsOnnx;

/// Model loaded when none is requested, and the fallback when loading fails.
pub const DEFAULT_MODEL: &str = "facebook/mms-tts-eng";

/// Average speaking rate used by [`TtsModelManager::estimate_duration`].
const WORDS_PER_MINUTE: f32 = 150.0;

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Architecture family of a hub checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Vits,
    SpeechT5,
    FastSpeech2,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Vits => "vits",
            Self::SpeechT5 => "speecht5",
            Self::FastSpeech2 => "fastspeech2",
        })
    }
}

/// What is known about a checkpoint before downloading it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    pub requires_speaker_embedding: bool,
    /// Used until the downloaded `config.json` says otherwise.
    pub sample_rate: u32,
    /// Repository holding the ONNX export, when one can be run here.
    pub onnx_repo: Option<String>,
}

const KNOWN_MODELS: &[(&str, ModelKind, bool, u32, Option<&str>)] = &[
    ("facebook/mms-tts-eng", ModelKind::Vits, false, 16_000, Some("Xenova/mms-tts-eng")),
    ("microsoft/speecht5_tts", ModelKind::SpeechT5, true, 16_000, None),
    ("facebook/fastspeech2-en-ljspeech", ModelKind::FastSpeech2, false, 22_050, None),
];

fn spec_from_row(row: &(&str, ModelKind, bool, u32, Option<&str>)) -> ModelSpec {
    let (name, kind, requires_speaker_embedding, sample_rate, onnx_repo) = *row;
    ModelSpec {
        name: name.to_string(),
        kind,
        requires_speaker_embedding,
        sample_rate,
        onnx_repo: onnx_repo.map(str::to_string),
    }
}

/// Every checkpoint in the built-in table.
pub fn known_models() -> Vec<ModelSpec> {
    KNOWN_MODELS.iter().map(spec_from_row).collect()
}

/// Find a checkpoint by id. Unlisted ids containing `mms-tts` or `vits` are
/// treated as VITS; `facebook/*` ids map to the `Xenova/*` ONNX export.
pub fn lookup(name: &str) -> Option<ModelSpec> {
    if let Some(row) = KNOWN_MODELS.iter().find(|row| row.0 == name) {
        return Some(spec_from_row(row));
    }
    let lower = name.to_lowercase();
    if !(lower.contains("mms-tts") || lower.contains("vits")) {
        return None;
    }
    let onnx_repo = match name.strip_prefix("facebook/") {
        Some(rest) => format!("Xenova/{rest}"),
        None => name.to_string(),
    };
    Some(ModelSpec {
        name: name.to_string(),
        kind: ModelKind::Vits,
        requires_speaker_embedding: false,
        sample_rate: 16_000,
        onnx_repo: Some(onnx_repo),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// SpeechModel
// ─────────────────────────────────────────────────────────────────────────────

/// A loaded text → waveform model.
pub trait SpeechModel: Send + Sync {
    /// Hub id the model was loaded from.
    fn name(&self) -> &str;

    /// Sample rate of the waveforms returned by [`synthesize`](Self::synthesize).
    fn sample_rate(&self) -> u32;

    /// Synthesise one chunk of text into mono samples.
    fn synthesize(&self, text: &str) -> Result<Vec<f32>>;
}

/// Serializable summary of the active model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub model_type: String,
    pub sample_rate: u32,
    pub requires_speaker_embedding: bool,
    pub device: &'static str,
    pub loaded: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// TtsModelManager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the active [`SpeechModel`] and wraps it with the chores every
/// caller needs: empty-input checks, edge fades, batch progress.
pub struct TtsModelManager {
    model: Box<dyn SpeechModel>,
}

impl fmt::Debug for TtsModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsModelManager")
            .field("model", &self.model.name())
            .field("sample_rate", &self.model.sample_rate())
            .finish()
    }
}

impl TtsModelManager {
    /// Load `name` from the hub, falling back to [`DEFAULT_MODEL`] if that
    /// fails.
    pub fn load(name: &str) -> Result<Self> {
        info!(model = name, "Loading model");
        match download::load_from_hub(name) {
            Ok(model) => Ok(Self::from_model(model)),
            Err(e) if name != DEFAULT_MODEL => {
                error_then_fallback(name, &e);
                Ok(Self::from_model(download::load_from_hub(DEFAULT_MODEL)?))
            }
            Err(e) => Err(e),
        }
    }

    /// Wrap an already constructed model.
    pub fn from_model(model: Box<dyn SpeechModel>) -> Self {
        info!(model = model.name(), sample_rate = model.sample_rate(), "Model ready");
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn sample_rate(&self) -> u32 {
        self.model.sample_rate()
    }

    /// Synthesise `text`. Outputs longer than 1000 samples get a short
    /// fade at both ends.
    pub fn synthesize_speech(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            warn!("Empty text provided");
            return Err(Error::EmptyText);
        }
        let mut audio = self.model.synthesize(text)?;
        dsp::edge_fade(&mut audio);
        Ok(audio)
    }

    /// Synthesise each text independently; one failure does not stop the rest.
    pub fn batch_synthesize<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Result<Vec<f32>>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                info!("Processing text {}/{}", i + 1, texts.len());
                self.synthesize_speech(text.as_ref())
            })
            .collect()
    }

    /// Rough spoken length of `text` in seconds at 150 words per minute.
    pub fn estimate_duration(text: &str) -> f32 {
        text.split_whitespace().count() as f32 / WORDS_PER_MINUTE * 60.0
    }

    pub fn model_info(&self) -> ModelInfo {
        let name = self.model.name();
        let spec = lookup(name);
        ModelInfo {
            model_name: name.to_string(),
            model_type: spec.as_ref().map_or_else(|| "unknown".to_string(), |s| s.kind.to_string()),
            sample_rate: self.model.sample_rate(),
            requires_speaker_embedding: spec.is_some_and(|s| s.requires_speaker_embedding),
            device: "cpu",
            loaded: true,
        }
    }

    pub fn list_available_models() -> Vec<String> {
        KNOWN_MODELS.iter().map(|row| row.0.to_string()).collect()
    }

    /// Replace the active model. The current model stays loaded if the new
    /// one fails to load.
    pub fn switch_model(&mut self, name: &str) -> Result<()> {
        if name == self.model.name() {
            info!(model = name, "Model is already loaded");
            return Ok(());
        }
        self.model = download::load_from_hub(name)?;
        info!(model = name, "Switched model");
        Ok(())
    }

    /// Swap in an already constructed model.
    pub fn replace_model(&mut self, model: Box<dyn SpeechModel>) {
        self.model = model;
    }
}

fn error_then_fallback(name: &str, e: &Error) {
    tracing::error!(model = name, "Failed to load model: {e}");
    warn!(fallback = DEFAULT_MODEL, "Falling back to default model");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
