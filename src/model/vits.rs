//! ONNX runner for VITS / MMS-TTS exports.
//!
//! Uses [`ort`] (ONNX Runtime Rust bindings) for inference.
//!
//! | Name             | Shape          | dtype   |
//! |------------------|----------------|---------|
//! | `input_ids`      | `[1, seq_len]` | int64   |
//! | `attention_mask` | `[1, seq_len]` | int64   |
//!
//! `attention_mask` is only fed when the graph declares it. Output 0 is the
//! waveform, shape `[1, T]` or `[T]`.

use std::{path::Path, sync::Mutex};

use anyhow::Context;
use ort::{session::Session, value::Tensor};
use tracing::debug;

use super::SpeechModel;
use crate::{tokenize::VitsTokenizer, Error, Result};

/// A VITS model loaded into an ONNX Runtime session.
pub struct VitsOnnx {
    name: String,
    session: Mutex<Session>,
    tokenizer: VitsTokenizer,
    sample_rate: u32,
    wants_attention_mask: bool,
}

impl std::fmt::Debug for VitsOnnx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VitsOnnx")
            .field("name", &self.name)
            .field("sample_rate", &self.sample_rate)
            .field("vocab_size", &self.tokenizer.vocab_size())
            .finish()
    }
}

impl VitsOnnx {
    /// Load the ONNX graph at `model_path`.
    pub fn load(
        name: impl Into<String>,
        model_path: &Path,
        tokenizer: VitsTokenizer,
        sample_rate: u32,
    ) -> Result<Self> {
        let session = Session::builder()
            .context("Failed to create ORT session builder")?
            .commit_from_file(model_path)
            .with_context(|| format!("Cannot load ONNX model: {}", model_path.display()))?;

        let wants_attention_mask = session.inputs().iter().any(|i| i.name() == "attention_mask");
        debug!(wants_attention_mask, "ONNX session created");

        Ok(Self {
            name: name.into(),
            session: Mutex::new(session),
            tokenizer,
            sample_rate,
            wants_attention_mask,
        })
    }

    fn infer(&self, ids: Vec<i64>) -> Result<Vec<f32>> {
        let seq_len = ids.len();

        let t_input_ids = Tensor::<i64>::from_array(([1usize, seq_len], ids))
            .context("Failed to build input_ids tensor")?;
        let t_mask = Tensor::<i64>::from_array(([1usize, seq_len], vec![1i64; seq_len]))
            .context("Failed to build attention_mask tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Model(anyhow::anyhow!("ORT session mutex poisoned")))?;

        let outputs = if self.wants_attention_mask {
            session.run(ort::inputs!["input_ids" => t_input_ids, "attention_mask" => t_mask])
        } else {
            session.run(ort::inputs!["input_ids" => t_input_ids])
        }
        .context("ONNX inference failed")?;

        let (_shape, audio) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract audio tensor")?;

        Ok(audio.to_vec())
    }
}

impl SpeechModel for VitsOnnx {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
        let ids = self.tokenizer.encode(text);
        if ids.is_empty() {
            return Err(Error::InvalidText(format!(
                "no characters of {text:?} are in the model vocabulary"
            )));
        }
        debug!(tokens = ids.len(), "Running VITS inference");
        self.infer(ids)
    }
}
