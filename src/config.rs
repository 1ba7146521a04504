//! Converter settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{audio::AudioFormat, model::DEFAULT_MODEL, text::DEFAULT_MAX_CHUNK_CHARS, Error, Result};

/// Settings for [`TextToAudioConverter`](crate::convert::TextToAudioConverter).
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Upper bound on characters per synthesised chunk.
    pub max_text_length: usize,
    pub audio_format: AudioFormat,
    pub normalize_audio: bool,
    pub apply_fade: bool,
    pub noise_reduction: bool,
    /// Join chunk outputs into one file instead of keeping the first.
    pub concatenate_segments: bool,
    /// Silence inserted between concatenated chunks.
    pub segment_gap_ms: u32,
    /// Resample before saving; `None` keeps the model's rate.
    pub output_sample_rate: Option<u32>,
    pub output_dir: PathBuf,
    pub model_name: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_text_length: DEFAULT_MAX_CHUNK_CHARS,
            audio_format: AudioFormat::Wav,
            normalize_audio: true,
            apply_fade: true,
            noise_reduction: false,
            concatenate_segments: true,
            segment_gap_ms: 500,
            output_sample_rate: None,
            output_dir: PathBuf::from("output"),
            model_name: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ConverterConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Set one field from its string form, as given on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "max_text_length" => {
                let n = parse::<usize>(key, value)?;
                if n == 0 {
                    return Err(Error::Config("max_text_length must be positive".into()));
                }
                self.max_text_length = n;
            }
            "audio_format" => self.audio_format = value.parse()?,
            "normalize_audio" => self.normalize_audio = parse_bool(key, value)?,
            "apply_fade" => self.apply_fade = parse_bool(key, value)?,
            "noise_reduction" => self.noise_reduction = parse_bool(key, value)?,
            "concatenate_segments" => self.concatenate_segments = parse_bool(key, value)?,
            "segment_gap_ms" => self.segment_gap_ms = parse(key, value)?,
            "output_sample_rate" => {
                self.output_sample_rate = match value.trim() {
                    "" | "none" | "model" => None,
                    v => Some(parse::<u32>(key, v)?).filter(|&r| r > 0),
                }
            }
            "output_dir" => self.output_dir = PathBuf::from(value),
            "model_name" => self.model_name = value.to_string(),
            other => return Err(Error::UnknownConfigKey(other.to_string())),
        }
        info!("Updated config: {key} = {value}");
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value '{value}' for {key}")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid value '{value}' for {key}"))),
    }
}
