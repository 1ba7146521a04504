//! WAV file I/O and the output directory writer.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{dsp, AudioBuffer};
use crate::{Error, Result};

/// Strength used for noise reduction in batch and conversion post-processing.
pub const POST_NOISE_STRENGTH: f32 = 0.3;

/// Fade applied at both ends during post-processing, in milliseconds.
pub const POST_FADE_MS: u32 = 50;

// ─────────────────────────────────────────────────────────────────────────────
// Formats
// ─────────────────────────────────────────────────────────────────────────────

/// Output container. Only [`AudioFormat::Wav`] can be written; the others are
/// recognised so configuration errors say what is wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            "flac" => Ok(Self::Flac),
            "ogg" => Ok(Self::Ogg),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plain file helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Write `samples` as a 16-bit PCM mono WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        // f32 [-1.0, 1.0] → i16 [-32768, 32767]
        let s16 = (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Load a WAV file as mono f32 in [-1, 1]. Multi-channel input is averaged.
pub fn load_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    info!(path = %path.display(), "Loaded audio");
    Ok(AudioBuffer::new(mono, spec.sample_rate))
}

// ─────────────────────────────────────────────────────────────────────────────
// AudioWriter
// ─────────────────────────────────────────────────────────────────────────────

/// Post-processing switches for [`AudioWriter::batch_process`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub normalize: bool,
    pub apply_fade: bool,
    pub noise_reduction: bool,
    pub format: AudioFormat,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            apply_fade: true,
            noise_reduction: false,
            format: AudioFormat::Wav,
        }
    }
}

/// Apply the optional noise reduction and fades, in that order.
pub fn post_process(samples: &[f32], sample_rate: u32, noise_reduction: bool, fade: bool) -> Vec<f32> {
    let mut out = if noise_reduction {
        dsp::reduce_noise(samples, sample_rate, POST_NOISE_STRENGTH)
    } else {
        samples.to_vec()
    };
    if fade {
        out = dsp::apply_fade(&out, POST_FADE_MS, POST_FADE_MS, sample_rate);
    }
    out
}

/// Timestamp suffix used in generated file names.
pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Saves audio into a fixed output directory.
#[derive(Debug, Clone)]
pub struct AudioWriter {
    output_dir: PathBuf,
}

impl AudioWriter {
    /// Create the writer, creating `output_dir` if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save `samples` as `<output_dir>/<stem>.<format>`. Any extension on
    /// `filename` is discarded.
    pub fn save(
        &self,
        samples: &[f32],
        filename: &str,
        sample_rate: u32,
        format: AudioFormat,
        normalize: bool,
    ) -> Result<PathBuf> {
        if samples.is_empty() {
            return Err(Error::EmptyAudio);
        }
        if format != AudioFormat::Wav {
            return Err(Error::UnsupportedFormat(format.to_string()));
        }

        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Audio(format!("Invalid output filename '{filename}'")))?;
        let path = self.output_dir.join(format!("{stem}.{}", format.extension()));

        let data = if normalize {
            dsp::normalize(samples, dsp::DEFAULT_TARGET_DB)
        } else {
            samples.to_vec()
        };

        write_wav(&path, &data, sample_rate).inspect_err(|e| {
            error!(path = %path.display(), "Failed to save audio: {e}");
        })?;

        info!(path = %path.display(), "Audio saved");
        Ok(path)
    }

    /// Post-process and save each segment as `{prefix}_{NNN}_{timestamp}`.
    /// Segments that fail are logged and skipped.
    pub fn batch_process(
        &self,
        segments: &[Vec<f32>],
        sample_rate: u32,
        prefix: &str,
        options: &ProcessingOptions,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            let processed = post_process(segment, sample_rate, options.noise_reduction, options.apply_fade);
            let filename = format!("{prefix}_{:03}_{}", i + 1, timestamp());
            match self.save(&processed, &filename, sample_rate, options.format, options.normalize) {
                Ok(path) => paths.push(path),
                Err(e) => error!("Failed to process audio segment {}: {e}", i + 1),
            }
        }
        info!("Processed {} audio segments", paths.len());
        paths
    }

    /// Files in the output directory with extension `ext`, sorted by name.
    pub fn list_outputs(&self, ext: &str) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.output_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
            .collect();
        files.sort();
        Ok(files)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
