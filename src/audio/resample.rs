//! Audio resampling using rubato

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::info;

use super::AudioBuffer;
use crate::{Error, Result};

const CHUNK_FRAMES: usize = 1024;

/// Resample mono audio to `target_rate`. Returns a clone when the rates
/// already match.
///
/// The output length is exactly `ceil(len * target / source)`.
pub fn resample(audio: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    if audio.sample_rate == target_rate || audio.is_empty() {
        return Ok(AudioBuffer::new(audio.samples.clone(), target_rate));
    }
    if audio.sample_rate == 0 || target_rate == 0 {
        return Err(Error::Audio("Sample rate must be non-zero".into()));
    }

    let ratio = target_rate as f64 / audio.sample_rate as f64;

    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0, // no ratio changes at runtime
        PolynomialDegree::Cubic,
        CHUNK_FRAMES,
        1,
    )
    .map_err(|e| Error::Audio(format!("Failed to create resampler: {e}")))?;

    let frames_needed = resampler.input_frames_next();
    let mut input = vec![vec![0.0f32; frames_needed]];
    let mut output = Vec::with_capacity((audio.len() as f64 * ratio) as usize + frames_needed);

    let mut pos = 0;
    loop {
        let end = (pos + frames_needed).min(audio.len());
        let taken = end - pos;
        input[0][..taken].copy_from_slice(&audio.samples[pos..end]);
        input[0][taken..].fill(0.0);

        let out = resampler
            .process(&input, None)
            .map_err(|e| Error::Audio(format!("Resampling failed: {e}")))?;
        output.extend_from_slice(&out[0]);
        pos = end;

        // One zero-padded pass past the end flushes the interpolator
        if taken < frames_needed {
            break;
        }
    }

    let expected = (audio.len() as f64 * ratio).ceil() as usize;
    output.resize(expected, 0.0);

    info!(from = audio.sample_rate, to = target_rate, "Resampled audio");
    Ok(AudioBuffer::new(output, target_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let a = AudioBuffer::new(vec![0.1, 0.2, 0.3], 16_000);
        assert_eq!(resample(&a, 16_000).unwrap(), a);
    }

    #[test]
    fn test_downsample_length() {
        let a = AudioBuffer::new(vec![0.0; 16_000], 16_000);
        let out = resample(&a, 8_000).unwrap();
        assert_eq!(out.sample_rate, 8_000);
        assert_eq!(out.len(), 8_000);
    }

    #[test]
    fn test_upsample_length_exact_chunk_multiple() {
        let a = AudioBuffer::new(vec![0.25; 2048], 16_000);
        let out = resample(&a, 22_050).unwrap();
        assert_eq!(out.len(), (2048.0f64 * 22_050.0 / 16_000.0).ceil() as usize);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let a = AudioBuffer::new(vec![0.1], 0);
        assert!(resample(&a, 16_000).is_err());
    }
}
