//! Playback through the default output device.
//!
//! Compiled in with the `playback` feature (rodio). Without it
//! [`play`] always returns [`Error::PlaybackUnavailable`].

use crate::{Error, Result};

/// Whether this build can play audio at all.
pub fn is_available() -> bool {
    cfg!(feature = "playback")
}

/// Play mono samples and block until playback finishes.
#[cfg(feature = "playback")]
pub fn play(samples: &[f32], sample_rate: u32) -> Result<()> {
    use rodio::{buffer::SamplesBuffer, OutputStream, Sink};

    if samples.is_empty() {
        return Err(Error::EmptyAudio);
    }

    let (_stream, handle) = OutputStream::try_default()
        .map_err(|e| Error::Audio(format!("No output device: {e}")))?;
    let sink = Sink::try_new(&handle)
        .map_err(|e| Error::Audio(format!("Cannot open playback sink: {e}")))?;

    sink.append(SamplesBuffer::new(1, sample_rate, samples.to_vec()));
    tracing::info!(samples = samples.len(), sample_rate, "Audio playback started");
    sink.sleep_until_end();
    Ok(())
}

#[cfg(not(feature = "playback"))]
pub fn play(_samples: &[f32], _sample_rate: u32) -> Result<()> {
    tracing::warn!("Audio playback not available");
    Err(Error::PlaybackUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "playback"))]
    #[test]
    fn test_play_without_feature() {
        assert!(!is_available());
        assert!(matches!(play(&[0.1], 16_000), Err(Error::PlaybackUnavailable)));
    }

    #[cfg(feature = "playback")]
    #[test]
    fn test_play_rejects_empty() {
        assert!(is_available());
        assert!(matches!(play(&[], 16_000), Err(Error::EmptyAudio)));
    }
}
