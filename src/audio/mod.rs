//! Audio buffers, post-processing, WAV I/O and playback.

pub mod dsp;
pub mod io;
pub mod playback;
pub mod resample;

pub use dsp::AudioInfo;
pub use io::{AudioFormat, AudioWriter, ProcessingOptions};

/// Mono audio at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples normalized to [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn info(&self) -> Option<AudioInfo> {
        dsp::info(&self.samples, self.sample_rate)
    }
}

/// Convert a duration in milliseconds to a sample count at `sample_rate`.
pub(crate) fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let buf = AudioBuffer::new(vec![0.0; 8000], 16_000);
        assert_eq!(buf.len(), 8000);
        assert!((buf.duration() - 0.5).abs() < 1e-6);
        assert_eq!(AudioBuffer::new(vec![], 0).duration(), 0.0);
    }

    #[test]
    fn test_info() {
        let info = AudioBuffer::new(vec![0.5; 1600], 16_000).info().unwrap();
        assert_eq!(info.samples, 1600);
        assert!((info.duration_seconds - 0.1).abs() < 1e-6);
        assert!((info.peak_level - 0.5).abs() < 1e-6);
        assert!(AudioBuffer::new(vec![], 16_000).info().is_none());
    }

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(500, 16_000), 8000);
        assert_eq!(ms_to_samples(50, 22_050), 1102);
        assert_eq!(ms_to_samples(0, 16_000), 0);
    }
}
