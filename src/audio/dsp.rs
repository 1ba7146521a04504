//! Post-processing applied to synthesised speech.
//!
//! Every function takes `&[f32]` and returns a new buffer except
//! [`edge_fade`], which works in place. Empty input is always returned
//! unchanged.

use serde::Serialize;
use tracing::{debug, warn};

use super::ms_to_samples;

/// Default loudness target for [`normalize`], in dBFS (RMS).
pub const DEFAULT_TARGET_DB: f32 = -3.0;

/// Cut-off of the high-pass used by [`reduce_noise`].
pub const NOISE_CUTOFF_HZ: f64 = 80.0;

/// Longest fade applied by [`edge_fade`], in samples.
const EDGE_FADE_MAX: usize = 500;

/// Buffers at or below this length are left alone by [`edge_fade`].
const EDGE_FADE_MIN_LEN: usize = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Level
// ─────────────────────────────────────────────────────────────────────────────

/// Compute RMS energy
pub fn compute_rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum: f64 = signal.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum / signal.len() as f64).sqrt() as f32
}

/// Compute peak amplitude
pub fn compute_peak(signal: &[f32]) -> f32 {
    signal.iter().map(|x| x.abs()).fold(0.0f32, f32::max)
}

/// RMS-normalize to `target_db`, then scale down by the peak if that
/// pushed any sample past full scale. Silent input is returned as is.
pub fn normalize(signal: &[f32], target_db: f32) -> Vec<f32> {
    let rms = compute_rms(signal);
    if rms <= 0.0 {
        return signal.to_vec();
    }

    let target_rms = 10f32.powf(target_db / 20.0);
    let factor = target_rms / rms;
    let mut out: Vec<f32> = signal.iter().map(|x| x * factor).collect();

    let peak = compute_peak(&out);
    if peak > 1.0 {
        out.iter_mut().for_each(|x| *x /= peak);
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Fades
// ─────────────────────────────────────────────────────────────────────────────

/// Value `i` of an `n`-point ramp from 0 to 1 with both endpoints included.
fn ramp(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        i as f32 / (n - 1) as f32
    }
}

fn fade_in_place(signal: &mut [f32], fade_in: usize, fade_out: usize) {
    let len = signal.len();
    if fade_in > 0 && fade_in < len {
        for (i, s) in signal[..fade_in].iter_mut().enumerate() {
            *s *= ramp(i, fade_in);
        }
    }
    if fade_out > 0 && fade_out < len {
        for (i, s) in signal[len - fade_out..].iter_mut().enumerate() {
            *s *= 1.0 - ramp(i, fade_out);
        }
    }
}

/// Apply linear fade-in and fade-out. A fade that is zero length or not
/// shorter than the signal is skipped.
pub fn apply_fade(signal: &[f32], fade_in_ms: u32, fade_out_ms: u32, sample_rate: u32) -> Vec<f32> {
    let mut out = signal.to_vec();
    fade_in_place(
        &mut out,
        ms_to_samples(fade_in_ms, sample_rate),
        ms_to_samples(fade_out_ms, sample_rate),
    );
    out
}

/// Short symmetric fade at both ends of raw model output.
pub fn edge_fade(signal: &mut [f32]) {
    if signal.len() <= EDGE_FADE_MIN_LEN {
        return;
    }
    let n = EDGE_FADE_MAX.min(signal.len() / 10);
    fade_in_place(signal, n, n);
}

// ─────────────────────────────────────────────────────────────────────────────
// Noise reduction: 4th-order Butterworth high-pass, zero phase
// ─────────────────────────────────────────────────────────────────────────────

/// Second-order section, coefficients normalized so a0 = 1.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn high_pass(cutoff: f64, sample_rate: f64, q: f64) -> Self {
        let w0 = 2.0 * std::f64::consts::PI * cutoff / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 + cos_w0) / 2.0 / a0,
            b1: -(1.0 + cos_w0) / a0,
            b2: (1.0 + cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Gain at DC.
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// State that makes a constant input of `level` produce no transient.
    fn steady_state(&self, level: f64) -> (f64, f64) {
        let out = self.dc_gain() * level;
        let z2 = self.b2 * level - self.a2 * out;
        let z1 = self.b1 * level - self.a1 * out + z2;
        (z1, z2)
    }

    /// Transposed direct form II over the whole buffer, starting from the
    /// steady state for a constant input equal to the first sample.
    fn run(&self, signal: &mut [f64]) {
        let Some(&first) = signal.first() else {
            return;
        };
        let (mut z1, mut z2) = self.steady_state(first);
        for x in signal.iter_mut() {
            let input = *x;
            let y = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * y + z2;
            z2 = self.b2 * input - self.a2 * y;
            *x = y;
        }
    }
}

/// The two sections of a 4th-order Butterworth high-pass.
fn butterworth_high_pass(cutoff: f64, sample_rate: f64) -> [Biquad; 2] {
    use std::f64::consts::PI;
    let q1 = 1.0 / (2.0 * (PI / 8.0).cos());
    let q2 = 1.0 / (2.0 * (3.0 * PI / 8.0).cos());
    [
        Biquad::high_pass(cutoff, sample_rate, q1),
        Biquad::high_pass(cutoff, sample_rate, q2),
    ]
}

/// Samples of odd-reflection padding added at each end by [`filtfilt`].
const FILTFILT_PAD: usize = 15;

/// Forward-backward filtering with odd-reflection padding at both ends.
///
/// Each section starts from its steady state for the first sample it sees,
/// in both directions. Signals no longer than the padding come back
/// unchanged.
fn filtfilt(sections: &[Biquad], signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n <= FILTFILT_PAD {
        debug!(len = n, "Signal too short to filter");
        return signal.to_vec();
    }
    let pad = FILTFILT_PAD;
    let first = signal[0] as f64;
    let last = signal[n - 1] as f64;

    let mut ext: Vec<f64> = Vec::with_capacity(n + 2 * pad);
    ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i] as f64));
    ext.extend(signal.iter().map(|&x| x as f64));
    ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i] as f64));

    for s in sections {
        s.run(&mut ext);
    }
    ext.reverse();
    for s in sections {
        s.run(&mut ext);
    }
    ext.reverse();

    ext[pad..pad + n].iter().map(|&x| x as f32).collect()
}

/// Blend the signal with an 80 Hz high-passed copy of itself.
///
/// `strength` is clamped to `[0, 1]`; 0 returns the input untouched.
pub fn reduce_noise(signal: &[f32], sample_rate: u32, strength: f32) -> Vec<f32> {
    if signal.is_empty() || strength <= 0.0 {
        return signal.to_vec();
    }
    let nyquist = sample_rate as f64 / 2.0;
    if NOISE_CUTOFF_HZ >= nyquist {
        warn!(sample_rate, "Noise reduction skipped: cutoff above Nyquist");
        return signal.to_vec();
    }

    let strength = strength.min(1.0);
    let filtered = filtfilt(&butterworth_high_pass(NOISE_CUTOFF_HZ, sample_rate as f64), signal);
    signal
        .iter()
        .zip(filtered)
        .map(|(&x, f)| (1.0 - strength) * x + strength * f)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Concatenation
// ─────────────────────────────────────────────────────────────────────────────

/// Join segments with `gap_ms` of silence between consecutive ones.
pub fn concatenate(segments: &[Vec<f32>], gap_ms: u32, sample_rate: u32) -> Vec<f32> {
    match segments {
        [] => Vec::new(),
        [only] => only.clone(),
        [first, rest @ ..] => {
            let gap = ms_to_samples(gap_ms, sample_rate);
            let total = segments.iter().map(Vec::len).sum::<usize>() + gap * rest.len();
            let mut out = Vec::with_capacity(total);
            out.extend_from_slice(first);
            for seg in rest {
                out.resize(out.len() + gap, 0.0);
                out.extend_from_slice(seg);
            }
            out
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Info
// ─────────────────────────────────────────────────────────────────────────────

/// Summary levels for a mono buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub duration_seconds: f32,
    pub sample_rate: u32,
    pub samples: usize,
    pub channels: u16,
    pub rms_level: f32,
    pub peak_level: f32,
    pub dynamic_range_db: f32,
    /// `None` for digital silence.
    pub estimated_loudness_lufs: Option<f32>,
}

/// `None` for empty input or a zero sample rate.
pub fn info(signal: &[f32], sample_rate: u32) -> Option<AudioInfo> {
    if signal.is_empty() || sample_rate == 0 {
        return None;
    }
    let rms = compute_rms(signal);
    let peak = compute_peak(signal);
    let audible = rms > 0.0;
    Some(AudioInfo {
        duration_seconds: signal.len() as f32 / sample_rate as f32,
        sample_rate,
        samples: signal.len(),
        channels: 1,
        rms_level: rms,
        peak_level: peak,
        dynamic_range_db: if audible { 20.0 * (peak / rms).log10() } else { 0.0 },
        estimated_loudness_lufs: audible.then(|| -23.0 + 20.0 * rms.log10()),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_normalize_hits_target_rms() {
        let s = sine(440.0, 16_000, 16_000, 0.1);
        let out = normalize(&s, -20.0);
        let target = 10f32.powf(-20.0 / 20.0);
        assert!((compute_rms(&out) - target).abs() < 1e-3);
    }

    #[test]
    fn test_normalize_prevents_clipping() {
        let s = sine(440.0, 16_000, 16_000, 0.1);
        let out = normalize(&s, DEFAULT_TARGET_DB);
        assert!(compute_peak(&out) <= 1.0 + 1e-6);
    }

    #[test]
    fn test_normalize_silence_and_empty() {
        assert_eq!(normalize(&[0.0; 10], -3.0), vec![0.0; 10]);
        assert!(normalize(&[], -3.0).is_empty());
    }

    #[test]
    fn test_fade_endpoints() {
        let out = apply_fade(&[1.0; 1000], 10, 10, 10_000);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[99], 1.0);
        assert_eq!(out[500], 1.0);
        assert_eq!(out[900], 1.0);
        assert_eq!(out[999], 0.0);
        assert!((out[50] - 50.0 / 99.0).abs() < 1e-6);
    }

    #[test]
    fn test_fade_longer_than_signal_is_skipped() {
        let out = apply_fade(&[1.0; 10], 50, 50, 16_000);
        assert_eq!(out, vec![1.0; 10]);
    }

    #[test]
    fn test_edge_fade() {
        let mut short = vec![1.0; 1000];
        edge_fade(&mut short);
        assert_eq!(short, vec![1.0; 1000]);

        let mut long = vec![1.0; 2000];
        edge_fade(&mut long);
        assert_eq!(long[0], 0.0);
        assert_eq!(long[1999], 0.0);
        assert_eq!(long[200], 1.0);
        assert_eq!(long[1000], 1.0);
    }

    #[test]
    fn test_reduce_noise_removes_dc() {
        let dc = vec![0.5f32; 16_000];
        let out = reduce_noise(&dc, 16_000, 1.0);
        assert_eq!(out.len(), dc.len());
        for &x in &out[4000..12_000] {
            assert!(x.abs() < 1e-3, "residual {x}");
        }
    }

    #[test]
    fn test_reduce_noise_keeps_speech_band() {
        let s = sine(1000.0, 16_000, 16_000, 0.5);
        let out = reduce_noise(&s, 16_000, 1.0);
        let ratio = compute_rms(&out[4000..12_000]) / compute_rms(&s[4000..12_000]);
        assert!((ratio - 1.0).abs() < 0.02, "ratio {ratio}");
    }

    #[test]
    fn test_reduce_noise_zero_strength() {
        let s = sine(50.0, 16_000, 1000, 0.5);
        assert_eq!(reduce_noise(&s, 16_000, 0.0), s);
        assert!(reduce_noise(&[], 16_000, 0.5).is_empty());
    }

    #[test]
    fn test_reduce_noise_short_input_unchanged() {
        assert_eq!(reduce_noise(&[0.3], 16_000, 0.5), vec![0.3]);
        let short = sine(50.0, 16_000, FILTFILT_PAD, 0.5);
        assert_eq!(reduce_noise(&short, 16_000, 1.0), short);
        assert_eq!(reduce_noise(&sine(50.0, 16_000, FILTFILT_PAD + 1, 0.5), 16_000, 1.0).len(), 16);
    }

    #[test]
    fn test_filtfilt_dc_has_no_edge_transient() {
        let sections = butterworth_high_pass(NOISE_CUTOFF_HZ, 16_000.0);
        let out = filtfilt(&sections, &vec![0.5f32; 2000]);
        for (i, &x) in out.iter().enumerate() {
            assert!(x.abs() < 1e-6, "sample {i}: {x}");
        }
    }

    #[test]
    fn test_concatenate() {
        assert!(concatenate(&[], 500, 16_000).is_empty());
        assert_eq!(concatenate(&[vec![1.0, 2.0]], 500, 16_000), vec![1.0, 2.0]);

        let out = concatenate(&[vec![1.0; 3], vec![2.0; 2], vec![3.0]], 1, 2000);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_info() {
        assert!(info(&[], 16_000).is_none());

        let s = vec![0.5f32, -0.5, 0.5, -0.5];
        let i = info(&s, 4).unwrap();
        assert_eq!(i.samples, 4);
        assert!((i.duration_seconds - 1.0).abs() < 1e-6);
        assert!((i.rms_level - 0.5).abs() < 1e-6);
        assert!((i.peak_level - 0.5).abs() < 1e-6);
        assert!(i.dynamic_range_db.abs() < 1e-4);
        assert!(i.estimated_loudness_lufs.is_some());

        let silent = info(&[0.0; 4], 4).unwrap();
        assert_eq!(silent.estimated_loudness_lufs, None);
    }
}
