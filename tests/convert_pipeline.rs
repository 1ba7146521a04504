//! End-to-end conversion and Q&A without network access, using a sine
//! generator in place of the ONNX model.

use std::path::Path;

use text2audio::{
    audio::{dsp, io::load_audio},
    qa::QaSession,
    ConverterConfig, Error, Result, SpeechModel, TextToAudioConverter, TtsModelManager,
};

const RATE: u32 = 16_000;

/// 20 ms of 220 Hz tone per character.
struct Sine;

impl SpeechModel for Sine {
    fn name(&self) -> &str {
        "test/sine"
    }

    fn sample_rate(&self) -> u32 {
        RATE
    }

    fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
        let n = text.chars().count() * (RATE as usize / 50);
        Ok((0..n)
            .map(|i| 0.2 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / RATE as f32).sin())
            .collect())
    }
}

fn converter(dir: &Path, tweak: impl FnOnce(&mut ConverterConfig)) -> TextToAudioConverter {
    let mut config = ConverterConfig { output_dir: dir.to_path_buf(), ..Default::default() };
    tweak(&mut config);
    TextToAudioConverter::new(config, TtsModelManager::from_model(Box::new(Sine))).unwrap()
}

#[test]
fn converts_long_text_into_one_normalized_file() {
    let dir = tempfile::tempdir().unwrap();
    let c = converter(dir.path(), |cfg| cfg.max_text_length = 40);

    let text = "Dr. Smith has 3 cats & 2 dogs. They live in a small house. \
                Every morning they wait by the door! Do they ever sleep?";
    let path = c.convert_text(text, Some("story.wav")).unwrap();
    assert_eq!(path, dir.path().join("story.wav"));

    let audio = load_audio(&path).unwrap();
    assert_eq!(audio.sample_rate, RATE);

    let chunks = c.processor().preprocess_for_tts(text, 40);
    assert!(chunks.len() > 1);
    let chars: usize = chunks.iter().map(|c| c.chars().count()).sum();
    let gaps = (chunks.len() - 1) * (RATE as usize / 2);
    assert_eq!(audio.len(), chars * (RATE as usize / 50) + gaps);

    // -3 dB RMS target, within 16-bit quantisation
    let target = 10f32.powf(-3.0 / 20.0);
    let peak = dsp::compute_peak(&audio.samples);
    assert!(peak <= 1.0);
    let rms = dsp::compute_rms(&audio.samples);
    assert!(rms <= target + 0.01, "rms {rms}");
    assert_eq!(audio.samples[0], 0.0);
}

#[test]
fn keeps_first_segment_when_not_concatenating() {
    let dir = tempfile::tempdir().unwrap();
    let c = converter(dir.path(), |cfg| {
        cfg.max_text_length = 20;
        cfg.concatenate_segments = false;
        cfg.normalize_audio = false;
    });

    let path = c.convert_text("First part here. Second part here.", Some("first")).unwrap();
    let audio = load_audio(&path).unwrap();
    assert_eq!(audio.len(), "first part here.".len() * (RATE as usize / 50));
}

#[test]
fn non_wav_output_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = converter(dir.path(), |_| {});
    c.update_config("audio_format", "mp3").unwrap();
    assert!(matches!(
        c.convert_text("This will not be saved.", None),
        Err(Error::UnsupportedFormat(_))
    ));
}

#[test]
fn noise_reduction_keeps_length() {
    let dir = tempfile::tempdir().unwrap();
    let c = converter(dir.path(), |cfg| cfg.noise_reduction = true);
    let path = c.convert_text("Filter this sentence.", Some("filtered")).unwrap();
    let audio = load_audio(&path).unwrap();
    assert_eq!(audio.len(), "filter this sentence.".len() * (RATE as usize / 50));
}

#[test]
fn qa_session_answers_adds_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("qa.json");
    let mut session = QaSession::open(converter(&dir.path().join("audio"), |_| {}), &db);
    assert_eq!(session.knowledge_base().len(), 8);

    let (path, answer) = session.ask("What is machine learning?").unwrap().unwrap();
    assert!(answer.starts_with("Machine learning"));
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("qa_answer_"));
    assert!(path.exists());

    assert!(session.ask("zzz qqq").unwrap().is_none());

    session.add_pair("Who wrote this?", "A small test.").unwrap();
    assert!(db.exists());
    assert_eq!(session.knowledge_base().find_answer("who wrote this"), Some("A small test."));

    let paths = session.convert_all();
    assert_eq!(paths.len(), 9);
    assert_eq!(paths[0].file_name().unwrap(), "qa_batch_001.wav");
}
