//! The end-to-end text → audio file pipeline.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    audio::{
        dsp,
        io::{self, load_audio, post_process},
        playback, resample, AudioBuffer, AudioWriter, ProcessingOptions,
    },
    config::ConverterConfig,
    model::{ModelInfo, TtsModelManager},
    text::TextProcessor,
    Error, Result,
};

/// Snapshot of the converter for `info` output.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub model_name: String,
    pub output_dir: PathBuf,
    pub playback_available: bool,
    pub config: ConverterConfig,
    pub model_info: ModelInfo,
}

/// Cleans and chunks text, synthesises each chunk, post-processes the
/// result and writes it under the configured output directory.
#[derive(Debug)]
pub struct TextToAudioConverter {
    config: ConverterConfig,
    processor: TextProcessor,
    models: TtsModelManager,
    writer: AudioWriter,
}

impl TextToAudioConverter {
    pub fn new(config: ConverterConfig, models: TtsModelManager) -> Result<Self> {
        let writer = AudioWriter::new(&config.output_dir)?;
        let processor = TextProcessor::new(config.max_text_length);
        info!(model = models.model_name(), output_dir = %config.output_dir.display(), "Converter ready");
        Ok(Self { config, processor, models, writer })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn models(&self) -> &TtsModelManager {
        &self.models
    }

    pub fn processor(&self) -> &TextProcessor {
        &self.processor
    }

    pub fn writer(&self) -> &AudioWriter {
        &self.writer
    }

    fn options(&self) -> ProcessingOptions {
        ProcessingOptions {
            normalize: self.config.normalize_audio,
            apply_fade: self.config.apply_fade,
            noise_reduction: self.config.noise_reduction,
            format: self.config.audio_format,
        }
    }

    /// Convert `text` into one audio file and return its path.
    ///
    /// Without `output_name` the file is called
    /// `tts_output_{words}words_{timestamp}`.
    pub fn convert_text(&self, text: &str, output_name: Option<&str>) -> Result<PathBuf> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        self.processor.validate(text)?;

        info!("Preprocessing text...");
        let chunks = self.processor.preprocess_for_tts(text, self.config.max_text_length);
        if chunks.is_empty() {
            return Err(Error::NoChunks);
        }
        info!("Text split into {} chunks", chunks.len());

        let mut segments = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            info!("Generating audio for chunk {}/{}", i + 1, chunks.len());
            match self.models.synthesize_speech(chunk) {
                Ok(audio) if !audio.is_empty() => segments.push(audio),
                Ok(_) => warn!("Chunk {} produced no audio", i + 1),
                Err(e) => error!("Failed to generate audio for chunk {}: {e}", i + 1),
            }
        }
        if segments.is_empty() {
            return Err(Error::NoAudio);
        }

        let sample_rate = self.models.sample_rate();
        let audio = if segments.len() > 1 && self.config.concatenate_segments {
            dsp::concatenate(&segments, self.config.segment_gap_ms, sample_rate)
        } else {
            segments.swap_remove(0)
        };

        let audio = post_process(&audio, sample_rate, self.config.noise_reduction, self.config.apply_fade);
        let audio = self.to_output_rate(AudioBuffer::new(audio, sample_rate))?;

        let filename = match output_name {
            Some(name) => name.to_string(),
            None => format!(
                "tts_output_{}words_{}",
                text.split_whitespace().count(),
                io::timestamp()
            ),
        };

        let path = self.writer.save(
            &audio.samples,
            &filename,
            audio.sample_rate,
            self.config.audio_format,
            self.config.normalize_audio,
        )?;
        info!(path = %path.display(), duration = audio.duration(), "Conversion complete");
        Ok(path)
    }

    fn to_output_rate(&self, audio: AudioBuffer) -> Result<AudioBuffer> {
        match self.config.output_sample_rate {
            Some(rate) if rate != audio.sample_rate => resample::resample(&audio, rate),
            _ => Ok(audio),
        }
    }

    /// Convert each text to `{prefix}_{NNN}` (1-based). Failures are logged
    /// and skipped.
    pub fn convert_batch<S: AsRef<str>>(&self, texts: &[S], prefix: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            info!("Processing batch item {}/{}", i + 1, texts.len());
            let name = format!("{prefix}_{:03}", i + 1);
            match self.convert_text(text.as_ref(), Some(&name)) {
                Ok(path) => paths.push(path),
                Err(e) => error!("Batch item {} failed: {e}", i + 1),
            }
        }
        info!("Batch complete: {}/{} files", paths.len(), texts.len());
        paths
    }

    /// Synthesise each text whole, without chunking, and save one
    /// post-processed file per text through [`AudioWriter::batch_process`].
    pub fn convert_segments<S: AsRef<str>>(&self, texts: &[S], prefix: &str) -> Vec<PathBuf> {
        let segments: Vec<Vec<f32>> = self
            .models
            .batch_synthesize(texts)
            .into_iter()
            .enumerate()
            .filter_map(|(i, result)| {
                result.inspect_err(|e| error!("Segment {} failed: {e}", i + 1)).ok()
            })
            .collect();
        self.writer.batch_process(&segments, self.models.sample_rate(), prefix, &self.options())
    }

    /// Convert question/answer pairs, one file each, named `qa_{NNN}`.
    pub fn convert_qa_pairs<Q, A>(&self, pairs: &[(Q, A)], include_questions: bool) -> Vec<PathBuf>
    where
        Q: AsRef<str>,
        A: AsRef<str>,
    {
        let texts: Vec<String> = pairs
            .iter()
            .map(|(q, a)| qa_text(q.as_ref(), a.as_ref(), include_questions))
            .collect();
        self.convert_batch(&texts, "qa")
    }

    /// Load an audio file and play it on the default output device.
    pub fn play_file(&self, path: &Path) -> Result<()> {
        let audio = load_audio(path)?;
        playback::play(&audio.samples, audio.sample_rate)
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            model_name: self.models.model_name().to_string(),
            output_dir: self.writer.output_dir().to_path_buf(),
            playback_available: playback::is_available(),
            config: self.config.clone(),
            model_info: self.models.model_info(),
        }
    }

    /// Change one setting by name. `output_dir` and `max_text_length` take
    /// effect immediately.
    pub fn update_config(&mut self, key: &str, value: &str) -> Result<()> {
        let mut config = self.config.clone();
        config.set(key, value)?;
        if config.output_dir != self.config.output_dir {
            self.writer = AudioWriter::new(&config.output_dir)?;
        }
        self.processor = TextProcessor::new(config.max_text_length);
        self.config = config;
        Ok(())
    }

    /// Load a different model. The current one is kept on failure.
    pub fn switch_model(&mut self, name: &str) -> Result<()> {
        self.models.switch_model(name)?;
        self.config.model_name = name.to_string();
        Ok(())
    }
}

/// Text spoken for one pair. A blank question is left out even when
/// questions are included.
fn qa_text(question: &str, answer: &str, include_question: bool) -> String {
    let question = question.trim();
    if include_question && !question.is_empty() {
        format!("Question: {question}. Answer: {answer}")
    } else {
        answer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpeechModel;

    /// 100 samples per input character, or nothing for texts containing "mute".
    struct Ramp;

    impl SpeechModel for Ramp {
        fn name(&self) -> &str {
            "test/ramp"
        }
        fn sample_rate(&self) -> u32 {
            8_000
        }
        fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("mute") {
                return Ok(Vec::new());
            }
            Ok((0..text.len() * 100).map(|i| ((i % 50) as f32 / 50.0) - 0.5).collect())
        }
    }

    fn converter(dir: &Path) -> TextToAudioConverter {
        let config = ConverterConfig { output_dir: dir.to_path_buf(), ..Default::default() };
        TextToAudioConverter::new(config, TtsModelManager::from_model(Box::new(Ramp))).unwrap()
    }

    #[test]
    fn test_convert_text_named() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = converter(dir.path());
        c.update_config("max_text_length", "20").unwrap();
        let path = c.convert_text("Hello there. How are you?", Some("greeting")).unwrap();
        assert_eq!(path, dir.path().join("greeting.wav"));

        let audio = load_audio(&path).unwrap();
        assert_eq!(audio.sample_rate, 8_000);
        // two 12-character chunks plus the 500 ms gap
        assert_eq!(audio.len(), 1_200 + 4_000 + 1_200);
    }

    #[test]
    fn test_convert_text_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = converter(dir.path()).convert_text("Three little words.", None).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("tts_output_3words_"), "got {name}");
    }

    #[test]
    fn test_convert_text_errors() {
        let dir = tempfile::tempdir().unwrap();
        let c = converter(dir.path());
        assert!(matches!(c.convert_text("   ", None), Err(Error::EmptyText)));
        assert!(matches!(c.convert_text("hi", None), Err(Error::InvalidText(_))));
        assert!(matches!(c.convert_text("mute mute mute.", None), Err(Error::NoAudio)));
    }

    #[test]
    fn test_output_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = converter(dir.path());
        c.update_config("output_sample_rate", "16000").unwrap();
        let path = c.convert_text("Resample this please.", Some("up")).unwrap();
        assert_eq!(load_audio(&path).unwrap().sample_rate, 16_000);
    }

    #[test]
    fn test_batch_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let c = converter(dir.path());
        let paths = c.convert_batch(&["First text here.", "", "Third text here."], "item");
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].file_name().unwrap(), "item_001.wav");
        assert_eq!(paths[1].file_name().unwrap(), "item_003.wav");
    }

    #[test]
    fn test_convert_segments() {
        let dir = tempfile::tempdir().unwrap();
        let paths = converter(dir.path()).convert_segments(&["one line", " ", "two line"], "seg");
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_qa_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = [("what is rust", "A systems language.")];
        let paths = converter(dir.path()).convert_qa_pairs(&pairs, true);
        assert_eq!(paths[0].file_name().unwrap(), "qa_001.wav");
    }

    #[test]
    fn test_qa_text_skips_blank_question() {
        assert_eq!(qa_text("what is rust", "A language.", true), "Question: what is rust. Answer: A language.");
        assert_eq!(qa_text("what is rust", "A language.", false), "A language.");
        assert_eq!(qa_text("", "A language.", true), "A language.");
        assert_eq!(qa_text("   ", "A language.", true), "A language.");
    }

    #[test]
    fn test_qa_pairs_blank_question_speaks_answer_only() {
        let dir = tempfile::tempdir().unwrap();
        let answer = "Only the answer is spoken.";
        let blank = converter(&dir.path().join("blank")).convert_qa_pairs(&[(" ", answer)], true);
        let plain = converter(&dir.path().join("plain")).convert_qa_pairs(&[("ignored", answer)], false);
        assert_eq!(blank.len(), 1);
        assert_eq!(load_audio(&blank[0]).unwrap().len(), load_audio(&plain[0]).unwrap().len());
    }

    #[test]
    fn test_switch_model_failure_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = converter(dir.path());
        assert!(matches!(c.switch_model("microsoft/speecht5_tts"), Err(Error::Unsupported(_))));
        assert_eq!(c.models().model_name(), "test/ramp");
        assert_eq!(c.config().model_name, crate::DEFAULT_MODEL);
        assert_eq!(c.system_info().model_info.sample_rate, 8_000);

        // still converts with the old model
        assert!(c.convert_text("Still speaking fine.", Some("after")).is_ok());
    }

    #[test]
    fn test_update_config_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = converter(dir.path());
        let sub = dir.path().join("nested");
        c.update_config("output_dir", sub.to_str().unwrap()).unwrap();
        assert!(sub.is_dir());
        assert_eq!(c.system_info().output_dir, sub);
        assert!(matches!(c.update_config("nope", "1"), Err(Error::UnknownConfigKey(_))));
    }

    #[test]
    fn test_system_info() {
        let dir = tempfile::tempdir().unwrap();
        let info = converter(dir.path()).system_info();
        assert_eq!(info.model_name, "test/ramp");
        assert_eq!(info.model_info.model_type, "unknown");
        assert_eq!(info.model_info.sample_rate, 8_000);
    }
}
