//! # text2audio
//!
//! Turn text into speech files with pretrained
//! [MMS-TTS / VITS](https://huggingface.co/facebook/mms-tts-eng) models
//! exported to ONNX.
//!
//! ## Quick start
//!
//! ```no_run
//! use text2audio::{ConverterConfig, TextToAudioConverter, TtsModelManager};
//!
//! // Download the model from HuggingFace (cached after first run)
//! let config = ConverterConfig::default();
//! let models = TtsModelManager::load(&config.model_name).unwrap();
//!
//! // Clean, chunk, synthesise, post-process and save as WAV
//! let converter = TextToAudioConverter::new(config, models).unwrap();
//! let path = converter.convert_text("Hello from Rust!", Some("hello")).unwrap();
//! println!("{}", path.display());
//! ```
//!
//! ## Q&A
//!
//! [`qa::QaSession`] keeps a small JSON question → answer database and
//! speaks the best match for a question:
//!
//! ```no_run
//! use text2audio::{qa::QaSession, ConverterConfig, TextToAudioConverter, TtsModelManager};
//!
//! let models = TtsModelManager::load(text2audio::DEFAULT_MODEL).unwrap();
//! let converter = TextToAudioConverter::new(ConverterConfig::default(), models).unwrap();
//! let session = QaSession::open(converter, "qa_database.json");
//! if let Some((path, answer)) = session.ask("What is deep learning?").unwrap() {
//!     println!("{answer}\n→ {}", path.display());
//! }
//! ```
//!
//! ## Pipeline
//! 1. **Text cleaning**: abbreviations, small numbers and symbols → words.
//! 2. **Chunking**: sentences packed greedily into ≤ 500-char chunks.
//! 3. **Tokenisation**: characters mapped through the model's `vocab.json`,
//!    blanks interleaved.
//! 4. **ONNX inference**: the VITS graph takes `input_ids`, outputs audio.
//! 5. **Edge fade**: short fade at both ends of every chunk.
//! 6. **Concat**: chunks joined with 500 ms of silence.
//! 7. **Post-processing**: optional 80 Hz high-pass, 50 ms fades, RMS
//!    normalisation to −3 dB, 16-bit PCM WAV.
//!
//! ## Features
//! | Feature    | Default | Adds                                         |
//! |------------|---------|----------------------------------------------|
//! | `cli`      | yes     | the `text2audio` binary                      |
//! | `playback` | no      | playback through the default output device   |

pub mod audio;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod qa;
pub mod text;
pub mod tokenize;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use audio::{AudioBuffer, AudioFormat, AudioWriter};
pub use config::ConverterConfig;
pub use convert::TextToAudioConverter;
pub use error::{Error, Result};
pub use model::{SpeechModel, TtsModelManager, DEFAULT_MODEL};
pub use text::TextProcessor;
