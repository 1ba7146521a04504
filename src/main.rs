//! text2audio CLI
//!
//! Convert text to speech files, run batches, and query the spoken Q&A
//! knowledge base.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rustyline::{error::ReadlineError, DefaultEditor};
use text2audio::{
    audio::{io::load_audio, playback},
    model::known_models,
    qa::QaSession,
    ConverterConfig, TextProcessor, TextToAudioConverter, TtsModelManager,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "text2audio", about = "Text-to-audio conversion with pretrained TTS models", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for generated audio
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// HuggingFace model id
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Override a config value (repeatable), e.g. --set noise_reduction=true
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    overrides: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert text to an audio file
    Convert {
        /// Text to convert
        text: Option<String>,

        /// Read the text from a file instead
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Output file name (extension is ignored)
        #[arg(short, long)]
        name: Option<String>,

        /// Play the result
        #[arg(long)]
        play: bool,
    },

    /// Convert every non-empty line of a file
    Batch {
        /// Input text file, one text per line
        input: PathBuf,

        /// File name prefix
        #[arg(short, long, default_value = "batch")]
        prefix: String,

        /// Synthesise each line whole and post-process it as one segment
        #[arg(long)]
        segments: bool,
    },

    /// Question/answer knowledge base
    Qa {
        /// Q&A database file
        #[arg(long, default_value = "qa_database.json")]
        db: PathBuf,

        #[command(subcommand)]
        action: QaAction,
    },

    /// Show how text is cleaned and chunked
    Preprocess {
        text: Option<String>,

        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Maximum characters per chunk
        #[arg(long)]
        max_length: Option<usize>,
    },

    /// Show model, configuration and output directory
    Info,

    /// List known models
    Models,

    /// Play an audio file
    Play { path: PathBuf },
}

#[derive(Subcommand)]
enum QaAction {
    /// Answer a question with audio
    Ask {
        question: String,

        #[arg(long)]
        play: bool,
    },
    /// List stored questions
    List,
    /// Add a question/answer pair
    Add { question: String, answer: String },
    /// Convert every pair to audio
    Export,
    /// Interactive question loop
    Interactive {
        #[arg(long)]
        play: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.global)?;

    match cli.command {
        Commands::Convert { text, file, name, play } => {
            let text = read_text(text, file.as_deref())?;
            let converter = open_converter(config)?;
            let path = converter.convert_text(&text, name.as_deref())?;
            println!("Saved: {}", path.display());
            if play {
                play_or_warn(&converter, &path);
            }
        }

        Commands::Batch { input, prefix, segments } => {
            let contents = std::fs::read_to_string(&input)
                .with_context(|| format!("Cannot read {}", input.display()))?;
            let texts: Vec<&str> = contents.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            if texts.is_empty() {
                bail!("{} has no text lines", input.display());
            }

            let converter = open_converter(config)?;
            let paths = if segments {
                converter.convert_segments(&texts, &prefix)
            } else {
                converter.convert_batch(&texts, &prefix)
            };
            println!("Generated {}/{} files:", paths.len(), texts.len());
            for path in &paths {
                println!("  {}", path.display());
            }
        }

        Commands::Qa { db, action } => run_qa(config, db, action)?,

        Commands::Preprocess { text, file, max_length } => {
            let text = read_text(text, file.as_deref())?;
            let processor = TextProcessor::new(max_length.unwrap_or(config.max_text_length));
            processor.validate(&text)?;

            println!("Cleaned:\n  {}\n", processor.clean(&text));
            let chunks = processor.preprocess(&text);
            println!("Chunks ({}):", chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                println!("  {:>3}. [{} chars] {}", i + 1, chunk.chars().count(), chunk);
            }
            println!("\nStats:\n{}", serde_json::to_string_pretty(&processor.stats(&text))?);
            println!(
                "Estimated duration: {:.1} s",
                TtsModelManager::estimate_duration(&text)
            );
        }

        Commands::Info => {
            let converter = open_converter(config)?;
            println!("{}", serde_json::to_string_pretty(&converter.system_info())?);
            let outputs = converter.writer().list_outputs(converter.config().audio_format.extension())?;
            println!("Existing outputs ({}):", outputs.len());
            for path in &outputs {
                if let Some(name) = path.file_name() {
                    println!("  {}", name.to_string_lossy());
                }
            }
        }

        Commands::Models => {
            for spec in known_models() {
                let runnable = if spec.onnx_repo.is_some() { "onnx" } else { "not runnable" };
                let default = if spec.name == config.model_name { " (default)" } else { "" };
                println!("{:<36} {:<12} {:>6} Hz  {runnable}{default}", spec.name, spec.kind, spec.sample_rate);
            }
        }

        Commands::Play { path } => {
            let audio = load_audio(&path)?;
            let info = audio.info().with_context(|| format!("{} has no audio", path.display()))?;
            println!("Playing {}\n{}", path.display(), serde_json::to_string_pretty(&info)?);
            playback::play(&audio.samples, audio.sample_rate)?;
        }
    }

    Ok(())
}

fn build_config(global: &GlobalArgs) -> Result<ConverterConfig> {
    let mut config = match &global.config {
        Some(path) => ConverterConfig::from_file(path)
            .with_context(|| format!("Cannot load config {}", path.display()))?,
        None => ConverterConfig::default(),
    };
    if let Some(dir) = &global.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(model) = &global.model {
        config.model_name = model.clone();
    }
    for item in &global.overrides {
        let (key, value) = item
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{item}'"))?;
        config.set(key.trim(), value.trim())?;
    }
    Ok(config)
}

fn open_converter(config: ConverterConfig) -> Result<TextToAudioConverter> {
    let models = TtsModelManager::load(&config.model_name).context("Failed to load a TTS model")?;
    Ok(TextToAudioConverter::new(config, models)?)
}

fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => {
            std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
        }
        (None, None) => bail!("Provide TEXT or --file"),
    }
}

fn play_or_warn(converter: &TextToAudioConverter, path: &Path) {
    if let Err(e) = converter.play_file(path) {
        eprintln!("Playback skipped: {e}");
    }
}

fn run_qa(config: ConverterConfig, db: PathBuf, action: QaAction) -> Result<()> {
    // Listing and adding do not need a model.
    match &action {
        QaAction::List => {
            let kb = text2audio::qa::KnowledgeBase::load_or_default(&db);
            println!("{} questions:", kb.len());
            for (i, q) in kb.questions().enumerate() {
                println!("  {:>2}. {q}?", i + 1);
            }
            return Ok(());
        }
        QaAction::Add { question, answer } => {
            let mut kb = text2audio::qa::KnowledgeBase::load_or_default(&db);
            kb.add(question, answer);
            kb.save(&db)?;
            println!("Added. {} questions in {}", kb.len(), db.display());
            return Ok(());
        }
        _ => {}
    }

    let session = QaSession::open(open_converter(config)?, db);
    match action {
        QaAction::Ask { question, play } => {
            ask(&session, &question, play)?;
        }
        QaAction::Export => {
            let paths = session.convert_all();
            println!("Generated {}/{} files:", paths.len(), session.knowledge_base().len());
            for path in &paths {
                println!("  {}", path.display());
            }
        }
        QaAction::Interactive { play } => interactive(session, play)?,
        QaAction::List | QaAction::Add { .. } => {}
    }
    Ok(())
}

/// Returns `false` when no stored question matched.
fn ask(session: &QaSession, question: &str, play: bool) -> Result<bool> {
    let Some((path, answer)) = session.ask(question)? else {
        println!("No answer found. Try `list` to see known questions.");
        return Ok(false);
    };
    println!("Answer: {answer}");
    println!("Audio:  {}", path.display());
    if play {
        play_or_warn(session.converter(), &path);
    }
    Ok(true)
}

fn interactive(mut session: QaSession, play: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question, or: list, add, help, quit");

    loop {
        let line = match editor.readline("qa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        editor.add_history_entry(line)?;

        match line {
            "quit" | "exit" | "q" => break,
            "help" => println!("Commands: list, add, help, quit. Anything else is asked as a question."),
            "list" => {
                for (i, q) in session.knowledge_base().questions().enumerate() {
                    println!("  {:>2}. {q}?", i + 1);
                }
            }
            "add" => {
                let question = editor.readline("question> ")?;
                let answer = editor.readline("answer> ")?;
                if question.trim().is_empty() || answer.trim().is_empty() {
                    println!("Both a question and an answer are needed.");
                    continue;
                }
                session.add_pair(&question, &answer)?;
                println!("Added.");
            }
            question => match ask(&session, question, play) {
                Ok(true) => {}
                Ok(false) => {
                    let answer = editor.readline("Add an answer? (empty to skip) answer> ")?;
                    if !answer.trim().is_empty() {
                        session.add_pair(question, &answer)?;
                        println!("Added.");
                    }
                }
                Err(e) => eprintln!("Error: {e:#}"),
            },
        }
    }
    println!("Goodbye!");
    Ok(())
}
