// Command-line front end: photos in, vocabulary tables and a flashcard deck out.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use photo_vocab::backends::ollama::{self, OllamaBackend, OllamaConfig};
use photo_vocab::backends::openai::{self, OpenAiBackend, OpenAiConfig};
use photo_vocab::deck::{DEFAULT_DECK_NAME, DeckExporter};
use photo_vocab::export::{Exporter, create_run_dir, read_inputs};
use photo_vocab::heic::HeifConvert;
use photo_vocab::images::{discover_images, prepare_photos};
use photo_vocab::metadata::{ExifToolReader, MetadataReader, NoMetadata};
use photo_vocab::ocr::{TesseractConfig, TesseractOcr};
use photo_vocab::prompt::DEFAULT_LANGUAGE_LEVEL;
use photo_vocab::pipeline::build_with_opts;
use photo_vocab::retry::RetryPolicy;
use photo_vocab::{
    DEFAULT_MARKER, Opts, OutputType, PhotoInput, QualityCutoff, VisionBackend, VocabPipeline,
    init_logging,
};

#[derive(Parser, Debug)]
#[command(name = "photo-vocab")]
#[command(about = "Build German vocabulary tables and flashcards from photos", long_about = None)]
struct Params {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// OCR and query every photo in a directory, then export tables and a deck.
    Run(RunArgs),

    /// Rebuild tables and the deck from a saved `inputs.jsonl` without querying a model.
    Rebuild(RebuildArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    Ollama,
    Openai,
}

/// Flags shared by every command that exports tables.
#[derive(Args, Debug)]
struct ExportArgs {
    /// Directory that receives the timestamped run folder.
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Minimum photo quality that contributes vocabulary: `high`, `medium`, anything else
    /// keeps every photo.
    #[arg(
        short = 'q',
        long = "quality-cutoff",
        default_value = "medium",
        value_parser = QualityCutoff::from_str
    )]
    quality_cutoff: QualityCutoff,

    /// Literal the model writes before its JSON answer.
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    #[arg(
        short = 't',
        long = "output-type",
        value_enum,
        default_value_t = OutputType::Csv
    )]
    output_type: OutputType,

    /// Drop repeated word/translation pairs from the deck.
    #[arg(long, default_value_t = false)]
    dedupe: bool,

    #[arg(long = "deck-name", default_value = DEFAULT_DECK_NAME)]
    deck_name: String,
}

impl ExportArgs {
    fn opts(&self) -> Opts {
        Opts {
            marker: self.marker.clone(),
            quality_cutoff: self.quality_cutoff,
            output_type: self.output_type,
            dedupe: self.dedupe,
            ..Opts::default()
        }
    }

    fn deck(&self) -> DeckExporter {
        DeckExporter {
            deck_name: self.deck_name.clone(),
            ..DeckExporter::default()
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory holding the photos (jpg, jpeg, png, heic). HEIC photos are converted into
    /// its `jpg/` subdirectory.
    #[arg(short = 'i', long = "input-dir")]
    input_dir: PathBuf,

    #[command(flatten)]
    export: ExportArgs,

    #[arg(short = 'b', long, value_enum, default_value_t = BackendKind::Ollama)]
    backend: BackendKind,

    /// Model name; each backend has its own default.
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Base URL of the backend API; each backend has its own default.
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// CEFR level the prompt targets.
    #[arg(short = 'l', long = "language-level", default_value = DEFAULT_LANGUAGE_LEVEL)]
    language_level: String,

    #[arg(long = "tessdata-dir")]
    tessdata_dir: Option<PathBuf>,

    #[arg(long = "ocr-language", default_value = "deu")]
    ocr_language: String,

    /// Pause between photos, in seconds.
    #[arg(long = "wait-secs", default_value_t = 1.0)]
    wait_secs: f64,

    /// Attempts per photo while the backend reports no capacity.
    #[arg(long = "max-attempts", default_value_t = 10)]
    max_attempts: u32,

    /// Skip EXIF extraction (no exiftool needed).
    #[arg(long = "no-exif", default_value_t = false)]
    no_exif: bool,

    /// Process at most this many photos.
    #[arg(long)]
    limit: Option<usize>,
}

impl RunArgs {
    fn opts(&self) -> Opts {
        Opts {
            language_level: self.language_level.clone(),
            wait_between_photos: Duration::from_secs_f64(self.wait_secs),
            ..self.export.opts()
        }
    }
}

#[derive(Args, Debug)]
struct RebuildArgs {
    /// `inputs.jsonl` written by an earlier run.
    #[arg(long)]
    inputs: PathBuf,

    #[command(flatten)]
    export: ExportArgs,
}

fn main() -> Result<()> {
    init_logging();
    let params = Params::parse();

    match params.command {
        Command::Run(args) => run(args),
        Command::Rebuild(args) => rebuild(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    if args.wait_secs < 0.0 || !args.wait_secs.is_finite() {
        bail!("--wait-secs must be a non-negative number");
    }
    if args.max_attempts == 0 {
        bail!("--max-attempts must be at least 1");
    }

    let mut images = discover_images(&args.input_dir)
        .with_context(|| format!("failed to list photos in {}", args.input_dir.display()))?;
    if let Some(limit) = args.limit {
        images.truncate(limit);
    }
    if images.is_empty() {
        bail!("no supported photos found in {}", args.input_dir.display());
    }
    let photos = prepare_photos(&images, &HeifConvert::default())
        .context("failed to convert HEIC photos")?;

    let opts = args.opts();
    let backend = build_backend(&args)?;
    let ocr = TesseractOcr::new(TesseractConfig {
        language: args.ocr_language.clone(),
        tessdata_dir: args.tessdata_dir.clone(),
        ..TesseractConfig::default()
    });
    let metadata: Box<dyn MetadataReader> = if args.no_exif {
        Box::new(NoMetadata)
    } else {
        Box::new(ExifToolReader::new())
    };

    let pipeline = VocabPipeline::new(ocr, backend, metadata, opts);

    let pb = ProgressBar::new(photos.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {pos}/{len} {bar:40.cyan/blue} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let collected = pipeline.collect(&photos, |i, path| {
        pb.set_position(i as u64);
        pb.set_message(display_name(path));
    });
    pb.finish_and_clear();
    let inputs = collected?;

    let output_root = args
        .export
        .output_dir
        .clone()
        .unwrap_or_else(|| args.input_dir.clone());
    export_all(&inputs, pipeline.opts(), &args.export.deck(), &output_root, true)
}

fn rebuild(args: RebuildArgs) -> Result<()> {
    let inputs = read_inputs(&args.inputs)
        .with_context(|| format!("failed to read {}", args.inputs.display()))?;
    info!(photos = inputs.len(), path = %args.inputs.display(), "loaded saved inputs");

    // Default to the root the saved run was written under: <root>/results/<stamp>/inputs.jsonl.
    let output_root = match &args.export.output_dir {
        Some(dir) => dir.clone(),
        None => args
            .inputs
            .ancestors()
            .nth(3)
            .filter(|root| !root.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    export_all(
        &inputs,
        &args.export.opts(),
        &args.export.deck(),
        &output_root,
        false,
    )
}

/// Build every table from `inputs` and write them into a fresh run directory.
fn export_all(
    inputs: &[PhotoInput],
    opts: &Opts,
    deck: &DeckExporter,
    output_root: &Path,
    save_inputs: bool,
) -> Result<()> {
    let run_dir = create_run_dir(output_root)
        .with_context(|| format!("failed to create run dir under {}", output_root.display()))?;
    let exporter = Exporter::for_opts(&run_dir, opts);

    if save_inputs {
        exporter.write_inputs(inputs)?;
    }

    let tables = build_with_opts(inputs, opts);
    let summary = exporter.write_tables(&tables, deck, opts)?;

    println!(
        "✅ {} photos, {} vocabulary rows, {} cards",
        summary.photos, summary.vocab_rows, summary.cards
    );
    println!("    tables: {}", run_dir.display());
    println!("    deck:   {}", summary.deck_path.display());
    Ok(())
}

fn build_backend(args: &RunArgs) -> Result<Box<dyn VisionBackend>> {
    let retry = RetryPolicy {
        max_attempts: args.max_attempts,
        ..RetryPolicy::default()
    };

    match args.backend {
        BackendKind::Ollama => {
            let config = OllamaConfig {
                endpoint: args
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| ollama::DEFAULT_ENDPOINT.to_owned()),
                model: args
                    .model
                    .clone()
                    .unwrap_or_else(|| ollama::DEFAULT_MODEL.to_owned()),
                retry,
                ..OllamaConfig::default()
            };
            Ok(Box::new(
                OllamaBackend::new(config).context("failed to build ollama client")?,
            ))
        }
        BackendKind::Openai => {
            let key = args
                .openai_api_key
                .clone()
                .context("--openai-api-key (or OPENAI_API_KEY) is required for --backend openai")?;
            let mut config = OpenAiConfig::new(key);
            config.endpoint = args
                .endpoint
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_ENDPOINT.to_owned());
            config.model = args
                .model
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_owned());
            config.retry = retry;
            Ok(Box::new(
                OpenAiBackend::new(config).context("failed to build openai client")?,
            ))
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
