//! Synth CLI - Command-line interface for Synheart Synth
//!
//! Commands:
//! - survey: List the importable record types found in a health export
//! - generate: Generate a synthetic sample batch for one type
//! - import: Survey an export, then generate and write samples for one of its types
//! - catalog: Print the importable type catalog

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_synth::pipeline::{ExportSource, ImportSession};
use synheart_synth::sink::{JsonSink, OutputFormat, SampleSink};
use synheart_synth::survey::{RecordTypeSurveyor, SurveyReport};
use synheart_synth::{
    SampleGenerator, SynthConfig, SynthError, TypeKind, PRODUCER_NAME, SYNTH_VERSION,
};

/// Synth - Health export surveying and synthetic sample generation
#[derive(Parser)]
#[command(name = "synth")]
#[command(author = "Synheart AI Inc")]
#[command(version = SYNTH_VERSION)]
#[command(about = "Survey health exports and generate synthetic samples", long_about = None)]
struct Cli {
    /// JSON configuration file (type catalog and generator settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. "info", "synheart_synth=debug"); defaults to RUST_LOG or "warn"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the importable record types found in a health export
    Survey {
        /// Export file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Also list record types that cannot be imported
        #[arg(long)]
        all: bool,

        /// Output the survey report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a synthetic sample batch for one type
    Generate {
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Survey an export, then generate and write samples for one of its types
    Import {
        /// Export file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Print the importable type catalog
    Catalog {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct GenerationArgs {
    /// Record type identifier (e.g. HKQuantityTypeIdentifierStepCount)
    #[arg(short = 't', long = "type")]
    record_type: String,

    /// Number of trailing days to generate (defaults to the configured window)
    #[arg(long)]
    days: Option<u32>,

    /// Anchor instant in RFC 3339 format (defaults to now)
    #[arg(long)]
    anchor: Option<String>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Output format
    #[arg(long, default_value = "ndjson")]
    output_format: CliOutputFormat,
}

#[derive(Clone, ValueEnum)]
enum CliOutputFormat {
    /// Newline-delimited JSON (one sample per line)
    Ndjson,
    /// The batch as one JSON object
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Ndjson => OutputFormat::Ndjson,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<(), SynthCliError> {
    let config = match &cli.config {
        Some(path) => SynthConfig::load(path)?,
        None => SynthConfig::default(),
    };

    match cli.command {
        Commands::Survey { input, all, json } => cmd_survey(&config, &input, all, json),
        Commands::Generate { generation } => cmd_generate(config, generation),
        Commands::Import { input, generation } => cmd_import(config, &input, generation),
        Commands::Catalog { json } => cmd_catalog(&config, json),
    }
}

fn cmd_survey(
    config: &SynthConfig,
    input: &Path,
    all: bool,
    json: bool,
) -> Result<(), SynthCliError> {
    let surveyor = RecordTypeSurveyor::new(config.catalog()?);

    let report = if is_stdio(input) {
        surveyor.report_bytes(&read_stdin()?)?
    } else {
        surveyor.report_file(input)?
    };

    if json || !atty::is(atty::Stream::Stdout) {
        let report = if all {
            report
        } else {
            SurveyReport {
                unsupported: Vec::new(),
                ..report
            }
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Survey Report");
    println!("=============");
    println!("Records scanned:  {}", report.record_count);
    println!("Importable types: {}", report.importable.len());

    for name in &report.importable {
        let label = surveyor.catalog().label(name.as_str()).unwrap_or("");
        println!("  - {} ({})", name, label);
    }

    if all && !report.unsupported.is_empty() {
        println!("\nNot importable:");
        for name in &report.unsupported {
            println!("  - {}", name);
        }
    }

    Ok(())
}

fn cmd_generate(mut config: SynthConfig, args: GenerationArgs) -> Result<(), SynthCliError> {
    if let Some(days) = args.days {
        config.generator.window_days = days;
    }
    let anchor = parse_anchor(args.anchor.as_deref())?;
    let catalog = config.catalog()?;

    let batch = match args.seed {
        Some(seed) => SampleGenerator::with_seed(catalog, config.generator.clone(), seed)?
            .generate_default(&args.record_type, anchor)?,
        None => SampleGenerator::new(catalog, config.generator.clone())?
            .generate_default(&args.record_type, anchor)?,
    };

    let mut sink = JsonSink::new(open_output(&args.output)?, args.output_format.into());
    let ack = sink.submit(batch).map_err(SynthError::from)?;

    if !is_stdio(&args.output) {
        println!(
            "Wrote {} samples of {} to {}",
            ack.accepted,
            args.record_type,
            args.output.display()
        );
    }

    Ok(())
}

fn cmd_import(
    mut config: SynthConfig,
    input: &Path,
    args: GenerationArgs,
) -> Result<(), SynthCliError> {
    if let Some(days) = args.days {
        config.generator.window_days = days;
    }
    let anchor = parse_anchor(args.anchor.as_deref())?;

    let mut session = match args.seed {
        Some(seed) => ImportSession::with_seed(&config, seed)?,
        None => ImportSession::new(&config)?,
    };

    let source = if is_stdio(input) {
        ExportSource::Bytes(read_stdin()?)
    } else {
        ExportSource::File(input.to_path_buf())
    };
    session.select_file(source);

    if session.survey()?.is_empty() {
        return Err(SynthCliError::NoImportableTypes);
    }
    session.select_type(&args.record_type)?;
    session.generate(anchor)?;

    let mut sink = JsonSink::new(open_output(&args.output)?, args.output_format.into());
    let ack = session.submit(&mut sink)?;

    if !is_stdio(&args.output) {
        let label = session
            .catalog()
            .label(&args.record_type)
            .unwrap_or(&args.record_type);
        println!(
            "Imported {} samples of {} (batch {}) into {}",
            ack.accepted,
            label,
            ack.batch_id,
            args.output.display()
        );
    }

    Ok(())
}

fn cmd_catalog(config: &SynthConfig, json: bool) -> Result<(), SynthCliError> {
    let catalog = config.catalog()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog.to_types())?);
        return Ok(());
    }

    println!("{} {} importable types", PRODUCER_NAME, SYNTH_VERSION);
    println!();
    for importable in catalog.iter() {
        let domain = match &importable.kind {
            TypeKind::Quantity { unit } => format!("quantity, {}", unit.as_str()),
            TypeKind::Category { codes, span_minutes } => {
                format!("category, {} codes, {} min span", codes.len(), span_minutes)
            }
        };
        println!("  {:<50} {:<28} {}", importable.identifier, importable.label, domain);
    }

    Ok(())
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_stdin() -> Result<Vec<u8>, SynthCliError> {
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn open_output(path: &Path) -> Result<Box<dyn Write>, SynthCliError> {
    if is_stdio(path) {
        Ok(Box::new(io::stdout().lock()))
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

fn parse_anchor(anchor: Option<&str>) -> Result<DateTime<Utc>, SynthCliError> {
    match anchor {
        None => Ok(Utc::now()),
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SynthCliError::InvalidAnchor(format!("{}: {}", text, e))),
    }
}

// Error types

#[derive(Debug)]
enum SynthCliError {
    Io(io::Error),
    Synth(SynthError),
    Json(serde_json::Error),
    InvalidAnchor(String),
    NoImportableTypes,
}

impl From<io::Error> for SynthCliError {
    fn from(e: io::Error) -> Self {
        SynthCliError::Io(e)
    }
}

impl From<SynthError> for SynthCliError {
    fn from(e: SynthError) -> Self {
        SynthCliError::Synth(e)
    }
}

impl From<serde_json::Error> for SynthCliError {
    fn from(e: serde_json::Error) -> Self {
        SynthCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<SynthCliError> for CliError {
    fn from(e: SynthCliError) -> Self {
        match e {
            SynthCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            SynthCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax")
            }
            SynthCliError::InvalidAnchor(msg) => CliError::new(
                "INVALID_ANCHOR",
                msg,
                "Use RFC 3339, e.g. 2024-01-15T08:00:00Z",
            ),
            SynthCliError::NoImportableTypes => CliError::new(
                "NO_IMPORTABLE_TYPES",
                "The export contains no importable record types".to_string(),
                "Run 'synth survey --all' to see which types it contains",
            ),
            SynthCliError::Synth(e) => {
                let message = e.to_string();
                match e {
                    SynthError::InputError(_) => CliError::new(
                        "INPUT_ERROR",
                        message,
                        "Ensure the export file exists and is not empty",
                    ),
                    SynthError::ParseError(_) => CliError::new(
                        "PARSE_ERROR",
                        message,
                        "Ensure input is a well-formed Apple Health export.xml",
                    ),
                    SynthError::UnsupportedType(_) => CliError::new(
                        "UNSUPPORTED_TYPE",
                        message,
                        "Run 'synth catalog' to list importable types",
                    ),
                    SynthError::InvalidWindow(_) => CliError::new(
                        "INVALID_WINDOW",
                        message,
                        "Pass --days with a positive value",
                    ),
                    SynthError::InvalidConfig(_) | SynthError::JsonError(_) => {
                        CliError::new("CONFIG_ERROR", message, "Check the --config file")
                    }
                    SynthError::InvalidTransition { .. } => {
                        CliError::new("SESSION_ERROR", message, "Retry the import from the start")
                    }
                    SynthError::Sink(_) => {
                        CliError::new("SINK_ERROR", message, "Check the output destination")
                    }
                }
            }
        }
    }
}
