//! BLF Converter CLI Application
//!
//! Command-line front end for the blf-convert library. It converts one or
//! more BLF log files into MF4 containers, optionally with per-signal CSV
//! exports, and reports the artifact map per input file.

use anyhow::{bail, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

use blf_convert::{BlfConverter, ConvertConfig, ConvertOutcome, OutputFormat};

mod config;

/// BLF Converter - Extract CAN signals from BLF logs into MF4/CSV
#[derive(Parser, Debug)]
#[command(name = "blf-convert-cli")]
#[command(about = "Convert BLF log files to MF4 containers and CSV exports", long_about = None)]
#[command(version)]
struct Args {
    /// Path to BLF log file(s) to convert (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    blf: Vec<PathBuf>,

    /// Path to DBC file(s) (can be repeated)
    #[arg(long, value_name = "FILE")]
    dbc: Vec<PathBuf>,

    /// Signal name to extract (can be repeated)
    #[arg(short, long, value_name = "NAME")]
    signal: Vec<String>,

    /// Target format: mf4 container only, or csv for container plus exports
    #[arg(long, value_name = "FORMAT", default_value = "csv")]
    to: CliFormat,

    /// Frames per decode chunk
    #[arg(long, value_name = "COUNT")]
    chunk_size: Option<usize>,

    /// Replace an existing MF4 file instead of writing a numbered sibling
    #[arg(long)]
    overwrite: bool,

    /// Decode chunks sequentially instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Print the artifact map as JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Path to a job configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliFormat {
    Mf4,
    Csv,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Mf4 => OutputFormat::Mf4,
            CliFormat::Csv => OutputFormat::Csv,
        }
    }
}

/// One conversion job resolved from flags or a config file
struct Job {
    blf_files: Vec<PathBuf>,
    dbc_files: Vec<PathBuf>,
    signals: Vec<String>,
    format: OutputFormat,
    config: ConvertConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("BLF Converter CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using converter library v{}", blf_convert::VERSION);

    let job = resolve_job(&args)?;

    let mut failed = 0usize;
    for blf in &job.blf_files {
        match run_conversion(blf, &job) {
            Ok(outcome) => report_outcome(blf, &outcome, args.json)?,
            Err(e) => {
                log::error!("Conversion of {:?} failed: {:#}", blf, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} conversions failed", failed, job.blf_files.len());
    }
    Ok(())
}

/// Merge command-line flags and the optional config file into one job
///
/// Flags win over config file values so a saved job can be tweaked per run.
fn resolve_job(args: &Args) -> Result<Job> {
    let file = match &args.config {
        Some(path) => Some(config::load_config(path)?),
        None => None,
    };

    let blf_files = if !args.blf.is_empty() {
        args.blf.clone()
    } else if let Some(cfg) = &file {
        cfg.input.blf_files.clone()
    } else {
        bail!("no BLF file given; use --blf or --config (--help for usage)");
    };

    let dbc_files = if !args.dbc.is_empty() {
        args.dbc.clone()
    } else {
        file.as_ref()
            .map(|cfg| cfg.input.dbc_files.clone())
            .unwrap_or_default()
    };
    if dbc_files.is_empty() {
        bail!("no DBC file given; use --dbc or list dbc_files in the config");
    }

    let signals = if !args.signal.is_empty() {
        args.signal.clone()
    } else {
        file.as_ref()
            .map(|cfg| cfg.signals.names.clone())
            .unwrap_or_default()
    };
    if signals.is_empty() {
        bail!("no signals requested; use --signal or list names in the config");
    }

    let out = file.as_ref().map(|cfg| cfg.output.clone()).unwrap_or_default();

    let mut convert_config = ConvertConfig::new()
        .with_overwrite(args.overwrite || out.overwrite)
        .with_parallel(!(args.sequential || out.sequential));
    if let Some(chunk_size) = args.chunk_size.or(out.chunk_size) {
        convert_config = convert_config.with_chunk_size(chunk_size);
    }

    // --to has a default value, so an explicit config format only applies
    // when the flag was left at its default.
    let format = if args.to == CliFormat::Csv {
        file.as_ref()
            .map(|cfg| cfg.output.format.into())
            .unwrap_or(OutputFormat::Csv)
    } else {
        args.to.into()
    };

    Ok(Job {
        blf_files,
        dbc_files,
        signals,
        format,
        config: convert_config,
    })
}

fn run_conversion(blf: &PathBuf, job: &Job) -> Result<ConvertOutcome> {
    let converter = BlfConverter::new(
        blf.clone(),
        &job.dbc_files,
        job.signals.iter().cloned(),
        job.config.clone(),
    )?;
    Ok(converter.convert(job.format)?)
}

/// Print the outcome of one conversion to stdout
fn report_outcome(blf: &PathBuf, outcome: &ConvertOutcome, json: bool) -> Result<()> {
    if json {
        let artifacts: BTreeMap<&String, String> = outcome
            .artifacts
            .iter()
            .map(|(name, path)| (name, path.display().to_string()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&artifacts)?);
        return Ok(());
    }

    println!("Converted {:?}", blf);
    println!("  MF4: {}", outcome.mf4_path.display());

    if !outcome.not_found.is_empty() {
        let names: Vec<&str> = outcome.not_found.iter().map(String::as_str).collect();
        println!("  Signals not found: {}", names.join(", "));
    }

    for (name, path) in &outcome.artifacts {
        println!("  {}: {}", name, path.display());
    }

    if let Some(report) = &outcome.rename {
        for failure in &report.failures {
            println!("  Rename failed for {:?}: {}", failure.path, failure.kind);
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
