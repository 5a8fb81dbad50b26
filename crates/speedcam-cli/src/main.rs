mod display;
mod source;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use speedcam_core::config::DEFAULT_EVENT_COLUMNS;
use speedcam_core::{CameraIndex, Config, Pipeline, partition_by_month, read_samples};
use speedcam_store::{DEFAULT_ENCODINGS, DuckStore, OutputFormat, check_output_dir, write_partitions};
use tracing_subscriber::EnvFilter;

use crate::source::CameraSource;

#[derive(Parser)]
#[command(name = "speedcam", version, about = "Match vehicle events to enforcement cameras and classify speeding")]
struct Cli {
    /// JSON file overriding thresholds and allow-sets.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate events, match cameras, classify and write monthly partitions.
    Run(RunArgs),
    /// Build the camera catalog and print a summary.
    Cameras(CamerasArgs),
}

#[derive(Args)]
struct CameraArgs {
    /// DuckDB database holding the camera table (spatial backend).
    #[arg(long, env = "SPEEDCAM_CAMERA_DB")]
    camera_db: Option<PathBuf>,

    /// Camera table inside --camera-db [default: cameras].
    #[arg(long)]
    camera_table: Option<String>,

    /// Plain CSV camera file.
    #[arg(long, env = "SPEEDCAM_CAMERA_CSV")]
    camera_csv: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    /// Event CSV file.
    #[arg(long, short)]
    input: PathBuf,

    /// Existing directory for the output files.
    #[arg(long, short, env = "SPEEDCAM_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    #[command(flatten)]
    cameras: CameraArgs,

    /// Skip camera matching; camera and class columns stay empty.
    #[arg(long, conflicts_with_all = ["camera_db", "camera_table", "camera_csv"])]
    aggregate_only: bool,

    #[arg(long, value_enum, default_value_t = Format::Parquet)]
    format: Format,
}

#[derive(Args)]
struct CamerasArgs {
    #[command(flatten)]
    cameras: CameraArgs,

    /// Number of records to print.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Parquet,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Parquet => OutputFormat::Parquet,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing::info!("speedcam v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => Config::load(path).context("loading config")?,
        None => Config::default(),
    };

    match cli.command {
        Command::Run(args) => cmd_run(&config, args),
        Command::Cameras(args) => cmd_cameras(&config, args),
    }
}

fn cmd_run(config: &Config, args: RunArgs) -> anyhow::Result<()> {
    let source = prepare_run(&args)?;
    let index = source
        .map(|source| build_index(config, &source))
        .transpose()?;

    let events = read_events(&args.input)?;
    let samples = read_samples(&events, &DEFAULT_EVENT_COLUMNS)
        .with_context(|| format!("reading events from {}", args.input.display()))?;

    let (records, summary) = Pipeline::new(config, index.as_ref()).run(samples);
    display::print_summary(&summary);

    let partitions = partition_by_month(records);
    let written = write_partitions(&args.output_dir, &args.input, &partitions, args.format.into())
        .context("writing output partitions")?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

/// Settle the camera source before touching the filesystem, then check the
/// output directory.
fn prepare_run(args: &RunArgs) -> anyhow::Result<Option<CameraSource>> {
    let source = if args.aggregate_only {
        None
    } else {
        Some(CameraSource::resolve(
            args.cameras.camera_db.clone(),
            args.cameras.camera_table.clone(),
            args.cameras.camera_csv.clone(),
        )?)
    };
    check_output_dir(&args.output_dir).context("checking output directory")?;
    Ok(source)
}

fn cmd_cameras(config: &Config, args: CamerasArgs) -> anyhow::Result<()> {
    let source = CameraSource::resolve(
        args.cameras.camera_db,
        args.cameras.camera_table,
        args.cameras.camera_csv,
    )?;
    let index = build_index(config, &source)?;
    display::print_catalog(&index, args.limit)
}

fn build_index(config: &Config, source: &CameraSource) -> anyhow::Result<CameraIndex> {
    let cameras = source
        .load(config)
        .with_context(|| format!("loading cameras from {source}"))?;
    let index = CameraIndex::new(cameras, config)?;
    tracing::info!(cameras = index.len(), radius_m = index.radius_m(), "camera index ready");
    Ok(index)
}

fn read_events(path: &Path) -> anyhow::Result<speedcam_core::Table> {
    let store = DuckStore::open()?;
    store
        .read_csv(path, DEFAULT_ENCODINGS)
        .with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["speedcam", "run", "-i", "events.csv", "-o", "/nonexistent/speedcam-out"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Run(args) => args,
            Command::Cameras(_) => unreachable!(),
        }
    }

    #[test]
    fn source_conflict_reported_before_output_dir() {
        let args = run_args(&["--camera-db", "cams.duckdb", "--camera-csv", "cams.csv"]);
        let err = prepare_run(&args).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<speedcam_core::Error>(), Some(speedcam_core::Error::SourceConflict(_))),
            "got {err:#}"
        );
    }

    #[test]
    fn aggregate_only_still_checks_output_dir() {
        let args = run_args(&["--aggregate-only"]);
        let err = prepare_run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("checking output directory"), "got {err:#}");
    }

    #[test]
    fn aggregate_only_conflicts_with_camera_flags() {
        let argv = ["speedcam", "run", "-i", "e.csv", "--aggregate-only", "--camera-csv", "c.csv"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
