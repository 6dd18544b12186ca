use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wearable_merge::{
    aggregate, export_dataset, AppConfig, ExportFormat, HeartRateFormat, SessionConfig,
    SessionErrorPolicy,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Align wearable sensor sessions into one labeled table", long_about = None)]
struct Cli {
    /// TOML configuration (layout, export, sessions); compiled-in defaults otherwise
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge every configured session into one time-sorted dataset
    Merge(MergeArgs),
    /// Align a single session directory
    Session(SessionArgs),
}

#[derive(Parser, Debug)]
struct MergeArgs {
    /// Extra session as DIR,LABEL,FORMAT (FORMAT is json or tcx); repeatable
    #[arg(long = "session", value_name = "DIR,LABEL,FORMAT")]
    sessions: Vec<String>,

    /// Output table path
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Output table format
    #[arg(long, value_enum)]
    format: Option<FormatOpt>,

    /// Skip sessions that fail instead of aborting the run
    #[arg(long, action = ArgAction::SetTrue)]
    skip_failed: bool,

    /// Do not write the manifest next to the table
    #[arg(long, action = ArgAction::SetTrue)]
    no_manifest: bool,
}

#[derive(Parser, Debug)]
struct SessionArgs {
    /// Session directory
    #[arg(value_hint = ValueHint::DirPath)]
    dir: PathBuf,

    /// Activity label attached to every row
    #[arg(long)]
    label: String,

    /// Heart-rate source format
    #[arg(long = "heart-rate", value_enum, default_value_t = HeartRateOpt::Tcx)]
    heart_rate: HeartRateOpt,

    /// TCX file or directory to read instead of the session directory
    #[arg(long, value_hint = ValueHint::AnyPath)]
    heart_rate_path: Option<PathBuf>,

    /// The recording device has no GPS
    #[arg(long, action = ArgAction::SetTrue)]
    no_location: bool,

    /// Output table path
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Output table format
    #[arg(long, value_enum, default_value_t = FormatOpt::Csv)]
    format: FormatOpt,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatOpt {
    Csv,
    Jsonl,
}

impl From<FormatOpt> for ExportFormat {
    fn from(value: FormatOpt) -> Self {
        match value {
            FormatOpt::Csv => ExportFormat::Csv,
            FormatOpt::Jsonl => ExportFormat::JsonLines,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HeartRateOpt {
    Tcx,
    Json,
}

impl From<HeartRateOpt> for HeartRateFormat {
    fn from(value: HeartRateOpt) -> Self {
        match value {
            HeartRateOpt::Tcx => HeartRateFormat::Tcx,
            HeartRateOpt::Json => HeartRateFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("Starting wearable_merge");

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::load_default()?,
    };

    match cli.command {
        Command::Merge(args) => run_merge(config, args),
        Command::Session(args) => run_session(config, args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_merge(config: AppConfig, args: MergeArgs) -> Result<()> {
    let mut sessions = config.sessions.clone();
    for arg in &args.sessions {
        sessions.push(parse_session_arg(arg)?);
    }
    if sessions.is_empty() {
        return Err(anyhow!("no sessions given; add [[sessions]] to the config or pass --session"));
    }

    let policy = if args.skip_failed {
        SessionErrorPolicy::Skip
    } else {
        config.run.on_session_error
    };
    let output = args.output.unwrap_or(config.export.output);
    let format = args.format.map(ExportFormat::from).unwrap_or(config.export.format);

    let dataset = aggregate(&sessions, &config.layout, policy)?;
    let manifest = export_dataset(&dataset, &output, format, config.export.manifest && !args.no_manifest)?;
    info!("wrote {} rows to {}", manifest.num_records, output.display());
    Ok(())
}

fn run_session(config: AppConfig, args: SessionArgs) -> Result<()> {
    let mut session = SessionConfig::new(args.dir, args.label, args.heart_rate.into());
    session.heart_rate_path = args.heart_rate_path;
    session.location = !args.no_location;

    let dataset = aggregate(std::slice::from_ref(&session), &config.layout, SessionErrorPolicy::Abort)?;
    let manifest = export_dataset(&dataset, &args.output, args.format.into(), config.export.manifest)?;
    info!("wrote {} rows to {}", manifest.num_records, args.output.display());
    Ok(())
}

/// `DIR,LABEL,FORMAT`; split from the right so DIR may contain commas
fn parse_session_arg(input: &str) -> Result<SessionConfig> {
    let mut parts = input.rsplitn(3, ',');
    let (format, label, dir) = match (parts.next(), parts.next(), parts.next()) {
        (Some(f), Some(l), Some(d)) if !d.trim().is_empty() && !l.trim().is_empty() => (f, l, d),
        _ => return Err(anyhow!("invalid --session '{}': expected DIR,LABEL,FORMAT", input)),
    };
    let format: HeartRateFormat = format.parse().map_err(|e: String| anyhow!(e))?;
    Ok(SessionConfig::new(dir.trim(), label.trim(), format))
}
