//! Workout GPX - command line front end
//!
//! Lists workouts in a JSON workout file, exports them to GPX and inspects
//! exported documents.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;
use workout_gpx::export::inspect::inspect_gpx_file;
use workout_gpx::storage::config::{get_config_path, load_config, load_config_from, save_config};
use workout_gpx::AppConfig;
use workout_gpx::{ExportPipeline, GpxExporter, JsonWorkoutSource, WorkoutSource};

#[derive(Parser, Debug)]
#[command(author, version, about = "Export workouts with heart rate to GPX", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform data directory)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List exportable workouts, newest first
    List {
        /// JSON workout file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        input: PathBuf,
    },
    /// Export one workout, or all of them, to GPX
    Export {
        /// JSON workout file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        input: PathBuf,

        /// Workout to export (all workouts when omitted)
        #[arg(long)]
        id: Option<Uuid>,

        /// Output directory (overrides the configured one)
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output_dir: Option<PathBuf>,
    },
    /// Summarise an exported GPX file
    Inspect {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Write a configuration file with the default settings
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting workout-gpx v{}", env!("CARGO_PKG_VERSION"));

    // Handled before loading so a broken file can be replaced.
    if let Command::InitConfig { force } = cli.command {
        let path = cli.config.unwrap_or_else(get_config_path);
        save_config(&AppConfig::default(), &path, force)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("{}", path.display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("loading configuration")?;

    match cli.command {
        Command::List { input } => {
            let source = JsonWorkoutSource::load(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            for summary in source.list_workouts().await? {
                println!(
                    "{}  {:<9} {} - {}",
                    summary.id,
                    summary.activity,
                    summary.started_at.to_rfc3339(),
                    summary.ended_at.to_rfc3339()
                );
            }
        }
        Command::Export {
            input,
            id,
            output_dir,
        } => {
            let source = JsonWorkoutSource::load(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let exporter = GpxExporter::new(config.export.to_export_config()?);
            let output_dir = output_dir.unwrap_or_else(|| config.output_dir());
            let pipeline = ExportPipeline::new(source, exporter, output_dir);

            match id {
                Some(id) => {
                    let path = pipeline.export_by_id(id).await?;
                    println!("{}", path.display());
                }
                None => {
                    let outcomes = pipeline.export_all().await?;
                    let mut failed = 0;
                    for outcome in &outcomes {
                        match &outcome.result {
                            Ok(path) => println!("{}", path.display()),
                            Err(e) => {
                                failed += 1;
                                eprintln!("{}: {}", outcome.workout_id, e);
                            }
                        }
                    }
                    if failed > 0 {
                        anyhow::bail!("{} of {} exports failed", failed, outcomes.len());
                    }
                }
            }
        }
        Command::Inspect { file } => {
            let summary = inspect_gpx_file(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            println!("creator:  {}", summary.creator.as_deref().unwrap_or("-"));
            println!("track:    {}", summary.track_name.as_deref().unwrap_or("-"));
            println!("segments: {}", summary.segment_count);
            println!("points:   {}", summary.point_count);
            if let (Some(first), Some(last)) = (summary.first_point_at, summary.last_point_at) {
                println!("span:     {} - {}", first.to_rfc3339(), last.to_rfc3339());
            }
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}
