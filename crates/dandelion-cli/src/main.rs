use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dandelion_core::{
    Climate, Coordinator, CsvWeatherSource, FileSnapshotExporter, SimConfig, SimulationContext,
    parse_ratio,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dandelion")]
#[command(about = "Dandelion population simulation driven by daily weather data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the simulation over a weather CSV
    Run(RunArgs),
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Daily weather CSV with date, tavg, prcp, wdir and wspd columns
    weather: PathBuf,

    /// Climate zone: polar, continental, tropical, desert or temperate
    climate: Option<String>,

    /// Real plants represented by each simulated plant
    ratio: Option<String>,

    /// Dates (YYYY-MM-DD) on which to export the density grid
    snapshot_dates: Vec<String>,

    /// Path to config file (JSON); positional arguments override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the random streams
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum wall-clock milliseconds per simulated day
    #[arg(long)]
    day_length_ms: Option<u64>,

    /// Directory for snapshot images and text dumps
    #[arg(long, default_value = ".")]
    snapshot_dir: PathBuf,

    /// Output directory for the run summary (optional)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Stay paused when the weather runs out instead of exiting
    #[arg(long)]
    keep_alive: bool,

    /// Do not read pause/resume/quit commands from stdin
    #[arg(long)]
    no_controls: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Control {
    Pause,
    Resume,
    Toggle,
    Quit,
}

fn parse_control(line: &str) -> Option<Control> {
    let raw = line.trim_end_matches(['\r', '\n']);
    if raw == " " {
        return Some(Control::Toggle);
    }
    match raw.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "t" | "toggle" => Some(Control::Toggle),
        "q" | "quit" | "exit" => Some(Control::Quit),
        _ => None,
    }
}

/// Reads control commands until stdin closes or quit is requested.
fn spawn_controls(context: Arc<SimulationContext>) -> Result<()> {
    thread::Builder::new()
        .name("dandelion-controls".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_control(&line) {
                    Some(Control::Pause) => {
                        context.pause();
                        info!(day = context.day(), "paused");
                    }
                    Some(Control::Resume) => {
                        context.resume();
                        info!(day = context.day(), "resumed");
                    }
                    Some(Control::Toggle) => {
                        let paused = context.toggle_pause();
                        info!(day = context.day(), paused, "pause toggled");
                    }
                    Some(Control::Quit) => {
                        context.request_shutdown();
                        break;
                    }
                    None => warn!(input = %line.trim(), "unknown command (p, r, t, q)"),
                }
            }
        })
        .context("failed to spawn control thread")?;
    Ok(())
}

/// Merge the config file (or defaults) with command-line overrides.
fn build_config(args: &RunArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path).context("failed to open config file")?;
            serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?
        }
        None => SimConfig::default(),
    };
    if let Some(name) = &args.climate {
        config.climate = Climate::from_name_or_default(name);
    }
    if let Some(ratio) = &args.ratio {
        config.ratio = parse_ratio(ratio);
    }
    config
        .snapshot_dates
        .extend(args.snapshot_dates.iter().cloned());
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(day_length_ms) = args.day_length_ms {
        config.day_length_ms = day_length_ms;
    }
    if args.keep_alive {
        config.stop_when_exhausted = false;
    }
    config.validate().context("Config validation error")?;
    Ok(config)
}

fn run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let weather = CsvWeatherSource::open(&args.weather)
        .with_context(|| format!("failed to open weather data {:?}", args.weather))?;

    info!(
        weather = ?args.weather,
        climate = %config.climate,
        ratio = config.ratio,
        snapshots = config.snapshot_dates.len(),
        "starting run"
    );

    let mut coordinator = Coordinator::new(config, Box::new(weather))
        .context("failed to start simulation")?
        .with_exporter(Box::new(FileSnapshotExporter::new(&args.snapshot_dir)));
    if !args.no_controls {
        spawn_controls(coordinator.context())?;
    }
    let summary = coordinator.run().context("simulation failed")?;
    coordinator.shutdown();

    if let Some(out_dir) = args.out {
        std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
        let summary_path = out_dir.join("summary.json");
        let file = File::create(summary_path).context("failed to create summary file")?;
        serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
        println!("Run complete. Results saved to {:?}", out_dir);
    } else {
        println!(
            "Run complete after {} days. Final population: {}",
            summary.days, summary.final_population
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run(args) => run(args)?,
    }
    Ok(())
}
