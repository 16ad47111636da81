//! surface-bench - micro-benchmarks for drawing back-ends
//!
//! Reports go to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use surface_bench::bench::{summarize, Timer};
use surface_bench::core::{HarnessConfig, HarnessError, OutputFormat};
use surface_bench::platform::{detect_host, ClockSource};
use surface_bench::{backend, cases, BenchmarkRunner, JsonReporter, Reporter, TextReporter};

/// Timer pairs measured by the `clock` command
const CLOCK_PROBES: usize = 10_000;

#[derive(Parser)]
#[command(name = "surface-bench")]
#[command(about = "Micro-benchmark harness for drawing back-ends", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run benchmarks
    Run {
        /// Case name filters (substring match)
        filters: Vec<String>,

        /// Maximum timed iterations per session
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Time budget per session in seconds
        #[arg(short = 'b', long)]
        budget: Option<f64>,

        /// Target name filter (substring match, repeatable)
        #[arg(short, long = "target")]
        targets: Vec<String>,

        /// Emit newline-delimited JSON
        #[arg(long)]
        json: bool,

        /// Include sorted raw samples in every record
        #[arg(long)]
        raw: bool,
    },

    /// List registered targets and cases
    List,

    /// Show effective configuration
    Config,

    /// Measure timer overhead and resolution
    Clock,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            filters,
            iterations,
            budget,
            targets,
            json,
            raw,
        } => {
            if let Some(iterations) = iterations {
                config.iterations = iterations;
            }
            if let Some(budget) = budget {
                config.time_budget_secs = budget;
            }
            if !filters.is_empty() {
                config.cases = filters;
            }
            if !targets.is_empty() {
                config.targets = targets;
            }
            if json {
                config.format = OutputFormat::Json;
            }
            config.raw_samples |= raw;

            if let Err(e) = run(config) {
                if e.is_fatal() {
                    error!("Fatal: {}", e);
                    std::process::abort();
                }
                return Err(e.into());
            }
        }

        Commands::List => {
            println!("Targets:");
            for target in backend::registry() {
                println!("  {:<12} {}", target.name(), target.content());
            }
            println!("\nCases:");
            for case in cases::registry() {
                let budget = case
                    .time_budget()
                    .map(|secs| format!(", {}s budget", secs))
                    .unwrap_or_default();
                println!(
                    "  {:<12} sizes {}..{}{}",
                    case.name(),
                    case.min_size(),
                    case.max_size(),
                    budget
                );
            }
        }

        Commands::Config => {
            config.validate()?;
            println!("{}", config.to_toml()?);
        }

        Commands::Clock => clock_report()?,
    }

    Ok(())
}

/// Explicit path, else the default path if it exists, else defaults.
fn load_config(path: Option<&std::path::Path>) -> Result<HarnessConfig, HarnessError> {
    if let Some(path) = path {
        return HarnessConfig::load(path);
    }
    match HarnessConfig::default_path() {
        Some(path) if path.exists() => HarnessConfig::load(&path),
        _ => Ok(HarnessConfig::default()),
    }
}

fn run(config: HarnessConfig) -> Result<(), HarnessError> {
    let format = config.format;
    let mut runner = BenchmarkRunner::new(config, backend::registry(), cases::registry())?;

    let mut reporter: Box<dyn Reporter> = match format {
        OutputFormat::Text => Box::new(TextReporter::new(io::stdout().lock())),
        OutputFormat::Json => Box::new(JsonReporter::new(io::stdout().lock())),
    };

    reporter.begin(&detect_host())?;
    let metrics = runner.run(reporter.as_mut())?;
    reporter.finish(&metrics.summary())?;
    Ok(())
}

fn clock_report() -> Result<(), HarnessError> {
    let mut timer = Timer::new();
    let clock = timer.clock();
    println!("Clock:      {}", clock.name());
    println!("Frequency:  {} Hz", clock.frequency());

    // Smallest non-zero step between consecutive readings
    let mut resolution = u64::MAX;
    let mut previous = clock.now();
    for _ in 0..CLOCK_PROBES {
        let now = clock.now();
        if now > previous {
            resolution = resolution.min(now - previous);
        }
        previous = now;
    }
    if resolution == u64::MAX {
        warn!("Clock did not advance over {} readings", CLOCK_PROBES);
    } else {
        println!(
            "Resolution: {} ticks ({:.1} ns)",
            resolution,
            resolution as f64 * 1e9 / clock.frequency() as f64
        );
    }

    let mut samples = Vec::new();
    samples.try_reserve_exact(CLOCK_PROBES)?;
    for _ in 0..CLOCK_PROBES {
        timer.start();
        timer.stop();
        samples.push(timer.elapsed());
    }

    match summarize(&mut samples) {
        Ok(stats) => println!(
            "Overhead:   min {:.1} ns, median {:.1} ns, stddev {:.2}% ({}/{} kept)",
            stats.min * 1e9,
            stats.median * 1e9,
            stats.std_dev * 100.0,
            stats.iterations,
            CLOCK_PROBES
        ),
        Err(e) => println!("Overhead:   below clock resolution ({})", e),
    }

    if timer.anomalies() > 0 {
        warn!("Clock went backwards {} time(s)", timer.anomalies());
    }
    info!("Clock probe complete");
    Ok(())
}
