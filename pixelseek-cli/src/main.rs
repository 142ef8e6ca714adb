use clap::Parser;
use pixelseek::io::load_rgb_image;
use pixelseek::{
    ListenerResult, OwnedImage, ParallelScanner, Rgb, ScanReport, SearchConfig, SearchListener,
    SearchOutcome, SequentialScanner, DEFAULT_THRESHOLD, DEFAULT_UPDATE_INTERVAL,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Brute-force image search (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Search the built-in demo scene instead of the configured images.
    #[arg(long)]
    demo: bool,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StrategyConfig {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    target_path: String,
    reference_path: String,
    output_path: Option<String>,
    strategy: StrategyConfig,
    threshold: f64,
    update_interval: usize,
    leaf_len: Option<usize>,
    threads: Option<usize>,
    quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_path: String::new(),
            reference_path: String::new(),
            output_path: None,
            strategy: StrategyConfig::Sequential,
            threshold: DEFAULT_THRESHOLD,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            leaf_len: None,
            threads: None,
            quiet: false,
        }
    }
}

impl Config {
    fn search_config(&self) -> SearchConfig {
        SearchConfig {
            threshold: self.threshold,
            update_interval: self.update_interval,
            leaf_len: self.leaf_len,
        }
    }
}

#[derive(Debug, Serialize)]
struct HitRecord {
    position: usize,
    x: usize,
    y: usize,
    elapsed_ms: u64,
    attempted: usize,
}

impl From<&ScanReport> for HitRecord {
    fn from(value: &ScanReport) -> Self {
        Self {
            position: value.position,
            x: value.x,
            y: value.y,
            elapsed_ms: value.elapsed_millis() as u64,
            attempted: value.attempted,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    outcome: &'static str,
    attempted: usize,
    elapsed_ms: u64,
    hits: Vec<HitRecord>,
}

/// Prints every notification to stdout and keeps the hits for the report.
struct ConsoleListener {
    quiet: bool,
    hits: Mutex<Vec<HitRecord>>,
}

impl ConsoleListener {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            hits: Mutex::new(Vec::new()),
        }
    }

    fn into_hits(self) -> Vec<HitRecord> {
        let mut hits = self
            .hits
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        hits.sort_by_key(|hit| hit.position);
        hits
    }
}

impl SearchListener for ConsoleListener {
    fn information(&self, message: &str) -> ListenerResult {
        println!("{message}");
        Ok(())
    }

    fn update(&self, report: &ScanReport) -> ListenerResult {
        if !self.quiet {
            println!(
                "Searching at: {} at {:.3}s ({} positions attempted)",
                report.position,
                report.elapsed.as_secs_f64(),
                report.attempted
            );
        }
        Ok(())
    }

    fn possible_match(&self, report: &ScanReport) -> ListenerResult {
        println!(
            "Possible match at: {} ({}, {}) at {:.3}s ({} positions attempted)",
            report.position,
            report.x,
            report.y,
            report.elapsed.as_secs_f64(),
            report.attempted
        );
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HitRecord::from(report));
        Ok(())
    }
}

/// Black 1000x1000 target with a red 10x10 square at (10, 0), and the square.
fn demo_scene() -> Result<(OwnedImage<Rgb>, OwnedImage<Rgb>), Box<dyn std::error::Error>> {
    let mut target = OwnedImage::filled(1000, 1000, Rgb::BLACK)?;
    target.fill_rect(10, 0, 10, 10, Rgb::RED);
    let reference = OwnedImage::filled(10, 10, Rgb::RED)?;
    Ok((target, reference))
}

fn outcome_name(outcome: &SearchOutcome) -> &'static str {
    match outcome {
        SearchOutcome::Found(_) => "found",
        SearchOutcome::NotFound(_) => "not_found",
        SearchOutcome::Cancelled(_) => "cancelled",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("pixelseek=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config: Config = if cli.demo && !cli.config.exists() {
        Config::default()
    } else {
        let config_text = fs::read_to_string(&cli.config)?;
        serde_json::from_str(&config_text)?
    };
    if config.threads == Some(0) {
        return Err("threads must be at least 1".into());
    }

    let (target, reference) = if cli.demo {
        demo_scene()?
    } else {
        if config.target_path.is_empty() || config.reference_path.is_empty() {
            return Err("target_path and reference_path must be set in the config".into());
        }
        (
            load_rgb_image(&config.target_path)?,
            load_rgb_image(&config.reference_path)?,
        )
    };

    let search_cfg = config.search_config();
    let listener = ConsoleListener::new(config.quiet);
    let outcome = match config.strategy {
        StrategyConfig::Sequential => {
            SequentialScanner::full(target.view(), reference.view(), &search_cfg)?
                .run(&listener)?
        }
        StrategyConfig::Parallel => {
            let scanner = ParallelScanner::full(target.view(), reference.view(), &search_cfg)?;
            match config.threads {
                Some(threads) => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .build()?;
                    scanner.compute_in(&pool, &listener)?
                }
                None => scanner.compute(&listener)?,
            }
        }
    };

    let summary = outcome.summary();
    tracing::info!(
        outcome = outcome_name(&outcome),
        attempted = summary.attempted,
        hits = summary.hits,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "search finished"
    );
    let output = Output {
        outcome: outcome_name(&outcome),
        attempted: summary.attempted,
        elapsed_ms: summary.elapsed.as_millis() as u64,
        hits: listener.into_hits(),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
