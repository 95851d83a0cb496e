use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use breath_trainer::calibration::StrategyKind;
use breath_trainer::config::AppConfig;
use breath_trainer::device::{hardware_percentage, BreathSimulator};
use breath_trainer::engine::EngineHandle;
use breath_trainer::pipeline::{CalibrationPipeline, CalibrationUpdate};
use breath_trainer::storage::{
    self, load_json, JsonFileStore, KeyValueStore, BASELINE_KEY,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "breath_cli",
    about = "Offline harness for the breath sensor calibration pipeline"
)]
struct Cli {
    /// Configuration file (defaults to assets/breath_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the JSON store holding the baseline and tutorial flag
    #[arg(long)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TuningArgs {
    /// Strategy identifier: dynamic_stepper, constant_stepper or linear
    #[arg(long)]
    strategy: Option<StrategyKind>,
    /// Gain in percent (0-100)
    #[arg(long)]
    sensitivity: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run recorded raw samples through the pipeline, one JSON update per line
    Replay {
        /// Whitespace separated raw samples; `#` starts a comment
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Feed a synthetic breathing session through the threaded engine
    Simulate {
        #[arg(long, default_value_t = 200)]
        count: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Probability that a notification arrives truncated
        #[arg(long, default_value_t = 0.0)]
        dropout: f64,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Show the persisted baseline and tutorial flag
    Status,
    /// Forget the persisted baseline
    Reset,
    /// Show or change the tutorial-completion flag
    Tutorial {
        #[arg(long)]
        set: Option<bool>,
    },
    /// List the built-in strategies
    Strategies,
}

fn main() -> ExitCode {
    breath_trainer::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    if let Some(store) = cli.store {
        config.storage.path = store;
    }

    match cli.command {
        Commands::Replay {
            input,
            output,
            tuning,
        } => run_replay(config, &input, output, tuning),
        Commands::Simulate {
            count,
            seed,
            dropout,
            tuning,
        } => run_simulate(config, count, seed, dropout, tuning),
        Commands::Status => run_status(&config),
        Commands::Reset => run_reset(&config),
        Commands::Tutorial { set } => run_tutorial(&config, set),
        Commands::Strategies => run_strategies(),
    }
}

fn open_store(config: &AppConfig) -> Result<Arc<JsonFileStore>> {
    let store = JsonFileStore::open(&config.storage.path)
        .with_context(|| format!("opening store {}", config.storage.path.display()))?;
    Ok(Arc::new(store))
}

fn apply_tuning(config: &mut AppConfig, tuning: TuningArgs) -> Result<()> {
    if let Some(strategy) = tuning.strategy {
        config.calibration.strategy = strategy;
    }
    if let Some(sensitivity) = tuning.sensitivity {
        if sensitivity > breath_trainer::pipeline::MAX_SENSITIVITY {
            bail!("sensitivity {} is outside 0-100", sensitivity);
        }
        config.calibration.sensitivity = sensitivity;
    }
    Ok(())
}

fn parse_samples(text: &str) -> Result<Vec<i32>> {
    let mut samples = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        for token in content.split_whitespace() {
            let raw = token
                .parse::<i32>()
                .with_context(|| format!("line {}: invalid sample {:?}", index + 1, token))?;
            samples.push(raw);
        }
    }
    Ok(samples)
}

fn run_replay(
    mut config: AppConfig,
    input: &Path,
    output_path: Option<PathBuf>,
    tuning: TuningArgs,
) -> Result<ExitCode> {
    apply_tuning(&mut config, tuning)?;
    let text =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let samples = parse_samples(&text)?;

    let store = open_store(&config)?;
    let mut pipeline = CalibrationPipeline::new(config.calibration.clone(), store);
    let updates: Vec<CalibrationUpdate> = samples
        .into_iter()
        .map(|raw| pipeline.process_sample(raw))
        .collect();

    emit_updates(&updates, output_path)?;
    Ok(ExitCode::from(0))
}

fn run_simulate(
    mut config: AppConfig,
    count: usize,
    seed: u64,
    dropout: f64,
    tuning: TuningArgs,
) -> Result<ExitCode> {
    apply_tuning(&mut config, tuning)?;

    let offset = config.device.payload_offset;
    let store = open_store(&config)?;
    let engine = EngineHandle::new(config, store);
    let mut updates_rx = engine.subscribe_updates();
    let mut simulator = BreathSimulator::new(seed).with_dropout(dropout);

    let mut dropped = 0usize;
    for _ in 0..count {
        if !engine.push_notification(&simulator.next_notification(offset))? {
            dropped += 1;
        }
    }
    let snapshot = engine.snapshot()?;

    let mut updates = Vec::with_capacity(count);
    while let Ok(update) = updates_rx.try_recv() {
        updates.push(update);
    }
    emit_updates(&updates, None)?;

    eprintln!(
        "processed {} samples, dropped {} notifications, baseline {:?}, progress {}%",
        snapshot.samples_processed, dropped, snapshot.baseline, snapshot.progress
    );
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    store: &'a Path,
    baseline: Option<f64>,
    tutorial_completed: bool,
    hardware_min_percent: f64,
    hardware_max_percent: f64,
}

fn run_status(config: &AppConfig) -> Result<ExitCode> {
    let store = open_store(config)?;
    let baseline = match load_json::<f64>(store.as_ref(), BASELINE_KEY) {
        Ok(baseline) => baseline,
        Err(err) => {
            eprintln!("Warning: ignoring unreadable baseline: {err}");
            None
        }
    };

    let payload = StatusPayload {
        store: store.path(),
        baseline,
        tutorial_completed: storage::tutorial_completed(store.as_ref()),
        hardware_min_percent: hardware_percentage(config.device.hardware_min, &config.device),
        hardware_max_percent: hardware_percentage(config.device.hardware_max, &config.device),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

fn run_reset(config: &AppConfig) -> Result<ExitCode> {
    let store = open_store(config)?;
    store
        .remove(BASELINE_KEY)
        .context("removing persisted baseline")?;
    println!("Baseline cleared in {}", store.path().display());
    Ok(ExitCode::from(0))
}

fn run_tutorial(config: &AppConfig, set: Option<bool>) -> Result<ExitCode> {
    let store = open_store(config)?;
    if let Some(completed) = set {
        storage::set_tutorial_completed(store.as_ref(), completed)
            .context("writing tutorial flag")?;
    }
    println!("tutorial_completed={}", storage::tutorial_completed(store.as_ref()));
    Ok(ExitCode::from(0))
}

fn run_strategies() -> Result<ExitCode> {
    for info in StrategyKind::catalog() {
        println!("{:<18} {}", info.kind.id(), info.description);
    }
    Ok(ExitCode::from(0))
}

fn emit_updates(updates: &[CalibrationUpdate], output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file =
                fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            write_lines(BufWriter::new(file), updates)
        }
        None => write_lines(io::stdout().lock(), updates),
    }
}

fn write_lines<W: Write>(mut writer: W, updates: &[CalibrationUpdate]) -> Result<()> {
    for update in updates {
        serde_json::to_writer(&mut writer, update)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
