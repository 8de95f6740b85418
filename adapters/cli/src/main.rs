#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a recorded rescue simulation.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rescue_replay_rendering::{render_ascii, RecordingPort};
use rescue_replay_system_builder::build;
use rescue_replay_system_replay::{InstantPacer, ReplayEngine, ReplayReport, ThreadPacer};
use rescue_replay_wire::{read_board, read_simulation};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{FileConfig, Overrides};

/// Replays a simulation log against its board and prints the outcome.
#[derive(Parser, Debug)]
#[command(name = "rescue-replay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Board descriptor JSON file.
    #[arg(long)]
    board: PathBuf,

    /// Simulation log JSON file.
    #[arg(long)]
    simulation: PathBuf,

    /// Seed of the cosmetic random number generator.
    #[arg(long)]
    seed: Option<u64>,

    /// Pause after every applied event, in milliseconds. Zero disables pacing.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Optional TOML file with replay settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the final board as ASCII.
    #[arg(long)]
    print_board: bool,
}

/// Entry point for the rescue replay command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let replay_config = config::resolve(
        &file,
        Overrides {
            delay_ms: cli.delay_ms,
            seed: cli.seed,
        },
    );

    let board = read_board(&cli.board).context("failed to load board descriptor")?;
    let simulation =
        read_simulation(&cli.simulation).context("failed to load simulation log")?;

    let mut descriptor = board.descriptor;
    descriptor.agents = simulation.agents;
    let built = build(&descriptor).context("board descriptor rejected")?;
    info!(
        board_issues = board.issues.len(),
        simulation_issues = simulation.issues.len(),
        build_warnings = built.warnings.len(),
        steps = simulation.steps.len(),
        "inputs_loaded"
    );

    let paced = !replay_config.event_delay.is_zero();
    let engine = ReplayEngine::new(built.board, RecordingPort::new(), replay_config);
    let mut engine = if paced {
        engine.with_pacer(ThreadPacer::default())
    } else {
        engine.with_pacer(InstantPacer)
    };
    let report = engine.run(simulation.steps).context("replay failed")?;

    let dropped = board.issues.len() + simulation.issues.len() + built.warnings.len();
    println!("{}", summary(&report, dropped));
    if cli.print_board {
        print!("{}", render_ascii(engine.board()));
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn summary(report: &ReplayReport, dropped: usize) -> String {
    let mut text = format!(
        "applied {} events, skipped {}, dropped {} input entries",
        report.applied,
        report.skipped.len(),
        dropped
    );
    if report.cancelled {
        text.push_str(" (cancelled)");
    }
    text.push_str(&format!(
        "\nsaved {} | casualties {} | damage {}",
        report.stats.saved, report.stats.casualties, report.stats.damage
    ));
    text
}
