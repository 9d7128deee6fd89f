use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use piano_recorder_core::hal::sim::{ManualClock, ScriptedAdc, SharedLine, SimDeck, SimLamp};
use piano_recorder_core::{
    ActivityDetector, AppConfig, BeamSensor, ControlEvent, DeckController, DeckState, Microphone,
    Orchestrator, StatusIndicator,
};
use tracing_subscriber::EnvFilter;

fn main() -> piano_recorder_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { config, steps } => run_simulation(config.as_deref(), steps),
        Commands::CheckConfig { path } => check_config(&path),
    }
}

/// Runs the control loop against the in-memory hardware: a simulated deck, a
/// scripted beam that is occluded once at startup, and a manual clock whose
/// sleeps advance instantly. Real pin backends plug in through the same
/// traits.
fn run_simulation(config: Option<&Path>, steps: u32) -> piano_recorder_core::Result<()> {
    let config = load_config(config)?;
    tracing::info!(steps, "starting simulated session");

    let clock = ManualClock::new();

    // One performance right at the start: a full occlusion burst, then the
    // beam reads clear until the inter-note timeout runs out.
    let occlusion: Vec<i32> = [50, 20, 15, 10, 12, 11, 9, 14, 13, 16, 10]
        .iter()
        .flat_map(|d| [0, *d])
        .collect();
    let beam = BeamSensor::new(
        SharedLine::high(),
        ScriptedAdc::new(occlusion).with_tail([0, 400]),
        config.detector.beam.clone(),
    );
    let mic = Microphone::new(ScriptedAdc::steady(512), config.detector.mic.clone());
    let detector = ActivityDetector::new(beam, clock.clone(), config.detector.internote_timeout())
        .with_microphone(mic);

    let sim_deck = SimDeck::new(DeckState::Stopped);
    let deck = DeckController::new(sim_deck.lines(), clock.clone(), config.deck.clone());

    let indicator = StatusIndicator::new(
        SimLamp::new(),
        SimLamp::new(),
        SimLamp::new(),
        SimLamp::new(),
    );

    let mut orchestrator =
        Orchestrator::new(detector, deck, clock.clone(), config.poll_interval())
            .with_indicator(indicator);

    let mut started = 0u32;
    let mut stopped = 0u32;
    for _ in 0..steps {
        match orchestrator.step()? {
            ControlEvent::RecordingStarted => started += 1,
            ControlEvent::RecordingStopped => stopped += 1,
            ControlEvent::Idle => {}
        }
        clock.advance(config.poll_interval());
    }

    tracing::info!(
        started,
        stopped,
        final_mode = %sim_deck.mode(),
        "simulation finished"
    );
    Ok(())
}

fn check_config(path: &Path) -> piano_recorder_core::Result<()> {
    let config = AppConfig::from_path(path)?;
    println!("{}", config.to_pretty_json()?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> piano_recorder_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::from_path(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Unattended piano performance recorder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control loop against the simulated hardware backend.
    Simulate {
        /// Optional JSON configuration file; defaults apply otherwise.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of control loop passes to simulate.
        #[arg(short, long, default_value_t = 400)]
        steps: u32,
    },
    /// Load a configuration file and print the effective values.
    CheckConfig {
        /// Path to the JSON configuration file.
        path: PathBuf,
    },
}
