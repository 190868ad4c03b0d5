//! Thermal head tracker: replays sensor captures through the tracking engine.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use thermal_head_tracker::{
    app::{ReplaySource, RunOptions, TrackerApp},
    config::{Config, EXAMPLE_CONFIG},
    roam::RoamMode,
    servo::LoggingActuator,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Track positions without driving the servo
    #[arg(long)]
    noservo: bool,

    /// Sweep back and forth while nobody is in view
    #[arg(long, conflicts_with = "rand")]
    roam: bool,

    /// Jump to random positions while nobody is in view
    #[arg(long)]
    rand: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Sensor capture to replay, one hex-encoded packet per line
    #[arg(short, long, required_unless_present = "print_config")]
    frames: Option<String>,

    /// Sleep for the measurement and settle intervals between cycles
    #[arg(long)]
    realtime: bool,

    /// Stop after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Thermal Head Tracker");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    // Command line switches override the file
    if args.noservo {
        config.servo.enabled = false;
    }
    if args.roam {
        config.roam.mode = RoamMode::Sweep;
    }
    if args.rand {
        config.roam.mode = RoamMode::Random;
    }

    let frames = args
        .frames
        .context("No sensor capture given, pass --frames")?;
    let mut source = ReplaySource::from_file(&frames, config.create_decoder())
        .with_context(|| format!("Failed to load sensor capture {frames}"))?;

    // Create and run application
    let mut app = TrackerApp::new(config)?;
    let mut actuator = LoggingActuator::new();
    let summary = app.run(
        &mut source,
        &mut actuator,
        RunOptions {
            realtime: args.realtime,
            max_cycles: args.max_cycles,
        },
    )?;

    info!(
        "Finished in state {}: {} arrivals, {} departures, {} hazard warnings",
        summary.final_state, summary.arrivals, summary.departures, summary.hazards
    );

    Ok(())
}
