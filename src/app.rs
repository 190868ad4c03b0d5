//! Main application module: the sense, decide and act loop.

use crate::{
    classifier::{Classification, FrameClassifier},
    config::Config,
    d6t::PacketDecoder,
    error::{Error, Result},
    frame::SensorReading,
    servo::{Actuator, ServoAngle, ServoController},
    tracker::{LifecycleEvent, PersonState, PersonTracker, ServoCommand, TrackerStep},
};
use log::{debug, error, info, warn};
use std::{collections::VecDeque, path::Path, thread, time::Duration};

/// Anything that can deliver thermal readings cycle by cycle
pub trait FrameSource {
    /// Next reading, or `None` once the source is exhausted
    ///
    /// A short read is reported as [`SensorReading::Unavailable`] rather
    /// than an error so the engine decides how to treat it.
    fn read(&mut self) -> Result<Option<SensorReading>>;
}

/// Replays recorded sensor packets
#[derive(Debug, Clone)]
pub struct ReplaySource {
    decoder: PacketDecoder,
    packets: VecDeque<Vec<u8>>,
}

impl ReplaySource {
    /// Replay already captured packets
    #[must_use]
    pub fn new(decoder: PacketDecoder, packets: Vec<Vec<u8>>) -> Self {
        Self {
            decoder,
            packets: packets.into(),
        }
    }

    /// Load a capture file holding one hex-encoded packet per line
    ///
    /// Blank lines and lines starting with `#` are skipped; whitespace
    /// between bytes is ignored.
    pub fn from_file<P: AsRef<Path>>(path: P, decoder: PacketDecoder) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::IoError(format!("{}: {}", path.display(), e)))?;
        let packets = parse_capture(&content)?;
        info!("Loaded {} packets from {}", packets.len(), path.display());
        Ok(Self::new(decoder, packets))
    }

    /// Packets not yet replayed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl FrameSource for ReplaySource {
    fn read(&mut self) -> Result<Option<SensorReading>> {
        let Some(packet) = self.packets.pop_front() else {
            return Ok(None);
        };

        match self.decoder.decode(&packet) {
            Ok(frame) => Ok(Some(SensorReading::Frame(frame))),
            Err(Error::SensorRead {
                bytes_read,
                expected,
            }) => Ok(Some(SensorReading::Unavailable {
                bytes_read,
                expected,
            })),
            Err(e) => Err(e),
        }
    }
}

/// Parse a hex capture into raw packets
pub fn parse_capture(content: &str) -> Result<Vec<Vec<u8>>> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| parse_hex_line(line).map_err(|msg| {
            Error::InvalidInput(format!("Capture line {}: {}", number, msg))
        }))
        .collect()
}

fn parse_hex_line(line: &str) -> std::result::Result<Vec<u8>, hex::FromHexError> {
    let digits: String = line.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(digits)
}

/// What happened during one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Classifier output for the frame
    pub classification: Classification,
    /// Tracker decision
    pub step: TrackerStep,
    /// Head position after the cycle
    pub servo: ServoAngle,
    /// How long to wait before trusting the next frame, when the head moved
    pub settle: Option<Duration>,
}

impl CycleReport {
    /// Whether the head position changed this cycle
    #[must_use]
    pub const fn moved(&self) -> bool {
        self.settle.is_some()
    }
}

/// Host loop options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Sleep for the measurement and settle intervals between cycles
    pub realtime: bool,
    /// Stop after this many cycles
    pub max_cycles: Option<u64>,
}

/// Totals for a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles executed
    pub cycles: u64,
    /// Arrival announcements
    pub arrivals: u64,
    /// Departure announcements
    pub departures: u64,
    /// Hazard warnings
    pub hazards: u64,
    /// State at the end of the run
    pub final_state: PersonState,
}

/// Composes classifier, tracker and servo control into one engine
#[derive(Debug)]
pub struct TrackerApp {
    config: Config,
    classifier: FrameClassifier,
    servo: ServoController,
    tracker: PersonTracker,
    cycles: u64,
}

impl TrackerApp {
    /// Build the engine from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        info!("Initializing thermal head tracker");
        if !config.servo.enabled {
            info!("Servo disabled, positions are tracked but not driven");
        }
        info!("Roaming mode {:?}", config.roam.mode);

        Ok(Self {
            classifier: config.create_classifier(),
            servo: config.create_servo(),
            tracker: config.create_tracker(),
            config,
            cycles: 0,
        })
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Tracker state machine
    #[must_use]
    pub const fn tracker(&self) -> &PersonTracker {
        &self.tracker
    }

    /// Current head position
    #[must_use]
    pub const fn servo_angle(&self) -> ServoAngle {
        self.tracker.context().servo_angle
    }

    /// Run one sense, decide and act cycle
    ///
    /// # Errors
    ///
    /// Returns `SensorRead` when no frame is available (tracker state is left
    /// untouched) and propagates actuator failures.
    pub fn cycle(&mut self, reading: SensorReading, actuator: &mut dyn Actuator) -> Result<CycleReport> {
        let frame = match reading {
            SensorReading::Frame(frame) => frame,
            SensorReading::Unavailable {
                bytes_read,
                expected,
            } => {
                error!("Sensor read failure: {} of {} bytes", bytes_read, expected);
                return Err(Error::SensorRead {
                    bytes_read,
                    expected,
                });
            }
        };

        self.cycles += 1;
        for row in frame.display_rows() {
            debug!("{}", row);
        }

        let classification = self.classifier.classify(&frame);
        let before = self.servo_angle();
        let step = self.tracker.step(&classification);

        let after = match step.command {
            Some(ServoCommand::Track { target }) => self.servo.move_toward(target, before),
            Some(ServoCommand::Position(angle)) => self.servo.set_position(angle.micros()),
            None => before,
        };
        self.tracker.observe_servo(after);

        let moved = after != before;
        if moved && self.config.servo.enabled {
            actuator.set_pulse_width(after)?;
        }

        match step.event {
            Some(LifecycleEvent::Arrived) => info!("Person arrived"),
            Some(LifecycleEvent::Departed) => info!("Person departed"),
            Some(LifecycleEvent::HazardWarning) => warn!(
                "Burn hazard! {:.1} degrees",
                classification.max_temperature
            ),
            None => {}
        }

        Ok(CycleReport {
            cycle: self.cycles,
            classification,
            step,
            servo: after,
            settle: moved.then(|| self.config.timing.settle_interval()),
        })
    }

    /// Drive the engine until the source runs dry, a cycle limit is hit, or a
    /// fatal error occurs
    ///
    /// The actuator is stopped on every exit path.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        actuator: &mut dyn Actuator,
        options: RunOptions,
    ) -> Result<RunSummary> {
        info!("Starting main tracking loop");
        let mut summary = RunSummary::default();

        let outcome = loop {
            if options.max_cycles.is_some_and(|max| summary.cycles >= max) {
                info!("Cycle limit reached");
                break Ok(());
            }

            let reading = match source.read() {
                Ok(Some(reading)) => reading,
                Ok(None) => {
                    info!("End of sensor data reached");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };

            let report = match self.cycle(reading, actuator) {
                Ok(report) => report,
                Err(e) => break Err(e),
            };

            summary.cycles += 1;
            match report.step.event {
                Some(LifecycleEvent::Arrived) => summary.arrivals += 1,
                Some(LifecycleEvent::Departed) => summary.departures += 1,
                Some(LifecycleEvent::HazardWarning) => summary.hazards += 1,
                None => {}
            }

            if options.realtime {
                if let Some(settle) = report.settle {
                    thread::sleep(settle);
                }
                thread::sleep(self.config.timing.measurement_interval());
            }
        };

        summary.final_state = self.tracker.state();

        if let Err(e) = &outcome {
            if e.is_fatal() {
                error!("Fatal error, shutting down: {}", e);
            } else {
                error!("Tracking loop failed: {}", e);
            }
        }
        if let Err(stop) = actuator.stop() {
            warn!("Failed to stop servo: {}", stop);
        }
        info!("Application shutting down after {} cycles", summary.cycles);

        outcome.map(|()| summary)
    }
}
