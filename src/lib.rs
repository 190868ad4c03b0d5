//! Thermal person tracking for a servo-mounted robot head.
//!
//! A 4x4 thermal array sits on a head that can pan left and right. Every
//! measurement cycle the library:
//! 1. Classifies the sixteen cell temperatures into a four-column hit histogram
//! 2. Estimates where a person is relative to the head
//! 3. Advances a hysteresis state machine that decides between roaming,
//!    following a heat signature, and announcing arrivals or burn hazards
//! 4. Turns the decision into a bounded, quantized servo pulse width
//!
//! # Examples
//!
//! ## Single Cycle
//!
//! ```no_run
//! use thermal_head_tracker::{
//!     app::TrackerApp, config::Config, frame::ThermalFrame, servo::LoggingActuator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut app = TrackerApp::new(Config::default())?;
//! let mut actuator = LoggingActuator::new();
//!
//! let frame = ThermalFrame::uniform(72.0, 72.0);
//! let report = app.cycle(frame.into(), &mut actuator)?;
//! println!("{} at {}", report.step.state, report.servo);
//! # Ok(())
//! # }
//! ```
//!
//! ## Replaying a Capture
//!
//! ```no_run
//! use thermal_head_tracker::{
//!     app::{ReplaySource, RunOptions, TrackerApp},
//!     config::Config,
//!     servo::LoggingActuator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut source = ReplaySource::from_file("capture.hex", config.create_decoder())?;
//! let mut app = TrackerApp::new(config)?;
//! let summary = app.run(&mut source, &mut LoggingActuator::new(), RunOptions::default())?;
//! println!("{} arrivals in {} cycles", summary.arrivals, summary.cycles);
//! # Ok(())
//! # }
//! ```

/// Thermal frames and temperature units
pub mod frame;

/// Decoder for raw thermal sensor packets
pub mod d6t;

/// Frame classification into directional hit histograms
pub mod classifier;

/// Person position estimation from hit patterns
pub mod estimator;

/// PID controller
pub mod pid;

/// Servo geometry, position control and the actuator interface
pub mod servo;

/// Idle roaming while nobody is in view
pub mod roam;

/// Person tracking state machine
pub mod tracker;

/// Utility functions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
