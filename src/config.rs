//! Configuration management for the thermal head tracker

use crate::{
    classifier::FrameClassifier,
    constants::{
        DEFAULT_BURN_HAZARD_TEMP, DEFAULT_PERSON_TEMP_THRESHOLD, DEFAULT_SERVO_CENTER_US,
        DEFAULT_SERVO_HIGH_US, DEFAULT_SERVO_LOW_US, MEASUREMENT_WAIT_PERIOD,
        MINIMUM_ERROR_GRANULARITY, MINIMUM_SERVO_GRANULARITY, ROAMING_GRANULARITY, ROAM_MAX,
        SETTLE_FACTOR,
    },
    d6t::PacketDecoder,
    estimator::{OffsetTable, PositionEstimator},
    frame::TemperatureUnit,
    pid::PidGains,
    roam::{RoamMode, RoamPlanner},
    servo::{Handedness, ServoController, ServoLimits},
    tracker::{PersonTracker, TrackerThresholds},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Thermal sensor configuration
    pub sensor: SensorConfig,

    /// Servo and position control configuration
    pub servo: ServoConfig,

    /// Position estimator offsets
    pub estimator: EstimatorConfig,

    /// Person tracker thresholds
    pub tracker: TrackerThresholds,

    /// Idle roaming configuration
    pub roam: RoamConfig,

    /// Loop timing
    pub timing: TimingConfig,
}

/// Thermal sensor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Cells hotter than this count as a person
    pub person_threshold: f64,

    /// Cells hotter than this are a burn hazard
    pub burn_threshold: f64,

    /// When set, the person threshold is `ambient + margin`
    pub ambient_margin: Option<f64>,

    /// Unit all temperatures above are expressed in
    pub unit: TemperatureUnit,

    /// Reject packets whose error code does not match
    pub verify_pec: bool,
}

/// Servo parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Drive the servo; when false positions are only tracked
    pub enabled: bool,

    /// Pulse width to rotation relationship
    pub handedness: Handedness,

    /// Smallest pulse width (microseconds)
    pub low_us: i32,

    /// Largest pulse width (microseconds)
    pub high_us: i32,

    /// Straight-ahead pulse width (microseconds)
    pub center_us: i32,

    /// Pulse width step (microseconds)
    pub granularity_us: i32,

    /// PID outputs at or below this do not move the head
    pub minimum_error: f64,

    /// PID gains and windup bounds
    pub pid: PidGains,
}

/// Position estimator parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Head offsets per estimate tier
    pub offsets: OffsetTable,

    /// Let the two-hit estimator follow a single inner column
    pub two_hit_single_column: bool,
}

/// Roaming parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoamConfig {
    /// Idle motion style
    pub mode: RoamMode,

    /// Roam steps before the head parks at center
    pub roam_max: u32,

    /// Sweep step (microseconds)
    pub granularity_us: i32,

    /// Seed for random roaming; entropy when absent
    pub seed: Option<u64>,
}

/// Loop timing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Seconds between measurements
    pub measurement_wait_secs: f64,

    /// Multiple of the measurement wait to pause after a move
    pub settle_factor: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            person_threshold: DEFAULT_PERSON_TEMP_THRESHOLD,
            burn_threshold: DEFAULT_BURN_HAZARD_TEMP,
            ambient_margin: None,
            unit: TemperatureUnit::Fahrenheit,
            verify_pec: true,
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            handedness: Handedness::LowToHighIsClockwise,
            low_us: DEFAULT_SERVO_LOW_US,
            high_us: DEFAULT_SERVO_HIGH_US,
            center_us: DEFAULT_SERVO_CENTER_US,
            granularity_us: MINIMUM_SERVO_GRANULARITY,
            minimum_error: MINIMUM_ERROR_GRANULARITY,
            pid: PidGains::default(),
        }
    }
}

impl Default for RoamConfig {
    fn default() -> Self {
        Self {
            mode: RoamMode::Still,
            roam_max: ROAM_MAX,
            granularity_us: ROAMING_GRANULARITY,
            seed: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            measurement_wait_secs: MEASUREMENT_WAIT_PERIOD,
            settle_factor: SETTLE_FACTOR,
        }
    }
}

impl ServoConfig {
    /// Travel range described by this section
    #[must_use]
    pub const fn limits(&self) -> ServoLimits {
        ServoLimits {
            low_us: self.low_us,
            high_us: self.high_us,
            center_us: self.center_us,
            granularity_us: self.granularity_us,
        }
    }
}

impl TimingConfig {
    /// Pause between measurements
    #[must_use]
    pub fn measurement_interval(&self) -> Duration {
        Duration::from_secs_f64(self.measurement_wait_secs.max(0.0))
    }

    /// Pause after a head move before the next frame can be trusted
    #[must_use]
    pub fn settle_interval(&self) -> Duration {
        Duration::from_secs_f64((self.measurement_wait_secs * self.settle_factor).max(0.0))
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Frame classifier for the sensor section
    #[must_use]
    pub const fn create_classifier(&self) -> FrameClassifier {
        FrameClassifier::new(self.sensor.person_threshold, self.sensor.burn_threshold)
            .with_ambient_margin(self.sensor.ambient_margin)
    }

    /// Packet decoder for the sensor section
    #[must_use]
    pub const fn create_decoder(&self) -> PacketDecoder {
        PacketDecoder::new(self.sensor.unit, self.sensor.verify_pec)
    }

    /// Servo controller for the servo section
    #[must_use]
    pub const fn create_servo(&self) -> ServoController {
        ServoController::new(self.servo.limits(), self.servo.pid, self.servo.minimum_error)
    }

    /// Person tracker wired with estimator, roaming and thresholds
    #[must_use]
    pub fn create_tracker(&self) -> PersonTracker {
        let handedness = self.servo.handedness;
        let estimator = PositionEstimator::new(
            self.estimator.offsets,
            handedness,
            self.estimator.two_hit_single_column,
        );
        let roam = RoamPlanner::new(
            self.roam.mode,
            self.roam.roam_max,
            self.roam.granularity_us,
            handedness,
            self.servo.limits(),
            self.roam.seed,
        );
        PersonTracker::new(estimator, roam, self.tracker)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Validate sensor thresholds
        if !self.sensor.person_threshold.is_finite() || !self.sensor.burn_threshold.is_finite() {
            return Err(Error::ConfigError("Sensor thresholds must be finite".to_string()));
        }
        if self.sensor.person_threshold >= self.sensor.burn_threshold {
            return Err(Error::ConfigError(
                "Person threshold must be below the burn threshold".to_string(),
            ));
        }
        if let Some(margin) = self.sensor.ambient_margin {
            if !margin.is_finite() {
                return Err(Error::ConfigError("Ambient margin must be finite".to_string()));
            }
        }

        // Validate servo geometry
        let servo = &self.servo;
        if servo.granularity_us <= 0 {
            return Err(Error::ConfigError(
                "Servo granularity must be greater than 0".to_string(),
            ));
        }
        if servo.low_us >= servo.high_us {
            return Err(Error::ConfigError(
                "Servo low limit must be below the high limit".to_string(),
            ));
        }
        if !(servo.low_us..=servo.high_us).contains(&servo.center_us) {
            return Err(Error::ConfigError(
                "Servo center must lie between the limits".to_string(),
            ));
        }
        for (name, value) in [
            ("low", servo.low_us),
            ("high", servo.high_us),
            ("center", servo.center_us),
        ] {
            if value % servo.granularity_us != 0 {
                return Err(Error::ConfigError(format!(
                    "Servo {} pulse width {} is not a multiple of the granularity {}",
                    name, value, servo.granularity_us
                )));
            }
        }
        if servo.minimum_error.is_nan() || servo.minimum_error < 0.0 {
            return Err(Error::ConfigError(
                "Minimum error must be non-negative".to_string(),
            ));
        }
        if servo.pid.integrator_min > servo.pid.integrator_max {
            return Err(Error::ConfigError(
                "PID integrator minimum must not exceed the maximum".to_string(),
            ));
        }

        // Validate roaming
        if self.roam.roam_max == 0 {
            return Err(Error::ConfigError("Roam max must be greater than 0".to_string()));
        }
        if self.roam.granularity_us <= 0 {
            return Err(Error::ConfigError(
                "Roaming granularity must be greater than 0".to_string(),
            ));
        }

        // Validate timing
        let timing = &self.timing;
        if !timing.measurement_wait_secs.is_finite() || timing.measurement_wait_secs <= 0.0 {
            return Err(Error::ConfigError(
                "Measurement wait must be a positive number of seconds".to_string(),
            ));
        }
        if !timing.settle_factor.is_finite() || timing.settle_factor < 0.0 {
            return Err(Error::ConfigError(
                "Settle factor must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Thermal Head Tracker Configuration

# Thermal sensor
sensor:
  person_threshold: 79.0
  burn_threshold: 100.0
  # ambient_margin: 6.0
  unit: fahrenheit
  verify_pec: true

# Servo and position control
servo:
  enabled: true
  handedness: low_to_high_is_clockwise
  low_us: 600
  high_us: 2300
  center_us: 1500
  granularity_us: 10
  minimum_error: 20.0
  pid:
    kp: 1.0
    ki: 0.1
    kd: 0.0
    integrator_min: -500.0
    integrator_max: 500.0

# Position estimator offsets (microseconds)
estimator:
  offsets:
    far_one: 240
    near_one: 100
    far_two: 170
    near_three: 30
  two_hit_single_column: false

# Person tracker
tracker:
  possible_person_max: 10
  person_hit_count: 4
  probable_person_thresh: 3

# Idle roaming
roam:
  mode: still
  roam_max: 600
  granularity_us: 50
  # seed: 42

# Loop timing
timing:
  measurement_wait_secs: 0.3
  settle_factor: 1.0
"#;
