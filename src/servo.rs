//! Servo geometry, position control and the actuator seam.
//!
//! Positions are pulse widths in microseconds. Whether a larger pulse turns
//! the head clockwise depends on the servo model, so all direction-aware
//! arithmetic goes through [`Handedness`].

use crate::{
    pid::{PidController, PidGains},
    utils::safe_cast::f64_round_to_i32_clamp,
    Result,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction the head turns in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    /// Clockwise, seen from above
    Clockwise,
    /// Counter-clockwise, seen from above
    CounterClockwise,
}

impl Rotation {
    /// The opposite rotation
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }

    const fn sign(self) -> i32 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

/// Relationship between pulse width and rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    /// Increasing the pulse width turns the head clockwise
    #[default]
    LowToHighIsClockwise,
    /// Increasing the pulse width turns the head counter-clockwise
    HighToLowIsClockwise,
}

impl Handedness {
    /// Pulse-width sign of a rotation
    #[must_use]
    pub const fn pulse_sign(self, rotation: Rotation) -> i32 {
        let clockwise = match self {
            Self::LowToHighIsClockwise => 1,
            Self::HighToLowIsClockwise => -1,
        };
        clockwise * rotation.sign()
    }

    /// Pulse width reached by turning `distance` microseconds in `rotation`
    #[must_use]
    pub const fn rotate(self, micros: i32, rotation: Rotation, distance: i32) -> i32 {
        micros + self.pulse_sign(rotation) * distance
    }

    /// Travel limit the head runs into when turning in `rotation`
    #[must_use]
    pub const fn travel_limit(self, limits: &ServoLimits, rotation: Rotation) -> i32 {
        let (low, high) = limits.bounds();
        if self.pulse_sign(rotation) > 0 {
            high
        } else {
            low
        }
    }

    /// Whether `micros` is at or past the travel limit for `rotation`
    #[must_use]
    pub const fn at_limit(self, limits: &ServoLimits, micros: i32, rotation: Rotation) -> bool {
        let limit = self.travel_limit(limits, rotation);
        if self.pulse_sign(rotation) > 0 {
            micros >= limit
        } else {
            micros <= limit
        }
    }
}

/// A realized servo position, always inside the limits and on the granularity grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServoAngle(i32);

impl ServoAngle {
    /// Pulse width in microseconds
    #[must_use]
    pub const fn micros(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ServoAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Physical travel range of the servo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoLimits {
    /// Smallest pulse width
    pub low_us: i32,
    /// Largest pulse width
    pub high_us: i32,
    /// Pulse width that faces the head straight ahead
    pub center_us: i32,
    /// Pulse widths are multiples of this
    pub granularity_us: i32,
}

impl ServoLimits {
    /// Head facing straight ahead
    #[must_use]
    pub fn center(&self) -> ServoAngle {
        self.settle(f64::from(self.center_us))
    }

    /// Travel range as `(low, high)`, swapped if the limits were given reversed
    #[must_use]
    pub const fn bounds(&self) -> (i32, i32) {
        if self.low_us <= self.high_us {
            (self.low_us, self.high_us)
        } else {
            (self.high_us, self.low_us)
        }
    }

    /// Clamp a requested pulse width into range and quantize it
    ///
    /// Values are rounded to the nearest granularity multiple, ties rounding up.
    /// Non-finite requests resolve to the center.
    #[must_use]
    pub fn settle(&self, requested: f64) -> ServoAngle {
        let (low_us, high_us) = self.bounds();
        let low = f64::from(low_us);
        let high = f64::from(high_us);
        let step = f64::from(self.granularity_us.max(1));

        let clamped = if requested.is_finite() {
            requested.clamp(low, high)
        } else {
            f64::from(self.center_us)
        };

        let remainder = clamped.rem_euclid(step);
        let quantized = if remainder < step / 2.0 {
            clamped - remainder
        } else {
            clamped - remainder + step
        };

        ServoAngle(f64_round_to_i32_clamp(quantized, low_us, high_us))
    }

    /// Integer convenience for [`ServoLimits::settle`]
    #[must_use]
    pub fn settle_micros(&self, requested: i32) -> ServoAngle {
        self.settle(f64::from(requested))
    }

    /// Whether a pulse width lies inside the travel range
    #[must_use]
    pub const fn contains(&self, micros: i32) -> bool {
        let (low, high) = self.bounds();
        micros >= low && micros <= high
    }
}

/// Hardware that physically pulses the servo
pub trait Actuator {
    /// Drive the servo to a position
    fn set_pulse_width(&mut self, angle: ServoAngle) -> Result<()>;

    /// Stop driving the servo
    fn stop(&mut self) -> Result<()>;
}

/// Actuator that only logs the pulses it would send
#[derive(Debug, Default)]
pub struct LoggingActuator {
    last: Option<ServoAngle>,
    pulses: usize,
}

impl LoggingActuator {
    /// Create an idle logging actuator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last commanded position
    #[must_use]
    pub const fn last(&self) -> Option<ServoAngle> {
        self.last
    }

    /// Number of pulse commands received
    #[must_use]
    pub const fn pulses(&self) -> usize {
        self.pulses
    }
}

impl Actuator for LoggingActuator {
    fn set_pulse_width(&mut self, angle: ServoAngle) -> Result<()> {
        debug!("SERVO_PULSE: {}", angle);
        self.last = Some(angle);
        self.pulses += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        info!("Servo stopped after {} pulses", self.pulses);
        self.last = None;
        Ok(())
    }
}

/// Feedback controller turning target pulse widths into servo positions
#[derive(Debug, Clone)]
pub struct ServoController {
    limits: ServoLimits,
    pid: PidController,
    minimum_error: f64,
}

impl ServoController {
    /// Create a controller
    #[must_use]
    pub const fn new(limits: ServoLimits, gains: PidGains, minimum_error: f64) -> Self {
        Self {
            limits,
            pid: PidController::new(gains),
            minimum_error,
        }
    }

    /// Travel range in use
    #[must_use]
    pub const fn limits(&self) -> &ServoLimits {
        &self.limits
    }

    /// PID state
    #[must_use]
    pub const fn pid(&self) -> &PidController {
        &self.pid
    }

    /// Move from `current` toward `target`
    ///
    /// Corrections no larger than the minimum error leave the head where it is.
    /// The caller must let the head settle before trusting the next frame.
    pub fn move_toward(&mut self, target: i32, current: ServoAngle) -> ServoAngle {
        let position = servo_move(target, current, &mut self.pid, &self.limits, self.minimum_error);
        debug!("SERVO_MOVE: {}", position);
        position
    }

    /// Go straight to a pulse width, bypassing the PID loop
    ///
    /// A request of zero re-centers the head.
    #[must_use]
    pub fn set_position(&self, requested: i32) -> ServoAngle {
        let position = if requested == 0 {
            self.limits.center()
        } else {
            self.limits.settle_micros(requested)
        };
        debug!("SERVO_MOVE: {}", position);
        position
    }
}

/// One controller update: PID correction applied in pulse-width space
///
/// Handedness is deliberately not applied here. The estimator and the roam
/// planner already fold the direction sign into `target`, so the correction
/// is added as-is for either handedness. Applying it again would turn the
/// head away from the person on counter-clockwise mounts.
pub fn servo_move(
    target: i32,
    current: ServoAngle,
    pid: &mut PidController,
    limits: &ServoLimits,
    minimum_error: f64,
) -> ServoAngle {
    pid.set_point(f64::from(target));
    let correction = pid.update(f64::from(current.micros()));
    debug!(
        "Des Pos: {} Cur Pos: {} PID Error: {:.1}",
        target,
        current.micros(),
        correction
    );

    if correction.abs() > minimum_error {
        limits.settle(f64::from(current.micros()) + correction)
    } else {
        limits.settle_micros(current.micros())
    }
}
