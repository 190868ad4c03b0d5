//! Proportional-integral-derivative controller for head positioning.

use crate::constants::{
    DEFAULT_PID_INTEGRATOR_MAX, DEFAULT_PID_INTEGRATOR_MIN, DEFAULT_PID_KD, DEFAULT_PID_KI,
    DEFAULT_PID_KP,
};
use serde::{Deserialize, Serialize};

/// Controller gains and integrator windup bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Lower bound of the accumulated error
    pub integrator_min: f64,
    /// Upper bound of the accumulated error
    pub integrator_max: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: DEFAULT_PID_KP,
            ki: DEFAULT_PID_KI,
            kd: DEFAULT_PID_KD,
            integrator_min: DEFAULT_PID_INTEGRATOR_MIN,
            integrator_max: DEFAULT_PID_INTEGRATOR_MAX,
        }
    }
}

/// Discrete PID controller
///
/// Choosing a new set point clears the integral and derivative memory, so
/// accumulation only spans updates toward the same target.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    set_point: f64,
    integrator: f64,
    derivator: f64,
    last_error: f64,
    last_process_variable: f64,
}

impl PidController {
    /// Create a controller with a zero set point
    #[must_use]
    pub const fn new(gains: PidGains) -> Self {
        Self {
            gains,
            set_point: 0.0,
            integrator: 0.0,
            derivator: 0.0,
            last_error: 0.0,
            last_process_variable: 0.0,
        }
    }

    /// Set the desired value and clear accumulated history
    pub fn set_point(&mut self, set_point: f64) {
        self.set_point = set_point;
        self.integrator = 0.0;
        self.derivator = 0.0;
    }

    /// Feed the current process variable and return the control output
    pub fn update(&mut self, process_variable: f64) -> f64 {
        let error = self.set_point - process_variable;

        let p_value = self.gains.kp * error;
        let d_value = self.gains.kd * (error - self.derivator);
        self.derivator = error;

        self.integrator = (self.integrator + error)
            .min(self.gains.integrator_max)
            .max(self.gains.integrator_min);
        let i_value = self.integrator * self.gains.ki;

        self.last_error = error;
        self.last_process_variable = process_variable;

        p_value + i_value + d_value
    }

    /// Error seen by the most recent update
    #[must_use]
    pub const fn last_error(&self) -> f64 {
        self.last_error
    }

    /// Process variable seen by the most recent update
    #[must_use]
    pub const fn last_process_variable(&self) -> f64 {
        self.last_process_variable
    }

    /// Accumulated (clamped) error
    #[must_use]
    pub const fn integral(&self) -> f64 {
        self.integrator
    }

    /// Gains in use
    #[must_use]
    pub const fn gains(&self) -> &PidGains {
        &self.gains
    }
}
