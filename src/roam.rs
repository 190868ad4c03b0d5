//! Idle "looking around" while nobody is in view.

use crate::servo::{Handedness, Rotation, ServoAngle, ServoLimits};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How the head moves while roaming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoamMode {
    /// Hold position; only the periodic re-center happens
    #[default]
    Still,
    /// Sweep back and forth between the travel limits
    Sweep,
    /// Jump to a random position each step
    Random,
}

/// Roaming progress carried between cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoamState {
    /// Roam steps since the last reset
    pub roam_count: u32,
    /// Head position
    pub angle: ServoAngle,
    /// Current sweep direction
    pub direction: Rotation,
}

/// Plans idle head motion
#[derive(Debug, Clone)]
pub struct RoamPlanner {
    mode: RoamMode,
    roam_max: u32,
    granularity: i32,
    handedness: Handedness,
    limits: ServoLimits,
    rng: StdRng,
}

impl RoamPlanner {
    /// Create a planner; a seed makes random roaming reproducible
    #[must_use]
    pub fn new(
        mode: RoamMode,
        roam_max: u32,
        granularity: i32,
        handedness: Handedness,
        limits: ServoLimits,
        seed: Option<u64>,
    ) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            mode,
            roam_max,
            granularity,
            handedness,
            limits,
            rng,
        }
    }

    /// Roaming mode in use
    #[must_use]
    pub const fn mode(&self) -> RoamMode {
        self.mode
    }

    /// Direction a fresh sweep starts in: toward larger pulse widths
    #[must_use]
    pub const fn initial_direction(&self) -> Rotation {
        if self.handedness.pulse_sign(Rotation::Clockwise) > 0 {
            Rotation::Clockwise
        } else {
            Rotation::CounterClockwise
        }
    }

    /// Starting state: centered, nothing counted yet
    #[must_use]
    pub fn initial_state(&self) -> RoamState {
        RoamState {
            roam_count: 0,
            angle: self.limits.center(),
            direction: self.initial_direction(),
        }
    }

    /// Take one roam step
    ///
    /// Past `roam_max` steps the head is held at center; at twice that the
    /// count wraps to zero and roaming resumes.
    pub fn advance(&mut self, state: RoamState) -> RoamState {
        let roam_count = state.roam_count + 1;

        if roam_count > self.roam_max {
            let roam_count = if roam_count >= self.roam_max.saturating_mul(2) {
                0
            } else {
                roam_count
            };
            return RoamState {
                roam_count,
                angle: self.limits.center(),
                direction: state.direction,
            };
        }

        let direction =
            if self.handedness.at_limit(&self.limits, state.angle.micros(), state.direction) {
                state.direction.reversed()
            } else {
                state.direction
            };

        let requested = match self.mode {
            RoamMode::Still => state.angle.micros(),
            RoamMode::Sweep => {
                self.handedness
                    .rotate(state.angle.micros(), direction, self.granularity)
            }
            RoamMode::Random => {
                let (low, high) = self.limits.bounds();
                self.rng.gen_range(low..=high)
            }
        };
        let angle = self.limits.settle_micros(requested);

        debug!(
            "SERVO_ROAM Pos: {} Direction: {:?} count: {}",
            angle, direction, roam_count
        );

        RoamState {
            roam_count,
            angle,
            direction,
        }
    }

    /// Tuple form of [`RoamPlanner::advance`]
    pub fn roam_step(
        &mut self,
        roam_count: u32,
        angle: ServoAngle,
        direction: Rotation,
    ) -> (u32, ServoAngle, Rotation) {
        let next = self.advance(RoamState {
            roam_count,
            angle,
            direction,
        });
        (next.roam_count, next.angle, next.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: ServoLimits = ServoLimits {
        low_us: 600,
        high_us: 2300,
        center_us: 1500,
        granularity_us: 10,
    };

    fn planner(mode: RoamMode, roam_max: u32) -> RoamPlanner {
        RoamPlanner::new(mode, roam_max, 50, Handedness::LowToHighIsClockwise, LIMITS, Some(7))
    }

    #[test]
    fn test_sweep_steps_and_flips() {
        let mut roam = planner(RoamMode::Sweep, 1000);
        let mut state = roam.initial_state();
        assert_eq!(state.direction, Rotation::Clockwise);

        state = roam.advance(state);
        assert_eq!(state.angle.micros(), 1550);
        assert_eq!(state.roam_count, 1);

        // 1500 -> 2300 takes 16 steps
        for _ in 0..15 {
            state = roam.advance(state);
        }
        assert_eq!(state.angle.micros(), 2300);
        assert_eq!(state.direction, Rotation::Clockwise);

        state = roam.advance(state);
        assert_eq!(state.direction, Rotation::CounterClockwise);
        assert_eq!(state.angle.micros(), 2250);
    }

    #[test]
    fn test_random_roam_with_reversed_limits() {
        let reversed = ServoLimits {
            low_us: 2300,
            high_us: 600,
            ..LIMITS
        };
        let mut roam =
            RoamPlanner::new(RoamMode::Random, 1000, 50, Handedness::LowToHighIsClockwise, reversed, Some(3));
        let mut state = roam.initial_state();
        for _ in 0..100 {
            state = roam.advance(state);
            assert!((600..=2300).contains(&state.angle.micros()));
            assert_eq!(state.angle.micros() % 10, 0);
        }
    }

    #[test]
    fn test_reversed_handedness_sweeps_the_other_way() {
        let mut roam =
            RoamPlanner::new(RoamMode::Sweep, 100, 50, Handedness::HighToLowIsClockwise, LIMITS, None);
        let state = roam.initial_state();
        assert_eq!(state.direction, Rotation::CounterClockwise);
        assert_eq!(roam.advance(state).angle.micros(), 1550);
    }

    #[test]
    fn test_recenter_and_reset() {
        let roam_max = 5;
        let mut roam = planner(RoamMode::Sweep, roam_max);
        let mut state = roam.initial_state();
        for _ in 0..roam_max {
            state = roam.advance(state);
        }
        assert_eq!(state.roam_count, roam_max);
        assert_eq!(state.angle.micros(), 1750);

        state = roam.advance(state);
        assert_eq!(state.angle, LIMITS.center());
        assert_eq!(state.roam_count, roam_max + 1);

        for _ in roam_max + 1..2 * roam_max - 1 {
            state = roam.advance(state);
            assert_eq!(state.angle, LIMITS.center());
        }
        assert_eq!(state.roam_count, 2 * roam_max - 1);

        state = roam.advance(state);
        assert_eq!(state.roam_count, 0);
        assert_eq!(state.angle, LIMITS.center());

        state = roam.advance(state);
        assert_eq!(state.roam_count, 1);
        assert_eq!(state.angle.micros(), 1550);
    }

    #[test]
    fn test_random_stays_in_bounds() {
        let mut roam = planner(RoamMode::Random, 10_000);
        let mut state = roam.initial_state();
        for _ in 0..500 {
            state = roam.advance(state);
            assert!(LIMITS.contains(state.angle.micros()));
            assert_eq!(state.angle.micros() % 10, 0);
        }
    }

    #[test]
    fn test_still_mode_holds_position() {
        let mut roam = planner(RoamMode::Still, 3);
        let start = RoamState {
            roam_count: 0,
            angle: LIMITS.settle_micros(900),
            direction: Rotation::Clockwise,
        };
        let (count, angle, _) = roam.roam_step(start.roam_count, start.angle, start.direction);
        assert_eq!(count, 1);
        assert_eq!(angle.micros(), 900);
    }
}
