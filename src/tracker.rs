//! Person tracking state machine.
//!
//! Each cycle consumes one [`Classification`] and decides whether to roam,
//! follow a heat signature, or raise a lifecycle event. Confidence climbs
//! through `Nothing -> Possible -> Likely -> Probable -> Detected` and drops
//! back as the signal weakens. A burn hazard preempts every state.

use crate::{
    classifier::Classification,
    constants::{PERSON_HIT_COUNT, POSSIBLE_PERSON_MAX, PROBABLE_PERSON_THRESH},
    estimator::PositionEstimator,
    roam::{RoamPlanner, RoamState},
    servo::{Rotation, ServoAngle},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence that a person is in view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PersonState {
    /// No heat signature
    #[default]
    Nothing,
    /// Weak or single-cell signal
    Possible,
    /// Signal across several cells
    Likely,
    /// Strong signal, waiting to confirm arrival
    Probable,
    /// Person confirmed present
    Detected,
    /// Something too hot to be a person
    Burn,
}

impl fmt::Display for PersonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nothing => "NOTHING",
            Self::Possible => "POSSIBLE",
            Self::Likely => "LIKELY",
            Self::Probable => "PROBABLE",
            Self::Detected => "DETECTED",
            Self::Burn => "BURN",
        };
        f.write_str(name)
    }
}

/// Events the host turns into audio/visual cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// A person has been confirmed
    Arrived,
    /// A confirmed person left
    Departed,
    /// A burn hazard appeared (once per hazard episode)
    HazardWarning,
}

/// Head movement requested by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoCommand {
    /// Follow a person: feed `target` through the PID loop
    Track {
        /// Estimated person position (unclamped pulse width)
        target: i32,
    },
    /// Go directly to an already-valid position (roaming)
    Position(ServoAngle),
}

/// Tracker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerThresholds {
    /// One-hit detections tolerated before the head follows them
    pub possible_person_max: u32,
    /// Hit count above which a signal is treated as a person
    pub person_hit_count: u32,
    /// Confirmed strong detections needed before announcing arrival
    pub probable_person_thresh: u32,
}

impl Default for TrackerThresholds {
    fn default() -> Self {
        Self {
            possible_person_max: POSSIBLE_PERSON_MAX,
            person_hit_count: PERSON_HIT_COUNT,
            probable_person_thresh: PROBABLE_PERSON_THRESH,
        }
    }
}

/// Everything the tracker remembers between cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerContext {
    /// Current state
    pub state: PersonState,
    /// State before the most recent step
    pub previous_state: PersonState,
    /// Hits in the latest frame
    pub hit_count: u32,
    /// Hits in the frame before that
    pub previous_hit_count: u32,
    /// One-hit detections while `Possible`
    pub possible_person: u32,
    /// Strong detections while `Probable`
    pub probable_person: u32,
    /// Cycles spent `Detected`
    pub person_detect_count: u32,
    /// Cycles without a confirmed person
    pub no_person_count: u32,
    /// Roam steps since the last reset
    pub roam_count: u32,
    /// Cycles spent in the current burn episode
    pub burn_count: u32,
    /// Last realized head position
    pub servo_angle: ServoAngle,
    /// Roam sweep direction
    pub roam_direction: Rotation,
}

impl TrackerContext {
    /// Fresh context with the head at `servo_angle`
    #[must_use]
    pub const fn new(servo_angle: ServoAngle, roam_direction: Rotation) -> Self {
        Self {
            state: PersonState::Nothing,
            previous_state: PersonState::Nothing,
            hit_count: 0,
            previous_hit_count: 0,
            possible_person: 0,
            probable_person: 0,
            person_detect_count: 0,
            no_person_count: 0,
            roam_count: 0,
            burn_count: 0,
            servo_angle,
            roam_direction,
        }
    }

    /// Both this frame and the previous one saw something
    const fn has_signal(&self) -> bool {
        self.hit_count > 0 && self.previous_hit_count > 0
    }
}

/// Outcome of one tracker cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStep {
    /// State after the cycle
    pub state: PersonState,
    /// Head movement to perform, if any
    pub command: Option<ServoCommand>,
    /// Lifecycle event to announce, if any
    pub event: Option<LifecycleEvent>,
}

/// The person tracking state machine
#[derive(Debug, Clone)]
pub struct PersonTracker {
    context: TrackerContext,
    estimator: PositionEstimator,
    roam: RoamPlanner,
    thresholds: TrackerThresholds,
}

impl PersonTracker {
    /// Create a tracker with the head at its roaming start position
    #[must_use]
    pub fn new(estimator: PositionEstimator, roam: RoamPlanner, thresholds: TrackerThresholds) -> Self {
        let start = roam.initial_state();
        Self {
            context: TrackerContext::new(start.angle, start.direction),
            estimator,
            roam,
            thresholds,
        }
    }

    /// Tracker memory
    #[must_use]
    pub const fn context(&self) -> &TrackerContext {
        &self.context
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> PersonState {
        self.context.state
    }

    /// Report where the head actually ended up after a command
    pub fn observe_servo(&mut self, angle: ServoAngle) {
        self.context.servo_angle = angle;
    }

    /// Run one cycle of the state machine
    pub fn step(&mut self, classification: &Classification) -> TrackerStep {
        let ctx = &mut self.context;
        ctx.previous_hit_count = ctx.hit_count;
        ctx.hit_count = classification.hit_count;

        let entered = ctx.state;
        if classification.burn_detected {
            ctx.state = PersonState::Burn;
        }

        debug!(
            "STATE: {} hits: {} previous: {} servo: {}",
            ctx.state, ctx.hit_count, ctx.previous_hit_count, ctx.servo_angle
        );

        let current = ctx.state;
        let step = match current {
            PersonState::Burn => self.burn(classification),
            PersonState::Nothing => self.nothing(),
            PersonState::Possible => self.possible(classification),
            PersonState::Likely => self.likely(classification),
            PersonState::Probable => self.probable(classification),
            PersonState::Detected => self.detected(classification),
        };

        self.transition(entered, step.state);
        step
    }

    fn transition(&mut self, entered: PersonState, next: PersonState) {
        let ctx = &mut self.context;
        let current = ctx.state;

        if next != current {
            match current {
                PersonState::Probable => ctx.probable_person = 0,
                PersonState::Burn => ctx.burn_count = 0,
                _ => {}
            }
        }
        if next != entered {
            info!("Person state {} -> {}", entered, next);
        }

        ctx.previous_state = entered;
        ctx.state = next;
    }

    fn burn(&mut self, classification: &Classification) -> TrackerStep {
        let ctx = &mut self.context;
        ctx.roam_count = 0;
        ctx.possible_person = 0;
        ctx.burn_count += 1;

        let event = if ctx.burn_count == 1 {
            warn!(
                "Burn hazard temperature is {:.1} degrees",
                classification.max_temperature
            );
            Some(LifecycleEvent::HazardWarning)
        } else {
            None
        };

        let state = if classification.burn_detected {
            PersonState::Burn
        } else {
            PersonState::Nothing
        };

        TrackerStep {
            state,
            command: None,
            event,
        }
    }

    fn nothing(&mut self) -> TrackerStep {
        let ctx = &mut self.context;
        ctx.no_person_count += 1;
        ctx.person_detect_count = 0;
        ctx.possible_person = 0;
        ctx.probable_person = 0;
        ctx.burn_count = 0;

        let state = if ctx.has_signal() {
            PersonState::Possible
        } else {
            PersonState::Nothing
        };

        let roamed = self.roam.advance(RoamState {
            roam_count: ctx.roam_count,
            angle: ctx.servo_angle,
            direction: ctx.roam_direction,
        });
        ctx.roam_count = roamed.roam_count;
        ctx.roam_direction = roamed.direction;
        ctx.servo_angle = roamed.angle;

        TrackerStep {
            state,
            command: Some(ServoCommand::Position(roamed.angle)),
            event: None,
        }
    }

    fn possible(&mut self, classification: &Classification) -> TrackerStep {
        let ctx = &mut self.context;
        ctx.burn_count = 0;
        ctx.no_person_count += 1;

        if !ctx.has_signal() {
            return Self::advance_to(PersonState::Nothing, None);
        }
        if ctx.hit_count > 1 {
            return Self::advance_to(PersonState::Likely, None);
        }

        let estimate = self
            .estimator
            .one_hit(&classification.histogram, ctx.servo_angle);
        if !estimate.detected {
            return Self::advance_to(PersonState::Nothing, None);
        }

        ctx.possible_person += 1;
        let command = if ctx.possible_person > self.thresholds.possible_person_max {
            ctx.possible_person = 0;
            Some(ServoCommand::Track {
                target: estimate.target,
            })
        } else {
            None
        };
        Self::advance_to(PersonState::Possible, command)
    }

    fn likely(&mut self, classification: &Classification) -> TrackerStep {
        let ctx = &mut self.context;
        ctx.burn_count = 0;
        ctx.possible_person = 0;
        ctx.no_person_count += 1;

        if !ctx.has_signal() {
            return Self::advance_to(PersonState::Nothing, None);
        }

        let estimate = self
            .estimator
            .two_hit(&classification.histogram, ctx.servo_angle);
        let (mut state, command) = if estimate.detected {
            (
                PersonState::Likely,
                Some(ServoCommand::Track {
                    target: estimate.target,
                }),
            )
        } else {
            (PersonState::Possible, None)
        };

        if ctx.hit_count > self.thresholds.person_hit_count {
            state = PersonState::Probable;
        }
        Self::advance_to(state, command)
    }

    fn probable(&mut self, classification: &Classification) -> TrackerStep {
        let ctx = &mut self.context;
        ctx.burn_count = 0;
        ctx.possible_person = 0;

        if !ctx.has_signal() {
            return Self::advance_to(PersonState::Likely, None);
        }

        if ctx.hit_count == 1 {
            let estimate = self
                .estimator
                .one_hit(&classification.histogram, ctx.servo_angle);
            return if estimate.detected {
                Self::advance_to(
                    PersonState::Probable,
                    Some(ServoCommand::Track {
                        target: estimate.target,
                    }),
                )
            } else {
                Self::advance_to(PersonState::Likely, None)
            };
        }

        let estimate = self
            .estimator
            .two_hit(&classification.histogram, ctx.servo_angle);
        if !estimate.detected {
            return Self::advance_to(PersonState::Likely, None);
        }

        let command = Some(ServoCommand::Track {
            target: estimate.target,
        });
        ctx.probable_person += 1;
        if ctx.probable_person > self.thresholds.probable_person_thresh {
            info!("Hello person!");
            ctx.probable_person = 0;
            return TrackerStep {
                state: PersonState::Detected,
                command,
                event: Some(LifecycleEvent::Arrived),
            };
        }
        Self::advance_to(PersonState::Probable, command)
    }

    fn detected(&mut self, classification: &Classification) -> TrackerStep {
        let ctx = &mut self.context;
        ctx.burn_count = 0;
        ctx.roam_count = 0;
        ctx.no_person_count = 0;
        ctx.possible_person = 0;
        ctx.person_detect_count += 1;
        debug!(
            "Person_count: {} Max: {:.1} Servo: {}",
            ctx.person_detect_count, classification.max_temperature, ctx.servo_angle
        );

        if !ctx.has_signal() {
            info!("Goodbye person!");
            return TrackerStep {
                state: PersonState::Nothing,
                command: None,
                event: Some(LifecycleEvent::Departed),
            };
        }
        if ctx.hit_count <= self.thresholds.person_hit_count {
            return Self::advance_to(PersonState::Possible, None);
        }

        let estimate = self
            .estimator
            .two_hit(&classification.histogram, ctx.servo_angle);
        if estimate.detected {
            Self::advance_to(
                PersonState::Detected,
                Some(ServoCommand::Track {
                    target: estimate.target,
                }),
            )
        } else {
            Self::advance_to(PersonState::Likely, None)
        }
    }

    const fn advance_to(state: PersonState, command: Option<ServoCommand>) -> TrackerStep {
        TrackerStep {
            state,
            command,
            event: None,
        }
    }
}

/// Run one tracker cycle from raw classifier outputs
pub fn tracker_step(tracker: &mut PersonTracker, classification: &Classification) -> TrackerStep {
    tracker.step(classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifier::HitHistogram,
        estimator::OffsetTable,
        roam::RoamMode,
        servo::{Handedness, ServoLimits},
    };

    const LIMITS: ServoLimits = ServoLimits {
        low_us: 600,
        high_us: 2300,
        center_us: 1500,
        granularity_us: 10,
    };

    fn tracker_with(mode: RoamMode) -> PersonTracker {
        let handedness = Handedness::LowToHighIsClockwise;
        PersonTracker::new(
            PositionEstimator::new(OffsetTable::default(), handedness, false),
            RoamPlanner::new(mode, 600, 50, handedness, LIMITS, Some(1)),
            TrackerThresholds::default(),
        )
    }

    fn tracker() -> PersonTracker {
        tracker_with(RoamMode::Still)
    }

    fn frame(columns: [u32; 4], hit_count: u32) -> Classification {
        Classification {
            histogram: HitHistogram::new(columns),
            hit_count,
            burn_detected: false,
            max_temperature: 85.0,
        }
    }

    fn burning() -> Classification {
        Classification {
            histogram: HitHistogram::new([0, 10, 0, 0]),
            hit_count: 1,
            burn_detected: true,
            max_temperature: 130.0,
        }
    }

    fn quiet() -> Classification {
        frame([0, 0, 0, 0], 0)
    }

    fn strong() -> Classification {
        frame([0, 3, 2, 0], 5)
    }

    /// Drive a tracker into `Detected`, returning the events seen on the way
    fn drive_to_detected(tracker: &mut PersonTracker) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        for _ in 0..20 {
            let step = tracker.step(&strong());
            events.extend(step.event);
            if step.state == PersonState::Detected {
                break;
            }
        }
        events
    }

    #[test]
    fn test_quiet_stays_nothing() {
        let mut tracker = tracker();
        for _ in 0..2 {
            let step = tracker.step(&quiet());
            assert_eq!(step.state, PersonState::Nothing);
            assert_eq!(step.event, None);
        }
        assert_eq!(tracker.context().no_person_count, 2);
        assert_eq!(tracker.context().roam_count, 2);
    }

    #[test]
    fn test_single_blip_is_ignored() {
        let mut tracker = tracker();
        assert_eq!(tracker.step(&frame([0, 1, 0, 0], 1)).state, PersonState::Nothing);
        assert_eq!(tracker.step(&quiet()).state, PersonState::Nothing);
    }

    #[test]
    fn test_arrival_sequence() {
        let mut tracker = tracker();
        let mut states = vec![tracker.step(&frame([0, 1, 1, 0], 2)).state];
        let mut events = Vec::new();

        for _ in 0..7 {
            let step = tracker.step(&strong());
            states.push(step.state);
            events.extend(step.event);
        }

        assert_eq!(
            states,
            vec![
                PersonState::Nothing,
                PersonState::Possible,
                PersonState::Likely,
                PersonState::Probable,
                PersonState::Probable,
                PersonState::Probable,
                PersonState::Probable,
                PersonState::Detected,
            ]
        );
        assert_eq!(events, vec![LifecycleEvent::Arrived]);
        assert_eq!(tracker.context().probable_person, 0);
    }

    #[test]
    fn test_departure() {
        let mut tracker = tracker();
        tracker.step(&strong());
        let arrived = drive_to_detected(&mut tracker);
        assert_eq!(arrived, vec![LifecycleEvent::Arrived]);

        let step = tracker.step(&quiet());
        assert_eq!(step.state, PersonState::Nothing);
        assert_eq!(step.event, Some(LifecycleEvent::Departed));

        let step = tracker.step(&quiet());
        assert_eq!(step.state, PersonState::Nothing);
        assert_eq!(step.event, None);
    }

    #[test]
    fn test_detected_weak_signal_drops_to_possible() {
        let mut tracker = tracker();
        tracker.step(&strong());
        drive_to_detected(&mut tracker);
        let step = tracker.step(&frame([0, 2, 1, 0], 3));
        assert_eq!(step.state, PersonState::Possible);
        assert_eq!(step.event, None);
    }

    #[test]
    fn test_detected_tracks_person() {
        let mut tracker = tracker();
        tracker.step(&strong());
        drive_to_detected(&mut tracker);
        let step = tracker.step(&frame([3, 2, 0, 0], 5));
        assert_eq!(step.state, PersonState::Detected);
        assert_eq!(step.command, Some(ServoCommand::Track { target: 1530 }));

        // unmatched strong pattern loses confidence
        let step = tracker.step(&frame([2, 1, 0, 2], 5));
        assert_eq!(step.state, PersonState::Likely);
    }

    #[test]
    fn test_burn_override_from_every_state() {
        let setups: [fn(&mut PersonTracker); 4] = [
            |_| {},
            |t| {
                t.step(&strong());
                t.step(&strong());
            },
            |t| {
                t.step(&strong());
                t.step(&strong());
                t.step(&strong());
            },
            |t| {
                t.step(&strong());
                drive_to_detected(t);
            },
        ];

        for setup in setups {
            let mut tracker = tracker();
            setup(&mut tracker);

            let step = tracker.step(&burning());
            assert_eq!(step.state, PersonState::Burn);
            assert_eq!(step.event, Some(LifecycleEvent::HazardWarning));

            let step = tracker.step(&burning());
            assert_eq!(step.state, PersonState::Burn);
            assert_eq!(step.event, None);

            let step = tracker.step(&quiet());
            assert_eq!(step.state, PersonState::Nothing);
            assert_eq!(step.event, None);
            assert_eq!(tracker.context().burn_count, 0);
        }
    }

    #[test]
    fn test_new_hazard_warns_again() {
        let mut tracker = tracker();
        assert_eq!(tracker.step(&burning()).event, Some(LifecycleEvent::HazardWarning));
        tracker.step(&quiet());
        assert_eq!(tracker.step(&burning()).event, Some(LifecycleEvent::HazardWarning));
    }

    #[test]
    fn test_possible_debounces_single_hits() {
        let mut tracker = tracker();
        tracker.step(&frame([0, 0, 0, 1], 1));
        assert_eq!(tracker.step(&frame([0, 0, 0, 1], 1)).state, PersonState::Possible);

        let max = TrackerThresholds::default().possible_person_max;
        for _ in 0..max {
            let step = tracker.step(&frame([0, 0, 0, 1], 1));
            assert_eq!(step.state, PersonState::Possible);
            assert_eq!(step.command, None);
        }
        let step = tracker.step(&frame([0, 0, 0, 1], 1));
        assert_eq!(step.command, Some(ServoCommand::Track { target: 1260 }));
        assert_eq!(tracker.context().possible_person, 0);
    }

    #[test]
    fn test_possible_unmatched_single_hit_falls_back() {
        let mut tracker = tracker();
        tracker.step(&frame([0, 1, 0, 0], 1));
        tracker.step(&frame([0, 1, 0, 0], 1));
        assert_eq!(tracker.state(), PersonState::Possible);
        // split signal matches no pattern
        let step = tracker.step(&frame([1, 0, 0, 1], 1));
        assert_eq!(step.state, PersonState::Nothing);
    }

    #[test]
    fn test_likely_without_match_returns_to_possible() {
        let mut tracker = tracker();
        tracker.step(&frame([0, 1, 1, 0], 2));
        tracker.step(&frame([0, 1, 1, 0], 2));
        assert_eq!(tracker.step(&frame([0, 1, 1, 0], 2)).state, PersonState::Likely);
        let step = tracker.step(&frame([1, 1, 1, 0], 3));
        assert_eq!(step.state, PersonState::Possible);
        assert_eq!(step.command, None);
    }

    #[test]
    fn test_probable_loses_signal() {
        let mut tracker = tracker();
        for _ in 0..5 {
            tracker.step(&strong());
        }
        assert_eq!(tracker.state(), PersonState::Probable);
        assert_eq!(tracker.context().probable_person, 1);

        let step = tracker.step(&quiet());
        assert_eq!(step.state, PersonState::Likely);
        assert_eq!(tracker.context().probable_person, 0);
    }

    #[test]
    fn test_probable_single_hit_uses_one_hit_table() {
        let mut tracker = tracker();
        for _ in 0..5 {
            tracker.step(&strong());
        }
        assert_eq!(tracker.state(), PersonState::Probable);

        let step = tracker.step(&frame([0, 0, 0, 1], 1));
        assert_eq!(step.state, PersonState::Probable);
        assert_eq!(step.command, Some(ServoCommand::Track { target: 1260 }));
        assert_eq!(step.event, None);
        assert_eq!(tracker.context().probable_person, 1);
    }

    #[test]
    fn test_probable_single_hit_miss_falls_to_likely() {
        let mut tracker = tracker();
        for _ in 0..5 {
            tracker.step(&strong());
        }
        assert_eq!(tracker.state(), PersonState::Probable);

        let step = tracker.step(&frame([1, 0, 0, 1], 1));
        assert_eq!(step.state, PersonState::Likely);
        assert_eq!(step.command, None);
        assert_eq!(tracker.context().probable_person, 0);
    }

    #[test]
    fn test_likely_many_hits_promotes_without_match() {
        let mut tracker = tracker();
        for _ in 0..3 {
            tracker.step(&frame([0, 1, 1, 0], 2));
        }
        assert_eq!(tracker.state(), PersonState::Likely);

        // No column holds two hits, so the two-hit table misses
        let step = tracker.step(&frame([1, 1, 1, 1], 5));
        assert_eq!(step.state, PersonState::Probable);
        assert_eq!(step.command, None);
    }

    #[test]
    fn test_roaming_only_in_nothing() {
        let mut tracker = tracker_with(RoamMode::Sweep);
        let step = tracker.step(&quiet());
        assert!(matches!(step.command, Some(ServoCommand::Position(angle)) if angle.micros() == 1550));
        assert_eq!(tracker.context().servo_angle.micros(), 1550);

        tracker.step(&strong());
        assert_eq!(tracker.state(), PersonState::Nothing);
        let step = tracker.step(&strong());
        assert_eq!(step.state, PersonState::Possible);
        let step = tracker.step(&strong());
        assert_eq!(step.state, PersonState::Likely);
        assert_eq!(step.command, None);
    }

    #[test]
    fn test_observe_servo_feeds_estimates() {
        let mut tracker = tracker();
        tracker.step(&strong());
        drive_to_detected(&mut tracker);
        tracker.observe_servo(LIMITS.settle_micros(2000));
        let step = tracker.step(&frame([0, 0, 2, 3], 5));
        assert_eq!(step.command, Some(ServoCommand::Track { target: 1970 }));
    }
}
