//! Person position estimation from hit histograms.
//!
//! Both estimators reduce the histogram to a 4-bit pattern of qualifying
//! columns (far-left is the most significant bit) and look the pattern up
//! in a fixed table:
//!
//! | pattern | one-hit (>=1) | two-hit (>=2) |
//! |---|---|---|
//! | `0001` | far-one CCW | far-one CCW |
//! | `0010` | near-one CCW | ignored (tunable: near-one CCW) |
//! | `0011` | far-two CCW | near-three CCW |
//! | `0100` | near-one CW | ignored (tunable: near-one CW) |
//! | `x11x` | centered | centered |
//! | `1000` | far-one CW | far-one CW |
//! | `1100` | far-two CW | near-three CW |
//!
//! Anything else is not recognized as a person.

use crate::{
    classifier::HitHistogram,
    constants::{FAR_ONE, FAR_TWO, NEAR_ONE, NEAR_THREE},
    servo::{Handedness, Rotation, ServoAngle},
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Which pattern matcher to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorMode {
    /// Columns with at least one hit qualify
    OneHit,
    /// Columns with at least two hits qualify
    TwoHit,
}

impl EstimatorMode {
    const fn min_hits(self) -> u32 {
        match self {
            Self::OneHit => 1,
            Self::TwoHit => 2,
        }
    }
}

/// Size class of a head correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetTier {
    /// Single hit on an outer column
    FarOne,
    /// Single hit on an inner column
    NearOne,
    /// Two adjacent outer hits
    FarTwo,
    /// Signal spread over three columns
    NearThree,
}

/// Head offsets per tier, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetTable {
    /// Offset for a single outer-column hit
    pub far_one: i32,
    /// Offset for a single inner-column hit
    pub near_one: i32,
    /// Offset for two adjacent outer hits
    pub far_two: i32,
    /// Offset for a three-column signal
    pub near_three: i32,
}

impl Default for OffsetTable {
    fn default() -> Self {
        Self {
            far_one: FAR_ONE,
            near_one: NEAR_ONE,
            far_two: FAR_TWO,
            near_three: NEAR_THREE,
        }
    }
}

impl OffsetTable {
    /// Offset for a tier
    #[must_use]
    pub const fn distance(&self, tier: OffsetTier) -> i32 {
        match tier {
            OffsetTier::FarOne => self.far_one,
            OffsetTier::NearOne => self.near_one,
            OffsetTier::FarTwo => self.far_two,
            OffsetTier::NearThree => self.near_three,
        }
    }
}

/// Outcome of a table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Person is straight ahead
    Centered,
    /// Person is off to one side
    Turn(OffsetTier, Rotation),
}

use OffsetTier::{FarOne, FarTwo, NearOne, NearThree};
use Placement::{Centered, Turn};
use Rotation::{Clockwise as Cw, CounterClockwise as Ccw};

const ONE_HIT_TABLE: [Option<Placement>; 16] = [
    None,                     // 0000
    Some(Turn(FarOne, Ccw)),  // 0001
    Some(Turn(NearOne, Ccw)), // 0010
    Some(Turn(FarTwo, Ccw)),  // 0011
    Some(Turn(NearOne, Cw)),  // 0100
    None,                     // 0101
    Some(Centered),           // 0110
    Some(Centered),           // 0111
    Some(Turn(FarOne, Cw)),   // 1000
    None,                     // 1001
    None,                     // 1010
    None,                     // 1011
    Some(Turn(FarTwo, Cw)),   // 1100
    None,                     // 1101
    Some(Centered),           // 1110
    Some(Centered),           // 1111
];

const TWO_HIT_TABLE: [Option<Placement>; 16] = [
    None,                       // 0000
    Some(Turn(FarOne, Ccw)),    // 0001
    None,                       // 0010
    Some(Turn(NearThree, Ccw)), // 0011
    None,                       // 0100
    None,                       // 0101
    Some(Centered),             // 0110
    Some(Centered),             // 0111
    Some(Turn(FarOne, Cw)),     // 1000
    None,                       // 1001
    None,                       // 1010
    None,                       // 1011
    Some(Turn(NearThree, Cw)),  // 1100
    None,                       // 1101
    Some(Centered),             // 1110
    Some(Centered),             // 1111
];

// A still person can flicker between 0200 and 0020, so these stay off by default.
const TWO_HIT_SINGLE_COLUMN: [(u8, Placement); 2] = [
    (0b0100, Turn(NearOne, Cw)),
    (0b0010, Turn(NearOne, Ccw)),
];

/// Look up a pattern without applying any offsets
#[must_use]
pub fn lookup(mode: EstimatorMode, pattern: u8, two_hit_single_column: bool) -> Option<Placement> {
    let index = usize::from(pattern & 0b1111);
    match mode {
        EstimatorMode::OneHit => ONE_HIT_TABLE[index],
        EstimatorMode::TwoHit => TWO_HIT_TABLE[index].or_else(|| {
            if two_hit_single_column {
                TWO_HIT_SINGLE_COLUMN
                    .iter()
                    .find(|(key, _)| *key == pattern)
                    .map(|&(_, placement)| placement)
            } else {
                None
            }
        }),
    }
}

/// Estimated person position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    /// A person-like pattern was recognized
    pub detected: bool,
    /// Pulse width that would face the person (unclamped)
    pub target: i32,
}

/// Maps histograms to head targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEstimator {
    offsets: OffsetTable,
    handedness: Handedness,
    two_hit_single_column: bool,
}

impl PositionEstimator {
    /// Create an estimator
    #[must_use]
    pub const fn new(offsets: OffsetTable, handedness: Handedness, two_hit_single_column: bool) -> Self {
        Self {
            offsets,
            handedness,
            two_hit_single_column,
        }
    }

    /// Sparse-signal estimate: columns with one or more hits
    #[must_use]
    pub fn one_hit(&self, histogram: &HitHistogram, current: ServoAngle) -> Estimate {
        self.estimate(histogram, current, EstimatorMode::OneHit)
    }

    /// Strong-signal estimate: columns with two or more hits
    #[must_use]
    pub fn two_hit(&self, histogram: &HitHistogram, current: ServoAngle) -> Estimate {
        self.estimate(histogram, current, EstimatorMode::TwoHit)
    }

    /// Run the matcher for `mode`
    #[must_use]
    pub fn estimate(&self, histogram: &HitHistogram, current: ServoAngle, mode: EstimatorMode) -> Estimate {
        let pattern = histogram.pattern(mode.min_hits());
        let estimate = match lookup(mode, pattern, self.two_hit_single_column) {
            None => Estimate {
                detected: false,
                target: current.micros(),
            },
            Some(Centered) => Estimate {
                detected: true,
                target: current.micros(),
            },
            Some(Turn(tier, rotation)) => Estimate {
                detected: true,
                target: self.handedness.rotate(
                    current.micros(),
                    rotation,
                    self.offsets.distance(tier),
                ),
            },
        };

        debug!(
            "person_position {:?}: pattern {:04b} Pos: {} Det: {}",
            mode, pattern, estimate.target, estimate.detected
        );
        estimate
    }
}

/// Stateless convenience wrapper around [`PositionEstimator::estimate`]
#[must_use]
pub fn estimate_position(
    histogram: &HitHistogram,
    current: ServoAngle,
    mode: EstimatorMode,
    estimator: &PositionEstimator,
) -> Estimate {
    estimator.estimate(histogram, current, mode)
}
