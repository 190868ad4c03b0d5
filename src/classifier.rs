//! Frame classification: thermal cells to directional hits.
//!
//! The sixteen cells are partitioned into four columns of four. Column 0 is
//! the far-left of the head's field of view and column 3 the far-right:
//!
//! | column | cells |
//! |---|---|
//! | 0 | 12..=15 |
//! | 1 | 8..=11 |
//! | 2 | 4..=7 |
//! | 3 | 0..=3 |

use crate::{
    constants::{BURN_HIT_WEIGHT, CELLS_PER_COLUMN, HISTOGRAM_COLUMNS, PERSON_HIT_WEIGHT},
    frame::ThermalFrame,
};
use log::debug;
use std::fmt;

/// Per-column hit weights, far-left first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct HitHistogram([u32; HISTOGRAM_COLUMNS]);

impl HitHistogram {
    /// Wrap explicit column weights
    #[must_use]
    pub const fn new(columns: [u32; HISTOGRAM_COLUMNS]) -> Self {
        Self(columns)
    }

    /// Column weights, far-left first
    #[must_use]
    pub const fn columns(&self) -> &[u32; HISTOGRAM_COLUMNS] {
        &self.0
    }

    /// Weight of a single column
    #[must_use]
    pub const fn column(&self, index: usize) -> u32 {
        self.0[index]
    }

    /// Encode which columns reach `min_hits` as a 4-bit pattern
    ///
    /// Column 0 is the most significant bit, so `0b0001` means only the
    /// far-right column qualifies.
    #[must_use]
    pub fn pattern(&self, min_hits: u32) -> u8 {
        self.0
            .iter()
            .fold(0, |bits, &hits| (bits << 1) | u8::from(hits >= min_hits))
    }
}

impl fmt::Display for HitHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}{b}{c}{d}")
    }
}

/// Histogram column a sensor cell belongs to
#[must_use]
pub const fn column_of_cell(cell: usize) -> usize {
    HISTOGRAM_COLUMNS - 1 - cell / CELLS_PER_COLUMN
}

/// Result of classifying one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Directional hit weights
    pub histogram: HitHistogram,
    /// Number of cells above the person threshold (burn cells count once)
    pub hit_count: u32,
    /// The hottest cell exceeds the burn threshold
    pub burn_detected: bool,
    /// Hottest cell temperature
    pub max_temperature: f64,
}

/// Thresholds used to turn temperatures into hits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClassifier {
    person_threshold: f64,
    burn_threshold: f64,
    ambient_margin: Option<f64>,
}

impl FrameClassifier {
    /// Create a classifier with fixed thresholds
    #[must_use]
    pub const fn new(person_threshold: f64, burn_threshold: f64) -> Self {
        Self {
            person_threshold,
            burn_threshold,
            ambient_margin: None,
        }
    }

    /// Derive the person threshold from the frame's ambient reading instead
    #[must_use]
    pub const fn with_ambient_margin(mut self, margin: Option<f64>) -> Self {
        self.ambient_margin = margin;
        self
    }

    /// Person threshold in effect for a frame
    #[must_use]
    pub fn person_threshold_for(&self, frame: &ThermalFrame) -> f64 {
        self.ambient_margin
            .map_or(self.person_threshold, |margin| frame.ambient() + margin)
    }

    /// Burn hazard threshold
    #[must_use]
    pub const fn burn_threshold(&self) -> f64 {
        self.burn_threshold
    }

    /// Classify a frame
    #[must_use]
    pub fn classify(&self, frame: &ThermalFrame) -> Classification {
        let classification =
            classify_frame(frame, self.person_threshold_for(frame), self.burn_threshold);
        debug!(
            "hit array: {} hit count: {} max: {:.1}",
            classification.histogram, classification.hit_count, classification.max_temperature
        );
        classification
    }
}

/// Classify a frame against explicit thresholds
#[must_use]
pub fn classify_frame(
    frame: &ThermalFrame,
    person_threshold: f64,
    burn_threshold: f64,
) -> Classification {
    let mut columns = [0_u32; HISTOGRAM_COLUMNS];
    let mut hit_count = 0;

    for (cell, &temperature) in frame.cells().iter().enumerate() {
        let weight = if temperature > burn_threshold {
            BURN_HIT_WEIGHT
        } else if temperature > person_threshold {
            PERSON_HIT_WEIGHT
        } else {
            continue;
        };
        columns[column_of_cell(cell)] += weight;
        hit_count += 1;
    }

    let max_temperature = frame.max_temperature();
    Classification {
        histogram: HitHistogram::new(columns),
        hit_count,
        burn_detected: max_temperature > burn_threshold,
        max_temperature,
    }
}
