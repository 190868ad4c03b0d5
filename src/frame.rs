//! Decoded thermal frames as handed to the tracking core.

use crate::{constants::SENSOR_CELLS, Error, Result};
use serde::{Deserialize, Serialize};

/// Unit the sensor temperatures are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Degrees Celsius
    Celsius,
    /// Degrees Fahrenheit
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius reading into this unit
    #[must_use]
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// One 4x4 thermal measurement plus the sensor's ambient reference
///
/// Cells are stored in the sensor's row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalFrame {
    cells: [f64; SENSOR_CELLS],
    ambient: f64,
}

impl ThermalFrame {
    /// Create a frame from sixteen cell readings and the ambient baseline
    #[must_use]
    pub const fn new(cells: [f64; SENSOR_CELLS], ambient: f64) -> Self {
        Self { cells, ambient }
    }

    /// Create a frame from a slice, which must hold exactly sixteen readings
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the slice length is wrong
    pub fn from_slice(cells: &[f64], ambient: f64) -> Result<Self> {
        let cells: [f64; SENSOR_CELLS] = cells.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "Thermal frame needs {SENSOR_CELLS} cells, got {}",
                cells.len()
            ))
        })?;
        Ok(Self::new(cells, ambient))
    }

    /// A frame where every cell reads the same temperature
    #[must_use]
    pub const fn uniform(temperature: f64, ambient: f64) -> Self {
        Self::new([temperature; SENSOR_CELLS], ambient)
    }

    /// Cell temperatures in sensor order
    #[must_use]
    pub const fn cells(&self) -> &[f64; SENSOR_CELLS] {
        &self.cells
    }

    /// Ambient (room) temperature reported by the sensor
    #[must_use]
    pub const fn ambient(&self) -> f64 {
        self.ambient
    }

    /// Hottest cell of the frame
    #[must_use]
    pub fn max_temperature(&self) -> f64 {
        self.cells.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Render the frame as the four display rows, far-left column first
    #[must_use]
    pub fn display_rows(&self) -> [String; 4] {
        let c = &self.cells;
        [0, 1, 2, 3].map(|row| {
            format!(
                "{:.1} {:.1} {:.1} {:.1}",
                c[12 + row],
                c[8 + row],
                c[4 + row],
                c[row]
            )
        })
    }
}

/// What the sensor driver delivered for one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum SensorReading {
    /// A complete, decoded frame
    Frame(ThermalFrame),
    /// No valid frame could be read
    Unavailable {
        /// Bytes the driver managed to read
        bytes_read: usize,
        /// Bytes a complete packet holds
        expected: usize,
    },
}

impl From<ThermalFrame> for SensorReading {
    fn from(frame: ThermalFrame) -> Self {
        Self::Frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fahrenheit_conversion() {
        assert_eq!(TemperatureUnit::Fahrenheit.from_celsius(100.0), 212.0);
        assert_eq!(TemperatureUnit::Fahrenheit.from_celsius(0.0), 32.0);
        assert_eq!(TemperatureUnit::Celsius.from_celsius(21.5), 21.5);
    }

    #[test]
    fn test_from_slice_length() {
        assert!(ThermalFrame::from_slice(&[70.0; 16], 70.0).is_ok());
        match ThermalFrame::from_slice(&[70.0; 15], 70.0) {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("15")),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_max_temperature() {
        let mut cells = [68.0; 16];
        cells[9] = 91.5;
        let frame = ThermalFrame::new(cells, 70.0);
        assert_eq!(frame.max_temperature(), 91.5);
        assert_eq!(frame.ambient(), 70.0);
    }

    #[test]
    fn test_display_rows_layout() {
        let cells: [f64; 16] = std::array::from_fn(|i| i as f64);
        let rows = ThermalFrame::new(cells, 0.0).display_rows();
        assert_eq!(rows[0], "12.0 8.0 4.0 0.0");
        assert_eq!(rows[3], "15.0 11.0 7.0 3.0");
    }
}
