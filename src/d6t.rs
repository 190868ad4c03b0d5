//! Decoder for the 35-byte packet produced by a 4x4 D6T-style thermal array.
//!
//! Packet layout (all temperatures little-endian `i16`, tenths of a degree Celsius):
//!
//! | bytes | content |
//! |---|---|
//! | 0..2 | reference (PTAT) temperature, used as the ambient baseline |
//! | 2..34 | sixteen cell temperatures in sensor order |
//! | 34 | packet error code (CRC-8, polynomial `0x07`) |
//!
//! The packet error code is seeded with the sensor's read address byte.

use crate::{
    constants::SENSOR_CELLS,
    frame::{TemperatureUnit, ThermalFrame},
    Error, Result,
};
use log::debug;

/// Size of a complete sensor packet
pub const PACKET_LENGTH: usize = 35;

/// 7-bit I2C address of the sensor
pub const SENSOR_ADDRESS: u8 = 0x0a;

/// Address byte on the wire for a read transaction
pub const READ_ADDRESS_BYTE: u8 = (SENSOR_ADDRESS << 1) | 1;

// CRC-8 with polynomial 0x07, zero init, no reflection
const PEC: crc::Crc<u8> = crc::Crc::<u8>::new(&crc::CRC_8_SMBUS);

/// Compute the packet error code over a payload (everything but the last byte)
#[must_use]
pub fn packet_error_code(payload: &[u8]) -> u8 {
    let mut digest = PEC.digest();
    digest.update(&[READ_ADDRESS_BYTE]);
    digest.update(payload);
    digest.finalize()
}

fn read_tenths(bytes: &[u8], offset: usize) -> f64 {
    f64::from(i16::from_le_bytes([bytes[offset], bytes[offset + 1]])) / 10.0
}

/// Packet decoder configured for a target unit
#[derive(Debug, Clone, Copy)]
pub struct PacketDecoder {
    unit: TemperatureUnit,
    verify_pec: bool,
}

impl PacketDecoder {
    /// Create a decoder producing temperatures in `unit`
    #[must_use]
    pub const fn new(unit: TemperatureUnit, verify_pec: bool) -> Self {
        Self { unit, verify_pec }
    }

    /// Decode one raw packet into a thermal frame
    ///
    /// # Errors
    ///
    /// Returns `SensorRead` when the packet is not exactly [`PACKET_LENGTH`] bytes,
    /// and `Checksum` when PEC verification is enabled and fails.
    pub fn decode(&self, packet: &[u8]) -> Result<ThermalFrame> {
        if packet.len() != PACKET_LENGTH {
            return Err(Error::SensorRead {
                bytes_read: packet.len(),
                expected: PACKET_LENGTH,
            });
        }

        let (payload, pec) = packet.split_at(PACKET_LENGTH - 1);
        if self.verify_pec {
            let expected = packet_error_code(payload);
            if expected != pec[0] {
                return Err(Error::Checksum {
                    expected,
                    actual: pec[0],
                });
            }
        }

        let ambient = self.unit.from_celsius(read_tenths(payload, 0));
        let cells: [f64; SENSOR_CELLS] =
            std::array::from_fn(|i| self.unit.from_celsius(read_tenths(payload, 2 + 2 * i)));

        debug!("Decoded sensor packet, ambient {:.1}", ambient);
        Ok(ThermalFrame::new(cells, ambient))
    }
}

/// Build a packet from Celsius tenths, computing its error code
///
/// Useful for recording fixtures and replay captures.
#[must_use]
pub fn encode_packet(ambient_tenths: i16, cell_tenths: &[i16; SENSOR_CELLS]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(PACKET_LENGTH);
    packet.extend_from_slice(&ambient_tenths.to_le_bytes());
    for cell in cell_tenths {
        packet.extend_from_slice(&cell.to_le_bytes());
    }
    packet.push(packet_error_code(&packet));
    packet
}
