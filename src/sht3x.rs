//! Driver for the SHT3x family (SHT30, SHT31, SHT35).
//!
//! One trigger yields both quantities: the 6-byte response carries the
//! temperature and humidity words, each followed by its own checksum. The
//! trigger opcode encodes the repeatability and whether the sensor may
//! stretch the clock during conversion.

use std::time::Duration;

use crate::bus::{transact, Bus, Delay};
use crate::crc;
use crate::error::{Error, Result};

/// 7-bit address with the ADDR pin low; 0x45 when it is pulled high.
pub const DEFAULT_ADDRESS: u8 = 0x44;

mod commands {
    pub const SOFT_RESET: [u8; 2] = [0x30, 0xA2];
    pub const HEATER_ON: [u8; 2] = [0x30, 0x6D];
    pub const HEATER_OFF: [u8; 2] = [0x30, 0x66];
    pub const READ_STATUS: [u8; 2] = [0xF3, 0x2D];
}

/// Recovery time after a soft reset (datasheet section 4.9: at most 1.5 ms).
const SOFT_RESET_SETTLE: Duration = Duration::from_millis(2);

/// The heater flag sits in bit 13 of the status word (datasheet table 17).
const HEATER_STATUS_BIT: u16 = 1 << 13;

const CRC_INIT: u8 = 0xFF;

/// Measurement repeatability. Higher repeatability averages longer on-chip
/// and therefore takes longer to convert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Repeatability {
    High,
    Medium,
    Low,
}

/// Single-shot acquisition mode: repeatability plus whether the sensor may
/// hold SCL low until conversion finishes. Each of the six combinations has
/// its own trigger opcode (datasheet tables 8 and 9); the match below is
/// exhaustive, so an unmapped combination cannot be expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Mode {
    pub repeatability: Repeatability,
    pub clock_stretch: bool,
}

impl Default for Mode {
    fn default() -> Self {
        Mode {
            repeatability: Repeatability::High,
            clock_stretch: true,
        }
    }
}

impl Mode {
    pub fn command(self) -> [u8; 2] {
        match (self.clock_stretch, self.repeatability) {
            (true, Repeatability::High) => [0x2C, 0x06],
            (true, Repeatability::Medium) => [0x2C, 0x0D],
            (true, Repeatability::Low) => [0x2C, 0x10],
            (false, Repeatability::High) => [0x24, 0x00],
            (false, Repeatability::Medium) => [0x24, 0x0B],
            (false, Repeatability::Low) => [0x24, 0x16],
        }
    }

    /// Worst-case conversion time (datasheet table 4).
    pub fn measurement_time(self) -> Duration {
        match self.repeatability {
            Repeatability::High => Duration::from_millis(15),
            Repeatability::Medium => Duration::from_millis(6),
            Repeatability::Low => Duration::from_millis(4),
        }
    }
}

#[derive(Debug)]
pub struct Sht3x<B, D> {
    bus: B,
    delay: D,
    address: u8,
}

impl<B: Bus, D: Delay> Sht3x<B, D> {
    /// Opens the sensor at the default address.
    pub fn new(bus: B, delay: D) -> Result<Self> {
        Self::with_address(bus, delay, DEFAULT_ADDRESS)
    }

    /// Opens the sensor at a specific address, failing with
    /// [`Error::NotPresent`] when nothing acknowledges there.
    pub fn with_address(mut bus: B, delay: D, address: u8) -> Result<Self> {
        if !bus.probe()?.contains(&address) {
            return Err(Error::NotPresent(address));
        }
        Ok(Sht3x { bus, delay, address })
    }

    /// Reboots the sensor into its power-up state.
    pub fn soft_reset(&mut self) -> Result<()> {
        self.bus.write(self.address, &commands::SOFT_RESET)?;
        self.delay.suspend(SOFT_RESET_SETTLE);
        Ok(())
    }

    /// Runs one single-shot measurement and returns degrees Celsius and %RH.
    /// Both words must pass validation; a bad checksum on either fails the
    /// whole read.
    pub fn read_temperature_and_humidity(&mut self, mode: Mode) -> Result<(f32, f32)> {
        let mut frame = [0u8; 6]; // two big-endian words, each followed by a crc byte
        transact(
            &mut self.bus,
            &mut self.delay,
            self.address,
            &mode.command(),
            mode.measurement_time(),
            &mut frame,
        )?;
        let raw_temperature = crc::validate([frame[0], frame[1]], frame[2], CRC_INIT)?;
        let raw_humidity = crc::validate([frame[3], frame[4]], frame[5], CRC_INIT)?;
        Ok((
            convert_temperature(raw_temperature),
            convert_humidity(raw_humidity),
        ))
    }

    /// Switches the built-in heater on (datasheet section 4.10).
    pub fn turn_heater_on(&mut self) -> Result<()> {
        self.bus.write(self.address, &commands::HEATER_ON)?;
        Ok(())
    }

    /// Switches the built-in heater off.
    pub fn turn_heater_off(&mut self) -> Result<()> {
        self.bus.write(self.address, &commands::HEATER_OFF)?;
        Ok(())
    }

    /// Reads the status register and reports whether the heater is running.
    /// A checksum failure is an error, never a "heater off" reading.
    pub fn heater_status(&mut self) -> Result<bool> {
        self.bus.write(self.address, &commands::READ_STATUS)?;
        let mut frame = [0u8; 3];
        self.bus.read(self.address, &mut frame)?;
        let status = crc::validate([frame[0], frame[1]], frame[2], CRC_INIT)?;
        Ok(status & HEATER_STATUS_BIT != 0)
    }
}

/// T = -45 + 175 * S / (2^16 - 1) (datasheet section 4.13). The divisor is
/// 65535 on this family, not 65536, and no status bits are embedded in the
/// raw code.
fn convert_temperature(raw: u16) -> f32 {
    -45.0 + 175.0 * f32::from(raw) / 65535.0
}

/// RH = 100 * S / (2^16 - 1) (datasheet section 4.13).
fn convert_humidity(raw: u16) -> f32 {
    100.0 * f32::from(raw) / 65535.0
}
