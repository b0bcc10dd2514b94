//! Driver for the SHT2x family (SHT20, SHT21, SHT25) of temperature and
//! humidity sensors.
//!
//! Measurements use the no-hold-master commands: the trigger is written, the
//! bus is released while the sensor converts, and the result is read back
//! after the worst-case conversion time from the datasheet.

use std::time::Duration;

use crate::bus::{transact, Bus, Delay};
use crate::crc;
use crate::error::{Error, Result};

/// Factory-programmed 7-bit address; not configurable on this family.
pub const DEFAULT_ADDRESS: u8 = 0x40;

mod commands {
    pub const SOFT_RESET: u8 = 0xFE;
    pub const TRIGGER_TEMPERATURE_NO_HOLD: u8 = 0xF3;
    pub const TRIGGER_HUMIDITY_NO_HOLD: u8 = 0xF5;
}

// Worst-case conversion times at full resolution (datasheet table 7) and the
// soft reset recovery time (datasheet section 5.5).
const TEMPERATURE_SETTLE: Duration = Duration::from_millis(85);
const HUMIDITY_SETTLE: Duration = Duration::from_millis(29);
const SOFT_RESET_SETTLE: Duration = Duration::from_millis(15);

/// The low 2 bits of every raw code carry status flags, not measurement
/// data, and must be cleared before conversion.
const STATUS_BITS_MASK: u16 = 0xFFFC;

const CRC_INIT: u8 = 0x00;

#[derive(Debug)]
pub struct Sht2x<B, D> {
    bus: B,
    delay: D,
    address: u8,
}

impl<B: Bus, D: Delay> Sht2x<B, D> {
    /// Opens the sensor at the factory address.
    pub fn new(bus: B, delay: D) -> Result<Self> {
        Self::with_address(bus, delay, DEFAULT_ADDRESS)
    }

    /// Opens the sensor at a specific address. Fails with
    /// [`Error::NotPresent`] when nothing acknowledges there, so wiring and
    /// power faults show up at construction instead of as unexplained read
    /// failures later.
    pub fn with_address(mut bus: B, delay: D, address: u8) -> Result<Self> {
        if !bus.probe()?.contains(&address) {
            return Err(Error::NotPresent(address));
        }
        Ok(Sht2x { bus, delay, address })
    }

    /// Reboots the sensor into its power-up state.
    pub fn soft_reset(&mut self) -> Result<()> {
        self.bus.write(self.address, &[commands::SOFT_RESET])?;
        self.delay.suspend(SOFT_RESET_SETTLE);
        Ok(())
    }

    /// Triggers a temperature measurement and returns it in degrees Celsius.
    pub fn read_temperature(&mut self) -> Result<f32> {
        let raw = self.measure(commands::TRIGGER_TEMPERATURE_NO_HOLD, TEMPERATURE_SETTLE)?;
        Ok(convert_temperature(raw))
    }

    /// Triggers a humidity measurement and returns it in %RH.
    pub fn read_humidity(&mut self) -> Result<f32> {
        let raw = self.measure(commands::TRIGGER_HUMIDITY_NO_HOLD, HUMIDITY_SETTLE)?;
        Ok(convert_humidity(raw))
    }

    fn measure(&mut self, command: u8, settle: Duration) -> Result<u16> {
        let mut frame = [0u8; 3]; // value (2 bytes) + crc (1 byte)
        transact(
            &mut self.bus,
            &mut self.delay,
            self.address,
            &[command],
            settle,
            &mut frame,
        )?;
        crc::validate([frame[0], frame[1]], frame[2], CRC_INIT)
    }
}

/// T = -46.85 + 175.72 * S / 2^16 (datasheet section 6.2).
fn convert_temperature(raw: u16) -> f32 {
    -46.85 + 175.72 * f32::from(raw & STATUS_BITS_MASK) / 65536.0
}

/// RH = -6 + 125 * S / 2^16 (datasheet section 6.1). The fixed -6 offset is
/// part of the datasheet formula; the SHT3x has no such term.
fn convert_humidity(raw: u16) -> f32 {
    -6.0 + 125.0 * f32::from(raw & STATUS_BITS_MASK) / 65536.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{MockBus, MockDelay};

    #[test]
    fn constructor_fails_fast_when_absent() {
        // something is on the bus, just not an SHT2x
        let bus = MockBus::new(&[0x44]);
        let err = Sht2x::new(bus, MockDelay::default()).unwrap_err();
        assert_eq!(err, Error::NotPresent(DEFAULT_ADDRESS));
    }

    #[test]
    fn temperature_read_round_trip() {
        let mut bus = MockBus::new(&[DEFAULT_ADDRESS]);
        bus.schedule_read(&[0x68, 0x3A, 0x7C]);
        let mut delay = MockDelay::default();

        let mut sensor = Sht2x::new(&mut bus, &mut delay).unwrap();
        let celsius = sensor.read_temperature().unwrap();

        assert!((celsius - 24.686).abs() < 1e-3);
        assert!(bus.pop_write(DEFAULT_ADDRESS, &[0xF3]));
        assert!(!bus.has_writes());
        assert_eq!(delay.suspensions, [Duration::from_millis(85)]);
    }

    #[test]
    fn humidity_read_round_trip() {
        let mut bus = MockBus::new(&[DEFAULT_ADDRESS]);
        bus.schedule_read(&[0x4E, 0x85, 0x6B]);
        let mut delay = MockDelay::default();

        let mut sensor = Sht2x::new(&mut bus, &mut delay).unwrap();
        let rh = sensor.read_humidity().unwrap();

        assert!((rh - 32.338).abs() < 1e-3);
        assert!(bus.pop_write(DEFAULT_ADDRESS, &[0xF5]));
        assert_eq!(delay.suspensions, [Duration::from_millis(29)]);
    }

    #[test]
    fn corrupted_frame_is_rejected() {
        let mut bus = MockBus::new(&[DEFAULT_ADDRESS]);
        bus.schedule_read(&[0x68, 0x3A, 0x7D]);

        let mut sensor = Sht2x::new(&mut bus, MockDelay::default()).unwrap();
        let err = sensor.read_temperature().unwrap_err();

        assert_eq!(
            err,
            Error::Checksum {
                computed: 0x7C,
                received: 0x7D
            }
        );
    }

    #[test]
    fn transport_fault_propagates_unretried() {
        // present at construction, but no response frame ever arrives
        let mut bus = MockBus::new(&[DEFAULT_ADDRESS]);
        let mut sensor = Sht2x::new(&mut bus, MockDelay::default()).unwrap();
        let err = sensor.read_temperature().unwrap_err();
        assert_eq!(err, Error::Bus(crate::error::BusError::Timeout));
    }

    #[test]
    fn soft_reset_waits_for_recovery() {
        let mut bus = MockBus::new(&[DEFAULT_ADDRESS]);
        let mut delay = MockDelay::default();

        let mut sensor = Sht2x::new(&mut bus, &mut delay).unwrap();
        sensor.soft_reset().unwrap();

        assert!(bus.pop_write(DEFAULT_ADDRESS, &[0xFE]));
        assert_eq!(delay.suspensions, [Duration::from_millis(15)]);
    }

    #[test]
    fn conversions_ignore_status_bits() {
        for raw in [0x0000u16, 0x4E84, 0x683A, 0x8000, 0xFFFC] {
            assert_eq!(convert_temperature(raw), convert_temperature(raw | 0x3));
            assert_eq!(convert_humidity(raw), convert_humidity(raw | 0x3));
        }
    }

    #[test]
    fn temperature_scale_is_anchored_and_monotonic() {
        assert!((convert_temperature(0x0000) + 46.85).abs() < 1e-4);

        let mut last = convert_temperature(0x0000);
        for raw in (0x0400u16..=0xFC00).step_by(0x0400) {
            let next = convert_temperature(raw);
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn humidity_offset_is_applied_after_scaling() {
        // RH(0) is the bare -6 offset; full scale lands at -6 + 125
        assert!((convert_humidity(0x0000) + 6.0).abs() < 1e-4);
        assert!((convert_humidity(0xFFFC) - 118.99).abs() < 0.01);
    }
}
