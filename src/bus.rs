use std::time::Duration;

use crate::error::BusError;

/// What the drivers need from an I2C transport: enumerate the peripherals
/// present on the bus and move raw bytes to and from a 7-bit address.
/// Implemented for `i2c` crate masters in [`crate::I2cMasterBus`] and
/// replaced with `MockBus` in tests.
pub trait Bus {
    /// Returns the 7-bit addresses that currently acknowledge on the bus.
    fn probe(&mut self) -> Result<Vec<u8>, BusError>;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError>;

    /// Reads exactly `buf.len()` bytes from the peripheral.
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), BusError>;
}

/// How a settling delay is honored is the caller's choice: a thread sleep,
/// a radio's low-power sleep, an executor timer. The drivers only require
/// that at least the requested time elapses before control returns;
/// resuming early violates the sensor protocol.
pub trait Delay {
    fn suspend(&mut self, duration: Duration);
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn probe(&mut self) -> Result<Vec<u8>, BusError> {
        (**self).probe()
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(address, bytes)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        (**self).read(address, buf)
    }
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn suspend(&mut self, duration: Duration) {
        (**self).suspend(duration);
    }
}

/// Suspends by putting the calling thread to sleep.
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn suspend(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// One command/settle/response cycle: write the command bytes, suspend for
/// the settling time, then read the fixed-size response. The settling time
/// is a protocol requirement, not a tunable; reading before the sensor has
/// finished converting yields a NACK or garbage data. Transport faults are
/// surfaced as-is, never retried here.
pub(crate) fn transact<B: Bus, D: Delay>(
    bus: &mut B,
    delay: &mut D,
    address: u8,
    command: &[u8],
    settle: Duration,
    response: &mut [u8],
) -> Result<(), BusError> {
    bus.write(address, command)?;
    delay.suspend(settle);
    bus.read(address, response)
}


#[cfg(test)]
mod tests {
    use super::mock::{MockBus, MockDelay};
    use super::*;

    #[test]
    fn transact_writes_settles_then_reads() {
        let mut bus = MockBus::new(&[0x40]);
        bus.schedule_read(&[0xAA, 0xBB, 0xCC]);
        let mut delay = MockDelay::default();

        let mut frame = [0u8; 3];
        transact(
            &mut bus,
            &mut delay,
            0x40,
            &[0xF3],
            Duration::from_millis(85),
            &mut frame,
        )
        .unwrap();

        assert!(bus.pop_write(0x40, &[0xF3]));
        assert!(!bus.has_writes());
        assert_eq!(frame, [0xAA, 0xBB, 0xCC]);
        assert_eq!(delay.suspensions, [Duration::from_millis(85)]);
    }

    #[test]
    fn transact_surfaces_transport_faults() {
        let mut bus = MockBus::new(&[]);
        let mut delay = MockDelay::default();

        let mut frame = [0u8; 3];
        let err = transact(
            &mut bus,
            &mut delay,
            0x40,
            &[0xF3],
            Duration::from_millis(85),
            &mut frame,
        )
        .unwrap_err();

        assert_eq!(err, BusError::Nack);
        // the write never went through, so no settling window was spent
        assert!(delay.suspensions.is_empty());
    }
}
