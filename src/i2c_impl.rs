use crate::bus::Bus;
use crate::error::BusError;

// 7-bit address range usable for peripherals; 0x00-0x02 and 0x78-0x7F are
// reserved by the I2C specification.
const FIRST_ADDRESS: u8 = 0x03;
const LAST_ADDRESS: u8 = 0x77;

/// Runs the drivers over any I2C master exposing the `i2c` crate's bulk
/// transfer interface, e.g. an i2c-tiny-usb adapter. Presence is probed
/// with zero-length reads, the same technique `i2cdetect` uses.
pub struct I2cMasterBus<M> {
    master: M,
}

impl<M> I2cMasterBus<M> {
    pub fn new(master: M) -> Self {
        I2cMasterBus { master }
    }

    /// Returns the wrapped master.
    pub fn into_inner(self) -> M {
        self.master
    }
}

fn to_bus_error<E: Into<std::io::Error>>(err: E) -> BusError {
    let err: std::io::Error = err.into();
    BusError::from(err)
}

impl<M> Bus for I2cMasterBus<M>
where
    M: i2c::Master + i2c::BulkTransfer,
    M::Error: Into<std::io::Error>,
{
    fn probe(&mut self) -> Result<Vec<u8>, BusError> {
        let mut present = Vec::new();
        for address in FIRST_ADDRESS..=LAST_ADDRESS {
            // a zero-length read is acknowledged iff a peripheral answers
            let result = self.master.i2c_transfer(&mut [i2c::Message::Read {
                address: address.into(),
                data: &mut [],
                flags: Default::default(),
            }]);
            if result.is_ok() {
                present.push(address);
            }
        }
        Ok(present)
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.master
            .i2c_transfer(&mut [i2c::Message::Write {
                address: address.into(),
                data: bytes,
                flags: Default::default(),
            }])
            .map_err(to_bus_error)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.master
            .i2c_transfer(&mut [i2c::Message::Read {
                address: address.into(),
                data: buf,
                flags: Default::default(),
            }])
            .map_err(to_bus_error)
    }
}
