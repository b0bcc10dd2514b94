/// Fault reported by the underlying I2C transport. The drivers surface these
/// unchanged; retry and backoff policy belongs to the caller.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BusError {
    #[error("no acknowledgement from the peripheral")]
    Nack,

    #[error("bus transaction timed out")]
    Timeout,

    #[error("bus arbitration lost to another master")]
    ArbitrationLost,

    #[error("i2c transport failure: {0}")]
    Transport(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("i2c bus error")]
    Bus(#[from] BusError),

    /// The received frame failed CRC validation. No reading is produced in
    /// this case, partial or otherwise.
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    Checksum { computed: u8, received: u8 },

    /// Nothing acknowledged at the configured address when the driver was
    /// constructed.
    #[error("no peripheral answering at i2c address {0:#04x}")]
    NotPresent(u8),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<BusError> for std::io::Error {
    fn from(value: BusError) -> Self {
        use std::io::ErrorKind;
        match value {
            BusError::Nack => ErrorKind::NotConnected.into(),
            BusError::Timeout => ErrorKind::TimedOut.into(),
            BusError::ArbitrationLost => ErrorKind::ResourceBusy.into(),
            BusError::Transport(msg) => std::io::Error::new(ErrorKind::Other, msg),
        }
    }
}

impl From<std::io::Error> for BusError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::NotConnected => BusError::Nack,
            std::io::ErrorKind::TimedOut => BusError::Timeout,
            std::io::ErrorKind::ResourceBusy => BusError::ArbitrationLost,
            _ => BusError::Transport(value.to_string()),
        }
    }
}
