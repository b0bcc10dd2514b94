mod bus;
pub mod crc;
mod error;
mod i2c_impl;
mod node;
pub mod sht2x;
pub mod sht3x;

pub use bus::{Bus, Delay, ThreadDelay};
pub use error::*;
pub use i2c_impl::I2cMasterBus;
pub use node::{Node, NodeConfig, NodeError, Radio, RadioError, Reading, Sensor};
pub use sht2x::Sht2x;
pub use sht3x::{Mode, Repeatability, Sht3x};
pub use i2c;
