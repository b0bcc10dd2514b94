//! Runs the full polling loop against a simulated SHT3x and a radio that
//! prints every payload, so the pipeline can be watched without hardware.
//!
//! ```
//! RUST_LOG=debug cargo run --example simulated-node
//! ```

use std::time::Duration;

use sht_mesh::{crc, Bus, BusError, Node, NodeConfig, Radio, RadioError, Sht3x, ThreadDelay};

/// Pretends to be an SHT3x at 0x44: acknowledges every command and serves
/// CRC-valid frames for a slowly wandering climate.
struct SimulatedSensorBus {
    tick: u16,
}

impl SimulatedSensorBus {
    fn frame(&mut self) -> [u8; 6] {
        // around 22 degrees / 45 %RH, drifting a little each cycle
        let raw_temp = 0x61A8u16.wrapping_add(self.tick.wrapping_mul(0x0111));
        let raw_humid = 0x7333u16.wrapping_add(self.tick.wrapping_mul(0x0222));
        self.tick = self.tick.wrapping_add(1);
        let t = raw_temp.to_be_bytes();
        let h = raw_humid.to_be_bytes();
        [
            t[0],
            t[1],
            crc::checksum(&t, 0xFF),
            h[0],
            h[1],
            crc::checksum(&h, 0xFF),
        ]
    }
}

impl Bus for SimulatedSensorBus {
    fn probe(&mut self) -> Result<Vec<u8>, BusError> {
        Ok(vec![0x44])
    }

    fn write(&mut self, _address: u8, _bytes: &[u8]) -> Result<(), BusError> {
        Ok(())
    }

    fn read(&mut self, _address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let frame = self.frame();
        buf.copy_from_slice(&frame[..buf.len()]);
        Ok(())
    }
}

/// Joins on the first commissioning attempt and prints transmitted frames.
struct ConsoleRadio {
    joined: bool,
}

impl Radio for ConsoleRadio {
    fn is_joined(&mut self) -> Result<bool, RadioError> {
        Ok(self.joined)
    }

    fn commission(&mut self) -> Result<(), RadioError> {
        self.joined = true;
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) -> Result<(), RadioError> {
        std::thread::sleep(duration);
        Ok(())
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        println!("tx {}", String::from_utf8_lossy(payload));
        Ok(())
    }

    fn reset(&mut self) -> Result<(), RadioError> {
        self.joined = false;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let sensor = Sht3x::new(SimulatedSensorBus { tick: 0 }, ThreadDelay)?;
    let config = NodeConfig {
        join_retry: Duration::from_millis(200),
        poll_interval: Duration::from_secs(1),
        transmit_interval: Duration::from_secs(3),
        recovery_backoff: Duration::from_millis(500),
    };

    let mut node = Node::with_config(sensor, ConsoleRadio { joined: false }, config);
    node.join()?;
    for _ in 0..10 {
        node.poll()?;
    }
    Ok(())
}
