//! The join/poll/transmit loop shared by both sensor drivers.
//!
//! Mirrors the duty cycle of a battery-powered mesh node: confirm network
//! membership, sleep the radio through the idle window, and push a fresh
//! reading out every transmit interval. A failed transmit backs off and
//! resets the radio; a failed sample transmits nothing, since a reading is
//! never fabricated from a bad frame.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::bus::{Bus, Delay};
use crate::error::Error;
use crate::sht2x::Sht2x;
use crate::sht3x::{Mode, Sht3x};

/// One measurement as it goes over the air. The field names are the wire
/// format: collectors expect `{"temp": .., "humid": ..}`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temp: f32,
    pub humid: f32,
}

/// Anything the node can poll for a reading.
pub trait Sensor {
    fn sample(&mut self) -> Result<Reading, Error>;
}

impl<S: Sensor + ?Sized> Sensor for &mut S {
    fn sample(&mut self) -> Result<Reading, Error> {
        (**self).sample()
    }
}

impl<B: Bus, D: Delay> Sensor for Sht2x<B, D> {
    /// The SHT2x measures one quantity per trigger, so a sample is two
    /// back-to-back transactions.
    fn sample(&mut self) -> Result<Reading, Error> {
        let temp = self.read_temperature()?;
        let humid = self.read_humidity()?;
        Ok(Reading { temp, humid })
    }
}

impl<B: Bus, D: Delay> Sensor for Sht3x<B, D> {
    fn sample(&mut self) -> Result<Reading, Error> {
        let (temp, humid) = self.read_temperature_and_humidity(Mode::default())?;
        Ok(Reading { temp, humid })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RadioError {
    #[error("transmit failed: {0}")]
    Transmit(String),

    #[error("radio i/o failure: {0}")]
    Io(String),
}

/// Mesh radio collaborator. Membership upkeep, low-power sleep and frame
/// delivery are the radio firmware's business; the node only sequences them.
pub trait Radio {
    /// Whether the module currently holds mesh membership.
    fn is_joined(&mut self) -> Result<bool, RadioError>;

    /// Starts (or re-attempts) the network joining procedure.
    fn commission(&mut self) -> Result<(), RadioError>;

    /// Puts the module into low-power sleep for the given window.
    fn sleep(&mut self, duration: Duration) -> Result<(), RadioError>;

    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError>;

    /// Hard module restart; membership must be re-established afterwards.
    fn reset(&mut self) -> Result<(), RadioError>;
}

impl<R: Radio + ?Sized> Radio for &mut R {
    fn is_joined(&mut self) -> Result<bool, RadioError> {
        (**self).is_joined()
    }

    fn commission(&mut self) -> Result<(), RadioError> {
        (**self).commission()
    }

    fn sleep(&mut self, duration: Duration) -> Result<(), RadioError> {
        (**self).sleep(duration)
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        (**self).transmit(payload)
    }

    fn reset(&mut self) -> Result<(), RadioError> {
        (**self).reset()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    #[error("sensor read failed")]
    Sensor(#[from] Error),

    #[error("radio failure")]
    Radio(#[from] RadioError),

    #[error("payload serialization failed")]
    Payload(#[from] serde_json::Error),
}

/// Loop timing. The defaults suit a battery deployment: a membership check
/// every 10 s keeps the parent from aging the node out, readings go out
/// every 30 s, and a failed transmit backs off 3 s before the radio is
/// reset.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub join_retry: Duration,
    pub poll_interval: Duration,
    pub transmit_interval: Duration,
    pub recovery_backoff: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            join_retry: Duration::from_secs(2),
            poll_interval: Duration::from_secs(10),
            transmit_interval: Duration::from_secs(30),
            recovery_backoff: Duration::from_secs(3),
        }
    }
}

pub struct Node<S, R> {
    sensor: S,
    radio: R,
    config: NodeConfig,
    last_transmit: Option<Instant>,
}

impl<S: Sensor, R: Radio> Node<S, R> {
    pub fn new(sensor: S, radio: R) -> Self {
        Self::with_config(sensor, radio, NodeConfig::default())
    }

    pub fn with_config(sensor: S, radio: R, config: NodeConfig) -> Self {
        Node {
            sensor,
            radio,
            config,
            last_transmit: None,
        }
    }

    /// Blocks until the radio reports mesh membership.
    pub fn join(&mut self) -> Result<(), RadioError> {
        while !self.radio.is_joined()? {
            debug!("not joined yet, commissioning");
            self.radio.commission()?;
            self.radio.sleep(self.config.join_retry)?;
        }
        info!("joined mesh network");
        Ok(())
    }

    /// One duty cycle: membership keep-alive, radio sleep, and a transmit
    /// when the interval has elapsed. Returns the transmitted reading, or
    /// `None` when nothing was due yet.
    pub fn poll(&mut self) -> Result<Option<Reading>, NodeError> {
        // querying membership doubles as the keep-alive the mesh expects
        if !self.radio.is_joined()? {
            warn!("mesh membership lost");
        }

        let idle = self.config.poll_interval.min(self.config.transmit_interval);
        self.radio.sleep(idle)?;

        if let Some(at) = self.last_transmit {
            if at.elapsed() < self.config.transmit_interval {
                return Ok(None);
            }
        }

        let reading = self.sensor.sample()?;
        let payload = serde_json::to_vec(&reading)?;
        match self.radio.transmit(&payload) {
            Ok(()) => {
                debug!("transmitted {} bytes", payload.len());
                self.last_transmit = Some(Instant::now());
                Ok(Some(reading))
            }
            Err(err) => {
                warn!("transmit failed: {err}");
                self.radio.sleep(self.config.recovery_backoff)?;
                self.radio.reset()?;
                Err(err.into())
            }
        }
    }

    /// Joins and polls forever. Sensor validation failures skip the cycle;
    /// radio failures re-run the joining procedure, since `poll` has
    /// already reset the module by the time they surface.
    pub fn run(&mut self) -> Result<(), NodeError> {
        self.join()?;
        loop {
            match self.poll() {
                Ok(_) => {}
                Err(NodeError::Radio(err)) => {
                    warn!("radio failure: {err}, rejoining");
                    self.join()?;
                }
                Err(err) => warn!("skipping cycle: {err}"),
            }
        }
    }
}
