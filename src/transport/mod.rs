//! Byte-stream transport boundary.
//!
//! The protocol core operates purely on byte buffers handed to and from this
//! interface and never assumes which realization is behind it.

pub mod event;
pub mod polling;

use async_trait::async_trait;

use crate::utils::error::ModbusError;

pub use event::EventTransport;
pub use polling::PollingTransport;

/// Capability set the client requires from a connection.
///
/// Two realizations exist: [`EventTransport`] (push-style, a background task
/// delivers received bytes through a channel) and [`PollingTransport`]
/// (pull-style, a non-blocking socket read per tick). Either is injected at
/// client construction.
#[async_trait]
pub trait Transport: Send {
    /// Initiates a connection. Readiness is asynchronous: a successful return
    /// means the attempt started, not that the peer is reachable. Observe
    /// [`Transport::is_ready`] on subsequent ticks.
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), ModbusError>;

    fn is_ready(&self) -> bool;

    /// Writes a frame. Returns the number of bytes accepted.
    async fn write(&mut self, bytes: &[u8]) -> Result<usize, ModbusError>;

    /// Polled once per scheduler tick; returns one chunk of received bytes
    /// when available.
    async fn poll_incoming(&mut self) -> Result<Option<Vec<u8>>, ModbusError>;

    /// Tears down the connection after a transport-reported failure.
    fn reset(&mut self);
}

/// Selects a transport realization by config name.
pub fn create_transport(kind: &str) -> Result<Box<dyn Transport>, ModbusError> {
    match kind {
        "event" => Ok(Box::new(EventTransport::new())),
        "polling" => Ok(Box::new(PollingTransport::new())),
        other => Err(ModbusError::Config(format!(
            "unknown transport '{}', expected 'event' or 'polling'",
            other
        ))),
    }
}
