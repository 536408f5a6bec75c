//! Modbus TCP Master Client Library
//!
//! This library provides a tick-driven Modbus TCP master: a frame codec,
//! a single-outstanding-request transaction tracker, a slave-device dispatch
//! registry, and a pluggable byte-stream transport boundary with push-style
//! and poll-style realizations.

pub mod cli;
pub mod config;
pub mod devices;
pub mod modbus;
pub mod services;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DeviceConfig};
pub use devices::{FlowmeterDevice, FlowmeterReading, ModbusDevice};
pub use modbus::{DecodedFrame, ExceptionCode, ModbusTcpClient, RequestTracker, ResponseFrame};
pub use services::PollService;
pub use transport::{EventTransport, PollingTransport, Transport};
pub use utils::error::ModbusError;

pub const VERSION: &str = "0.1.0";
