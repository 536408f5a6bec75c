use thiserror::Error;

use crate::modbus::protocol::ExceptionCode;

#[derive(Error, Debug)]
pub enum ModbusError {
    #[error("too many entities requested: {quantity} (max {max})")]
    TooManyEntities { quantity: u16, max: u16 },

    #[error("transport not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("short write: {written}/{expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("modbus exception from unit {unit}: function 0x{function:02X}, {code}")]
    Exception {
        unit: u8,
        function: u8,
        code: ExceptionCode,
    },

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        ModbusError::Transport(format!("IO error: {}", err))
    }
}
