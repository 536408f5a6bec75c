use std::fmt;

/// Fixed MBAP protocol identifier for Modbus TCP.
pub const PROTOCOL_ID: u16 = 0x0000;

/// Minimum bytes for a decodable response: 6-byte MBAP header tail,
/// unit address, function code, one length/exception byte.
pub const MIN_RESPONSE_LEN: usize = 9;

/// Largest entity count accepted for standard function codes.
pub const MAX_ENTITIES: u16 = 128;

/// Highest standard function code; vendor codes above this skip validation.
pub const MAX_STANDARD_FUNCTION: u8 = 0x10;

// Function codes
pub const FC_READ_COILS: u8 = 0x01;
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
pub const FC_READ_WRITE_MULTIPLE_REGISTERS: u8 = 0x17;

/// Exception codes returned by a slave when a request cannot be fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerFailure,
    Acknowledge,
    ServerBusy,
    Other(u8),
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::ServerFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::ServerBusy,
            other => ExceptionCode::Other(other),
        }
    }
}

impl ExceptionCode {
    pub fn as_u8(&self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 0x01,
            ExceptionCode::IllegalDataAddress => 0x02,
            ExceptionCode::IllegalDataValue => 0x03,
            ExceptionCode::ServerFailure => 0x04,
            ExceptionCode::Acknowledge => 0x05,
            ExceptionCode::ServerBusy => 0x06,
            ExceptionCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionCode::IllegalFunction => write!(f, "ILLEGAL FUNCTION (0x01)"),
            ExceptionCode::IllegalDataAddress => write!(f, "ILLEGAL DATA ADDRESS (0x02)"),
            ExceptionCode::IllegalDataValue => write!(f, "ILLEGAL DATA VALUE (0x03)"),
            ExceptionCode::ServerFailure => write!(f, "SERVER FAILURE (0x04)"),
            ExceptionCode::Acknowledge => write!(f, "ACKNOWLEDGE (0x05)"),
            ExceptionCode::ServerBusy => write!(f, "SERVER BUSY (0x06)"),
            ExceptionCode::Other(code) => write!(f, "exception code 0x{:02X}", code),
        }
    }
}

/// A well-formed non-exception response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub transaction_id: u16,
    pub unit: u8,
    pub function: u8,
    pub payload: Vec<u8>,
}

/// Result of running the decoder over a receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    /// Fewer bytes than a minimum frame; wait for more.
    Incomplete,
    /// Structurally broken frame (declared payload length exceeds the buffer).
    Malformed { declared: usize, available: usize },
    /// Exception response (function code high bit set).
    Exception {
        transaction_id: u16,
        unit: u8,
        function: u8,
        code: ExceptionCode,
    },
    /// Parsed data response.
    Data(ResponseFrame),
}
