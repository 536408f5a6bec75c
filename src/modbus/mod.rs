pub mod client;
pub mod frame;
pub mod protocol;
pub mod tracker;

pub use client::ModbusTcpClient;
pub use frame::{decode_response, encode_request};
pub use protocol::{DecodedFrame, ExceptionCode, ResponseFrame};
pub use tracker::RequestTracker;
