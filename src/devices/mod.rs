pub mod flowmeter;
pub mod traits;

pub use flowmeter::{FlowmeterDevice, FlowmeterReading};
pub use traits::ModbusDevice;
