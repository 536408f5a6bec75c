use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::{json, Value};

use crate::devices::traits::ModbusDevice;
use crate::modbus::protocol::ExceptionCode;

/// Register block layout: error code (u32) followed by four IEEE-754 floats,
/// all big-endian.
const READING_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowmeterReading {
    pub device_address: u8,
    pub timestamp: DateTime<Utc>,
    pub error_code: u32,
    pub mass_flow_rate: f32,
    pub density_flow: f32,
    pub temperature: f32,
    pub volume_flow_rate: f32,
}

impl FlowmeterReading {
    pub fn to_json(&self) -> Value {
        json!({
            "device_address": self.device_address,
            "timestamp": self.timestamp.to_rfc3339(),
            "error_code": self.error_code,
            "mass_flow_rate": self.mass_flow_rate,
            "density_flow": self.density_flow,
            "temperature": self.temperature,
            "volume_flow_rate": self.volume_flow_rate,
        })
    }
}

/// Coriolis flowmeter polled over Modbus TCP.
pub struct FlowmeterDevice {
    address: u8,
    name: String,
    last_reading: Mutex<Option<FlowmeterReading>>,
}

impl FlowmeterDevice {
    pub fn new(address: u8, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            last_reading: Mutex::new(None),
        }
    }

    pub fn last_reading(&self) -> Option<FlowmeterReading> {
        self.last_reading
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn read_u32(data: &[u8], offset: usize) -> u32 {
        u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ])
    }

    fn read_f32(data: &[u8], offset: usize) -> f32 {
        f32::from_bits(Self::read_u32(data, offset))
    }
}

impl ModbusDevice for FlowmeterDevice {
    fn address(&self) -> u8 {
        self.address
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn on_modbus_data(&self, payload: &[u8]) {
        if payload.len() < READING_LEN {
            warn!(
                "'{}': short register block, {} bytes (need {})",
                self.name,
                payload.len(),
                READING_LEN
            );
            return;
        }

        let reading = FlowmeterReading {
            device_address: self.address,
            timestamp: Utc::now(),
            error_code: Self::read_u32(payload, 0),
            mass_flow_rate: Self::read_f32(payload, 4),
            density_flow: Self::read_f32(payload, 8),
            temperature: Self::read_f32(payload, 12),
            volume_flow_rate: Self::read_f32(payload, 16),
        };
        debug!(
            "'{}': mass {:.3} kg/h, temp {:.2} C, volume {:.3} m3/h",
            self.name, reading.mass_flow_rate, reading.temperature, reading.volume_flow_rate
        );
        *self.last_reading.lock().unwrap_or_else(|e| e.into_inner()) = Some(reading);
    }

    fn on_modbus_error(&self, function: u8, code: ExceptionCode) {
        warn!(
            "'{}': slave rejected function 0x{:02X}: {}",
            self.name, function, code
        );
    }
}
