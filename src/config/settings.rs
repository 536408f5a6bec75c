use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::error::ModbusError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Connection settings
    pub host: String,
    pub port: u16,
    pub transport: String, // "event" or "polling"

    // Protocol timing
    pub send_wait_time_ms: u64,
    pub tick_interval_ms: u64,
    pub reconnect_backoff: bool,

    // Monitoring settings
    pub poll_interval_seconds: u64,

    // Device configuration
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub address: u8,          // Modbus unit address
    pub name: String,         // Device name
    pub enabled: bool,        // Whether device is polled
    pub start_register: u16,  // First holding register of the block
    pub register_count: u16,  // Registers per poll
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "192.168.1.10".to_string(),
            port: 502,
            transport: "event".to_string(),
            send_wait_time_ms: 250,
            tick_interval_ms: 50,
            reconnect_backoff: false,
            poll_interval_seconds: 10,
            devices: vec![
                DeviceConfig {
                    address: 2,
                    name: "Inlet Flowmeter".to_string(),
                    enabled: true,
                    start_register: 244,
                    register_count: 10,
                },
                DeviceConfig {
                    address: 3,
                    name: "Outlet Flowmeter".to_string(),
                    enabled: true,
                    start_register: 244,
                    register_count: 10,
                },
            ],
        }
    }
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ModbusError> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        // Command line arguments override file values
        if let Some(host) = matches.get_one::<String>("host") {
            config.host = host.clone();
        }
        if let Some(port) = matches.get_one::<String>("port") {
            config.port = port
                .parse()
                .map_err(|_| ModbusError::Config(format!("invalid port '{}'", port)))?;
        }
        if let Some(transport) = matches.get_one::<String>("transport") {
            config.transport = transport.clone();
        }
        if let Some(timeout) = matches.get_one::<String>("timeout") {
            config.send_wait_time_ms = timeout
                .parse()
                .map_err(|_| ModbusError::Config(format!("invalid timeout '{}'", timeout)))?;
        }
        if let Some(interval) = matches.get_one::<String>("interval") {
            config.poll_interval_seconds = interval
                .parse()
                .map_err(|_| ModbusError::Config(format!("invalid interval '{}'", interval)))?;
        }
        if matches.get_flag("backoff") {
            config.reconnect_backoff = true;
        }

        // Override the polled units if provided
        if let Some(devices_str) = matches.get_one::<String>("devices") {
            let addresses: Vec<u8> = devices_str
                .split(',')
                .map(|s| s.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| {
                    ModbusError::Config(format!("invalid device list '{}'", devices_str))
                })?;

            for addr in &addresses {
                if !config.devices.iter().any(|d| d.address == *addr) {
                    config.devices.push(DeviceConfig {
                        address: *addr,
                        name: format!("Device {}", addr),
                        enabled: true,
                        start_register: 244,
                        register_count: 10,
                    });
                }
            }
            config.devices.retain(|d| addresses.contains(&d.address));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModbusError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ModbusError::Config(format!("read config: {}", e)))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ModbusError::Config(format!("parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModbusError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ModbusError::Config(format!("create config dir: {}", e)))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ModbusError::Config(format!("serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| ModbusError::Config(format!("write config: {}", e)))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.host.is_empty() {
            return Err(ModbusError::Config("host must not be empty".to_string()));
        }
        if self.transport != "event" && self.transport != "polling" {
            return Err(ModbusError::Config(format!(
                "unknown transport '{}', expected 'event' or 'polling'",
                self.transport
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ModbusError::Config(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn enabled_devices(&self) -> Vec<&DeviceConfig> {
        self.devices.iter().filter(|d| d.enabled).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.send_wait_time_ms, 250);
        assert_eq!(config.port, 502);
    }

    #[test]
    fn test_rejects_unknown_transport() {
        let mut config = Config::default();
        config.transport = "serial".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.host, config.host);
        assert_eq!(parsed.devices.len(), config.devices.len());
        assert_eq!(parsed.devices[0].address, config.devices[0].address);
    }
}
