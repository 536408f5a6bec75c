use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use serde_json::{json, Value};
use tokio::time::interval;

use crate::config::Config;
use crate::devices::flowmeter::FlowmeterDevice;
use crate::devices::traits::ModbusDevice;
use crate::modbus::protocol::FC_READ_HOLDING_REGISTERS;
use crate::modbus::ModbusTcpClient;
use crate::transport::create_transport;
use crate::utils::error::ModbusError;

/// Drives the client from a periodic tick and schedules device polls.
///
/// One request is outstanding at a time: a poll sweep queues every enabled
/// device and the queue drains one send per tick, gated on
/// [`ModbusTcpClient::is_waiting`].
pub struct PollService {
    config: Config,
    client: ModbusTcpClient,
    devices: Vec<Arc<FlowmeterDevice>>,
    pending_polls: VecDeque<usize>,
    last_sweep: Option<Instant>,
}

impl PollService {
    pub fn new(config: Config) -> Result<Self, ModbusError> {
        info!("initializing poll service for {}:{}", config.host, config.port);

        let transport = create_transport(&config.transport)?;
        let mut client = ModbusTcpClient::new(
            config.host.clone(),
            config.port,
            Duration::from_millis(config.send_wait_time_ms),
            transport,
        );
        client.set_reconnect_backoff(config.reconnect_backoff);

        let mut devices = Vec::new();
        for device_config in config.enabled_devices() {
            let device = Arc::new(FlowmeterDevice::new(
                device_config.address,
                device_config.name.clone(),
            ));
            client.register_device(device.clone());
            devices.push(device);
        }
        if devices.is_empty() {
            warn!("no enabled devices configured");
        }

        Ok(Self {
            config,
            client,
            devices,
            pending_polls: VecDeque::new(),
            last_sweep: None,
        })
    }

    /// JSON snapshot of the most recent reading per device.
    pub fn snapshot(&self) -> Value {
        let readings: Vec<Value> = self
            .devices
            .iter()
            .map(|device| match device.last_reading() {
                Some(reading) => reading.to_json(),
                None => json!({ "device_address": device.address(), "reading": Value::Null }),
            })
            .collect();
        json!({ "devices": readings })
    }

    fn queue_sweep(&mut self, now: Instant) {
        self.pending_polls.clear();
        self.pending_polls.extend(0..self.devices.len());
        self.last_sweep = Some(now);
    }

    fn sweep_due(&self, now: Instant) -> bool {
        match self.last_sweep {
            Some(at) => now.duration_since(at) >= Duration::from_secs(self.config.poll_interval_seconds),
            None => true,
        }
    }

    async fn service_tick(&mut self, now: Instant) {
        self.client.tick().await;

        if self.sweep_due(now) && self.pending_polls.is_empty() {
            self.queue_sweep(now);
        }

        // Callers are responsible for the single-outstanding discipline:
        // hold the next poll until the previous response or its timeout.
        if self.client.is_waiting() {
            return;
        }
        if let Some(index) = self.pending_polls.pop_front() {
            let device_config = self.config.enabled_devices()[index].clone();
            self.client
                .send(
                    device_config.address,
                    FC_READ_HOLDING_REGISTERS,
                    device_config.start_register,
                    device_config.register_count,
                    None,
                )
                .await;
        }
    }

    /// Polls every enabled device once and waits for responses or timeouts.
    pub async fn read_all_devices_once(&mut self) -> Result<(), ModbusError> {
        let started = Instant::now();
        self.queue_sweep(started);

        let tick_interval = Duration::from_millis(self.config.tick_interval_ms);
        let per_device = Duration::from_millis(self.config.send_wait_time_ms) + tick_interval * 2;
        let deadline = started
            + Duration::from_secs(2)
            + per_device * (self.devices.len().max(1) as u32);

        while Instant::now() < deadline {
            let now = Instant::now();
            self.service_tick(now).await;
            if self.pending_polls.is_empty() && !self.client.is_waiting() {
                break;
            }
            tokio::time::sleep(tick_interval).await;
        }
        Ok(())
    }

    /// Runs the periodic tick loop until Ctrl+C.
    pub async fn run(&mut self) -> Result<(), ModbusError> {
        info!(
            "polling {} device(s) every {}s, tick {}ms, wait timeout {}ms",
            self.devices.len(),
            self.config.poll_interval_seconds,
            self.config.tick_interval_ms,
            self.config.send_wait_time_ms
        );

        let mut ticker = interval(Duration::from_millis(self.config.tick_interval_ms));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.service_tick(Instant::now()).await;
                }
            }
        }
        Ok(())
    }
}
