//! Modbus TCP master client.
//!
//! Owns the transaction counter, the single-outstanding-request tracker and
//! the device registry, and drives an injected [`Transport`] from a periodic
//! scheduler tick. Sends are fire-and-forget: validation and transport
//! failures are logged and the request is dropped, never retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::devices::traits::ModbusDevice;
use crate::modbus::frame::{decode_response, encode_request};
use crate::modbus::protocol::{DecodedFrame, ExceptionCode, ResponseFrame};
use crate::modbus::tracker::RequestTracker;
use crate::transport::Transport;
use crate::utils::error::ModbusError;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(250);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

pub struct ModbusTcpClient {
    host: String,
    port: u16,
    transport: Box<dyn Transport>,
    devices: Vec<Arc<dyn ModbusDevice>>,
    transaction_id: u16,
    tracker: RequestTracker,
    // Reconnect pacing; disabled by default (attempt on every tick).
    backoff_enabled: bool,
    reconnect_delay: Duration,
    next_connect_after: Option<Instant>,
    was_ready: bool,
}

impl ModbusTcpClient {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        wait_timeout: Duration,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            transport,
            devices: Vec::new(),
            transaction_id: 0,
            tracker: RequestTracker::new(wait_timeout),
            backoff_enabled: false,
            reconnect_delay: INITIAL_RECONNECT_DELAY,
            next_connect_after: None,
            was_ready: false,
        }
    }

    /// Enables exponential backoff between reconnect attempts. Off by
    /// default: a persistently unreachable peer is retried every tick.
    pub fn set_reconnect_backoff(&mut self, enabled: bool) {
        self.backoff_enabled = enabled;
    }

    /// Appends a device to the registry. Entries are not deduplicated and
    /// there is no unregister.
    pub fn register_device(&mut self, device: Arc<dyn ModbusDevice>) {
        info!(
            "registered device '{}' at unit address {}",
            device.name(),
            device.address()
        );
        self.devices.push(device);
    }

    /// Advisory: whether a request is outstanding. The client never blocks
    /// or rejects a send based on this; callers check it by convention.
    pub fn is_waiting(&self) -> bool {
        self.tracker.is_waiting()
    }

    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Encodes and transmits a request. Fire-and-forget: failures are
    /// reported through the log and the request is dropped.
    pub async fn send(
        &mut self,
        unit: u8,
        function: u8,
        start_address: u16,
        quantity: u16,
        payload: Option<&[u8]>,
    ) {
        // Counter committed only once the frame actually goes out.
        let next_id = self.transaction_id.wrapping_add(1);
        let frame = match encode_request(next_id, unit, function, start_address, quantity, payload)
        {
            Ok(frame) => frame,
            Err(e) => {
                error!("send to unit {} rejected: {}", unit, e);
                return;
            }
        };

        if !self.transport.is_ready() {
            debug!("transport not ready, dropping request to unit {}", unit);
            return;
        }

        match self.transport.write(&frame).await {
            Ok(written) if written == frame.len() => {
                debug!(">>> {}", hex::encode(&frame));
                self.transaction_id = next_id;
                self.tracker.mark_sent(unit, Instant::now());
            }
            Ok(written) => {
                warn!("incomplete write: {}/{} bytes", written, frame.len());
                self.transport.reset();
            }
            Err(e) => {
                warn!("write to unit {} failed: {}", unit, e);
                self.transport.reset();
            }
        }
    }

    /// Transmits a pre-framed buffer as-is. The first byte is tracked as the
    /// awaited unit address.
    pub async fn send_raw(&mut self, payload: &[u8]) {
        if payload.is_empty() {
            return;
        }
        if !self.transport.is_ready() {
            debug!("transport not ready, dropping raw frame");
            return;
        }
        match self.transport.write(payload).await {
            Ok(written) if written == payload.len() => {
                debug!(">>> raw {}", hex::encode(payload));
                self.tracker.mark_sent(payload[0], Instant::now());
            }
            Ok(written) => {
                warn!("incomplete raw write: {}/{} bytes", written, payload.len());
                self.transport.reset();
            }
            Err(e) => {
                warn!("raw write failed: {}", e);
                self.transport.reset();
            }
        }
    }

    /// Emits a three-byte exception reply on behalf of a device.
    pub async fn send_error(&mut self, unit: u8, function: u8, code: ExceptionCode) {
        let reply = [unit, function | 0x80, code.as_u8()];
        self.send_raw(&reply).await;
    }

    /// One scheduler tick: reconnect if needed, drain the transport, decode
    /// and dispatch, then re-evaluate the response timeout.
    pub async fn tick(&mut self) {
        self.tick_at(Instant::now()).await;
    }

    pub async fn tick_at(&mut self, now: Instant) {
        self.ensure_connected(now).await;
        self.poll_and_dispatch().await;
        self.tracker.check_timeout(now);
    }

    async fn ensure_connected(&mut self, now: Instant) {
        if self.transport.is_ready() {
            if !self.was_ready {
                info!("transport connected to {}:{}", self.host, self.port);
            }
            self.was_ready = true;
            self.reconnect_delay = INITIAL_RECONNECT_DELAY;
            self.next_connect_after = None;
            return;
        }

        if self.was_ready {
            info!("transport disconnected from {}:{}", self.host, self.port);
        }
        self.was_ready = false;

        if self.backoff_enabled {
            if let Some(not_before) = self.next_connect_after {
                if now < not_before {
                    return;
                }
            }
        }

        if let Err(e) = self.transport.connect(&self.host, self.port).await {
            debug!("connect to {}:{} failed: {}", self.host, self.port, e);
        }

        if self.backoff_enabled {
            self.next_connect_after = Some(now + self.reconnect_delay);
            self.reconnect_delay = (self.reconnect_delay * 2).min(MAX_RECONNECT_DELAY);
        }
    }

    async fn poll_and_dispatch(&mut self) {
        let chunk = match self.transport.poll_incoming().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return,
            Err(e) => {
                // Transport failure: left to the tick timeout and reconnect.
                warn!("receive failed: {}", e);
                return;
            }
        };

        debug!("<<< {}", hex::encode(&chunk));
        match decode_response(&chunk) {
            DecodedFrame::Incomplete => {
                debug!("ignoring {} bytes, not yet a frame", chunk.len());
            }
            DecodedFrame::Malformed {
                declared,
                available,
            } => {
                warn!(
                    "{}",
                    ModbusError::MalformedFrame(format!(
                        "declares {} payload bytes, {} available",
                        declared, available
                    ))
                );
            }
            DecodedFrame::Exception {
                unit,
                function,
                code,
                ..
            } => {
                error!(
                    "{}",
                    ModbusError::Exception {
                        unit,
                        function,
                        code
                    }
                );
                self.dispatch_error(unit, function, code);
                self.tracker.clear();
            }
            DecodedFrame::Data(frame) => {
                self.dispatch_data(&frame);
                self.tracker.clear();
            }
        }
    }

    /// Delivers a payload to every registered device whose address matches
    /// the frame's unit address.
    fn dispatch_data(&self, frame: &ResponseFrame) {
        let mut delivered = 0usize;
        for device in &self.devices {
            if device.address() == frame.unit {
                device.on_modbus_data(&frame.payload);
                delivered += 1;
            }
        }
        if delivered == 0 {
            debug!("no registered device for unit {}", frame.unit);
        }
    }

    fn dispatch_error(&self, unit: u8, function: u8, code: ExceptionCode) {
        for device in &self.devices {
            if device.address() == unit {
                device.on_modbus_error(function, code);
            }
        }
    }
}
