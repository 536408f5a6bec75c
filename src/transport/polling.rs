//! Pull-style transport: a non-blocking socket read per tick.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};

use crate::transport::Transport;
use crate::utils::error::ModbusError;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 256;

/// Non-blocking `TcpStream` polled by the scheduler tick.
pub struct PollingTransport {
    stream: Option<TcpStream>,
}

impl PollingTransport {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

impl Default for PollingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for PollingTransport {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), ModbusError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| ModbusError::Transport(format!("resolve {}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| {
                ModbusError::Transport(format!("no address found for {}:{}", host, port))
            })?;

        debug!("connecting to {}...", addr);
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        debug!("connected to {}", addr);
        self.stream = Some(stream);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.stream.is_some()
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize, ModbusError> {
        let stream = self.stream.as_mut().ok_or(ModbusError::NotConnected)?;
        match stream.write(bytes) {
            Ok(written) => Ok(written),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Err(ModbusError::ShortWrite {
                written: 0,
                expected: bytes.len(),
            }),
            Err(e) => {
                warn!("socket write error: {}", e);
                self.reset();
                Err(e.into())
            }
        }
    }

    async fn poll_incoming(&mut self) -> Result<Option<Vec<u8>>, ModbusError> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Ok(None),
        };

        let mut buf = [0u8; READ_CHUNK];
        match stream.read(&mut buf) {
            Ok(0) => {
                debug!("peer closed connection");
                self.reset();
                Err(ModbusError::Transport("connection closed by peer".into()))
            }
            Ok(n) => Ok(Some(buf[..n].to_vec())),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                warn!("socket receive error: {}", e);
                self.reset();
                Err(e.into())
            }
        }
    }

    fn reset(&mut self) {
        self.stream = None;
    }
}
