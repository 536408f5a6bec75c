//! Push-style transport: a background task owns the socket and delivers
//! received bytes through channels.
//!
//! The client touches its own state only from the scheduler tick, so
//! everything the I/O task observes (connects, data, errors) is marshaled
//! through channels and an atomic readiness flag rather than callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transport::Transport;
use crate::utils::error::ModbusError;

const READ_CHUNK: usize = 256;

/// Tokio-task-backed transport with asynchronous delivery.
pub struct EventTransport {
    ready: Arc<AtomicBool>,
    outgoing_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    incoming_rx: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    io_task: Option<JoinHandle<()>>,
}

impl EventTransport {
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            outgoing_tx: None,
            incoming_rx: None,
            io_task: None,
        }
    }

    fn task_alive(&self) -> bool {
        self.io_task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Default for EventTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventTransport {
    fn drop(&mut self) {
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl Transport for EventTransport {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), ModbusError> {
        if self.task_alive() {
            return Ok(());
        }

        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let ready = Arc::clone(&self.ready);
        let target = format!("{}:{}", host, port);

        let task = tokio::spawn(async move {
            let mut stream = match TcpStream::connect(&target).await {
                Ok(stream) => stream,
                Err(e) => {
                    debug!("connect to {} failed: {}", target, e);
                    return;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                debug!("set_nodelay failed: {}", e);
            }
            debug!("connected to {}", target);
            ready.store(true, Ordering::Release);

            let mut buf = BytesMut::with_capacity(READ_CHUNK);
            loop {
                tokio::select! {
                    outgoing = outgoing_rx.recv() => {
                        match outgoing {
                            Some(frame) => {
                                if let Err(e) = stream.write_all(&frame).await {
                                    warn!("socket write error: {}", e);
                                    break;
                                }
                            }
                            // Transport handle dropped; shut down.
                            None => break,
                        }
                    }
                    result = stream.read_buf(&mut buf) => {
                        match result {
                            Ok(0) => {
                                debug!("peer closed connection");
                                break;
                            }
                            Ok(n) => {
                                let chunk = buf.split_to(n).to_vec();
                                if incoming_tx.send(chunk).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("socket receive error: {}", e);
                                break;
                            }
                        }
                    }
                }
            }
            ready.store(false, Ordering::Release);
        });

        self.outgoing_tx = Some(outgoing_tx);
        self.incoming_rx = Some(incoming_rx);
        self.io_task = Some(task);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && self.task_alive()
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize, ModbusError> {
        if !self.is_ready() {
            return Err(ModbusError::NotConnected);
        }
        let tx = self.outgoing_tx.as_ref().ok_or(ModbusError::NotConnected)?;
        tx.send(bytes.to_vec())
            .map_err(|_| ModbusError::Transport("I/O task gone".into()))?;
        Ok(bytes.len())
    }

    async fn poll_incoming(&mut self) -> Result<Option<Vec<u8>>, ModbusError> {
        let rx = match self.incoming_rx.as_mut() {
            Some(rx) => rx,
            None => return Ok(None),
        };
        match rx.try_recv() {
            Ok(chunk) => Ok(Some(chunk)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn reset(&mut self) {
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
        self.ready.store(false, Ordering::Release);
        self.outgoing_tx = None;
        self.incoming_rx = None;
    }
}
