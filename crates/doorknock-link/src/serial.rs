//! Serial-port transport.
//!
//! Covers an HC-05 bound to an RFCOMM device (`/dev/rfcomm0`) or attached
//! through a USB-UART bridge. "Bonded devices" are the serial ports the
//! host can see; a session owns the opened port.
//!
//! The `serialport` crate is blocking, so every port operation runs on
//! Tokio's blocking pool. Inbound data is read by a dedicated blocking
//! task that forwards chunks until the subscriber goes away, the session
//! is closed, or the port fails.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serialport::{SerialPort, SerialPortType};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{LinkError, Result};
use crate::traits::{Session, Transport};
use crate::types::{PeerDevice, SessionEvent};

/// HC-05 factory default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout; bounds how long the reader takes to notice a close.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

const READ_BUFFER_SIZE: usize = 256;

const INBOUND_CHANNEL_CAPACITY: usize = 32;

/// Transport over local serial ports.
#[derive(Debug, Clone)]
pub struct SerialTransport {
    port: Option<String>,
    baud_rate: u32,
}

impl SerialTransport {
    /// Enumerate every serial port the host exposes.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            port: None,
            baud_rate,
        }
    }

    /// Restrict the transport to a single port path.
    pub fn with_port(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: Some(path.into()),
            baud_rate,
        }
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

fn peer_for_path(path: &str) -> PeerDevice {
    let name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    PeerDevice::new(name, path)
}

fn port_error(error: serialport::Error) -> LinkError {
    LinkError::Io(error.into())
}

fn join_error(error: tokio::task::JoinError) -> LinkError {
    LinkError::other(format!("serial task failed: {error}"))
}

impl Transport for SerialTransport {
    type Session = SerialSession;

    fn is_available(&self) -> bool {
        true
    }

    async fn bonded_devices(&self) -> Result<Vec<PeerDevice>> {
        if let Some(path) = &self.port {
            return Ok(vec![peer_for_path(path)]);
        }

        let ports = tokio::task::spawn_blocking(serialport::available_ports)
            .await
            .map_err(join_error)?
            .map_err(port_error)?;

        Ok(ports
            .into_iter()
            .map(|info| {
                let name = match info.port_type {
                    SerialPortType::UsbPort(usb) => usb.product,
                    _ => None,
                };
                match name {
                    Some(name) => PeerDevice::new(name, info.port_name),
                    None => peer_for_path(&info.port_name),
                }
            })
            .collect())
    }

    async fn open_session(&self, peer: &PeerDevice, _delimiter: u8) -> Result<SerialSession> {
        let path = peer.address.clone();
        let baud_rate = self.baud_rate;

        let port = tokio::task::spawn_blocking(move || {
            serialport::new(path, baud_rate)
                .timeout(READ_TIMEOUT)
                .open()
        })
        .await
        .map_err(join_error)?
        .map_err(|error| LinkError::session_open(error.to_string()))?;

        info!(%peer, baud_rate, "Serial port opened");

        Ok(SerialSession {
            peer: peer.clone(),
            port: Arc::new(Mutex::new(port)),
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
        })
    }
}

/// Open serial port.
pub struct SerialSession {
    peer: PeerDevice,
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("peer", &self.peer)
            .field("closed", &self.stop.load(Ordering::Relaxed))
            .finish()
    }
}

impl Session for SerialSession {
    fn can_write(&self) -> bool {
        !self.stop.load(Ordering::Relaxed)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(LinkError::disconnected(self.peer.name.clone()));
        }

        let port = Arc::clone(&self.port);
        let payload = bytes.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut port = port.lock();
            port.write_all(&payload)?;
            port.flush()
        })
        .await
        .map_err(join_error)?
        .map_err(|error| LinkError::write(error.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);

        if let Some(reader) = self.reader.take() {
            reader.await.map_err(join_error)?;
        }

        debug!(peer = %self.peer, "Serial session closed");
        Ok(())
    }

    fn subscribe(&mut self) -> Result<mpsc::Receiver<SessionEvent>> {
        if self.stop.load(Ordering::Relaxed) {
            return Err(LinkError::disconnected(self.peer.name.clone()));
        }

        let reader = self.port.lock().try_clone().map_err(port_error)?;
        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let stop = Arc::clone(&self.stop);

        // The previous reader notices its receiver is gone on the next chunk.
        self.reader = Some(tokio::task::spawn_blocking(move || {
            read_loop(reader, tx, stop)
        }));

        Ok(rx)
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn read_loop(mut port: Box<dyn SerialPort>, tx: mpsc::Sender<SessionEvent>, stop: Arc<AtomicBool>) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    while !stop.load(Ordering::Relaxed) && !tx.is_closed() {
        match port.read(&mut buffer) {
            Ok(0) => {
                let _ = tx.blocking_send(SessionEvent::Disconnected);
                return;
            }
            Ok(n) => {
                let chunk = Bytes::copy_from_slice(&buffer[..n]);
                if tx.blocking_send(SessionEvent::Data(chunk)).is_err() {
                    return;
                }
            }
            Err(error) if error.kind() == ErrorKind::TimedOut => {}
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => {
                warn!(%error, "Serial read failed");
                let _ = tx.blocking_send(SessionEvent::Disconnected);
                return;
            }
        }
    }
}
