//! Mock transport implementation.
//!
//! [`MockTransport`] behaves like a host with a configurable set of bonded
//! peripherals. The paired [`MockTransportHandle`] plays the peripheral:
//! it injects inbound data, hangs up, inspects what the host wrote, and
//! arms failures for the next operations.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::traits::{Session, Transport};
use crate::types::{PeerDevice, SessionEvent};
use doorknock_core::constants::{DEFAULT_DELIMITER, DEFAULT_PERIPHERAL_NAME};

/// Address reported by the default mock peripheral.
pub const MOCK_ADDRESS: &str = "00:21:13:00:AB:CD";

/// Inbound channel capacity per subscription.
const INBOUND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Default)]
struct MockState {
    bonded: Vec<PeerDevice>,
    list_failure: Option<String>,
    open_failure: Option<String>,
    write_failure: Option<String>,
    close_failure: Option<String>,
    read_only: bool,
    delimiter: Option<u8>,
    opened: Vec<PeerDevice>,
    closed: usize,
    written: Vec<Bytes>,
    inbound: Option<mpsc::Sender<SessionEvent>>,
}

/// Mock transport for testing and development.
///
/// # Examples
///
/// ```
/// use doorknock_link::mock::MockTransport;
/// use doorknock_link::traits::{Session, Transport};
///
/// #[tokio::main]
/// async fn main() -> doorknock_link::Result<()> {
///     let (transport, handle) = MockTransport::new();
///
///     let peers = transport.bonded_devices().await?;
///     let mut session = transport.open_session(&peers[0], b'\n').await?;
///     session.write(b"UNLOCK:kevin\n").await?;
///
///     assert_eq!(handle.written_text(), vec!["UNLOCK:kevin\n".to_string()]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock transport with a single bonded `HC-05`.
    pub fn new() -> (Self, MockTransportHandle) {
        Self::with_devices(vec![PeerDevice::new(DEFAULT_PERIPHERAL_NAME, MOCK_ADDRESS)])
    }

    /// Create a mock transport with the given bonded devices.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorknock_link::mock::MockTransport;
    ///
    /// let (transport, handle) = MockTransport::with_devices(Vec::new());
    /// assert!(handle.bonded_devices().is_empty());
    /// ```
    pub fn with_devices(bonded: Vec<PeerDevice>) -> (Self, MockTransportHandle) {
        let state = Arc::new(Mutex::new(MockState {
            bonded,
            ..MockState::default()
        }));

        let transport = Self {
            state: Arc::clone(&state),
        };
        let handle = MockTransportHandle { state };

        (transport, handle)
    }
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn is_available(&self) -> bool {
        true
    }

    async fn bonded_devices(&self) -> Result<Vec<PeerDevice>> {
        let mut state = self.state.lock();
        match state.list_failure.take() {
            Some(message) => Err(LinkError::other(message)),
            None => Ok(state.bonded.clone()),
        }
    }

    async fn open_session(&self, peer: &PeerDevice, delimiter: u8) -> Result<MockSession> {
        let mut state = self.state.lock();
        if let Some(message) = state.open_failure.take() {
            return Err(LinkError::session_open(message));
        }

        debug!(%peer, "Mock session opened");
        state.opened.push(peer.clone());
        state.delimiter = Some(delimiter);

        Ok(MockSession {
            peer: peer.clone(),
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

/// Session produced by [`MockTransport`].
#[derive(Debug)]
pub struct MockSession {
    peer: PeerDevice,
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockSession {
    pub fn peer(&self) -> &PeerDevice {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Session for MockSession {
    fn can_write(&self) -> bool {
        !self.state.lock().read_only
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(LinkError::disconnected(self.peer.name.clone()));
        }

        let mut state = self.state.lock();
        if let Some(message) = state.write_failure.clone() {
            return Err(LinkError::write(message));
        }
        state.written.push(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;

        let mut state = self.state.lock();
        state.closed += 1;
        state.inbound = None;

        match state.close_failure.take() {
            Some(message) => Err(LinkError::disconnect(message)),
            None => Ok(()),
        }
    }

    fn subscribe(&mut self) -> Result<mpsc::Receiver<SessionEvent>> {
        if self.closed {
            return Err(LinkError::disconnected(self.peer.name.clone()));
        }

        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        self.state.lock().inbound = Some(tx);
        Ok(rx)
    }
}

/// Handle for driving a mock transport.
///
/// Cloning yields another handle to the same transport.
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransportHandle {
    /// Send raw bytes to the subscribed host.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is subscribed.
    pub async fn send_data(&self, data: impl Into<Bytes>) -> Result<()> {
        self.deliver(SessionEvent::Data(data.into())).await
    }

    /// Send `line` followed by the session delimiter.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorknock_link::mock::MockTransport;
    /// use doorknock_link::traits::{Session, Transport};
    /// use doorknock_link::SessionEvent;
    ///
    /// #[tokio::main]
    /// async fn main() -> doorknock_link::Result<()> {
    ///     let (transport, handle) = MockTransport::new();
    ///     let peers = transport.bonded_devices().await?;
    ///     let mut session = transport.open_session(&peers[0], b'\n').await?;
    ///     let mut inbound = session.subscribe()?;
    ///
    ///     handle.send_line("L").await?;
    ///
    ///     assert_eq!(
    ///         inbound.recv().await,
    ///         Some(SessionEvent::Data("L\n".into()))
    ///     );
    ///     Ok(())
    /// }
    /// ```
    pub async fn send_line(&self, line: &str) -> Result<()> {
        let delimiter = self.state.lock().delimiter.unwrap_or(DEFAULT_DELIMITER);
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(delimiter);
        self.send_data(data).await
    }

    /// Simulate the peripheral hanging up.
    pub async fn hang_up(&self) -> Result<()> {
        self.deliver(SessionEvent::Disconnected).await
    }

    async fn deliver(&self, event: SessionEvent) -> Result<()> {
        let tx = self
            .state
            .lock()
            .inbound
            .clone()
            .ok_or_else(|| LinkError::disconnected("no subscribed session"))?;

        tx.send(event)
            .await
            .map_err(|_| LinkError::disconnected("inbound subscription dropped"))
    }

    /// Add a bonded device.
    pub fn add_bonded_device(&self, peer: PeerDevice) {
        self.state.lock().bonded.push(peer);
    }

    pub fn bonded_devices(&self) -> Vec<PeerDevice> {
        self.state.lock().bonded.clone()
    }

    /// Fail the next bonded-device listing with `message`.
    pub fn fail_next_listing(&self, message: impl Into<String>) {
        self.state.lock().list_failure = Some(message.into());
    }

    /// Fail the next session open with `message`.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.state.lock().open_failure = Some(message.into());
    }

    /// Fail every write with `message` until cleared with `None`.
    pub fn fail_writes(&self, message: Option<String>) {
        self.state.lock().write_failure = message;
    }

    /// Fail the next session close with `message`.
    pub fn fail_next_close(&self, message: impl Into<String>) {
        self.state.lock().close_failure = Some(message.into());
    }

    /// Make sessions report that they cannot write.
    pub fn set_read_only(&self, read_only: bool) {
        self.state.lock().read_only = read_only;
    }

    /// Payloads written by the host, in order.
    pub fn written(&self) -> Vec<Bytes> {
        self.state.lock().written.clone()
    }

    /// Payloads written by the host, decoded lossily as text.
    pub fn written_text(&self) -> Vec<String> {
        self.state
            .lock()
            .written
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// Peers sessions were opened with, in order.
    pub fn opened(&self) -> Vec<PeerDevice> {
        self.state.lock().opened.clone()
    }

    /// Number of session closes.
    pub fn close_count(&self) -> usize {
        self.state.lock().closed
    }

    /// Whether a host is currently subscribed to inbound data.
    pub fn is_subscribed(&self) -> bool {
        self.state
            .lock()
            .inbound
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open(transport: &MockTransport) -> MockSession {
        let peers = transport.bonded_devices().await.unwrap();
        transport.open_session(&peers[0], b'\n').await.unwrap()
    }

    #[tokio::test]
    async fn test_default_bonded_device() {
        let (transport, _handle) = MockTransport::new();

        let peers = transport.bonded_devices().await.unwrap();
        assert_eq!(peers, vec![PeerDevice::new("HC-05", MOCK_ADDRESS)]);
        assert!(transport.is_available());
    }

    #[tokio::test]
    async fn test_listing_failure_is_one_shot() {
        let (transport, handle) = MockTransport::new();
        handle.fail_next_listing("adapter off");

        assert!(transport.bonded_devices().await.is_err());
        assert!(transport.bonded_devices().await.is_ok());
    }

    #[tokio::test]
    async fn test_open_failure() {
        let (transport, handle) = MockTransport::new();
        handle.fail_next_open("busy");

        let peer = handle.bonded_devices().remove(0);
        let error = transport.open_session(&peer, b'\n').await.unwrap_err();
        assert!(matches!(error, LinkError::SessionOpen { .. }));
        assert!(handle.opened().is_empty());
    }

    #[tokio::test]
    async fn test_write_capture_and_failure() {
        let (transport, handle) = MockTransport::new();
        let mut session = open(&transport).await;

        session.write(b"A\n").await.unwrap();
        handle.fail_writes(Some("pipe".to_string()));
        assert!(session.write(b"B\n").await.is_err());
        handle.fail_writes(None);
        session.write(b"C\n").await.unwrap();

        assert_eq!(handle.written_text(), vec!["A\n".to_string(), "C\n".to_string()]);
    }

    #[tokio::test]
    async fn test_inbound_line_uses_session_delimiter() {
        let (transport, handle) = MockTransport::new();
        let peer = handle.bonded_devices().remove(0);
        let mut session = transport.open_session(&peer, b'\r').await.unwrap();
        let mut inbound = session.subscribe().unwrap();

        handle.send_line("R").await.unwrap();
        assert_eq!(
            inbound.recv().await,
            Some(SessionEvent::Data(Bytes::from_static(b"R\r")))
        );
    }

    #[tokio::test]
    async fn test_dropping_receiver_unsubscribes() {
        let (transport, handle) = MockTransport::new();
        let mut session = open(&transport).await;

        let inbound = session.subscribe().unwrap();
        assert!(handle.is_subscribed());

        drop(inbound);
        assert!(!handle.is_subscribed());
        assert!(handle.send_line("L").await.is_err());
    }

    #[tokio::test]
    async fn test_close_failure_still_closes() {
        let (transport, handle) = MockTransport::new();
        let mut session = open(&transport).await;
        let _inbound = session.subscribe().unwrap();
        handle.fail_next_close("radio stuck");

        assert!(session.close().await.is_err());
        assert!(session.is_closed());
        assert!(!handle.is_subscribed());
        assert_eq!(handle.close_count(), 1);
        assert!(session.write(b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_hang_up() {
        let (transport, handle) = MockTransport::new();
        let mut session = open(&transport).await;
        let mut inbound = session.subscribe().unwrap();

        handle.hang_up().await.unwrap();
        assert_eq!(inbound.recv().await, Some(SessionEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_read_only() {
        let (transport, handle) = MockTransport::new();
        let session = open(&transport).await;

        assert!(session.can_write());
        handle.set_read_only(true);
        assert!(!session.can_write());
    }
}
