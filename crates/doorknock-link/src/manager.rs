//! Link lifecycle manager.
//!
//! This module provides the [`LinkManager`], which owns the session with the
//! knock peripheral, routes its inbound lines into the recognizer, and sends
//! the unlock command back whenever a code matches.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  SessionEvent   ┌────────────┐  zone   ┌────────────┐
//! │  Session   │────────────────►│ Pump task  │────────►│ Recognizer │
//! │ (transport)│                 │ LineDecoder│         └─────┬──────┘
//! └─────▲──────┘                 └────────────┘               │ match
//!       │                                                     │
//!       └──────────────── UNLOCK:<code>\n ◄───────────────────┘
//! ```
//!
//! The pump task exists exactly as long as the session: it is spawned after
//! the session is subscribed and aborted (dropping the subscription) before
//! the session is closed, so no inbound data is ever processed while the
//! link is not connected.
//!
//! # Error Handling
//!
//! Every failure is recorded as [`last_error`](LinkManager::last_error) and
//! returned. Connect failures also move the link to [`LinkState::Error`];
//! write failures leave the link state untouched. Nothing is retried.
//!
//! # Examples
//!
//! ```no_run
//! use doorknock_core::{CodeTable, Zone};
//! use doorknock_link::mock::MockTransport;
//! use doorknock_link::{LinkConfig, LinkManager};
//! use doorknock_recognizer::PatternRecognizer;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> doorknock_link::Result<()> {
//!     let (transport, handle) = MockTransport::new();
//!     let recognizer = PatternRecognizer::new(CodeTable::reference(), Duration::from_millis(6500));
//!     let manager = LinkManager::new(transport, recognizer, LinkConfig::default());
//!
//!     manager.connect().await?;
//!     for zone in [Zone::Left, Zone::Left, Zone::Right, Zone::Right] {
//!         manager.simulate_knock(zone).await;
//!     }
//!
//!     assert_eq!(handle.written_text(), vec!["UNLOCK:kevin\n".to_string()]);
//!     manager.disconnect().await
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::devices::AnyTransport;
use crate::error::{LinkError, Result};
use crate::traits::{Session, Transport};
use crate::types::{LinkConfig, LinkState, PeerDevice, SessionEvent};
use crate::unavailable::UNAVAILABLE_MESSAGE;
use doorknock_core::{CodeName, KnockConfig, KnockSource, Zone};
use doorknock_protocol::{DecodedLine, LineDecoder, UnlockCommand};
use doorknock_recognizer::{KnockOutcome, PatternRecognizer};

/// Pick the bonded device named `name`, else the first one.
///
/// # Examples
///
/// ```
/// use doorknock_link::PeerDevice;
/// use doorknock_link::manager::select_peer;
///
/// let bonded = vec![
///     PeerDevice::new("Headset", "00:11:22:33:44:55"),
///     PeerDevice::new("HC-05", "00:21:13:00:AB:CD"),
/// ];
/// assert_eq!(select_peer(&bonded, "HC-05").unwrap().name, "HC-05");
/// assert_eq!(select_peer(&bonded, "HC-06").unwrap().name, "Headset");
/// assert!(select_peer(&[], "HC-05").is_none());
/// ```
pub fn select_peer<'a>(bonded: &'a [PeerDevice], name: &str) -> Option<&'a PeerDevice> {
    bonded
        .iter()
        .find(|peer| peer.name == name)
        .or_else(|| bonded.first())
}

/// Session slot contents while connected.
struct ActiveSession<S> {
    session: S,
    peer: PeerDevice,
    pump: JoinHandle<()>,
}

struct Inner<T: Transport> {
    transport: T,
    recognizer: PatternRecognizer,
    config: LinkConfig,
    session: Mutex<Option<ActiveSession<T::Session>>>,
    state_tx: watch::Sender<LinkState>,
    message_tx: watch::Sender<Option<String>>,
    last_error: parking_lot::Mutex<Option<String>>,
    visible: AtomicBool,
}

/// Owns the peripheral link and its lifecycle.
///
/// Lifecycle calls ([`connect`](Self::connect),
/// [`disconnect`](Self::disconnect)) are expected to be serialised by the
/// caller; overlapping connects are ignored rather than queued.
pub struct LinkManager<T: Transport = AnyTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> LinkManager<T> {
    /// Create a manager in the `Idle` state.
    pub fn new(transport: T, recognizer: PatternRecognizer, config: LinkConfig) -> Self {
        let (state_tx, _) = watch::channel(LinkState::Idle);
        let (message_tx, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                transport,
                recognizer,
                config,
                session: Mutex::new(None),
                state_tx,
                message_tx,
                last_error: parking_lot::Mutex::new(None),
                visible: AtomicBool::new(true),
            }),
        }
    }

    /// Create a manager and its recognizer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured code table is invalid.
    pub fn with_config(transport: T, config: &KnockConfig) -> doorknock_core::Result<Self> {
        let recognizer = PatternRecognizer::with_config(config)?;
        Ok(Self::new(transport, recognizer, LinkConfig::from(config)))
    }

    /// Connect to the preferred bonded peer.
    ///
    /// A no-op while already connecting or connected.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Configuration`] if the transport is unavailable (the
    ///   link goes straight to `Error`, never through `Connecting`)
    /// - [`LinkError::NoBondedDevice`] if no peer is bonded
    /// - [`LinkError::SessionOpen`] if the session cannot be opened
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;

        let current = inner.state_tx.borrow().clone();
        if current.is_busy() {
            warn!(state = %current, "Connect ignored, link already busy");
            return Ok(());
        }

        if !inner.transport.is_available() {
            return Err(inner.fail_connect(LinkError::configuration(UNAVAILABLE_MESSAGE)));
        }

        let started = inner.state_tx.send_if_modified(|state| {
            if state.is_busy() {
                return false;
            }
            *state = LinkState::Connecting;
            true
        });
        if !started {
            return Ok(());
        }

        *inner.last_error.lock() = None;
        info!(peripheral = %inner.config.peripheral_name, "Connecting");

        match inner.establish().await {
            Ok(peer) => {
                info!(%peer, "Connected");
                Ok(())
            }
            Err(error) => Err(inner.fail_connect(error)),
        }
    }

    /// Drop the session and return to `Idle`.
    ///
    /// A no-op unless connected. The state moves to `Idle` even when the
    /// transport fails to close the session.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Disconnect`] if closing failed.
    pub async fn disconnect(&self) -> Result<()> {
        let active = self.inner.session.lock().await.take();
        let Some(mut active) = active else {
            debug!("Disconnect ignored, not connected");
            return Ok(());
        };

        active.pump.abort();
        let _ = (&mut active.pump).await;

        let closed = active.session.close().await;
        self.inner.state_tx.send_replace(LinkState::Idle);
        info!(peer = %active.peer, "Disconnected");

        closed.map_err(|error| self.inner.record(error.into_disconnect()))
    }

    /// Send `command` followed by the delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Write`] when not connected or the write fails,
    /// and [`LinkError::Configuration`] when the session cannot write. The
    /// link state is never changed.
    pub async fn send(&self, command: &str) -> Result<()> {
        let mut payload = Vec::with_capacity(command.len() + 1);
        payload.extend_from_slice(command.as_bytes());
        payload.push(self.inner.config.delimiter);

        self.inner.send_payload(&payload).await?;
        debug!(command, "Command sent");
        Ok(())
    }

    /// Send `UNLOCK:<code>` followed by the delimiter.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_unlock(&self, code: &CodeName) -> Result<()> {
        self.inner.send_unlock(code).await
    }

    /// Register a knock triggered locally rather than by the peripheral.
    ///
    /// A match is forwarded to the peripheral exactly like a transport
    /// knock; if that send fails, the error is recorded but not returned.
    pub async fn simulate_knock(&self, zone: Zone) -> KnockOutcome {
        let outcome = self
            .inner
            .recognizer
            .register_knock(zone, KnockSource::Simulated);
        self.inner.forward_match(&outcome).await;
        outcome
    }

    /// Host visibility hook.
    ///
    /// Going from visible to hidden disconnects. Becoming visible again
    /// never reconnects; that stays a user action.
    ///
    /// # Errors
    ///
    /// Returns the disconnect error, if any.
    pub async fn on_host_visibility_changed(&self, visible: bool) -> Result<()> {
        let was_visible = self.inner.visible.swap(visible, Ordering::SeqCst);
        if was_visible && !visible {
            info!("Host hidden, releasing link");
            return self.disconnect().await;
        }
        Ok(())
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.inner.state_tx.borrow().clone()
    }

    /// Watch the link state.
    pub fn subscribe_state(&self) -> watch::Receiver<LinkState> {
        self.inner.state_tx.subscribe()
    }

    /// Last raw line received, recognised or not.
    pub fn last_message(&self) -> Option<String> {
        self.inner.message_tx.borrow().clone()
    }

    /// Watch the last raw line received.
    pub fn subscribe_last_message(&self) -> watch::Receiver<Option<String>> {
        self.inner.message_tx.subscribe()
    }

    /// Message of the most recent failure, cleared on each connect attempt.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state_tx.borrow().is_connected()
    }

    pub fn recognizer(&self) -> &PatternRecognizer {
        &self.inner.recognizer
    }

    pub fn config(&self) -> &LinkConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }
}

impl<T: Transport> Inner<T> {
    /// Select a peer, open and subscribe a session, start the pump.
    async fn establish(self: &Arc<Self>) -> Result<PeerDevice> {
        let bonded = self.transport.bonded_devices().await?;
        let peer = select_peer(&bonded, &self.config.peripheral_name)
            .cloned()
            .ok_or_else(|| {
                LinkError::no_bonded_device(format!(
                    "No bonded {} found. Pair it in system settings first.",
                    self.config.peripheral_name
                ))
            })?;
        debug!(%peer, bonded = bonded.len(), "Peer selected");

        let mut session = self
            .transport
            .open_session(&peer, self.config.delimiter)
            .await
            .map_err(LinkError::into_session_open)?;

        let events = match session.subscribe() {
            Ok(events) => events,
            Err(error) => {
                let _ = session.close().await;
                return Err(error.into_session_open());
            }
        };

        // Publish Connected while holding the slot so a hang-up handled by
        // the pump can only be observed after it.
        let mut slot = self.session.lock().await;
        let pump = tokio::spawn(pump(
            Arc::downgrade(self),
            events,
            self.config.delimiter,
        ));
        *slot = Some(ActiveSession {
            session,
            peer: peer.clone(),
            pump,
        });
        self.state_tx.send_replace(LinkState::Connected(peer.clone()));

        Ok(peer)
    }

    async fn route_line(&self, line: DecodedLine) {
        trace!(raw = %line.raw, "Line received");
        self.message_tx.send_replace(Some(line.raw.clone()));

        match line.zone {
            Some(zone) => {
                let outcome = self.recognizer.register_knock(zone, KnockSource::Transport);
                self.forward_match(&outcome).await;
            }
            None => debug!(raw = %line.raw, "Ignoring unrecognized line"),
        }
    }

    async fn forward_match(&self, outcome: &KnockOutcome) {
        if let Some(code) = outcome.matched() {
            // Already recorded as last_error.
            let _ = self.send_unlock(code).await;
        }
    }

    async fn send_unlock(&self, code: &CodeName) -> Result<()> {
        let command = UnlockCommand::with_prefix(self.config.unlock_prefix.clone(), code.clone());
        self.send_payload(&command.to_wire(self.config.delimiter))
            .await?;
        info!(%command, "Unlock sent");
        Ok(())
    }

    async fn send_payload(&self, payload: &[u8]) -> Result<()> {
        let mut slot = self.session.lock().await;
        let Some(active) = slot.as_mut() else {
            return Err(self.record(LinkError::write(format!(
                "Connect to {} before sending commands.",
                self.config.peripheral_name
            ))));
        };

        if !active.session.can_write() {
            return Err(self.record(LinkError::configuration(format!(
                "session with {} does not support writing",
                active.peer.name
            ))));
        }

        active
            .session
            .write(payload)
            .await
            .map_err(|error| self.record(error.into_write()))
    }

    /// The peer hung up or the inbound stream ended.
    async fn on_remote_disconnect(&self) {
        let active = self.session.lock().await.take();
        let Some(mut active) = active else {
            return;
        };

        warn!(peer = %active.peer, "Peripheral disconnected");
        if let Err(error) = active.session.close().await {
            debug!(%error, "Close after hang-up failed");
        }
        self.state_tx.send_replace(LinkState::Idle);
    }

    /// Record a connect failure and move to `Error`.
    fn fail_connect(&self, error: LinkError) -> LinkError {
        let error = self.record(error);
        self.state_tx.send_replace(LinkState::Error(error.message()));
        error
    }

    fn record(&self, error: LinkError) -> LinkError {
        warn!(%error, "Link operation failed");
        *self.last_error.lock() = Some(error.message());
        error
    }
}

impl<T: Transport> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(active) = self.session.get_mut().take() {
            active.pump.abort();
        }
    }
}

/// Inbound routing for one session.
async fn pump<T: Transport>(
    manager: Weak<Inner<T>>,
    mut events: mpsc::Receiver<SessionEvent>,
    delimiter: u8,
) {
    let mut decoder = LineDecoder::new(delimiter);

    while let Some(event) = events.recv().await {
        let Some(inner) = manager.upgrade() else {
            return;
        };

        match event {
            SessionEvent::Data(chunk) => {
                decoder.feed(&chunk);
                while let Some(line) = decoder.next_line() {
                    inner.route_line(line).await;
                }
            }
            SessionEvent::Disconnected => break,
        }
    }

    drop(events);
    if let Some(inner) = manager.upgrade() {
        inner.on_remote_disconnect().await;
    }
}

impl<T: Transport> fmt::Debug for LinkManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkManager")
            .field("state", &*self.inner.state_tx.borrow())
            .field("config", &self.inner.config)
            .field("last_error", &*self.inner.last_error.lock())
            .finish()
    }
}
