//! Transport capability traits.
//!
//! The link manager consumes the radio stack through two traits:
//!
//! - [`Transport`]: lists bonded peers and opens sessions
//! - [`Session`]: writes bytes, closes, and hands out the inbound stream
//!
//! Methods return `impl Future + Send` so that a manager generic over the
//! transport can still be driven from spawned tasks. Implementations are
//! free to write them as plain `async fn`.
//!
//! # Object Safety
//!
//! **NOTE**: These traits are NOT object-safe (return-position `impl
//! Future`). Use generics, or the enum wrappers in [`devices`](crate::devices)
//! when the transport is chosen at runtime:
//!
//! ```
//! use doorknock_link::devices::AnyTransport;
//! use doorknock_link::mock::MockTransport;
//!
//! let (transport, _handle) = MockTransport::new();
//! let transport = AnyTransport::Mock(transport);
//! ```

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{PeerDevice, SessionEvent};

/// Source of sessions with bonded peers.
pub trait Transport: Send + Sync + 'static {
    /// Session type produced by [`open_session`](Self::open_session).
    type Session: Session;

    /// Whether a capability is installed at all.
    ///
    /// When `false`, every other operation fails with
    /// [`LinkError::Configuration`](crate::LinkError::Configuration).
    fn is_available(&self) -> bool;

    /// List peers already bonded with this host.
    fn bonded_devices(&self) -> impl Future<Output = Result<Vec<PeerDevice>>> + Send;

    /// Open a session with `peer`, framing inbound data on `delimiter`.
    fn open_session(
        &self,
        peer: &PeerDevice,
        delimiter: u8,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// An open session with a single peer.
pub trait Session: Send + Sync + 'static {
    /// Whether [`write`](Self::write) is supported.
    fn can_write(&self) -> bool;

    /// Write raw bytes to the peer.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Close the session.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Start receiving inbound events.
    ///
    /// Dropping the returned receiver unsubscribes. Subscribing again
    /// replaces the previous subscription.
    fn subscribe(&mut self) -> Result<mpsc::Receiver<SessionEvent>>;
}
