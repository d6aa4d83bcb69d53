//! Common types shared by transports and the link manager.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use doorknock_core::KnockConfig;
use doorknock_core::constants::{DEFAULT_DELIMITER, DEFAULT_PERIPHERAL_NAME, UNLOCK_PREFIX};

/// A bonded peer the transport can open a session with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerDevice {
    /// Advertised name (e.g. "HC-05").
    pub name: String,

    /// Transport-specific address: a Bluetooth MAC, a serial port path.
    pub address: String,
}

impl PeerDevice {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for PeerDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Connectivity of the peripheral link.
///
/// # Transitions
///
/// - Idle/Error → Connecting → Connected | Error
/// - Connected → Idle (disconnect, remote hang-up)
/// - Idle/Error → Error (no transport installed)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum LinkState {
    /// No session, nothing in progress.
    #[default]
    Idle,

    /// Selecting a peer and opening a session.
    Connecting,

    /// Session open with the given peer.
    Connected(PeerDevice),

    /// The last connect attempt failed with this message.
    Error(String),
}

impl LinkState {
    pub fn is_idle(&self) -> bool {
        matches!(self, LinkState::Idle)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, LinkState::Connecting)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LinkState::Error(_))
    }

    /// Whether a connect attempt is in progress or already succeeded.
    pub fn is_busy(&self) -> bool {
        self.is_connecting() || self.is_connected()
    }

    /// Connected peer, if any.
    pub fn peer(&self) -> Option<&PeerDevice> {
        match self {
            LinkState::Connected(peer) => Some(peer),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LinkState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Idle => write!(f, "Idle"),
            LinkState::Connecting => write!(f, "Connecting"),
            LinkState::Connected(peer) => write!(f, "Connected to {peer}"),
            LinkState::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

/// Inbound notification from an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Raw bytes received from the peer, not necessarily line-aligned.
    Data(Bytes),

    /// The peer or the transport closed the session.
    Disconnected,
}

/// Link manager settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Name preferred when selecting among bonded devices.
    pub peripheral_name: String,

    /// Line delimiter for both directions.
    pub delimiter: u8,

    /// Prefix of the outbound unlock command.
    pub unlock_prefix: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            peripheral_name: DEFAULT_PERIPHERAL_NAME.to_string(),
            delimiter: DEFAULT_DELIMITER,
            unlock_prefix: UNLOCK_PREFIX.to_string(),
        }
    }
}

impl From<&KnockConfig> for LinkConfig {
    fn from(config: &KnockConfig) -> Self {
        Self {
            peripheral_name: config.peripheral_name.clone(),
            delimiter: config.delimiter_byte(),
            unlock_prefix: config.unlock_prefix.clone(),
        }
    }
}
