//! Enum wrappers for transport dispatch.
//!
//! The capability traits return `impl Future`, so they cannot be used as
//! `Box<dyn Transport>`. When the transport is picked at runtime (from
//! command-line flags, say) these enums provide concrete dispatch instead,
//! with hardware variants behind feature flags.
//!
//! # Examples
//!
//! ```
//! use doorknock_link::devices::AnyTransport;
//! use doorknock_link::traits::Transport;
//!
//! let transport = AnyTransport::unavailable();
//! assert!(!transport.is_available());
//! ```

use tokio::sync::mpsc;

use crate::error::Result;
use crate::mock::{MockSession, MockTransport};
use crate::traits::{Session, Transport};
use crate::types::{PeerDevice, SessionEvent};
use crate::unavailable::UnavailableTransport;

#[cfg(feature = "hardware-serial")]
use crate::serial::{SerialSession, SerialTransport};

/// Enum wrapper for transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Mock transport for development and testing.
    Mock(MockTransport),

    /// No capability installed.
    Unavailable(UnavailableTransport),

    /// Local serial port.
    #[cfg(feature = "hardware-serial")]
    Serial(SerialTransport),
}

impl AnyTransport {
    pub fn unavailable() -> Self {
        Self::Unavailable(UnavailableTransport)
    }
}

impl Transport for AnyTransport {
    type Session = AnySession;

    fn is_available(&self) -> bool {
        match self {
            Self::Mock(transport) => transport.is_available(),
            Self::Unavailable(transport) => transport.is_available(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(transport) => transport.is_available(),
        }
    }

    async fn bonded_devices(&self) -> Result<Vec<PeerDevice>> {
        match self {
            Self::Mock(transport) => transport.bonded_devices().await,
            Self::Unavailable(transport) => transport.bonded_devices().await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(transport) => transport.bonded_devices().await,
        }
    }

    async fn open_session(&self, peer: &PeerDevice, delimiter: u8) -> Result<AnySession> {
        match self {
            Self::Mock(transport) => transport
                .open_session(peer, delimiter)
                .await
                .map(AnySession::Mock),
            Self::Unavailable(transport) => match transport.open_session(peer, delimiter).await? {},
            #[cfg(feature = "hardware-serial")]
            Self::Serial(transport) => transport
                .open_session(peer, delimiter)
                .await
                .map(AnySession::Serial),
        }
    }
}

/// Enum wrapper for session dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySession {
    /// Session on a mock transport.
    Mock(MockSession),

    /// Session on a serial port.
    #[cfg(feature = "hardware-serial")]
    Serial(SerialSession),
}

impl Session for AnySession {
    fn can_write(&self) -> bool {
        match self {
            Self::Mock(session) => session.can_write(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(session) => session.can_write(),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::Mock(session) => session.write(bytes).await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(session) => session.write(bytes).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(session) => session.close().await,
            #[cfg(feature = "hardware-serial")]
            Self::Serial(session) => session.close().await,
        }
    }

    fn subscribe(&mut self) -> Result<mpsc::Receiver<SessionEvent>> {
        match self {
            Self::Mock(session) => session.subscribe(),
            #[cfg(feature = "hardware-serial")]
            Self::Serial(session) => session.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkError;

    #[tokio::test]
    async fn test_mock_dispatch() {
        let (mock, handle) = MockTransport::new();
        let transport = AnyTransport::Mock(mock);

        let peers = transport.bonded_devices().await.unwrap();
        let mut session = transport.open_session(&peers[0], b'\n').await.unwrap();
        assert!(matches!(session, AnySession::Mock(_)));

        session.write(b"UNLOCK:danny\n").await.unwrap();
        assert_eq!(handle.written_text(), vec!["UNLOCK:danny\n".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_dispatch() {
        let transport = AnyTransport::unavailable();
        let peer = PeerDevice::new("HC-05", "00:00:00:00:00:00");

        let error = transport.open_session(&peer, b'\n').await.unwrap_err();
        assert!(matches!(error, LinkError::Configuration { .. }));
    }
}
