//! Transport used when no link capability is installed.
//!
//! Every operation fails with [`LinkError::Configuration`], so a host built
//! without a radio stack still gets a well-labelled error state instead of
//! a missing module.

use tokio::sync::mpsc;

use crate::error::{LinkError, Result};
use crate::traits::{Session, Transport};
use crate::types::{PeerDevice, SessionEvent};

/// Message reported for every operation.
pub const UNAVAILABLE_MESSAGE: &str =
    "no link transport installed; rebuild with a transport feature or pass a port";

/// Transport with no capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableTransport;

impl Transport for UnavailableTransport {
    type Session = NoSession;

    fn is_available(&self) -> bool {
        false
    }

    async fn bonded_devices(&self) -> Result<Vec<PeerDevice>> {
        Err(LinkError::configuration(UNAVAILABLE_MESSAGE))
    }

    async fn open_session(&self, _peer: &PeerDevice, _delimiter: u8) -> Result<NoSession> {
        Err(LinkError::configuration(UNAVAILABLE_MESSAGE))
    }
}

/// Session type of [`UnavailableTransport`]; it can never be constructed.
#[derive(Debug)]
pub enum NoSession {}

impl Session for NoSession {
    fn can_write(&self) -> bool {
        match *self {}
    }

    async fn write(&mut self, _bytes: &[u8]) -> Result<()> {
        match *self {}
    }

    async fn close(&mut self) -> Result<()> {
        match *self {}
    }

    fn subscribe(&mut self) -> Result<mpsc::Receiver<SessionEvent>> {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_operation_is_configuration_error() {
        let transport = UnavailableTransport;
        assert!(!transport.is_available());

        let error = transport.bonded_devices().await.unwrap_err();
        assert!(matches!(error, LinkError::Configuration { .. }));

        let peer = PeerDevice::new("HC-05", "00:00:00:00:00:00");
        let error = transport.open_session(&peer, b'\n').await.unwrap_err();
        assert!(matches!(error, LinkError::Configuration { .. }));
    }
}
