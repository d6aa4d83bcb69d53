//! Error types for link operations.
//!
//! Every failure the link manager can hit maps to one of these variants.
//! The manager never lets them escape as faults: each one is recorded as a
//! human-readable message (and, for connect failures, as
//! [`LinkState::Error`](crate::LinkState::Error)) before being returned.

/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors that can occur while managing the peripheral link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No usable transport is installed, or it lacks a required capability.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The transport knows no bonded peer to connect to.
    #[error("{message}")]
    NoBondedDevice { message: String },

    /// Opening a session with the selected peer failed.
    #[error("Unable to open session: {message}")]
    SessionOpen { message: String },

    /// Writing to the session failed, or no session is open.
    #[error("Write failed: {message}")]
    Write { message: String },

    /// Closing the session failed.
    #[error("Disconnect failed: {message}")]
    Disconnect { message: String },

    /// The session is closed or the peer went away.
    #[error("Peripheral disconnected: {device}")]
    Disconnected { device: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl LinkError {
    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new no-bonded-device error.
    pub fn no_bonded_device(message: impl Into<String>) -> Self {
        Self::NoBondedDevice {
            message: message.into(),
        }
    }

    /// Create a new session open error.
    pub fn session_open(message: impl Into<String>) -> Self {
        Self::SessionOpen {
            message: message.into(),
        }
    }

    /// Create a new write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a new disconnect error.
    pub fn disconnect(message: impl Into<String>) -> Self {
        Self::Disconnect {
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// The underlying message, without the variant's display prefix.
    ///
    /// This is what the manager records in `last_error` and
    /// [`LinkState::Error`](crate::LinkState::Error); `Display` keeps the
    /// prefix for logs.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration { message }
            | Self::NoBondedDevice { message }
            | Self::SessionOpen { message }
            | Self::Write { message }
            | Self::Disconnect { message } => message.clone(),
            Self::Disconnected { .. } => self.to_string(),
            Self::Io(error) => error.to_string(),
            Self::Other(message) => message.clone(),
        }
    }

    /// Rewrap as a [`SessionOpen`](Self::SessionOpen) error unless it
    /// already is one or is a configuration problem.
    pub(crate) fn into_session_open(self) -> Self {
        match self {
            Self::SessionOpen { .. } | Self::Configuration { .. } => self,
            other => Self::session_open(other.to_string()),
        }
    }

    /// Rewrap as a [`Write`](Self::Write) error unless it already is one
    /// or is a configuration problem.
    pub(crate) fn into_write(self) -> Self {
        match self {
            Self::Write { .. } | Self::Configuration { .. } => self,
            other => Self::write(other.to_string()),
        }
    }

    /// Rewrap as a [`Disconnect`](Self::Disconnect) error unless it
    /// already is one.
    pub(crate) fn into_disconnect(self) -> Self {
        match self {
            Self::Disconnect { .. } => self,
            other => Self::disconnect(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LinkError::configuration("no transport installed"), "Configuration error: no transport installed")]
    #[case(LinkError::no_bonded_device("No bonded HC-05 found."), "No bonded HC-05 found.")]
    #[case(LinkError::session_open("device busy"), "Unable to open session: device busy")]
    #[case(LinkError::write("broken pipe"), "Write failed: broken pipe")]
    #[case(LinkError::disconnect("close failed"), "Disconnect failed: close failed")]
    #[case(LinkError::disconnected("HC-05"), "Peripheral disconnected: HC-05")]
    #[case(LinkError::other("unexpected"), "unexpected")]
    fn test_error_display(#[case] error: LinkError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case(LinkError::configuration("no transport installed"), "no transport installed")]
    #[case(LinkError::session_open("page timeout"), "page timeout")]
    #[case(LinkError::write("buffer full"), "buffer full")]
    #[case(LinkError::disconnect("radio stuck"), "radio stuck")]
    #[case(LinkError::other("adapter powered off"), "adapter powered off")]
    #[case(LinkError::disconnected("HC-05"), "Peripheral disconnected: HC-05")]
    fn test_message_drops_prefix(#[case] error: LinkError, #[case] expected: &str) {
        assert_eq!(error.message(), expected);
    }

    #[test]
    fn test_into_session_open_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such port");
        let error = LinkError::from(io).into_session_open();
        assert!(matches!(error, LinkError::SessionOpen { .. }));
        assert_eq!(error.message(), "I/O error: no such port");
        assert_eq!(error.to_string(), "Unable to open session: I/O error: no such port");
    }

    #[test]
    fn test_into_write_keeps_configuration() {
        let error = LinkError::configuration("read-only session").into_write();
        assert!(matches!(error, LinkError::Configuration { .. }));

        let error = LinkError::disconnected("HC-05").into_write();
        assert!(matches!(error, LinkError::Write { .. }));
    }
}
