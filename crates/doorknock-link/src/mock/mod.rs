//! Mock transport for testing and development.
//!
//! This module provides a simulated link that can be driven programmatically
//! without a paired radio.

pub mod transport;

pub use transport::{MockSession, MockTransport, MockTransportHandle};
