//! Peripheral link lifecycle for the door knock host.
//!
//! This crate owns the connection to the knock peripheral (an HC-05 radio
//! bridge in the reference build). It turns the transport's raw inbound
//! bytes into knocks for the recognizer and sends the unlock command back
//! when a code matches.
//!
//! # Design
//!
//! - **Capability traits**: the radio stack is consumed only through
//!   [`Transport`] and [`Session`], using native `async fn` in traits
//!   (Edition 2024 RPITIT) with `Send` futures.
//! - **Enum dispatch**: [`AnyTransport`] picks a concrete transport at
//!   runtime, since the traits are not object-safe.
//! - **No conditional loading**: a host without a radio uses
//!   [`UnavailableTransport`], which fails every operation with
//!   [`LinkError::Configuration`].
//!
//! # Transports
//!
//! - [`mock::MockTransport`]: programmable peer for tests and demos
//! - [`UnavailableTransport`]: no capability
//! - `serial::SerialTransport` (feature `hardware-serial`): local serial
//!   ports such as `/dev/rfcomm0`
//!
//! # Example
//!
//! ```no_run
//! use doorknock_core::KnockConfig;
//! use doorknock_link::devices::AnyTransport;
//! use doorknock_link::mock::MockTransport;
//! use doorknock_link::LinkManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (transport, handle) = MockTransport::new();
//!     let manager = LinkManager::with_config(AnyTransport::Mock(transport), &KnockConfig::default())?;
//!
//!     manager.connect().await?;
//!     for knock in ["L", "L", "R", "R"] {
//!         handle.send_line(knock).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! [`Transport`]: traits::Transport
//! [`Session`]: traits::Session
//! [`AnyTransport`]: devices::AnyTransport
//! [`UnavailableTransport`]: unavailable::UnavailableTransport

pub mod devices;
pub mod error;
pub mod manager;
pub mod mock;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod traits;
pub mod types;
pub mod unavailable;

// Re-export commonly used types for convenience
pub use devices::{AnySession, AnyTransport};
pub use error::{LinkError, Result};
pub use manager::LinkManager;
pub use traits::{Session, Transport};
pub use types::{LinkConfig, LinkState, PeerDevice, SessionEvent};
pub use unavailable::UnavailableTransport;
