pub mod code;
pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use code::{Code, CodeName, CodeTable};
pub use config::KnockConfig;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
