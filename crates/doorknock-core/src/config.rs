//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields the reference setup: newline delimited lines, an `HC-05`
//! peripheral, a 6.5 s inactivity window and the two reference codes.
//!
//! ```
//! use doorknock_core::KnockConfig;
//!
//! let config = KnockConfig::from_json_str(r#"{ "peripheral_name": "DOOR-01" }"#).unwrap();
//! assert_eq!(config.peripheral_name, "DOOR-01");
//! assert_eq!(config.delimiter, '\n');
//! assert_eq!(config.code_table().unwrap().len(), 2);
//! ```

use crate::{
    Result,
    code::{Code, CodeTable},
    constants::{
        DEFAULT_DELIMITER, DEFAULT_INACTIVITY_TIMEOUT_MS, DEFAULT_PERIPHERAL_NAME, UNLOCK_PREFIX,
    },
    error::Error,
    types::Zone,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Configuration shared by the decoder, recognizer and link manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnockConfig {
    /// Line delimiter for inbound and outbound text (must be ASCII).
    pub delimiter: char,

    /// Advertised name of the peripheral to prefer among bonded devices.
    pub peripheral_name: String,

    /// Inactivity window before a partial sequence is discarded.
    pub inactivity_timeout_ms: u64,

    /// Prefix of the outbound unlock command.
    pub unlock_prefix: String,

    /// Registered codes: name to zone sequence.
    pub codes: BTreeMap<String, Vec<Zone>>,
}

impl Default for KnockConfig {
    fn default() -> Self {
        let codes = CodeTable::reference()
            .iter()
            .map(|code| (code.name().to_string(), code.sequence().to_vec()))
            .collect();

        Self {
            delimiter: char::from(DEFAULT_DELIMITER),
            peripheral_name: DEFAULT_PERIPHERAL_NAME.to_string(),
            inactivity_timeout_ms: DEFAULT_INACTIVITY_TIMEOUT_MS,
            unlock_prefix: UNLOCK_PREFIX.to_string(),
            codes,
        }
    }
}

impl KnockConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns `Error::Json` for malformed JSON or unknown fields, and any
    /// error from [`KnockConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, otherwise as
    /// [`KnockConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    /// Returns `Error::Config` if the delimiter is not ASCII or collides with
    /// the command text, if the timeout is zero, or if the peripheral name
    /// or unlock prefix is empty; code table errors are passed through.
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(Error::Config(format!(
                "delimiter must be ASCII, got {:?}",
                self.delimiter
            )));
        }

        if self.delimiter.is_ascii_alphanumeric() || self.delimiter == ':' {
            return Err(Error::Config(format!(
                "delimiter {:?} would collide with knock tokens or commands",
                self.delimiter
            )));
        }

        if self.inactivity_timeout_ms == 0 {
            return Err(Error::Config(
                "inactivity_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.peripheral_name.trim().is_empty() {
            return Err(Error::Config("peripheral_name must not be empty".to_string()));
        }

        if self.unlock_prefix.is_empty() || self.unlock_prefix.contains(self.delimiter) {
            return Err(Error::Config(
                "unlock_prefix must be non-empty and free of the delimiter".to_string(),
            ));
        }

        self.code_table().map(|_| ())
    }

    /// Delimiter as a wire byte.
    ///
    /// Falls back to the default delimiter if the configured one is not
    /// ASCII; [`KnockConfig::validate`] rejects that case up front.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .unwrap_or(DEFAULT_DELIMITER)
    }

    #[must_use]
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    /// Build the immutable code table from the configured codes.
    ///
    /// # Errors
    /// Any code or table invariant violation (see [`CodeTable::new`]).
    pub fn code_table(&self) -> Result<CodeTable> {
        let codes = self
            .codes
            .iter()
            .map(|(name, sequence)| Code::new(name, sequence))
            .collect::<Result<Vec<_>>>()?;

        CodeTable::new(codes)
    }
}
