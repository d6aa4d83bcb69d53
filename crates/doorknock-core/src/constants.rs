//! Core constants for the knock link protocol.
//!
//! The peripheral (an HC-05 serial module wired to the knock sensor) speaks a
//! plain text, line oriented protocol:
//!
//! ```text
//! inbound:   L\n   R\n   1\n   2\n   (one knock indicator per line)
//! outbound:  UNLOCK:<code>\n
//! ```
//!
//! # Usage
//!
//! ```
//! use doorknock_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DEFAULT_DELIMITER, b'\n');
//! assert_eq!(CODE_LENGTH, 4);
//!
//! let timeout = Duration::from_millis(DEFAULT_INACTIVITY_TIMEOUT_MS);
//! assert_eq!(timeout.as_millis(), 6500);
//! ```

// ============================================================================
// Wire Format
// ============================================================================

/// Default line delimiter for both directions of the link.
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// Prefix of the outbound unlock instruction.
///
/// # Examples
///
/// ```
/// use doorknock_core::constants::{COMMAND_SEPARATOR, UNLOCK_PREFIX};
///
/// let payload = format!("{UNLOCK_PREFIX}{COMMAND_SEPARATOR}kevin");
/// assert_eq!(payload, "UNLOCK:kevin");
/// ```
pub const UNLOCK_PREFIX: &str = "UNLOCK";

/// Separator between the command prefix and its argument.
pub const COMMAND_SEPARATOR: char = ':';

/// Maximum length of a pending line before it is discarded as noise.
///
/// Valid knock lines are one or two characters long. Anything approaching
/// this size means the delimiter is wrong or the link is garbage.
pub const MAX_LINE_LENGTH: usize = 1024;

// ============================================================================
// Knock Codes
// ============================================================================

/// Number of knocks in every registered code.
pub const CODE_LENGTH: usize = 4;

/// Maximum length of a code name.
pub const MAX_CODE_NAME_LENGTH: usize = 32;

/// Inactivity window after which a partial sequence is discarded (ms).
pub const DEFAULT_INACTIVITY_TIMEOUT_MS: u64 = 6500;

// ============================================================================
// Peripheral
// ============================================================================

/// Advertised name of the expected peripheral.
pub const DEFAULT_PERIPHERAL_NAME: &str = "HC-05";
