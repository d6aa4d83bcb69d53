//! Classification of inbound text lines into knock zones.
//!
//! The peripheral firmware has shipped with several encodings over time, so
//! the classifier accepts all of them:
//!
//! | Line (trimmed, any case) | Zone |
//! |--------------------------|------|
//! | starts with `l`, or `1`  | Left |
//! | starts with `r`, or `2`  | Right |
//! | anything else            | unrecognized |
//!
//! Unrecognized lines are not errors; the link is best-effort text and
//! callers simply drop them.

use doorknock_core::Zone;

/// Classify a single line (without its delimiter).
///
/// # Examples
///
/// ```
/// use doorknock_core::Zone;
/// use doorknock_protocol::classify_line;
///
/// assert_eq!(classify_line("L"), Some(Zone::Left));
/// assert_eq!(classify_line("  right\r"), Some(Zone::Right));
/// assert_eq!(classify_line("2"), Some(Zone::Right));
/// assert_eq!(classify_line("OK"), None);
/// ```
#[must_use]
pub fn classify_line(line: &str) -> Option<Zone> {
    let normalized = line.trim().to_lowercase();

    if normalized.starts_with('l') || normalized == "1" {
        Some(Zone::Left)
    } else if normalized.starts_with('r') || normalized == "2" {
        Some(Zone::Right)
    } else {
        None
    }
}

/// A complete line extracted from the link, with its classification.
///
/// The raw text is kept even when the line is unrecognized so the host can
/// show the last message received for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    /// Line text without the delimiter (lossily decoded as UTF-8).
    pub raw: String,

    /// Zone the line encodes, if any.
    pub zone: Option<Zone>,
}

impl DecodedLine {
    /// Classify `raw` and wrap it.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let zone = classify_line(&raw);
        Self { raw, zone }
    }

    /// Returns `true` if the line encodes a knock.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        self.zone.is_some()
    }
}
