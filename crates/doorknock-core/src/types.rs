use crate::{Result, error::Error};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical knock location on the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    #[serde(rename = "L", alias = "l", alias = "Left")]
    Left,
    #[serde(rename = "R", alias = "r", alias = "Right")]
    Right,
}

impl Zone {
    /// Create a zone from its single-letter symbol (`L` or `R`, any case).
    ///
    /// # Errors
    /// Returns `Error::InvalidZone` for any other character.
    #[inline]
    pub fn from_symbol(symbol: char) -> Result<Self> {
        match symbol.to_ascii_uppercase() {
            'L' => Ok(Zone::Left),
            'R' => Ok(Zone::Right),
            _ => Err(Error::InvalidZone(symbol.to_string())),
        }
    }

    /// Single-letter symbol used in code tables and logs.
    #[inline]
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Zone::Left => 'L',
            Zone::Right => 'R',
        }
    }

    /// Returns `true` if zone is Left.
    #[inline]
    #[must_use]
    pub fn is_left(self) -> bool {
        matches!(self, Zone::Left)
    }

    /// Returns `true` if zone is Right.
    #[inline]
    #[must_use]
    pub fn is_right(self) -> bool {
        matches!(self, Zone::Right)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Zone::Left => write!(f, "Left"),
            Zone::Right => write!(f, "Right"),
        }
    }
}

impl std::str::FromStr for Zone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Ok(Zone::Left),
            "r" | "right" => Ok(Zone::Right),
            _ => Err(Error::InvalidZone(s.to_string())),
        }
    }
}

/// Where a knock came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnockSource {
    /// Decoded from the peripheral link.
    Transport,
    /// Triggered manually by the host (test buttons, console input).
    Simulated,
}

impl fmt::Display for KnockSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KnockSource::Transport => write!(f, "transport"),
            KnockSource::Simulated => write!(f, "simulated"),
        }
    }
}

/// A single observed or simulated knock.
///
/// Events are immutable once created; the recognizer drops them when they
/// slide out of its window or on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockEvent {
    pub zone: Zone,
    pub observed_at: DateTime<Local>,
    pub source: KnockSource,
}

impl KnockEvent {
    /// Create an event stamped with the current local time.
    #[must_use]
    pub fn now(zone: Zone, source: KnockSource) -> Self {
        Self {
            zone,
            observed_at: Local::now(),
            source,
        }
    }
}

impl fmt::Display for KnockEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} knock ({}) at {}",
            self.zone,
            self.source,
            self.observed_at.format("%H:%M:%S%.3f")
        )
    }
}
