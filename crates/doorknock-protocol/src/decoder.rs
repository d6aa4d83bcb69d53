//! Line framing for the knock link.
//!
//! This module provides a stateful decoder capable of handling partial lines
//! from a serial stream. The decoder accumulates bytes in an internal buffer
//! and extracts complete, classified lines whenever the delimiter arrives.
//!
//! # Framing
//!
//! ```text
//! L\nR\nRR     ->  "L" (Left), "R" (Right), pending "RR"
//! \n           ->  "RR" (Right)
//! ```
//!
//! # Usage
//!
//! ```
//! use doorknock_core::Zone;
//! use doorknock_protocol::LineDecoder;
//!
//! let mut decoder = LineDecoder::new(b'\n');
//!
//! // Serial reads arrive in arbitrary fragments
//! decoder.feed(b"L\nR");
//! decoder.feed(b"\n");
//!
//! let zones: Vec<_> = decoder.drain_lines().filter_map(|line| line.zone).collect();
//! assert_eq!(zones, vec![Zone::Left, Zone::Right]);
//! ```

use bytes::BytesMut;
use doorknock_core::constants::{DEFAULT_DELIMITER, MAX_LINE_LENGTH};
use std::collections::VecDeque;

use crate::line::DecodedLine;

/// Initial buffer capacity for incoming serial data.
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Recommended initial capacity for the line queue.
const INITIAL_LINE_QUEUE_CAPACITY: usize = 4;

/// State machine states for line framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Accumulating bytes of the current line.
    Framing,

    /// Dropping an oversized line until the next delimiter.
    ///
    /// Entered when a pending line grows past `MAX_LINE_LENGTH` without a
    /// delimiter. Everything up to and including the next delimiter is
    /// discarded, then framing resumes on a clean line boundary. A delimited
    /// line over the limit is dropped the same way, so the outcome never
    /// depends on how reads were split.
    Discarding,
}

/// Stateful line decoder for the knock link.
///
/// # State Machine
///
/// ```text
/// ┌─────────┐  line > MAX_LINE_LENGTH  ┌────────────┐
/// │ Framing │─────────────────────────>│ Discarding │
/// └─────────┘                          └────────────┘
///    ^  │ delimiter: emit line               │
///    │  └──────────┘                         │ delimiter: drop
///    └───────────────────────────────────────┘
/// ```
///
/// No input is ever an error: invalid UTF-8 is decoded lossily and
/// unrecognized lines are still emitted (with `zone == None`) so callers can
/// surface them for diagnostics.
#[derive(Debug)]
pub struct LineDecoder {
    /// Bytes of the current, not yet delimited line.
    buffer: BytesMut,

    /// Line delimiter byte.
    delimiter: u8,

    /// Current state of the framing state machine.
    state: DecoderState,

    /// Complete lines ready for extraction.
    lines: VecDeque<DecodedLine>,

    /// Number of oversized lines dropped since creation.
    discarded: u64,
}

impl LineDecoder {
    /// Create a decoder for the given delimiter byte.
    ///
    /// # Example
    ///
    /// ```
    /// use doorknock_protocol::LineDecoder;
    ///
    /// let decoder = LineDecoder::new(b'\r');
    /// assert_eq!(decoder.delimiter(), b'\r');
    /// ```
    pub fn new(delimiter: u8) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            delimiter,
            state: DecoderState::Framing,
            lines: VecDeque::with_capacity(INITIAL_LINE_QUEUE_CAPACITY),
            discarded: 0,
        }
    }

    /// Feed bytes read from the link.
    ///
    /// Multiple lines may be completed by a single call; a trailing fragment
    /// without a delimiter stays buffered until a later call completes it.
    ///
    /// # Example
    ///
    /// ```
    /// use doorknock_protocol::LineDecoder;
    ///
    /// let mut decoder = LineDecoder::default();
    /// decoder.feed(b"L");
    /// assert_eq!(decoder.lines_available(), 0);
    ///
    /// decoder.feed(b"\nR\n");
    /// assert_eq!(decoder.lines_available(), 2);
    /// ```
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        while self.try_extract_line() {
            // Continue extracting lines while possible
        }

        self.enforce_line_limit();
    }

    /// Extract the next complete line, if any.
    pub fn next_line(&mut self) -> Option<DecodedLine> {
        self.lines.pop_front()
    }

    /// Returns number of lines ready for extraction.
    pub fn lines_available(&self) -> usize {
        self.lines.len()
    }

    /// Returns the number of bytes of the pending partial line.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns current decoder state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Line delimiter this decoder frames on.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Number of oversized lines that were dropped.
    pub fn discarded_lines(&self) -> u64 {
        self.discarded
    }

    /// Emit the pending partial line, if any, as a complete line.
    ///
    /// Used at end of stream, where no delimiter will ever arrive. A partial
    /// line that is being discarded is dropped instead.
    pub fn finish(&mut self) {
        if self.state == DecoderState::Discarding {
            self.buffer.clear();
            self.state = DecoderState::Framing;
            return;
        }

        if !self.buffer.is_empty() {
            let bytes = self.buffer.split();
            self.enqueue_line(&bytes);
        }
    }

    /// Clear all internal buffers and reset state.
    ///
    /// Called when the link is reset so a fragment from an old session can
    /// never be glued to the first bytes of a new one. Idempotent.
    ///
    /// # Example
    ///
    /// ```
    /// use doorknock_protocol::{DecoderState, LineDecoder};
    ///
    /// let mut decoder = LineDecoder::default();
    /// decoder.feed(b"L\nR");
    /// decoder.clear();
    ///
    /// assert_eq!(decoder.state(), DecoderState::Framing);
    /// assert_eq!(decoder.lines_available(), 0);
    /// assert_eq!(decoder.pending_len(), 0);
    /// ```
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.lines.clear();
        self.state = DecoderState::Framing;
    }

    /// Returns an iterator that drains all currently available lines.
    ///
    /// It does NOT process more data; call [`feed()`] first.
    ///
    /// [`feed()`]: LineDecoder::feed
    pub fn drain_lines(&mut self) -> DrainLines<'_> {
        DrainLines { decoder: self }
    }

    /// Try to extract one delimited line from the buffer.
    ///
    /// Returns `true` if a delimiter was consumed.
    fn try_extract_line(&mut self) -> bool {
        let Some(pos) = self.buffer.iter().position(|&b| b == self.delimiter) else {
            return false;
        };

        let line = self.buffer.split_to(pos);
        let _ = self.buffer.split_to(1); // Consume delimiter

        match self.state {
            DecoderState::Framing if line.len() > MAX_LINE_LENGTH => self.discarded += 1,
            DecoderState::Framing => self.enqueue_line(&line),
            DecoderState::Discarding => self.state = DecoderState::Framing,
        }

        true
    }

    /// Drop an undelimited line that has grown past `MAX_LINE_LENGTH`.
    fn enforce_line_limit(&mut self) {
        if self.buffer.len() <= MAX_LINE_LENGTH {
            return;
        }

        self.buffer.clear();
        if self.state == DecoderState::Framing {
            self.state = DecoderState::Discarding;
            self.discarded += 1;
        }
    }

    fn enqueue_line(&mut self, bytes: &[u8]) {
        let raw = String::from_utf8_lossy(bytes).into_owned();
        self.lines.push_back(DecodedLine::new(raw));
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

/// Iterator that drains lines from a [`LineDecoder`].
pub struct DrainLines<'a> {
    decoder: &'a mut LineDecoder,
}

impl Iterator for DrainLines<'_> {
    type Item = DecodedLine;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_line()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.decoder.lines_available();
        (len, Some(len))
    }
}

impl ExactSizeIterator for DrainLines<'_> {
    fn len(&self) -> usize {
        self.decoder.lines_available()
    }
}
