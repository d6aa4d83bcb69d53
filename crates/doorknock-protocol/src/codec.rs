//! Tokio codec for the knock link.
//!
//! `KnockCodec` wraps the [`LineDecoder`] so that any async byte source
//! (stdin, a TCP bridge to the peripheral, a pty) can be framed with the same
//! rules as the serial link:
//!
//! ```text
//! AsyncRead -> Decoder -> DecodedLine (raw text + zone)
//! UnlockCommand -> Encoder -> AsyncWrite ("UNLOCK:<code>" + delimiter)
//! ```
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use doorknock_protocol::KnockCodec;
//! use futures::StreamExt;
//! use tokio_util::codec::FramedRead;
//!
//! # async fn example() -> doorknock_core::Result<()> {
//! let mut lines = FramedRead::new(tokio::io::stdin(), KnockCodec::new(b'\n'));
//!
//! while let Some(line) = lines.next().await {
//!     let line = line?;
//!     if let Some(zone) = line.zone {
//!         println!("knock: {zone}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # End of Stream
//!
//! A trailing fragment without a delimiter is emitted as a final line when
//! the source reaches EOF, so piping a file without a final newline does not
//! lose the last knock.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::{DecodedLine, LineDecoder, UnlockCommand};
use doorknock_core::constants::DEFAULT_DELIMITER;
use doorknock_core::{Error, Result};

/// Tokio codec for knock lines and unlock commands.
#[derive(Debug)]
pub struct KnockCodec {
    decoder: LineDecoder,
}

impl KnockCodec {
    /// Create a codec framing on `delimiter`.
    ///
    /// # Example
    ///
    /// ```
    /// use doorknock_protocol::KnockCodec;
    ///
    /// let codec = KnockCodec::new(b'\n');
    /// assert_eq!(codec.delimiter(), b'\n');
    /// ```
    pub fn new(delimiter: u8) -> Self {
        Self {
            decoder: LineDecoder::new(delimiter),
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.decoder.delimiter()
    }
}

impl Default for KnockCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl Decoder for KnockCodec {
    type Item = DecodedLine;
    type Error = Error;

    /// Decode the next complete line from the byte stream.
    ///
    /// All bytes in `src` are moved into the internal decoder; complete
    /// lines are then returned one per call.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            self.decoder.feed(src);
            src.clear();
        }

        Ok(self.decoder.next_line())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.decoder.finish();
        Ok(self.decoder.next_line())
    }
}

impl Encoder<UnlockCommand> for KnockCodec {
    type Error = Error;

    fn encode(&mut self, item: UnlockCommand, dst: &mut BytesMut) -> Result<()> {
        item.encode_into(self.decoder.delimiter(), dst);
        Ok(())
    }
}

/// Raw text commands, terminated with the codec delimiter.
impl Encoder<&str> for KnockCodec {
    type Error = Error;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(item.len() + 1);
        dst.extend_from_slice(item.as_bytes());
        dst.extend_from_slice(&[self.decoder.delimiter()]);
        Ok(())
    }
}
