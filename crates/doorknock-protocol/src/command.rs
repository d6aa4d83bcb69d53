//! Outbound commands.
//!
//! The only instruction the host ever sends is the unlock command, a fixed
//! two-part payload terminated by the link delimiter:
//!
//! ```text
//! UNLOCK:kevin\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use doorknock_core::CodeName;
use doorknock_core::constants::{COMMAND_SEPARATOR, UNLOCK_PREFIX};
use std::fmt;

/// Instruction telling the peripheral that a code matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockCommand {
    prefix: String,
    code: CodeName,
}

impl UnlockCommand {
    /// Create an unlock command with the standard `UNLOCK` prefix.
    ///
    /// # Example
    ///
    /// ```
    /// use doorknock_core::CodeName;
    /// use doorknock_protocol::UnlockCommand;
    ///
    /// let command = UnlockCommand::new(CodeName::new("kevin").unwrap());
    /// assert_eq!(command.to_string(), "UNLOCK:kevin");
    /// assert_eq!(&command.to_wire(b'\n')[..], b"UNLOCK:kevin\n");
    /// ```
    pub fn new(code: CodeName) -> Self {
        Self::with_prefix(UNLOCK_PREFIX, code)
    }

    /// Create an unlock command with a firmware-specific prefix.
    pub fn with_prefix(prefix: impl Into<String>, code: CodeName) -> Self {
        Self {
            prefix: prefix.into(),
            code,
        }
    }

    pub fn code(&self) -> &CodeName {
        &self.code
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Encode the command followed by `delimiter`.
    pub fn to_wire(&self, delimiter: u8) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.prefix.len() + self.code.as_str().len() + 2);
        self.encode_into(delimiter, &mut buf);
        buf.freeze()
    }

    pub(crate) fn encode_into(&self, delimiter: u8, dst: &mut BytesMut) {
        dst.put_slice(self.prefix.as_bytes());
        let mut sep = [0u8; 4];
        dst.put_slice(COMMAND_SEPARATOR.encode_utf8(&mut sep).as_bytes());
        dst.put_slice(self.code.as_str().as_bytes());
        dst.put_u8(delimiter);
    }
}

impl fmt::Display for UnlockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, COMMAND_SEPARATOR, self.code)
    }
}
