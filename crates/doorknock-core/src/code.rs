//! Unlock codes and the immutable code table.
//!
//! A [`Code`] is a named sequence of exactly [`CODE_LENGTH`] zones. Codes are
//! collected into a [`CodeTable`] once, at startup, and handed to the
//! recognizer; the table is never mutated afterwards.
//!
//! Construction enforces the table invariants:
//! - every sequence has exactly [`CODE_LENGTH`] knocks
//! - names are unique
//! - no two codes share a sequence (classification would be ambiguous)
//!
//! ```
//! use doorknock_core::{CodeTable, Zone};
//!
//! let table = CodeTable::reference();
//! let code = table.find(&[Zone::Left, Zone::Left, Zone::Right, Zone::Right]).unwrap();
//! assert_eq!(code.name().as_str(), "kevin");
//! ```

use crate::{
    Result,
    constants::{CODE_LENGTH, MAX_CODE_NAME_LENGTH},
    error::Error,
    types::Zone,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a registered code (lowercase, `[a-z0-9_-]`, 1-32 chars).
///
/// The name travels on the wire verbatim (`UNLOCK:<name>`), so it may not
/// contain the command separator or any line delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeName(String);

impl CodeName {
    /// Create a new code name with validation.
    ///
    /// The name is normalized (trimmed and lowercased) before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCodeName` if the name is empty, longer than
    /// 32 characters, or contains characters outside `[a-z0-9_-]`.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim().to_ascii_lowercase();

        if name.is_empty() || name.len() > MAX_CODE_NAME_LENGTH {
            return Err(Error::InvalidCodeName(format!(
                "name must be 1-{MAX_CODE_NAME_LENGTH} chars, got {:?}",
                name
            )));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidCodeName(format!(
                "{name:?} contains characters outside [a-z0-9_-]"
            )));
        }

        Ok(CodeName(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CodeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CodeName::new(s)
    }
}

impl TryFrom<String> for CodeName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CodeName::new(&value)
    }
}

impl From<CodeName> for String {
    fn from(name: CodeName) -> Self {
        name.0
    }
}

/// A named, fixed-length knock sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Code {
    name: CodeName,
    sequence: [Zone; CODE_LENGTH],
}

impl Code {
    /// Create a code from a name and a zone sequence.
    ///
    /// # Errors
    /// Returns `Error::InvalidCodeName` for a bad name, or
    /// `Error::InvalidCode` if the sequence is not exactly
    /// [`CODE_LENGTH`] zones long.
    pub fn new(name: &str, sequence: &[Zone]) -> Result<Self> {
        let name = CodeName::new(name)?;
        let sequence: [Zone; CODE_LENGTH] =
            sequence.try_into().map_err(|_| Error::InvalidCode {
                name: name.to_string(),
                message: format!(
                    "sequence must have {CODE_LENGTH} knocks, got {}",
                    sequence.len()
                ),
            })?;

        Ok(Self { name, sequence })
    }

    #[must_use]
    pub fn name(&self) -> &CodeName {
        &self.name
    }

    #[must_use]
    pub fn sequence(&self) -> &[Zone; CODE_LENGTH] {
        &self.sequence
    }

    /// Returns `true` if the zones equal this code exactly.
    #[inline]
    #[must_use]
    pub fn matches(&self, zones: &[Zone]) -> bool {
        self.sequence.as_slice() == zones
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = ", self.name)?;
        for zone in &self.sequence {
            write!(f, "{}", zone.symbol())?;
        }
        Ok(())
    }
}

/// Immutable registry of unlock codes, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: Vec<Code>,
}

impl CodeTable {
    /// Build a table from a set of codes, enforcing the table invariants.
    ///
    /// # Errors
    /// - `Error::EmptyCodeTable` if no codes are given
    /// - `Error::DuplicateCode` if two codes share a name
    /// - `Error::DuplicateSequence` if two codes share a sequence
    pub fn new(codes: impl IntoIterator<Item = Code>) -> Result<Self> {
        let codes: Vec<Code> = codes.into_iter().collect();

        if codes.is_empty() {
            return Err(Error::EmptyCodeTable);
        }

        for (i, code) in codes.iter().enumerate() {
            for earlier in &codes[..i] {
                if earlier.name == code.name {
                    return Err(Error::DuplicateCode(code.name.to_string()));
                }
                if earlier.sequence == code.sequence {
                    return Err(Error::DuplicateSequence {
                        first: earlier.name.to_string(),
                        second: code.name.to_string(),
                    });
                }
            }
        }

        Ok(Self { codes })
    }

    /// The default registration: `kevin = LLRR`, `danny = RRLL`.
    #[must_use]
    pub fn reference() -> Self {
        use Zone::{Left as L, Right as R};

        Self {
            codes: vec![
                Code {
                    name: CodeName("kevin".to_string()),
                    sequence: [L, L, R, R],
                },
                Code {
                    name: CodeName("danny".to_string()),
                    sequence: [R, R, L, L],
                },
            ],
        }
    }

    /// Find the code whose sequence equals `zones` exactly.
    #[must_use]
    pub fn find(&self, zones: &[Zone]) -> Option<&Code> {
        self.codes.iter().find(|code| code.matches(zones))
    }

    /// Look up a code by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Code> {
        self.codes.iter().find(|code| code.name.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Code> {
        self.codes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for CodeTable {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Zone::{Left as L, Right as R};
    use rstest::rstest;

    #[rstest]
    #[case("kevin", "kevin")]
    #[case(" Danny ", "danny")]
    #[case("front-door_2", "front-door_2")]
    fn test_code_name_valid(#[case] input: &str, #[case] expected: &str) {
        let name = CodeName::new(input).unwrap();
        assert_eq!(name.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("un:lock")]
    #[case("two words")]
    #[case("line\nbreak")]
    #[case("abcdefghijklmnopqrstuvwxyz0123456")] // 33 chars
    fn test_code_name_invalid(#[case] input: &str) {
        assert!(matches!(
            CodeName::new(input),
            Err(Error::InvalidCodeName(_))
        ));
    }

    #[test]
    fn test_code_requires_four_knocks() {
        assert!(Code::new("short", &[L, L, R]).is_err());
        assert!(Code::new("long", &[L, L, R, R, L]).is_err());

        let code = Code::new("kevin", &[L, L, R, R]).unwrap();
        assert_eq!(code.sequence(), &[L, L, R, R]);
        assert_eq!(code.to_string(), "kevin = LLRR");
    }

    #[test]
    fn test_reference_table() {
        let table = CodeTable::reference();
        assert_eq!(table.len(), 2);

        assert_eq!(table.find(&[L, L, R, R]).unwrap().name().as_str(), "kevin");
        assert_eq!(table.find(&[R, R, L, L]).unwrap().name().as_str(), "danny");
        assert!(table.find(&[L, R, L, R]).is_none());
        assert!(table.find(&[L, L, R]).is_none());
        assert!(table.get("kevin").is_some());
        assert!(table.get("nobody").is_none());
    }

    #[test]
    fn test_table_rejects_duplicate_sequences() {
        let codes = vec![
            Code::new("kevin", &[L, L, R, R]).unwrap(),
            Code::new("imposter", &[L, L, R, R]).unwrap(),
        ];

        match CodeTable::new(codes) {
            Err(Error::DuplicateSequence { first, second }) => {
                assert_eq!(first, "kevin");
                assert_eq!(second, "imposter");
            }
            other => panic!("expected DuplicateSequence, got {other:?}"),
        }
    }

    #[test]
    fn test_table_rejects_duplicate_names() {
        let codes = vec![
            Code::new("kevin", &[L, L, R, R]).unwrap(),
            Code::new("KEVIN", &[R, R, R, R]).unwrap(),
        ];

        assert!(matches!(
            CodeTable::new(codes),
            Err(Error::DuplicateCode(name)) if name == "kevin"
        ));
    }

    #[test]
    fn test_table_rejects_empty() {
        assert!(matches!(
            CodeTable::new(Vec::new()),
            Err(Error::EmptyCodeTable)
        ));
    }

    #[test]
    fn test_code_name_serde() {
        let name: CodeName = serde_json::from_str(r#""Kevin""#).unwrap();
        assert_eq!(name.as_str(), "kevin");
        assert!(serde_json::from_str::<CodeName>(r#""bad name""#).is_err());
    }
}
