//! Match classification.
//!
//! [`MatchState`] is a projection of the knock window, never independent
//! state: it is recomputed from the buffer contents on every knock.
//!
//! # Transitions
//!
//! - Listening → (four knocks equal to a code) → Matched
//! - Listening → (four knocks matching no code) → Invalid
//! - Matched → (any further knock) → Matched or Invalid (the window slides)
//! - Invalid → (window cleared) → Listening
//! - any → (inactivity timeout or reset) → Listening

use std::fmt;

use serde::{Deserialize, Serialize};

use doorknock_core::constants::CODE_LENGTH;
use doorknock_core::{CodeName, CodeTable, Zone};

/// Classification of the current knock window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum MatchState {
    /// Fewer than four knocks collected.
    #[default]
    Listening,

    /// The last four knocks equal a registered code.
    Matched(CodeName),

    /// Four knocks collected that match no registered code.
    Invalid,
}

impl MatchState {
    /// Classify a zone sequence against the code table.
    ///
    /// Shorter sequences are always `Listening`, even when they are a prefix
    /// of a registered code.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorknock_core::{CodeTable, Zone};
    /// use doorknock_recognizer::MatchState;
    ///
    /// let table = CodeTable::reference();
    /// use Zone::{Left as L, Right as R};
    ///
    /// assert_eq!(MatchState::classify(&[L, L, R], &table), MatchState::Listening);
    /// assert_eq!(MatchState::classify(&[L, R, L, R], &table), MatchState::Invalid);
    /// assert!(MatchState::classify(&[R, R, L, L], &table).is_matched());
    /// ```
    pub fn classify(zones: &[Zone], table: &CodeTable) -> Self {
        if zones.len() < CODE_LENGTH {
            return MatchState::Listening;
        }

        match table.find(zones) {
            Some(code) => MatchState::Matched(code.name().clone()),
            None => MatchState::Invalid,
        }
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, MatchState::Listening)
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchState::Matched(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, MatchState::Invalid)
    }

    /// Name of the matched code, if any.
    pub fn matched_code(&self) -> Option<&CodeName> {
        match self {
            MatchState::Matched(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchState::Listening => write!(f, "Listening"),
            MatchState::Matched(name) => write!(f, "Matched({name})"),
            MatchState::Invalid => write!(f, "Invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorknock_core::Code;
    use rstest::rstest;
    use Zone::{Left as L, Right as R};

    #[rstest]
    #[case(&[], MatchState::Listening)]
    #[case(&[L], MatchState::Listening)]
    #[case(&[L, L, R], MatchState::Listening)]
    #[case(&[R, R, L], MatchState::Listening)]
    #[case(&[L, R, L, R], MatchState::Invalid)]
    #[case(&[L, L, L, L], MatchState::Invalid)]
    fn test_classify_without_match(#[case] zones: &[Zone], #[case] expected: MatchState) {
        assert_eq!(MatchState::classify(zones, &CodeTable::reference()), expected);
    }

    #[rstest]
    #[case(&[L, L, R, R], "kevin")]
    #[case(&[R, R, L, L], "danny")]
    fn test_classify_reference_codes(#[case] zones: &[Zone], #[case] name: &str) {
        let state = MatchState::classify(zones, &CodeTable::reference());
        assert_eq!(state.matched_code().map(CodeName::as_str), Some(name));
    }

    #[test]
    fn test_classify_custom_table() {
        let table = CodeTable::new([Code::new("drum", &[L, L, L, L]).unwrap()]).unwrap();

        assert!(MatchState::classify(&[L, L, L, L], &table).is_matched());
        assert!(MatchState::classify(&[L, L, R, R], &table).is_invalid());
    }

    #[test]
    fn test_predicates() {
        assert!(MatchState::Listening.is_listening());
        assert!(MatchState::Invalid.is_invalid());
        assert!(MatchState::Listening.matched_code().is_none());
    }

    #[test]
    fn test_display() {
        let matched = MatchState::Matched(CodeName::new("kevin").unwrap());
        assert_eq!(matched.to_string(), "Matched(kevin)");
        assert_eq!(MatchState::Invalid.to_string(), "Invalid");
    }

    #[test]
    fn test_serialization() {
        let matched = MatchState::Matched(CodeName::new("danny").unwrap());
        let json = serde_json::to_string(&matched).unwrap();
        assert_eq!(json, r#"{"state":"matched","code":"danny"}"#);

        let back: MatchState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, matched);

        let listening = serde_json::to_string(&MatchState::Listening).unwrap();
        assert_eq!(listening, r#"{"state":"listening"}"#);
    }
}
