//! Knock pattern recognition.
//!
//! This crate turns a stream of zone knocks into a classification against
//! the registered [`CodeTable`](doorknock_core::CodeTable):
//!
//! - [`SequenceBuffer`]: sliding window of the most recent four knocks
//! - [`MatchState`]: `Listening`, `Matched(name)` or `Invalid`
//! - [`PatternRecognizer`]: owns the window, the inactivity deadline and
//!   the observers
//!
//! # Example
//!
//! ```
//! use doorknock_core::{CodeTable, KnockSource, Zone};
//! use doorknock_recognizer::{MatchState, PatternRecognizer};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let recognizer = PatternRecognizer::new(CodeTable::reference(), Duration::from_millis(6500));
//!
//! for zone in [Zone::Left, Zone::Left, Zone::Right] {
//!     recognizer.register_knock(zone, KnockSource::Simulated);
//! }
//! let outcome = recognizer.register_knock(Zone::Right, KnockSource::Simulated);
//!
//! assert_eq!(outcome.matched().map(|name| name.as_str()), Some("kevin"));
//! assert!(matches!(recognizer.match_state(), MatchState::Matched(_)));
//! # }
//! ```

pub mod buffer;
pub mod recognizer;
pub mod state;

pub use buffer::SequenceBuffer;
pub use recognizer::{KnockOutcome, MatchCallback, PatternRecognizer, RecognizerEvent};
pub use state::MatchState;
