//! Pattern recognizer with inactivity reset.
//!
//! [`PatternRecognizer`] accumulates knocks into a [`SequenceBuffer`] and
//! classifies the window on every knock. Each knock also (re)arms a single
//! inactivity deadline: when it fires before the next knock, the window is
//! cleared and the state returns to `Listening`.
//!
//! # Deadline discipline
//!
//! There is at most one pending reset. Buffer mutation, cancellation of the
//! previous deadline and scheduling of the next all happen under the same
//! lock, and every deadline carries a generation number. A deadline that
//! wakes up after being superseded finds a newer generation and does
//! nothing, so a knock and a timeout landing together can never clear a
//! window the knock just extended.
//!
//! # Buffer clearing
//!
//! An `Invalid` window is cleared immediately. A `Matched` window is kept:
//! the next knock slides it, which lets overlapping windows match again.
//!
//! # Runtime
//!
//! The deadline is a spawned Tokio task, so knocks should be registered
//! from within a runtime. Without one, classification still works but no
//! inactivity reset is scheduled.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{MatchState, SequenceBuffer};
use doorknock_core::constants::CODE_LENGTH;
use doorknock_core::{CodeName, CodeTable, KnockConfig, KnockEvent, KnockSource, Result, Zone};

/// Capacity of the event broadcast channel.
///
/// Slow subscribers lag and skip events rather than blocking knocks.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Callback invoked with the code name on every match.
pub type MatchCallback = Arc<dyn Fn(&CodeName) + Send + Sync>;

/// Event published to [`PatternRecognizer::events`] subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// A knock was accepted into the window.
    KnockObserved(KnockEvent),

    /// The match state changed, or a code matched again.
    MatchChanged(MatchState),
}

/// Result of registering a single knock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnockOutcome {
    /// The event that was recorded.
    pub event: KnockEvent,

    /// Classification after this knock.
    pub state: MatchState,

    /// Number of knocks left in the window after this call.
    ///
    /// Zero after an `Invalid` classification, since the window is cleared.
    pub buffered: usize,
}

impl KnockOutcome {
    /// Matched code name, if this knock completed a code.
    pub fn matched(&self) -> Option<&CodeName> {
        self.state.matched_code()
    }
}

/// The single scheduled inactivity reset.
struct PendingReset {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Window {
    buffer: SequenceBuffer,
    state: MatchState,
    pending: Option<PendingReset>,
    generation: u64,
}

struct Shared {
    table: CodeTable,
    inactivity_timeout: Duration,
    window: Mutex<Window>,
    on_match: Mutex<Option<MatchCallback>>,
    state_tx: watch::Sender<MatchState>,
    events_tx: broadcast::Sender<RecognizerEvent>,
}

/// Recognizes registered knock codes in a stream of zone knocks.
///
/// Cloning is cheap and yields a handle to the same recognizer.
#[derive(Clone)]
pub struct PatternRecognizer {
    shared: Arc<Shared>,
}

impl PatternRecognizer {
    /// Create a recognizer over `table`, resetting after
    /// `inactivity_timeout` without knocks.
    pub fn new(table: CodeTable, inactivity_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(MatchState::Listening);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                table,
                inactivity_timeout,
                window: Mutex::new(Window {
                    buffer: SequenceBuffer::new(),
                    state: MatchState::Listening,
                    pending: None,
                    generation: 0,
                }),
                on_match: Mutex::new(None),
                state_tx,
                events_tx,
            }),
        }
    }

    /// Build a recognizer from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured code table is invalid.
    pub fn with_config(config: &KnockConfig) -> Result<Self> {
        Ok(Self::new(config.code_table()?, config.inactivity_timeout()))
    }

    /// Register the callback invoked on every match, replacing any previous one.
    ///
    /// The callback runs on the caller of [`register_knock`](Self::register_knock)
    /// after the recognizer lock has been released.
    pub fn on_match<F>(&self, callback: F)
    where
        F: Fn(&CodeName) + Send + Sync + 'static,
    {
        *self.shared.on_match.lock() = Some(Arc::new(callback));
    }

    /// Accept a knock, reclassify the window and re-arm the inactivity reset.
    pub fn register_knock(&self, zone: Zone, source: KnockSource) -> KnockOutcome {
        let event = KnockEvent::now(zone, source);

        let outcome = {
            let mut window = self.shared.window.lock();
            window.buffer.push(event.clone());

            let state = MatchState::classify(&window.buffer.zones(), &self.shared.table);
            if state.is_invalid() {
                window.buffer.clear();
            }

            trace!(%event, buffered = window.buffer.len(), "Knock registered");
            let _ = self
                .shared
                .events_tx
                .send(RecognizerEvent::KnockObserved(event.clone()));

            let notify = window.state != state || state.is_matched();
            window.state = state.clone();
            if notify {
                self.shared.publish(&state);
            }

            self.schedule_reset(&mut window);

            KnockOutcome {
                event,
                state,
                buffered: window.buffer.len(),
            }
        };

        match &outcome.state {
            MatchState::Matched(name) => {
                info!(code = %name, "Knock code matched");
                let callback = self.shared.on_match.lock().clone();
                if let Some(callback) = callback {
                    callback(name);
                }
            }
            MatchState::Invalid => debug!("Knock sequence matched no code"),
            MatchState::Listening => {}
        }

        outcome
    }

    /// Cancel the pending reset, clear the window and return to `Listening`.
    ///
    /// Idempotent.
    pub fn reset(&self) {
        let mut window = self.shared.window.lock();
        if let Some(pending) = window.pending.take() {
            pending.handle.abort();
        }
        window.generation = window.generation.wrapping_add(1);
        self.shared.clear_window(&mut window);
    }

    /// Current classification.
    pub fn match_state(&self) -> MatchState {
        self.shared.window.lock().state.clone()
    }

    /// Zones in the window, in arrival order.
    pub fn sequence(&self) -> Vec<Zone> {
        self.shared.window.lock().buffer.zones()
    }

    /// Window fill ratio in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        self.shared.window.lock().buffer.len() as f32 / CODE_LENGTH as f32
    }

    /// Whether an inactivity reset is scheduled.
    pub fn has_pending_reset(&self) -> bool {
        self.shared.window.lock().pending.is_some()
    }

    /// Watch the match state.
    pub fn subscribe(&self) -> watch::Receiver<MatchState> {
        self.shared.state_tx.subscribe()
    }

    /// Subscribe to knock and match events.
    pub fn events(&self) -> broadcast::Receiver<RecognizerEvent> {
        self.shared.events_tx.subscribe()
    }

    pub fn code_table(&self) -> &CodeTable {
        &self.shared.table
    }

    pub fn inactivity_timeout(&self) -> Duration {
        self.shared.inactivity_timeout
    }

    /// Replace the pending reset with a fresh one. Must be called with the
    /// window locked.
    fn schedule_reset(&self, window: &mut Window) {
        if let Some(pending) = window.pending.take() {
            pending.handle.abort();
        }
        window.generation = window.generation.wrapping_add(1);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No Tokio runtime, inactivity reset not scheduled");
            return;
        };

        let generation = window.generation;
        let timeout = self.shared.inactivity_timeout;
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);

        let handle = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = shared.upgrade() {
                shared.expire(generation);
            }
        });

        window.pending = Some(PendingReset { generation, handle });
    }
}

impl Shared {
    /// Handle a deadline firing. Stale generations are ignored.
    fn expire(&self, generation: u64) {
        let mut window = self.window.lock();
        match &window.pending {
            Some(pending) if pending.generation == generation => {}
            _ => {
                trace!(generation, "Ignoring superseded inactivity reset");
                return;
            }
        }

        window.pending = None;
        debug!(
            buffered = window.buffer.len(),
            timeout_ms = self.inactivity_timeout.as_millis() as u64,
            "Knock window expired"
        );
        self.clear_window(&mut window);
    }

    fn clear_window(&self, window: &mut Window) {
        window.buffer.clear();
        if !window.state.is_listening() {
            window.state = MatchState::Listening;
            self.publish(&MatchState::Listening);
        }
    }

    fn publish(&self, state: &MatchState) {
        self.state_tx.send_replace(state.clone());
        let _ = self
            .events_tx
            .send(RecognizerEvent::MatchChanged(state.clone()));
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(pending) = self.window.get_mut().pending.take() {
            pending.handle.abort();
        }
    }
}

impl fmt::Debug for PatternRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = self.shared.window.lock();
        f.debug_struct("PatternRecognizer")
            .field("codes", &self.shared.table.len())
            .field("inactivity_timeout", &self.shared.inactivity_timeout)
            .field("sequence", &window.buffer.zones())
            .field("state", &window.state)
            .field("pending_reset", &window.pending.is_some())
            .finish()
    }
}
