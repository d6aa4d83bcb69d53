//! Sliding window of recent knocks.

use std::collections::VecDeque;

use doorknock_core::constants::CODE_LENGTH;
use doorknock_core::{KnockEvent, Zone};

/// Ordered window holding at most [`CODE_LENGTH`] knock events.
///
/// Insertion order is arrival order. Pushing into a full window evicts the
/// oldest event, so the buffer always holds the most recent knocks.
///
/// # Examples
///
/// ```
/// use doorknock_core::{KnockEvent, KnockSource, Zone};
/// use doorknock_recognizer::SequenceBuffer;
///
/// let mut buffer = SequenceBuffer::new();
/// for zone in [Zone::Left, Zone::Left, Zone::Right, Zone::Right, Zone::Left] {
///     buffer.push(KnockEvent::now(zone, KnockSource::Simulated));
/// }
///
/// assert_eq!(buffer.len(), 4);
/// assert_eq!(buffer.zones(), vec![Zone::Left, Zone::Right, Zone::Right, Zone::Left]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequenceBuffer {
    events: VecDeque<KnockEvent>,
}

impl SequenceBuffer {
    /// Maximum number of events held at once.
    pub const CAPACITY: usize = CODE_LENGTH;

    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(Self::CAPACITY),
        }
    }

    /// Append an event, returning the evicted oldest event if the window
    /// was already full.
    pub fn push(&mut self, event: KnockEvent) -> Option<KnockEvent> {
        let evicted = if self.events.len() == Self::CAPACITY {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Zone-only projection in arrival order.
    pub fn zones(&self) -> Vec<Zone> {
        self.events.iter().map(|event| event.zone).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnockEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&KnockEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() == Self::CAPACITY
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorknock_core::KnockSource;

    fn knock(zone: Zone) -> KnockEvent {
        KnockEvent::now(zone, KnockSource::Transport)
    }

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = SequenceBuffer::new();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert!(buffer.latest().is_none());
    }

    #[test]
    fn test_push_keeps_arrival_order() {
        let mut buffer = SequenceBuffer::new();
        assert!(buffer.push(knock(Zone::Right)).is_none());
        assert!(buffer.push(knock(Zone::Left)).is_none());

        assert_eq!(buffer.zones(), vec![Zone::Right, Zone::Left]);
        assert_eq!(buffer.latest().map(|e| e.zone), Some(Zone::Left));
    }

    #[test]
    fn test_fifth_push_evicts_oldest() {
        let mut buffer = SequenceBuffer::new();
        for zone in [Zone::Right, Zone::Left, Zone::Left, Zone::Left] {
            buffer.push(knock(zone));
        }
        assert!(buffer.is_full());

        let evicted = buffer.push(knock(Zone::Right)).unwrap();
        assert_eq!(evicted.zone, Zone::Right);
        assert_eq!(buffer.len(), SequenceBuffer::CAPACITY);
        assert_eq!(
            buffer.zones(),
            vec![Zone::Left, Zone::Left, Zone::Left, Zone::Right]
        );
    }

    #[test]
    fn test_clear() {
        let mut buffer = SequenceBuffer::new();
        buffer.push(knock(Zone::Left));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
    }
}
