//! Bounded FIFO for received frames.
//!
//! Frames drained from the hardware FIFO wait here until the receive path
//! gets around to decoding them. The ring is deliberately small: telemetry
//! devices repeat themselves, so when a burst overruns the ring the right
//! thing to keep is the newest frames. Overwritten frames are counted, not
//! silently lost.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// A raw frame plus when it was pulled off the air.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub bytes: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl ReceivedFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        ReceivedFrame {
            bytes,
            received_at: Utc::now(),
        }
    }
}

/// Fixed-capacity receive ring, oldest-out on overflow.
#[derive(Debug)]
pub struct RxRing {
    slots: VecDeque<ReceivedFrame>,
    capacity: usize,
    dropped: u64,
}

impl RxRing {
    pub fn new(capacity: usize) -> Self {
        RxRing {
            slots: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Store a frame, evicting the oldest if the ring is full.
    pub fn push(&mut self, frame: ReceivedFrame) {
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
            self.dropped += 1;
        }
        self.slots.push_back(frame);
    }

    /// Take the oldest frame out of the ring.
    pub fn pop(&mut self) -> Option<ReceivedFrame> {
        self.slots.pop_front()
    }

    /// Non-destructive view of every buffered frame, oldest first.
    /// Discovery scans decode from here without consuming.
    pub fn iter(&self) -> impl Iterator<Item = &ReceivedFrame> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames evicted unread since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> ReceivedFrame {
        ReceivedFrame::new(vec![tag, 0xAA, 0xBB])
    }

    #[test]
    fn test_fifo_order() {
        let mut ring = RxRing::new(3);
        ring.push(frame(1));
        ring.push(frame(2));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop().unwrap().bytes[0], 1);
        assert_eq!(ring.pop().unwrap().bytes[0], 2);
        assert!(ring.pop().is_none());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut ring = RxRing::new(3);
        for tag in 1..=5 {
            ring.push(frame(tag));
        }
        assert!(ring.is_full());
        assert_eq!(ring.dropped(), 2);
        assert_eq!(ring.pop().unwrap().bytes[0], 3);
        assert_eq!(ring.pop().unwrap().bytes[0], 4);
        assert_eq!(ring.pop().unwrap().bytes[0], 5);
    }

    #[test]
    fn test_iter_is_non_destructive() {
        let mut ring = RxRing::new(3);
        ring.push(frame(7));
        ring.push(frame(8));
        let tags: Vec<u8> = ring.iter().map(|f| f.bytes[0]).collect();
        assert_eq!(tags, vec![7, 8]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_timestamps_monotonic_enough() {
        let mut ring = RxRing::new(2);
        ring.push(frame(1));
        ring.push(frame(2));
        let first = ring.pop().unwrap();
        let second = ring.pop().unwrap();
        assert!(second.received_at >= first.received_at);
    }
}
