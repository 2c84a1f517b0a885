//! Fixed-capacity per-button press history.

use std::time::Duration;
use tokio::time::Instant;

/// Ring buffer of recent accepted press times for one button.
///
/// Slots are allocated once; pushing into a full buffer overwrites the
/// oldest entry. Entries more than `window` older than the newest one are
/// dropped on every push, so the buffer never spans more than one window.
#[derive(Debug, Clone)]
pub struct PressHistory {
    slots: Box<[Option<Instant>]>,
    /// Index of the oldest entry
    head: usize,
    len: usize,
    window: Duration,
}

impl PressHistory {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, window: Duration) -> Self {
        assert!(capacity > 0, "press history needs at least one slot");
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
            window,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn oldest(&self) -> Option<Instant> {
        if self.len == 0 {
            None
        } else {
            self.slots[self.head]
        }
    }

    pub fn newest(&self) -> Option<Instant> {
        if self.len == 0 {
            None
        } else {
            self.slots[self.index(self.len - 1)]
        }
    }

    /// Drop entries from the front that are more than one window older
    /// than `now`.
    pub fn trim(&mut self, now: Instant) {
        while let Some(oldest) = self.oldest() {
            if now.saturating_duration_since(oldest) <= self.window {
                break;
            }
            self.slots[self.head] = None;
            self.head = self.index(1);
            self.len -= 1;
        }
    }

    /// Entries within one window of `now`, after trimming.
    pub fn count_recent(&mut self, now: Instant) -> usize {
        self.trim(now);
        self.len
    }

    /// Record a press at `at`. Times must be pushed in non-decreasing order.
    pub fn push(&mut self, at: Instant) {
        if self.len == self.capacity() {
            self.slots[self.head] = Some(at);
            self.head = self.index(1);
        } else {
            let tail = self.index(self.len);
            self.slots[tail] = Some(at);
            self.len += 1;
        }
        self.trim(at);
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Instant> + '_ {
        (0..self.len).filter_map(move |i| self.slots[self.index(i)])
    }

    fn index(&self, offset: usize) -> usize {
        (self.head + offset) % self.slots.len()
    }
}
