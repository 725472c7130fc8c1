use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::event::Event;

/// Heap entry: min-ordered by time, then by insertion sequence so that ties
/// dequeue in FIFO order deterministically.
#[derive(Debug, Clone, Copy)]
struct Scheduled {
    event: Event,
    seq: u64,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .time()
            .total_cmp(&other.event.time())
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

/// Bounded priority queue of events, min-ordered by scheduled time.
///
/// The queue is bounded by a time horizon: enqueueing an event scheduled
/// past the horizon silently discards it. This keeps the queue finite when
/// particles oscillate between walls forever, and is also what terminates
/// the simulation — once every future event falls past the horizon the
/// queue drains empty. Infinite prediction times are swallowed the same way.
#[derive(Debug)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    horizon: f64,
    seq: u64,
}

impl EventQueue {
    pub fn new(horizon: f64) -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            horizon,
            seq: 0,
        }
    }

    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Inserts `event` unless it is scheduled past the horizon.
    pub fn enqueue(&mut self, event: Event) {
        let time = event.time();
        if time > self.horizon || time.is_nan() {
            return;
        }
        self.heap.push(Scheduled { event, seq: self.seq });
        self.seq += 1;
    }

    /// Removes and returns the earliest-scheduled event.
    pub fn dequeue(&mut self) -> Option<Event> {
        self.heap.pop().map(|s| s.event)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.seq = 0;
    }
}
