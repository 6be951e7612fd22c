//! Discrete event queue.
//!
//! Events are ordered by tick, then by the order they were scheduled in, so two
//! events due on the same tick always run in a reproducible order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::common::Tick;

/// Work the engine can schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The core with this index retires its next trace instruction.
    CoreStep(usize),
}

/// An event with its due tick.
#[derive(Clone, Copy, Debug)]
pub struct ScheduledEvent {
    /// Tick the event fires at.
    pub tick: Tick,
    seq: u64,
    /// What happens.
    pub event: Event,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` at absolute tick `tick`.
    pub fn schedule(&mut self, tick: Tick, event: Event) {
        self.heap.push(ScheduledEvent {
            tick,
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    /// Tick of the earliest pending event.
    pub fn peek_tick(&self) -> Option<Tick> {
        self.heap.peek().map(|e| e.tick)
    }

    /// Removes the earliest pending event.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
