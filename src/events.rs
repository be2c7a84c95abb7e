//! The discrete-event queue: a single, strictly time-ordered timeline.

use crate::{LaneId, VehicleId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A scheduled callback. Events carry vehicle ids rather than references;
/// a vehicle destroyed before its event fires turns the event into a no-op.
#[derive(Clone, Copy, Debug)]
pub(crate) enum EventKind {
    /// Run the vehicle's move cycle.
    Move(VehicleId),
    /// Deregister the vehicle from a lane its rear has cleared.
    LeaveLane { vehicle: VehicleId, lane: LaneId },
    /// The vehicle's front passes a lane detector.
    Detector {
        vehicle: VehicleId,
        lane: LaneId,
        position: f64,
    },
}

struct Entry {
    time: f64,
    /// Insertion counter; events at the same instant fire in FIFO order.
    seq: u64,
    kind: EventKind,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        // The counter is unique per entry, which keeps Eq consistent with Ord.
        self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the BinaryHeap pops the earliest time first,
        // FIFO within the same instant.
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A priority queue of simulation events.
#[derive(Default)]
pub(crate) struct EventQueue {
    heap: BinaryHeap<Entry>,
    counter: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Default::default()
    }

    /// Schedules an event at an absolute simulated time.
    pub fn push(&mut self, time: f64, kind: EventKind) {
        let seq = self.counter;
        self.counter += 1;
        self.heap.push(Entry { time, seq, kind });
    }

    /// Pops the earliest event if it is due at or before `bound`.
    pub fn pop_until(&mut self, bound: f64) -> Option<(f64, EventKind)> {
        if self.heap.peek()?.time <= bound {
            self.heap.pop().map(|e| (e.time, e.kind))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
