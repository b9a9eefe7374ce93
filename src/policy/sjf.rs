/*!
 * Shortest Job First / Shortest Remaining Time First
 * Min-heaps keyed on total and remaining work respectively
 */

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::types::{TaskId, Tick};
use crate::task::TaskSet;

/// Heap entry for non-preemptive SJF: shortest execution time first,
/// earliest arrival breaks ties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SjfEntry {
    burst: Tick,
    arrival: Tick,
    id: TaskId,
}

impl Ord for SjfEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the shortest job surfaces first
        other
            .burst
            .cmp(&self.burst)
            .then_with(|| other.arrival.cmp(&self.arrival))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for SjfEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct SjfHeap {
    heap: BinaryHeap<SjfEntry>,
}

impl SjfHeap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, id: TaskId, tasks: &TaskSet) {
        let task = tasks.task(id);
        self.heap.push(SjfEntry {
            burst: task.spec.execution_time,
            arrival: task.spec.arrival_time,
            id,
        });
    }

    pub fn select(&mut self) -> Option<TaskId> {
        self.heap.pop().map(|e| e.id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Heap entry for SRTF: least remaining work first, then earliest arrival,
/// then id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SrtfEntry {
    remaining: Tick,
    arrival: Tick,
    id: TaskId,
}

impl Ord for SrtfEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .remaining
            .cmp(&self.remaining)
            .then_with(|| other.arrival.cmp(&self.arrival))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for SrtfEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct SrtfHeap {
    heap: BinaryHeap<SrtfEntry>,
}

impl SrtfHeap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, id: TaskId, tasks: &TaskSet) {
        let task = tasks.task(id);
        self.heap.push(SrtfEntry {
            remaining: task.remaining_time,
            arrival: task.spec.arrival_time,
            id,
        });
    }

    pub fn select(&mut self) -> Option<TaskId> {
        self.heap.pop().map(|e| e.id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Preemption is re-evaluated at every arrival event, so a slice never
    /// crosses one.
    #[must_use]
    pub fn slice(&self, id: TaskId, tasks: &TaskSet, now: Tick, next_arrival: Option<Tick>) -> Tick {
        let remaining = tasks.task(id).remaining_time;
        match next_arrival {
            Some(at) if at > now => remaining.min(at - now),
            _ => remaining,
        }
    }
}
