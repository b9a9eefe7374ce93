/*!
 * Round Robin
 * Circular FIFO with a fixed quantum; arrivals enter ahead of the preempted task
 */

use std::collections::VecDeque;

use crate::core::types::{TaskId, Tick};
use crate::task::TaskSet;

/// Circular ready queue for round-robin dispatch.
///
/// The re-queue rule is deliberate: tasks arriving at or before the
/// preemption instant are admitted first, then the preempted task goes to the
/// tail. Arrivals therefore win queue position over the task that just ran.
#[derive(Debug)]
pub struct RrQueue {
    queue: VecDeque<TaskId>,
    quantum: Tick,
}

impl RrQueue {
    #[must_use]
    pub fn new(quantum: Tick) -> Self {
        Self {
            queue: VecDeque::new(),
            quantum,
        }
    }

    pub fn admit(&mut self, id: TaskId) {
        self.queue.push_back(id);
    }

    /// Tail placement for a task preempted at quantum expiry; the engine has
    /// already admitted every due arrival by the time this runs.
    pub fn requeue(&mut self, id: TaskId) {
        self.queue.push_back(id);
    }

    pub fn select(&mut self) -> Option<TaskId> {
        self.queue.pop_front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn slice(&self, id: TaskId, tasks: &TaskSet) -> Tick {
        tasks.task(id).remaining_time.min(self.quantum)
    }
}
