/*!
 * Static Priority with Aging
 * Most urgent effective priority wins; waiting tasks age toward the top level
 */

use serde::{Deserialize, Serialize};

use crate::core::types::{Priority, TaskId, Tick};
use crate::task::TaskSet;

/// Aging parameters: after `threshold` ticks in the ready structure a task's
/// effective priority improves by `increment`, repeatedly, clamped at the
/// most urgent level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgingParams {
    pub threshold: Tick,
    pub increment: Priority,
}

impl Default for AgingParams {
    fn default() -> Self {
        Self {
            threshold: 10,
            increment: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PrioEntry {
    id: TaskId,
    /// Instant this entry joined the ready structure
    enqueued_at: Tick,
    /// Last instant aging improved this entry
    last_aged: Tick,
}

/// Ready structure for priority scheduling.
///
/// Selection scans linearly, matching the level-order rule: lowest effective
/// priority value first, then earliest arrival, then id. Scanning keeps the
/// structure correct while aging rewrites effective priorities underneath.
#[derive(Debug)]
pub struct AgingList {
    entries: Vec<PrioEntry>,
    params: AgingParams,
}

impl AgingList {
    #[must_use]
    pub fn new(params: AgingParams) -> Self {
        Self {
            entries: Vec::new(),
            params,
        }
    }

    pub fn admit(&mut self, id: TaskId, now: Tick) {
        self.entries.push(PrioEntry {
            id,
            enqueued_at: now,
            last_aged: now,
        });
    }

    pub fn requeue(&mut self, id: TaskId, now: Tick) {
        self.admit(id, now);
    }

    /// Apply aging before every dispatch decision. A task that has waited at
    /// least `threshold` ticks since its last improvement moves
    /// `increment` levels toward urgency.
    pub fn prepare(&mut self, tasks: &mut TaskSet, now: Tick) {
        let increment = self.params.increment;
        let threshold = self.params.threshold;
        for entry in &mut self.entries {
            if now.saturating_sub(entry.last_aged) >= threshold {
                let task = tasks.task_mut(entry.id);
                task.priority_adjust = task.priority_adjust.saturating_add(increment);
                entry.last_aged = now;
            }
        }
    }

    pub fn select(&mut self, tasks: &TaskSet) -> Option<TaskId> {
        let best = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| {
                let task = tasks.task(e.id);
                (
                    task.effective_priority(),
                    task.spec.arrival_time,
                    e.id,
                )
            })
            .map(|(idx, _)| idx)?;
        Some(self.entries.swap_remove(best).id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
