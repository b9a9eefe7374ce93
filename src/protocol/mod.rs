/*!
 * Resource Protocols
 * Priority inheritance and priority ceiling over lockable resources
 */

use serde::{Deserialize, Serialize};

use crate::core::types::{Priority, ResourceId, TaskId, Tick};
use crate::engine::Timeline;
use crate::task::TaskSet;

mod sim;

pub use sim::simulate;

/// Which blocking-avoidance protocol guards the resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// A holder inherits the urgency of whoever it blocks; vulnerable to
    /// chained blocking across distinct resources
    PriorityInheritance,
    /// A task may lock only above the system ceiling; at most one blocking
    /// period per execution and no deadlock, by construction
    PriorityCeiling,
}

/// A lockable resource. Ownership is exclusive; the ceiling is the most
/// urgent base priority among tasks that ever lock it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Resource {
    pub id: ResourceId,
    pub ceiling: Priority,
    pub owner: Option<TaskId>,
    pub waiters: Vec<TaskId>,
}

impl Resource {
    #[must_use]
    pub fn new(id: ResourceId, ceiling: Priority) -> Self {
        Self {
            id,
            ceiling,
            owner: None,
            waiters: Vec::new(),
        }
    }
}

/// One observed transition into the Blocked state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BlockingEvent {
    pub task: TaskId,
    pub resource: ResourceId,
    pub at: Tick,
    /// Owner that caused the block, when the resource was held
    pub holder: Option<TaskId>,
}

/// Result of a protocol simulation
#[derive(Debug)]
pub struct ProtocolOutcome {
    pub kind: ProtocolKind,
    pub tasks: TaskSet,
    pub timeline: Timeline,
    pub blocking_events: Vec<BlockingEvent>,
    /// Times each task transitioned into Blocked, in task-id order
    pub blocked_counts: Vec<(TaskId, u64)>,
    /// Longest holder chain walked when a task blocked (inheritance only
    /// grows it past 1 when blocking chains across resources)
    pub max_blocking_chain: usize,
    /// Times a holder's effective priority was raised by a blocker
    pub inheritance_activations: u64,
    /// Tasks caught in a circular wait, inheritance protocol only; the
    /// ceiling protocol turns this case into a fatal invariant violation
    pub deadlocked: Vec<TaskId>,
    pub total_time: Tick,
}

impl ProtocolOutcome {
    /// Blocking count for a single task
    #[must_use]
    pub fn blocked_count(&self, id: TaskId) -> u64 {
        self.blocked_counts
            .iter()
            .find(|(task, _)| *task == id)
            .map_or(0, |(_, count)| *count)
    }
}
