/*!
 * Task Types
 * The scheduled entity: descriptor, lifecycle state, and derived timestamps
 */

use serde::{Deserialize, Serialize};

use crate::core::types::{Priority, ResourceId, TaskId, Tick};

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Descriptor ingested, not yet admitted to a ready structure
    New,
    /// Admitted and runnable
    Ready,
    /// Currently executing (at most one per instant on a single core)
    Running,
    /// Suspended on a contended resource
    Blocked,
    /// All work done
    Terminated,
}

/// Periodic parameters for real-time tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PeriodicSpec {
    pub period: Tick,
    pub relative_deadline: Tick,
}

/// A lock/unlock window inside a task body, expressed as offsets into its
/// execution (not wall-clock times)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CriticalSection {
    pub resource: ResourceId,
    /// Executed ticks at which the lock is taken
    pub start_offset: Tick,
    /// Held for this many executed ticks
    pub duration: Tick,
}

impl CriticalSection {
    /// Executed-tick offset at which the resource is released
    #[inline]
    #[must_use]
    pub const fn end_offset(&self) -> Tick {
        self.start_offset + self.duration
    }

    /// Whether the section covers the given progress offset
    #[inline]
    #[must_use]
    pub const fn covers(&self, progress: Tick) -> bool {
        progress >= self.start_offset && progress < self.end_offset()
    }
}

/// Task descriptor as supplied by a workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskSpec {
    pub id: TaskId,
    pub arrival_time: Tick,
    pub execution_time: Tick,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub periodic: Option<PeriodicSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub critical_sections: Vec<CriticalSection>,
}

impl TaskSpec {
    #[must_use]
    pub fn new(id: TaskId, arrival_time: Tick, execution_time: Tick) -> Self {
        Self {
            id,
            arrival_time,
            execution_time,
            priority: Priority::MAX / 2,
            periodic: None,
            critical_sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn periodic(mut self, period: Tick, relative_deadline: Tick) -> Self {
        self.periodic = Some(PeriodicSpec {
            period,
            relative_deadline,
        });
        self
    }

    #[must_use]
    pub fn with_section(mut self, resource: ResourceId, start_offset: Tick, duration: Tick) -> Self {
        self.critical_sections.push(CriticalSection {
            resource,
            start_offset,
            duration,
        });
        self
    }
}

/// A task inside the arena, tracking live state alongside its descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub spec: TaskSpec,
    pub state: TaskState,
    /// Work still owed; strictly decreases while Running, zero exactly at completion
    pub remaining_time: Tick,
    /// First dispatch instant, set exactly once
    pub start_time: Option<Tick>,
    /// Completion instant, set exactly once
    pub completion_time: Option<Tick>,
    /// Priority improvement accumulated through aging; the base stays immutable
    pub priority_adjust: Priority,
}

impl Task {
    #[must_use]
    pub fn new(spec: TaskSpec) -> Self {
        let remaining_time = spec.execution_time;
        Self {
            spec,
            state: TaskState::New,
            remaining_time,
            start_time: None,
            completion_time: None,
            priority_adjust: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.spec.id
    }

    /// Immutable priority as declared in the descriptor
    #[inline]
    #[must_use]
    pub fn base_priority(&self) -> Priority {
        self.spec.priority
    }

    /// Priority after aging improvements (derived, never overwritten in place)
    #[inline]
    #[must_use]
    pub fn effective_priority(&self) -> Priority {
        self.spec.priority.saturating_sub(self.priority_adjust)
    }

    /// Executed ticks so far
    #[inline]
    #[must_use]
    pub fn progress(&self) -> Tick {
        self.spec.execution_time - self.remaining_time
    }

    #[inline]
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        matches!(self.state, TaskState::Terminated)
    }

    #[inline]
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, TaskState::Ready)
    }

    #[inline]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, TaskState::Running)
    }

    /// Time from arrival to first dispatch
    #[must_use]
    pub fn response_time(&self) -> Option<Tick> {
        self.start_time.map(|s| s - self.spec.arrival_time)
    }

    /// Time from arrival to completion
    #[must_use]
    pub fn turnaround_time(&self) -> Option<Tick> {
        self.completion_time.map(|c| c - self.spec.arrival_time)
    }

    /// Time spent ready but not running
    #[must_use]
    pub fn waiting_time(&self) -> Option<Tick> {
        self.turnaround_time().map(|t| t - self.spec.execution_time)
    }

    /// Mark the first dispatch; later dispatches leave start_time untouched
    pub fn record_dispatch(&mut self, now: Tick) {
        if self.start_time.is_none() {
            self.start_time = Some(now);
        }
        self.state = TaskState::Running;
    }

    pub fn record_completion(&mut self, now: Tick) {
        debug_assert_eq!(self.remaining_time, 0);
        self.completion_time = Some(now);
        self.state = TaskState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_timestamps() {
        let mut task = Task::new(TaskSpec::new(1, 2, 5));
        task.record_dispatch(4);
        task.remaining_time = 0;
        task.record_completion(9);

        assert_eq!(task.response_time(), Some(2));
        assert_eq!(task.turnaround_time(), Some(7));
        assert_eq!(task.waiting_time(), Some(2));
    }

    #[test]
    fn start_time_set_once() {
        let mut task = Task::new(TaskSpec::new(1, 0, 5));
        task.record_dispatch(3);
        task.state = TaskState::Ready;
        task.record_dispatch(8);
        assert_eq!(task.start_time, Some(3));
    }

    #[test]
    fn effective_priority_clamps_at_most_urgent() {
        let mut task = Task::new(TaskSpec::new(1, 0, 5).with_priority(2));
        task.priority_adjust = 5;
        assert_eq!(task.effective_priority(), 0);
        assert_eq!(task.base_priority(), 2);
    }

    #[test]
    fn critical_section_window() {
        let cs = CriticalSection {
            resource: 1,
            start_offset: 2,
            duration: 3,
        };
        assert!(!cs.covers(1));
        assert!(cs.covers(2));
        assert!(cs.covers(4));
        assert!(!cs.covers(5));
    }
}
