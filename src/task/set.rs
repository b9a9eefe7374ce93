/*!
 * Task Arena
 * Owns every task in a run; ready structures hold stable handles into it
 */

use std::collections::HashMap;

use crate::core::errors::ValidationError;
use crate::core::types::{TaskId, Tick};

use super::types::{Task, TaskSpec, TaskState};

/// Arena of tasks addressed by stable id.
///
/// Iteration order is ingestion order, which keeps every run deterministic;
/// the id index is only used for point lookups.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    slots: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskSet {
    /// Validate and ingest a workload. Each descriptor is checked
    /// individually; the first offending descriptor aborts ingestion.
    pub fn from_specs(specs: Vec<TaskSpec>) -> Result<Self, ValidationError> {
        let mut set = Self {
            slots: Vec::with_capacity(specs.len()),
            index: HashMap::with_capacity(specs.len()),
        };
        for spec in specs {
            set.insert(spec)?;
        }
        Ok(set)
    }

    fn insert(&mut self, spec: TaskSpec) -> Result<(), ValidationError> {
        if spec.execution_time == 0 {
            return Err(ValidationError::ZeroExecutionTime(spec.id));
        }
        if let Some(periodic) = &spec.periodic {
            if periodic.relative_deadline == 0 {
                return Err(ValidationError::ZeroRelativeDeadline(spec.id));
            }
            if periodic.period == 0 {
                return Err(ValidationError::ZeroPeriod(spec.id));
            }
        }
        for section in &spec.critical_sections {
            if section.end_offset() > spec.execution_time {
                return Err(ValidationError::SectionOutOfRange {
                    id: spec.id,
                    end: section.end_offset(),
                    execution_time: spec.execution_time,
                });
            }
        }
        if self.index.contains_key(&spec.id) {
            return Err(ValidationError::DuplicateId(spec.id));
        }

        self.index.insert(spec.id, self.slots.len());
        self.slots.push(Task::new(spec));
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.index.get(&id).map(|&slot| &self.slots[slot])
    }

    #[must_use]
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        let slot = *self.index.get(&id)?;
        Some(&mut self.slots[slot])
    }

    /// Panicking accessor for handles the engine already vetted
    #[must_use]
    pub fn task(&self, id: TaskId) -> &Task {
        self.get(id).unwrap_or_else(|| panic!("unknown task id {id}"))
    }

    /// Panicking mutable accessor for handles the engine already vetted
    #[must_use]
    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("unknown task id {id}"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.slots.iter_mut()
    }

    #[must_use]
    pub fn all_terminated(&self) -> bool {
        self.slots.iter().all(Task::is_terminated)
    }

    /// Earliest arrival strictly after `now` among not-yet-admitted tasks
    #[must_use]
    pub fn next_arrival_after(&self, now: Tick) -> Option<Tick> {
        self.slots
            .iter()
            .filter(|t| t.state == TaskState::New && t.spec.arrival_time > now)
            .map(|t| t.spec.arrival_time)
            .min()
    }

    /// Ids of New tasks with `arrival_time <= now`, in (arrival, id) order,
    /// the admission order every policy sees
    #[must_use]
    pub fn due_arrivals(&self, now: Tick) -> Vec<TaskId> {
        let mut due: Vec<&Task> = self
            .slots
            .iter()
            .filter(|t| t.state == TaskState::New && t.spec.arrival_time <= now)
            .collect();
        due.sort_by_key(|t| (t.spec.arrival_time, t.id()));
        due.iter().map(|t| t.id()).collect()
    }
}
