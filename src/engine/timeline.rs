/*!
 * Execution Timeline
 * Ordered record of executed slices; the audit trail for the single-core
 * invariant and the source for utilization and Gantt output
 */

use serde::{Deserialize, Serialize};

use crate::core::errors::InvariantViolation;
use crate::core::types::{TaskId, Tick};

/// One contiguous stretch of execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Slice {
    pub task: TaskId,
    pub start: Tick,
    pub end: Tick,
}

/// Append-only execution record. Slices never overlap; adjacent slices of
/// the same task are merged so the Gantt view stays readable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    slices: Vec<Slice>,
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an executed slice, enforcing the at-most-one-Running invariant
    pub fn record(&mut self, task: TaskId, start: Tick, end: Tick) -> Result<(), InvariantViolation> {
        debug_assert!(start < end, "empty slice");
        if let Some(last) = self.slices.last_mut() {
            if start < last.end {
                return Err(InvariantViolation::OverlappingExecution {
                    first: last.task,
                    second: task,
                    at: start,
                });
            }
            if last.task == task && last.end == start {
                last.end = end;
                return Ok(());
            }
        }
        self.slices.push(Slice { task, start, end });
        Ok(())
    }

    #[must_use]
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Total executed ticks
    #[must_use]
    pub fn busy_time(&self) -> Tick {
        self.slices.iter().map(|s| s.end - s.start).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Compact single-line Gantt rendering, e.g. `| T1 0-8 | T2 8-12 |`
    #[must_use]
    pub fn gantt(&self) -> String {
        if self.slices.is_empty() {
            return "| idle |".to_string();
        }
        let mut out = String::from("|");
        let mut cursor = 0;
        for slice in &self.slices {
            if slice.start > cursor {
                out.push_str(&format!(" idle {}-{} |", cursor, slice.start));
            }
            out.push_str(&format!(" T{} {}-{} |", slice.task, slice.start, slice.end));
            cursor = slice.end;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_adjacent_same_task_slices() {
        let mut timeline = Timeline::new();
        timeline.record(1, 0, 3).unwrap();
        timeline.record(1, 3, 5).unwrap();
        timeline.record(2, 5, 6).unwrap();

        assert_eq!(timeline.slices().len(), 2);
        assert_eq!(timeline.busy_time(), 6);
    }

    #[test]
    fn rejects_overlap() {
        let mut timeline = Timeline::new();
        timeline.record(1, 0, 5).unwrap();
        let err = timeline.record(2, 4, 6).unwrap_err();
        assert!(matches!(
            err,
            InvariantViolation::OverlappingExecution { first: 1, second: 2, at: 4 }
        ));
    }

    #[test]
    fn gantt_marks_idle_gaps() {
        let mut timeline = Timeline::new();
        timeline.record(1, 2, 4).unwrap();
        assert_eq!(timeline.gantt(), "| idle 0-2 | T1 2-4 |");
    }
}
