/*!
 * Metrics Engine
 * Per-task records and the aggregate report scored from a finished run
 */

use serde::{Deserialize, Serialize};

use crate::core::types::{TaskId, Tick};
use crate::engine::RunOutcome;

mod fairness;

pub use fairness::{gini_coefficient, jain_index, starvation_detected};

/// Report tuning knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsConfig {
    /// A task starves when its waiting time exceeds this multiple of the mean
    pub starvation_multiple: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            starvation_multiple: 3.0,
        }
    }
}

/// The four derived timestamps for one completed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskRecord {
    pub id: TaskId,
    pub arrival_time: Tick,
    pub execution_time: Tick,
    pub start_time: Tick,
    pub completion_time: Tick,
    pub response_time: Tick,
    pub turnaround_time: Tick,
    pub waiting_time: Tick,
}

/// Aggregate scorecard for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Report {
    pub policy: String,
    /// Busy over total elapsed, as a percentage rounded to 2 decimals
    pub cpu_utilization: f64,
    /// Completed tasks per elapsed tick
    pub throughput: f64,
    pub avg_waiting_time: f64,
    pub avg_turnaround_time: f64,
    pub avg_response_time: f64,
    /// Jain's index over waiting times
    pub fairness_index: f64,
    pub gini_coefficient: f64,
    pub starvation_detected: bool,
    pub context_switches: u64,
    pub preemptions: u64,
    pub total_time: Tick,
}

/// Extract per-task records and the aggregate report from a finished run
#[must_use]
pub fn build_report(outcome: &RunOutcome, config: &MetricsConfig) -> (Vec<TaskRecord>, Report) {
    let mut records: Vec<TaskRecord> = outcome
        .tasks
        .iter()
        .filter_map(|task| {
            Some(TaskRecord {
                id: task.id(),
                arrival_time: task.spec.arrival_time,
                execution_time: task.spec.execution_time,
                start_time: task.start_time?,
                completion_time: task.completion_time?,
                response_time: task.response_time()?,
                turnaround_time: task.turnaround_time()?,
                waiting_time: task.waiting_time()?,
            })
        })
        .collect();
    records.sort_by_key(|r| r.id);

    let n = records.len() as f64;
    let total_time = outcome.total_time;
    let waits: Vec<Tick> = records.iter().map(|r| r.waiting_time).collect();

    let avg = |extract: fn(&TaskRecord) -> Tick| -> f64 {
        if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| extract(r) as f64).sum::<f64>() / n
        }
    };

    let cpu_utilization = if total_time == 0 {
        0.0
    } else {
        round2(outcome.timeline.busy_time() as f64 / total_time as f64 * 100.0)
    };
    let throughput = if total_time == 0 {
        0.0
    } else {
        n / total_time as f64
    };

    let report = Report {
        policy: outcome.policy_name.to_string(),
        cpu_utilization,
        throughput,
        avg_waiting_time: avg(|r| r.waiting_time),
        avg_turnaround_time: avg(|r| r.turnaround_time),
        avg_response_time: avg(|r| r.response_time),
        fairness_index: jain_index(&waits),
        gini_coefficient: gini_coefficient(&waits),
        starvation_detected: starvation_detected(&waits, config.starvation_multiple),
        context_switches: outcome.counters.context_switches,
        preemptions: outcome.counters.preemptions,
        total_time,
    };
    (records, report)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
