/*!
 * Schedulability Analysis
 * Liu & Layland utilization bound, exact response-time analysis, and the
 * EDF utilization test
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::types::{TaskId, Tick};

use super::RtTaskSpec;

/// Aggregate utilization `Σ C_i / T_i`
#[must_use]
pub fn total_utilization(tasks: &[RtTaskSpec]) -> f64 {
    tasks.iter().map(RtTaskSpec::utilization).sum()
}

/// Liu & Layland bound `n·(2^(1/n) − 1)`; sufficient, not necessary
#[must_use]
pub fn rms_bound(n: usize) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let n = n as f64;
    n * (2f64.powf(1.0 / n) - 1.0)
}

/// Result of the RMS utilization test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UtilizationTest {
    pub total_utilization: f64,
    pub bound: f64,
    pub passed: bool,
}

#[must_use]
pub fn rms_utilization_test(tasks: &[RtTaskSpec]) -> UtilizationTest {
    let total = total_utilization(tasks);
    let bound = rms_bound(tasks.len());
    UtilizationTest {
        total_utilization: total,
        bound,
        passed: total <= bound,
    }
}

/// Exact response time of one task under rate-monotonic priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponseTimeEntry {
    pub task: TaskId,
    /// Fixed point of the recurrence, or the first value past the deadline
    pub response_time: Tick,
    pub deadline: Tick,
    pub schedulable: bool,
}

/// Iterate `R = C_i + Σ_j ⌈R/T_j⌉·C_j` over all higher-priority tasks j to a
/// fixed point. Converged means schedulable iff `R ≤ D_i`; crossing the
/// deadline terminates the iteration and marks the task unschedulable.
#[must_use]
pub fn response_time_analysis(tasks: &[RtTaskSpec]) -> Vec<ResponseTimeEntry> {
    let mut ordered: Vec<&RtTaskSpec> = tasks.iter().collect();
    ordered.sort_by_key(|t| (t.period, t.id));

    let mut entries = Vec::with_capacity(ordered.len());
    for (rank, task) in ordered.iter().enumerate() {
        let deadline = task.relative_deadline;
        let mut response = task.execution_time;
        let (response_time, schedulable) = loop {
            let mut next = task.execution_time;
            for higher in &ordered[..rank] {
                next += div_ceil(response, higher.period) * higher.execution_time;
            }
            if next == response {
                break (response, response <= deadline);
            }
            if next > deadline {
                break (next, false);
            }
            response = next;
        };
        debug!(
            "RTA task {}: R={}, D={}, schedulable={}",
            task.id, response_time, deadline, schedulable
        );
        entries.push(ResponseTimeEntry {
            task: task.id,
            response_time,
            deadline,
            schedulable,
        });
    }
    entries
}

/// Full RMS verdict: the sufficient utilization test plus, when it fails,
/// the exact per-task analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RmsAnalysis {
    pub utilization: UtilizationTest,
    pub response_times: Vec<ResponseTimeEntry>,
    pub schedulable: bool,
}

#[must_use]
pub fn rms_analysis(tasks: &[RtTaskSpec]) -> RmsAnalysis {
    let utilization = rms_utilization_test(tasks);
    let response_times = response_time_analysis(tasks);
    let schedulable = utilization.passed || response_times.iter().all(|e| e.schedulable);
    RmsAnalysis {
        utilization,
        response_times,
        schedulable,
    }
}

/// EDF verdict for implicit-deadline periodic sets on one core:
/// necessary and sufficient that `ΣU ≤ 1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EdfTest {
    pub total_utilization: f64,
    pub schedulable: bool,
}

#[must_use]
pub fn edf_test(tasks: &[RtTaskSpec]) -> EdfTest {
    let total = total_utilization(tasks);
    EdfTest {
        total_utilization: total,
        schedulable: total <= 1.0,
    }
}

fn div_ceil(a: Tick, b: Tick) -> Tick {
    (a + b - 1) / b
}
