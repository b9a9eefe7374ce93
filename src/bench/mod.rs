/*!
 * Benchmark Harness
 * Replays named policies over a workload and scores them side by side
 */

use log::info;
use serde::{Deserialize, Serialize};

use crate::core::types::SimResult;
use crate::engine;
use crate::metrics::{build_report, MetricsConfig, Report, TaskRecord};
use crate::policy::{Policy, PolicyParams};
use crate::task::TaskSpec;

pub mod workload;

/// One scored policy run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonRow {
    pub policy: String,
    pub report: Report,
    pub records: Vec<TaskRecord>,
}

/// Side-by-side scores of several policies over one workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    /// Row minimizing a metric, e.g. average waiting time
    #[must_use]
    pub fn best_by<F>(&self, metric: F) -> Option<&ComparisonRow>
    where
        F: Fn(&Report) -> f64,
    {
        self.rows.iter().min_by(|a, b| {
            metric(&a.report)
                .partial_cmp(&metric(&b.report))
                .expect("metrics are finite")
        })
    }
}

/// The full batch-policy lineup with the given shared parameters
#[must_use]
pub fn standard_lineup(params: &PolicyParams) -> Vec<Policy> {
    vec![
        Policy::Fcfs,
        Policy::Sjf,
        Policy::Srtf,
        Policy::RoundRobin {
            quantum: params.quantum,
        },
        Policy::Priority {
            aging: params.aging,
        },
        Policy::MultilevelQueue(params.mlq.clone()),
        Policy::MultilevelFeedback(params.mlfq.clone()),
    ]
}

/// Run every policy over the same workload and collect the scorecards.
/// Each policy sees a fresh copy of the task set.
pub fn run_comparison(
    specs: &[TaskSpec],
    policies: &[Policy],
    config: &MetricsConfig,
) -> SimResult<Comparison> {
    let mut rows = Vec::with_capacity(policies.len());
    for policy in policies {
        let outcome = engine::run(specs.to_vec(), policy)?;
        let (records, report) = build_report(&outcome, config);
        info!(
            "{}: avg_wait={:.2} avg_turnaround={:.2} util={:.2}%",
            report.policy, report.avg_waiting_time, report.avg_turnaround_time,
            report.cpu_utilization
        );
        rows.push(ComparisonRow {
            policy: report.policy.clone(),
            report,
            records,
        });
    }
    Ok(Comparison { rows })
}
