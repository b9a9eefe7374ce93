/*!
 * Property Tests
 * Determinism, timestamp identities, and SRTF optimality over generated
 * workloads
 */

use proptest::prelude::*;

use schedlab::engine;
use schedlab::metrics::{build_report, MetricsConfig};
use schedlab::policy::{Policy, PolicyParams};
use schedlab::task::TaskSpec;

fn arb_workload() -> impl Strategy<Value = Vec<TaskSpec>> {
    prop::collection::vec((0u64..40, 1u64..16, 0u8..8), 1..10).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (arrival, burst, priority))| {
                TaskSpec::new(i as u32 + 1, arrival, burst).with_priority(priority)
            })
            .collect()
    })
}

fn lineup() -> Vec<Policy> {
    let params = PolicyParams::default();
    vec![
        Policy::Fcfs,
        Policy::Sjf,
        Policy::Srtf,
        Policy::RoundRobin { quantum: 3 },
        Policy::Priority {
            aging: params.aging,
        },
        Policy::MultilevelQueue(params.mlq),
        Policy::MultilevelFeedback(params.mlfq),
    ]
}

proptest! {
    #[test]
    fn identical_inputs_produce_identical_schedules(specs in arb_workload()) {
        for policy in lineup() {
            let first = engine::run(specs.clone(), &policy).unwrap();
            let second = engine::run(specs.clone(), &policy).unwrap();
            prop_assert_eq!(first.timeline.slices(), second.timeline.slices());

            let (records_a, report_a) = build_report(&first, &MetricsConfig::default());
            let (records_b, report_b) = build_report(&second, &MetricsConfig::default());
            prop_assert_eq!(records_a, records_b);
            prop_assert_eq!(report_a, report_b);
        }
    }

    #[test]
    fn timestamp_identities_hold_for_every_policy(specs in arb_workload()) {
        for policy in lineup() {
            let outcome = engine::run(specs.clone(), &policy).unwrap();
            let (records, _) = build_report(&outcome, &MetricsConfig::default());
            prop_assert_eq!(records.len(), specs.len());
            for r in &records {
                prop_assert_eq!(r.turnaround_time, r.completion_time - r.arrival_time);
                prop_assert_eq!(r.waiting_time, r.turnaround_time - r.execution_time);
                prop_assert_eq!(r.response_time, r.start_time - r.arrival_time);
            }
        }
    }

    #[test]
    fn srtf_never_waits_longer_than_sjf_on_average(specs in arb_workload()) {
        let sjf = engine::run(specs.clone(), &Policy::Sjf).unwrap();
        let srtf = engine::run(specs, &Policy::Srtf).unwrap();

        let (_, sjf_report) = build_report(&sjf, &MetricsConfig::default());
        let (_, srtf_report) = build_report(&srtf, &MetricsConfig::default());
        prop_assert!(srtf_report.avg_waiting_time <= sjf_report.avg_waiting_time + 1e-9);
    }

    #[test]
    fn fcfs_equals_round_robin_with_quantum_above_max_burst(specs in arb_workload()) {
        let max_burst = specs.iter().map(|s| s.execution_time).max().unwrap();

        let fcfs = engine::run(specs.clone(), &Policy::Fcfs).unwrap();
        let rr = engine::run(specs, &Policy::RoundRobin { quantum: max_burst }).unwrap();

        let (fcfs_records, _) = build_report(&fcfs, &MetricsConfig::default());
        let (rr_records, _) = build_report(&rr, &MetricsConfig::default());
        prop_assert_eq!(fcfs_records, rr_records);
    }

    #[test]
    fn no_task_starts_before_arrival(specs in arb_workload()) {
        for policy in lineup() {
            let outcome = engine::run(specs.clone(), &policy).unwrap();
            for task in outcome.tasks.iter() {
                prop_assert!(task.start_time.unwrap() >= task.spec.arrival_time);
            }
        }
    }

    #[test]
    fn busy_time_equals_total_demand(specs in arb_workload()) {
        let demand: u64 = specs.iter().map(|s| s.execution_time).sum();
        for policy in lineup() {
            let outcome = engine::run(specs.clone(), &policy).unwrap();
            prop_assert_eq!(outcome.timeline.busy_time(), demand);
        }
    }
}
