/*!
 * Real-Time Scheduling Tests
 * Utilization bounds, exact analysis, hyperperiod simulation, and servers
 */

use pretty_assertions::assert_eq;

use schedlab::rt::{
    self, edf_test, rms_analysis, rms_bound, AperiodicJob, RtAlgorithm, RtSimConfig, RtTaskSpec,
    ServerConfig, ServerKind,
};

/// Utilizations 0.4 + 0.35 + 0.225 = 0.975: over the bound, and genuinely
/// infeasible under fixed priorities
fn overloaded_set() -> Vec<RtTaskSpec> {
    vec![
        RtTaskSpec::new(1, 6, 15),
        RtTaskSpec::new(2, 7, 20),
        RtTaskSpec::new(3, 9, 40),
    ]
}

#[test]
fn bound_for_three_tasks_is_780_per_mille() {
    assert!((rms_bound(3) - 0.780).abs() < 1e-3);
}

#[test]
fn overloaded_set_fails_bound_and_analysis_predicts_a_miss() {
    let analysis = rms_analysis(&overloaded_set());

    assert!((analysis.utilization.total_utilization - 0.975).abs() < 1e-9);
    assert!(!analysis.utilization.passed);
    assert!(!analysis.schedulable);

    let misses: Vec<_> = analysis
        .response_times
        .iter()
        .filter(|e| !e.schedulable)
        .collect();
    assert!(!misses.is_empty());
    assert!(misses.iter().all(|e| e.response_time > e.deadline));
}

#[test]
fn simulation_confirms_the_predicted_miss() {
    let outcome = rt::simulate(
        RtAlgorithm::RateMonotonic,
        &overloaded_set(),
        &RtSimConfig::default(),
    )
    .unwrap();
    assert!(!outcome.warning.utilization_test_passed);
    assert!(outcome.misses.iter().any(|m| m.task == 3));
}

#[test]
fn edf_utilization_verdicts_at_the_boundary() {
    // U = 0.9: schedulable
    let passing = vec![RtTaskSpec::new(1, 3, 10), RtTaskSpec::new(2, 6, 10)];
    let verdict = edf_test(&passing);
    assert!((verdict.total_utilization - 0.9).abs() < 1e-9);
    assert!(verdict.schedulable);

    // U = 1.1: not schedulable
    let failing = vec![RtTaskSpec::new(1, 6, 10), RtTaskSpec::new(2, 5, 10)];
    let verdict = edf_test(&failing);
    assert!((verdict.total_utilization - 1.1).abs() < 1e-9);
    assert!(!verdict.schedulable);
}

#[test]
fn edf_meets_every_deadline_at_full_utilization() {
    let tasks = vec![RtTaskSpec::new(1, 2, 4), RtTaskSpec::new(2, 4, 8)];
    let outcome = rt::simulate(
        RtAlgorithm::EarliestDeadlineFirst,
        &tasks,
        &RtSimConfig::default(),
    )
    .unwrap();
    assert!(outcome.misses.is_empty());
    assert!(outcome.warning.is_clean() || outcome.warning.utilization_test_passed);
}

#[test]
fn rms_misses_where_edf_succeeds() {
    // U = 1.0 with non-harmonic periods: beyond what fixed priorities can do
    let tasks = vec![RtTaskSpec::new(1, 3, 6), RtTaskSpec::new(2, 5, 10)];

    let rms = rt::simulate(RtAlgorithm::RateMonotonic, &tasks, &RtSimConfig::default()).unwrap();
    let edf = rt::simulate(
        RtAlgorithm::EarliestDeadlineFirst,
        &tasks,
        &RtSimConfig::default(),
    )
    .unwrap();

    assert!(!rms.misses.is_empty());
    assert!(edf.misses.is_empty());
}

#[test]
fn instance_counters_cover_the_horizon() {
    let tasks = vec![RtTaskSpec::new(1, 2, 10), RtTaskSpec::new(2, 3, 20)];
    let outcome = rt::simulate(RtAlgorithm::RateMonotonic, &tasks, &RtSimConfig::default())
        .unwrap();
    assert_eq!(outcome.horizon, 20);

    let t1 = outcome.stats.iter().find(|s| s.task == 1).unwrap();
    assert_eq!(t1.released, 2);
    assert_eq!(t1.completed, 2);
    assert_eq!(t1.missed, 0);
}

#[test]
fn deadline_shorter_than_period_is_honored() {
    // Same demand, but the deadline leaves no slack for interference
    let tasks = vec![
        RtTaskSpec::new(1, 4, 10),
        RtTaskSpec::new(2, 5, 20).with_deadline(6),
    ];
    let analysis = rms_analysis(&tasks);
    let tight = analysis
        .response_times
        .iter()
        .find(|e| e.task == 2)
        .unwrap();
    assert!(!tight.schedulable);
}

fn background() -> Vec<RtTaskSpec> {
    vec![RtTaskSpec::new(1, 2, 10), RtTaskSpec::new(2, 3, 20)]
}

#[test]
fn polling_server_discards_budget_between_slots() {
    let jobs = vec![AperiodicJob {
        id: 100,
        arrival: 2,
        execution: 2,
    }];
    let polling = ServerConfig {
        kind: ServerKind::Polling,
        budget: 2,
        period: 5,
    };
    let outcome = rt::simulate_with_server(&background(), &polling, &jobs, &RtSimConfig::default())
        .unwrap();

    let job = &outcome.served[0];
    // Arrived mid-slot at t=2; nothing happens before the next slot at t=5
    assert!(job.completion >= 5 + 2);
}

#[test]
fn deferrable_server_uses_carried_budget_immediately() {
    let jobs = vec![AperiodicJob {
        id: 100,
        arrival: 2,
        execution: 2,
    }];
    let deferrable = ServerConfig {
        kind: ServerKind::Deferrable,
        budget: 2,
        period: 5,
    };
    let outcome = rt::simulate_with_server(
        &background(),
        &deferrable,
        &jobs,
        &RtSimConfig::default(),
    )
    .unwrap();

    let job = &outcome.served[0];
    assert_eq!(job.completion, 4);
    assert_eq!(job.response, 2);
}

#[test]
fn sporadic_server_replenishes_consumed_amount_one_period_later() {
    let server = ServerConfig {
        kind: ServerKind::Sporadic,
        budget: 2,
        period: 10,
    };
    let jobs = vec![
        AperiodicJob {
            id: 100,
            arrival: 3,
            execution: 2,
        },
        AperiodicJob {
            id: 101,
            arrival: 6,
            execution: 1,
        },
    ];
    let outcome = rt::simulate_with_server(&background(), &server, &jobs, &RtSimConfig::default())
        .unwrap();

    assert_eq!(outcome.served.len(), 2);
    let first = outcome.served.iter().find(|j| j.id == 100).unwrap();
    assert!(first.completion <= 6); // served on demand, no slot wait
    let second = outcome.served.iter().find(|j| j.id == 101).unwrap();
    assert!(second.completion > 10); // waits for the deferred replenishment
}

#[test]
fn properly_sized_server_never_disturbs_the_periodic_set() {
    for kind in [ServerKind::Polling, ServerKind::Deferrable, ServerKind::Sporadic] {
        let server = ServerConfig {
            kind,
            budget: 1,
            period: 5,
        };
        let jobs = vec![AperiodicJob {
            id: 100,
            arrival: 0,
            execution: 3,
        }];
        let outcome =
            rt::simulate_with_server(&background(), &server, &jobs, &RtSimConfig::default())
                .unwrap();
        assert_eq!(outcome.periodic_misses, 0, "{kind:?}");
    }
}
