/*!
 * schedlab - Demo Binary
 *
 * Runs the full policy lineup over the demonstration workload, prints the
 * comparison table, then walks through the real-time analysis and the
 * resource-protocol instrumentation.
 */

use std::error::Error;

use log::info;

use schedlab::bench::{run_comparison, standard_lineup, workload};
use schedlab::metrics::MetricsConfig;
use schedlab::policy::PolicyParams;
use schedlab::protocol::{self, ProtocolKind};
use schedlab::rt::{self, RtAlgorithm, RtSimConfig, RtTaskSpec};
use schedlab::task::TaskSpec;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    info!("schedlab starting");

    compare_batch_policies()?;
    analyze_realtime();
    simulate_realtime()?;
    instrument_protocols()?;

    Ok(())
}

fn compare_batch_policies() -> Result<(), Box<dyn Error>> {
    let params = PolicyParams {
        quantum: 3,
        ..PolicyParams::default()
    };
    let comparison = run_comparison(
        &workload::demo_set(),
        &standard_lineup(&params),
        &MetricsConfig::default(),
    )?;

    println!("Policy Comparison (demo workload, quantum=3)");
    println!(
        "{:<12} {:>9} {:>9} {:>9} {:>9} {:>10} {:>9} {:>6}",
        "Policy", "AvgWait", "AvgTurn", "AvgResp", "CPU%", "Thruput", "Jain", "Starve"
    );
    for row in &comparison.rows {
        let r = &row.report;
        println!(
            "{:<12} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>10.4} {:>9.3} {:>6}",
            r.policy,
            r.avg_waiting_time,
            r.avg_turnaround_time,
            r.avg_response_time,
            r.cpu_utilization,
            r.throughput,
            r.fairness_index,
            if r.starvation_detected { "yes" } else { "no" }
        );
    }

    if let Some(best) = comparison.best_by(|r| r.avg_waiting_time) {
        println!(
            "\nBest average waiting time: {} ({:.2})",
            best.policy, best.report.avg_waiting_time
        );
    }
    Ok(())
}

fn rt_demo_set() -> Vec<RtTaskSpec> {
    vec![
        RtTaskSpec::new(1, 3, 10),
        RtTaskSpec::new(2, 2, 15),
        RtTaskSpec::new(3, 4, 25),
        RtTaskSpec::new(4, 5, 30),
        RtTaskSpec::new(5, 3, 50),
    ]
}

fn analyze_realtime() {
    let tasks = rt_demo_set();
    let analysis = rt::rms_analysis(&tasks);

    println!("\nRMS Schedulability Analysis");
    println!(
        "utilization={:.3} bound={:.3} bound_test={}",
        analysis.utilization.total_utilization,
        analysis.utilization.bound,
        if analysis.utilization.passed {
            "pass"
        } else {
            "inconclusive"
        }
    );
    for entry in &analysis.response_times {
        println!(
            "  task {}: R={} D={} {}",
            entry.task,
            entry.response_time,
            entry.deadline,
            if entry.schedulable { "ok" } else { "MISS" }
        );
    }

    let edf = rt::edf_test(&tasks);
    println!(
        "EDF: utilization={:.3} schedulable={}",
        edf.total_utilization, edf.schedulable
    );
}

fn simulate_realtime() -> Result<(), Box<dyn Error>> {
    let tasks = rt_demo_set();
    for algorithm in [RtAlgorithm::RateMonotonic, RtAlgorithm::EarliestDeadlineFirst] {
        let outcome = rt::simulate(algorithm, &tasks, &RtSimConfig::default())?;
        println!(
            "\n{:?}: horizon={} preemptions={} misses={}",
            algorithm,
            outcome.horizon,
            outcome.preemptions,
            outcome.misses.len()
        );
        for stat in &outcome.stats {
            println!(
                "  task {}: released={} completed={} missed={}",
                stat.task, stat.released, stat.completed, stat.missed
            );
        }
    }
    Ok(())
}

fn instrument_protocols() -> Result<(), Box<dyn Error>> {
    // High-priority task needs two resources held by two lower-priority tasks
    let workload = || {
        vec![
            TaskSpec::new(1, 2, 4)
                .with_priority(0)
                .with_section(1, 0, 1)
                .with_section(2, 1, 1),
            TaskSpec::new(2, 1, 5).with_priority(2).with_section(2, 0, 4),
            TaskSpec::new(3, 0, 6).with_priority(4).with_section(1, 0, 5),
        ]
    };

    println!("\nResource Protocols (priority-inversion blocking per task)");
    for kind in [ProtocolKind::PriorityInheritance, ProtocolKind::PriorityCeiling] {
        let outcome = protocol::simulate(kind, workload())?;
        println!(
            "{:?}: events={} max_chain={} inheritances={}",
            kind,
            outcome.blocking_events.len(),
            outcome.max_blocking_chain,
            outcome.inheritance_activations
        );
        for (task, count) in &outcome.blocked_counts {
            println!("  task {task}: blocked {count} time(s)");
        }
        println!("  gantt: {}", outcome.timeline.gantt());
    }
    Ok(())
}
