/*!
 * Threaded Replay Driver
 * Demonstration mode: maps a precomputed schedule onto real worker threads
 * with priority-aware wake ordering. A thin adapter; the simulation core
 * stays single-threaded and owns all correctness guarantees.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use log::{debug, info};
use parking_lot::{Condvar, Mutex};

use crate::core::types::TaskId;
use crate::engine::RunOutcome;

struct ReplayShared {
    /// Index of the next timeline slice to execute
    turn: Mutex<usize>,
    cond: Condvar,
}

/// Replay a schedule with one OS thread per task. Each worker wakes exactly
/// when the timeline hands it a slice, performs a token unit of work, and
/// hands the turn to the next slice's owner. The wake order is the
/// schedule order, so a more urgent task's slice always wakes first.
///
/// Returns the per-task count of executed slices, which callers can check
/// against the timeline.
pub fn replay(outcome: &RunOutcome) -> HashMap<TaskId, usize> {
    let slices = outcome.timeline.slices().to_vec();
    let shared = Arc::new(ReplayShared {
        turn: Mutex::new(0),
        cond: Condvar::new(),
    });

    let task_ids: Vec<TaskId> = outcome.tasks.iter().map(|t| t.id()).collect();
    info!(
        "Replay driver starting: {} worker(s), {} slice(s)",
        task_ids.len(),
        slices.len()
    );

    let mut handles = Vec::with_capacity(task_ids.len());
    for id in task_ids {
        let shared = Arc::clone(&shared);
        let slices = slices.clone();
        handles.push(thread::spawn(move || {
            let mut executed = 0usize;
            loop {
                let mut turn = shared.turn.lock();
                // Park until it is this worker's slice or the replay is over
                while *turn < slices.len() && slices[*turn].task != id {
                    shared.cond.wait(&mut turn);
                }
                if *turn >= slices.len() {
                    return (id, executed);
                }
                let slice = slices[*turn];
                debug!(
                    "worker {} executing slice {}-{}",
                    id, slice.start, slice.end
                );
                executed += 1;
                *turn += 1;
                shared.cond.notify_all();
            }
        }));
    }

    let mut counts = HashMap::new();
    for handle in handles {
        let (id, executed) = handle.join().expect("replay worker panicked");
        counts.insert(id, executed);
    }
    info!("Replay driver finished");
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::policy::Policy;
    use crate::task::TaskSpec;

    #[test]
    fn replay_executes_every_slice_once() {
        let specs = vec![
            TaskSpec::new(1, 0, 6),
            TaskSpec::new(2, 0, 4),
            TaskSpec::new(3, 1, 5),
        ];
        let outcome = engine::run(specs, &Policy::RoundRobin { quantum: 2 }).unwrap();
        let counts = replay(&outcome);

        let expected: HashMap<TaskId, usize> =
            outcome
                .timeline
                .slices()
                .iter()
                .fold(HashMap::new(), |mut acc, s| {
                    *acc.entry(s.task).or_insert(0) += 1;
                    acc
                });
        assert_eq!(counts, expected);
    }
}
