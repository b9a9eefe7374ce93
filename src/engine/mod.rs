/*!
 * Scheduler Core
 * Generic discrete-event dispatch loop shared by every batch policy
 */

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::core::errors::InvariantViolation;
use crate::core::types::{SimResult, TaskId, Tick};
use crate::policy::{Policy, ReadyState};
use crate::task::{TaskSet, TaskSpec, TaskState};

mod timeline;

pub use timeline::{Slice, Timeline};

/// Dispatch counters for a single run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedCounters {
    pub dispatches: u64,
    pub context_switches: u64,
    pub preemptions: u64,
}

/// Everything a finished run hands to the metrics layer
#[derive(Debug)]
pub struct RunOutcome {
    pub policy_name: &'static str,
    pub tasks: TaskSet,
    pub timeline: Timeline,
    pub counters: SchedCounters,
    /// Clock value when the last task terminated
    pub total_time: Tick,
}

/// Simulate a workload under a policy.
///
/// The contract: every task receives its four derived timestamps, no task
/// executes before arrival, and Running never overlaps. Identical inputs
/// always produce identical outcomes.
pub fn run(specs: Vec<TaskSpec>, policy: &Policy) -> SimResult<RunOutcome> {
    policy.validate()?;
    let tasks = TaskSet::from_specs(specs)?;
    let mut ctx = SchedulerContext::new(tasks, policy);
    info!(
        "Simulation started: policy={}, tasks={}",
        policy.name(),
        ctx.tasks.len()
    );
    ctx.run_to_completion()?;
    info!(
        "Simulation finished: policy={}, total_time={}, dispatches={}",
        policy.name(),
        ctx.now,
        ctx.counters.dispatches
    );
    Ok(RunOutcome {
        policy_name: policy.name(),
        total_time: ctx.now,
        tasks: ctx.tasks,
        timeline: ctx.timeline,
        counters: ctx.counters,
    })
}

/// Owned per-run state: the simulation clock, the task arena, and the ready
/// structure for the active policy. Created per run, discarded after the
/// metrics are extracted.
struct SchedulerContext {
    now: Tick,
    tasks: TaskSet,
    ready: ReadyState,
    timeline: Timeline,
    counters: SchedCounters,
    last_dispatched: Option<TaskId>,
    /// Task whose slice just ended unfinished; decides preemption accounting
    pending_preempt: Option<TaskId>,
}

impl SchedulerContext {
    fn new(tasks: TaskSet, policy: &Policy) -> Self {
        Self {
            now: 0,
            tasks,
            ready: ReadyState::for_policy(policy),
            timeline: Timeline::new(),
            counters: SchedCounters::default(),
            last_dispatched: None,
            pending_preempt: None,
        }
    }

    fn run_to_completion(&mut self) -> SimResult<()> {
        loop {
            self.admit_due();
            if self.tasks.all_terminated() {
                return Ok(());
            }
            self.ready.prepare(&mut self.tasks, self.now);

            let Some(id) = self.ready.select(&self.tasks) else {
                if !self.advance_past_idle() {
                    // Nothing ready and nothing pending; with no Blocked
                    // state in batch scheduling this means we are done.
                    debug_assert!(self.tasks.all_terminated());
                    return Ok(());
                }
                continue;
            };

            self.dispatch(id)?;
        }
    }

    /// Admit every task whose arrival is due, in (arrival, id) order
    fn admit_due(&mut self) {
        for id in self.tasks.due_arrivals(self.now) {
            self.tasks.task_mut(id).state = TaskState::Ready;
            self.ready.admit(id, &self.tasks, self.now);
            trace!("t={}: task {} admitted", self.now, id);
        }
    }

    /// Jump the clock over an idle or budget-starved interval. Returns false
    /// when there is no future event to jump to.
    fn advance_past_idle(&mut self) -> bool {
        let next_arrival = self.tasks.next_arrival_after(self.now);
        let target = if self.ready.is_empty() {
            next_arrival
        } else {
            // Tasks are queued but unselectable: budget starvation. The next
            // reset boundary (or an arrival into another level) unblocks.
            match (self.ready.stall_boundary(), next_arrival) {
                (Some(boundary), Some(arrival)) => Some(boundary.min(arrival)),
                (Some(boundary), None) => Some(boundary),
                (None, arrival) => arrival,
            }
        };
        match target {
            Some(at) => {
                trace!("t={}: idle, clock jumps to {}", self.now, at);
                self.now = at;
                true
            }
            None => false,
        }
    }

    fn dispatch(&mut self, id: TaskId) -> SimResult<()> {
        let arrival = self.tasks.task(id).spec.arrival_time;
        if self.now < arrival {
            return Err(InvariantViolation::PrematureDispatch { id, at: self.now }.into());
        }

        let next_arrival = self.tasks.next_arrival_after(self.now);
        let slice = self.ready.slice(id, &self.tasks, self.now, next_arrival).max(1);

        if self.last_dispatched != Some(id) {
            self.counters.context_switches += 1;
        }
        if let Some(preempted) = self.pending_preempt.take() {
            if preempted != id {
                self.counters.preemptions += 1;
                debug!("t={}: task {} preempted by {}", self.now, preempted, id);
            }
        }
        self.counters.dispatches += 1;

        self.tasks.task_mut(id).record_dispatch(self.now);
        self.timeline.record(id, self.now, self.now + slice)?;

        let remaining = {
            let task = self.tasks.task_mut(id);
            task.remaining_time = task
                .remaining_time
                .checked_sub(slice)
                .ok_or(InvariantViolation::RemainingUnderflow { id, at: self.now })?;
            task.remaining_time
        };
        self.now += slice;
        self.ready.charge(slice);
        self.last_dispatched = Some(id);

        if remaining == 0 {
            self.tasks.task_mut(id).record_completion(self.now);
            debug!("t={}: task {} completed", self.now, id);
        } else {
            self.tasks.task_mut(id).state = TaskState::Ready;
            // Due arrivals enter the ready structure before the preempted
            // task re-enqueues; round-robin's ordering rule depends on this.
            self.admit_due();
            self.ready.requeue(id, &self.tasks, self.now, slice);
            self.pending_preempt = Some(id);
        }
        Ok(())
    }
}
