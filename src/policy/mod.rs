/*!
 * Scheduling Policies
 * Closed policy sum type, selector parsing, and per-policy ready structures
 */

use serde::{Deserialize, Serialize};

use crate::core::errors::ConfigError;
use crate::core::types::{TaskId, Tick};
use crate::task::TaskSet;

mod fcfs;
mod mlfq;
mod mlq;
mod priority;
mod rr;
mod sjf;

pub use mlfq::MlfqConfig;
pub use mlq::{classify, LevelDiscipline, MlqConfig, MlqLevel, TaskClass};
pub use priority::AgingParams;

use fcfs::FcfsQueue;
use mlfq::MlfqState;
use mlq::MlqState;
use priority::AgingList;
use rr::RrQueue;
use sjf::{SjfHeap, SrtfHeap};

/// Scheduling policy. A closed sum type so every dispatch site is forced to
/// handle new policies exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Policy {
    Fcfs,
    Sjf,
    Srtf,
    RoundRobin { quantum: Tick },
    Priority { aging: AgingParams },
    MultilevelQueue(MlqConfig),
    MultilevelFeedback(MlfqConfig),
}

/// Tunable knobs supplied alongside a policy name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyParams {
    pub quantum: Tick,
    pub aging: AgingParams,
    pub mlq: MlqConfig,
    pub mlfq: MlfqConfig,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            quantum: 4,
            aging: AgingParams::default(),
            mlq: MlqConfig::default(),
            mlfq: MlfqConfig::default(),
        }
    }
}

impl Policy {
    /// Resolve a policy selector by name. Unknown names are a configuration
    /// error; nothing is simulated for them.
    pub fn by_name(name: &str, params: &PolicyParams) -> Result<Self, ConfigError> {
        let policy = match name {
            "fcfs" | "first_come_first_serve" => Policy::Fcfs,
            "sjf" | "shortest_job_first" => Policy::Sjf,
            "srtf" | "shortest_remaining_time_first" => Policy::Srtf,
            "rr" | "round_robin" => Policy::RoundRobin {
                quantum: params.quantum,
            },
            "priority" | "priority_aging" => Policy::Priority {
                aging: params.aging,
            },
            "mlq" | "multilevel_queue" => Policy::MultilevelQueue(params.mlq.clone()),
            "mlfq" | "multilevel_feedback" => Policy::MultilevelFeedback(params.mlfq.clone()),
            other => return Err(ConfigError::UnknownPolicy(other.to_string())),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Reject bad parameters before any simulation starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Policy::Fcfs | Policy::Sjf | Policy::Srtf => Ok(()),
            Policy::RoundRobin { quantum } => {
                if *quantum == 0 {
                    return Err(ConfigError::InvalidQuantum(0));
                }
                Ok(())
            }
            Policy::Priority { aging } => {
                if aging.threshold == 0 {
                    return Err(ConfigError::InvalidAgingThreshold(0));
                }
                Ok(())
            }
            Policy::MultilevelQueue(config) => {
                if config.levels.is_empty() {
                    return Err(ConfigError::EmptyLevels);
                }
                for level in &config.levels {
                    if let LevelDiscipline::RoundRobin { quantum } = level.discipline {
                        if quantum == 0 {
                            return Err(ConfigError::InvalidQuantum(0));
                        }
                    }
                }
                let has_budget = config.levels.iter().any(|level| level.budget.is_some());
                match config.budget_reset_interval {
                    Some(0) => Err(ConfigError::InvalidBoostInterval(0)),
                    None if has_budget => Err(ConfigError::MissingBudgetReset),
                    _ => Ok(()),
                }
            }
            Policy::MultilevelFeedback(config) => {
                if config.quanta.is_empty() {
                    return Err(ConfigError::EmptyLevels);
                }
                if config.quanta.iter().any(|&q| q == 0) {
                    return Err(ConfigError::InvalidQuantum(0));
                }
                if config.boost_interval == 0 {
                    return Err(ConfigError::InvalidBoostInterval(0));
                }
                Ok(())
            }
        }
    }

    /// Human-readable name used in reports and comparison tables
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Fcfs => "FCFS",
            Policy::Sjf => "SJF",
            Policy::Srtf => "SRTF",
            Policy::RoundRobin { .. } => "RoundRobin",
            Policy::Priority { .. } => "Priority",
            Policy::MultilevelQueue(_) => "MLQ",
            Policy::MultilevelFeedback(_) => "MLFQ",
        }
    }
}

/// Ready structure matching the active policy. Holds arena handles only;
/// every task lives in the `TaskSet`.
#[derive(Debug)]
pub(crate) enum ReadyState {
    Fcfs(FcfsQueue),
    Sjf(SjfHeap),
    Srtf(SrtfHeap),
    RoundRobin(RrQueue),
    Priority(AgingList),
    Mlq(MlqState),
    Mlfq(MlfqState),
}

impl ReadyState {
    pub fn for_policy(policy: &Policy) -> Self {
        match policy {
            Policy::Fcfs => ReadyState::Fcfs(FcfsQueue::new()),
            Policy::Sjf => ReadyState::Sjf(SjfHeap::new()),
            Policy::Srtf => ReadyState::Srtf(SrtfHeap::new()),
            Policy::RoundRobin { quantum } => ReadyState::RoundRobin(RrQueue::new(*quantum)),
            Policy::Priority { aging } => ReadyState::Priority(AgingList::new(*aging)),
            Policy::MultilevelQueue(config) => ReadyState::Mlq(MlqState::new(config)),
            Policy::MultilevelFeedback(config) => ReadyState::Mlfq(MlfqState::new(config)),
        }
    }

    pub fn admit(&mut self, id: TaskId, tasks: &TaskSet, now: Tick) {
        match self {
            ReadyState::Fcfs(q) => q.admit(id),
            ReadyState::Sjf(h) => h.admit(id, tasks),
            ReadyState::Srtf(h) => h.admit(id, tasks),
            ReadyState::RoundRobin(q) => q.admit(id),
            ReadyState::Priority(l) => l.admit(id, now),
            ReadyState::Mlq(m) => m.admit(id, tasks),
            ReadyState::Mlfq(m) => m.admit(id),
        }
    }

    /// Placement rule for a preempted task. Callers admit due arrivals
    /// first, which is what gives round-robin its arrival-before-requeue
    /// ordering.
    pub fn requeue(&mut self, id: TaskId, tasks: &TaskSet, now: Tick, executed: Tick) {
        match self {
            ReadyState::Fcfs(q) => q.admit(id),
            ReadyState::Sjf(h) => h.admit(id, tasks),
            ReadyState::Srtf(h) => h.admit(id, tasks),
            ReadyState::RoundRobin(q) => q.requeue(id),
            ReadyState::Priority(l) => l.requeue(id, now),
            ReadyState::Mlq(m) => m.requeue(id, tasks),
            ReadyState::Mlfq(m) => m.requeue(id, executed),
        }
    }

    /// Policy housekeeping before each dispatch decision: aging, priority
    /// boost, budget reset
    pub fn prepare(&mut self, tasks: &mut TaskSet, now: Tick) {
        match self {
            ReadyState::Priority(l) => l.prepare(tasks, now),
            ReadyState::Mlq(m) => m.prepare(now),
            ReadyState::Mlfq(m) => m.prepare(now),
            _ => {}
        }
    }

    pub fn select(&mut self, tasks: &TaskSet) -> Option<TaskId> {
        match self {
            ReadyState::Fcfs(q) => q.select(),
            ReadyState::Sjf(h) => h.select(),
            ReadyState::Srtf(h) => h.select(),
            ReadyState::RoundRobin(q) => q.select(),
            ReadyState::Priority(l) => l.select(tasks),
            ReadyState::Mlq(m) => m.select(tasks),
            ReadyState::Mlfq(m) => m.select(),
        }
    }

    /// Execution slice granted to the selected task, bounded by whatever
    /// event must be able to preempt it under the policy
    pub fn slice(
        &self,
        id: TaskId,
        tasks: &TaskSet,
        now: Tick,
        next_arrival: Option<Tick>,
    ) -> Tick {
        match self {
            ReadyState::Fcfs(q) => q.slice(id, tasks),
            ReadyState::Sjf(_) => tasks.task(id).remaining_time,
            ReadyState::Srtf(h) => h.slice(id, tasks, now, next_arrival),
            ReadyState::RoundRobin(q) => q.slice(id, tasks),
            // Tick granularity keeps arrival- and aging-driven preemption exact
            ReadyState::Priority(_) => 1,
            ReadyState::Mlq(m) => {
                let mut slice = m.slice(id, tasks);
                slice = bound_by(slice, now, next_arrival);
                bound_by(slice, now, m.next_reset())
            }
            ReadyState::Mlfq(m) => {
                let mut slice = m.slice(id, tasks);
                slice = bound_by(slice, now, next_arrival);
                bound_by(slice, now, Some(m.next_boost()))
            }
        }
    }

    /// Account executed ticks where a policy tracks consumption
    pub fn charge(&mut self, executed: Tick) {
        if let ReadyState::Mlq(m) = self {
            m.charge(executed);
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ReadyState::Fcfs(q) => q.is_empty(),
            ReadyState::Sjf(h) => h.is_empty(),
            ReadyState::Srtf(h) => h.is_empty(),
            ReadyState::RoundRobin(q) => q.is_empty(),
            ReadyState::Priority(l) => l.is_empty(),
            ReadyState::Mlq(m) => m.is_empty(),
            ReadyState::Mlfq(m) => m.is_empty(),
        }
    }

    /// When tasks are queued but budget-starved, the clock must advance to
    /// this boundary instead of the next arrival
    pub fn stall_boundary(&self) -> Option<Tick> {
        match self {
            ReadyState::Mlq(m) if m.stalled_on_budget() => m.next_reset(),
            _ => None,
        }
    }
}

fn bound_by(slice: Tick, now: Tick, boundary: Option<Tick>) -> Tick {
    match boundary {
        Some(at) if at > now => slice.min(at - now),
        _ => slice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_policy_name_is_config_error() {
        let err = Policy::by_name("lottery", &PolicyParams::default()).unwrap_err();
        assert_eq!(err, ConfigError::UnknownPolicy("lottery".into()));
    }

    #[test]
    fn zero_quantum_rejected() {
        let policy = Policy::RoundRobin { quantum: 0 };
        assert_eq!(policy.validate(), Err(ConfigError::InvalidQuantum(0)));
    }

    #[test]
    fn zero_aging_threshold_rejected() {
        let policy = Policy::Priority {
            aging: AgingParams {
                threshold: 0,
                increment: 1,
            },
        };
        assert_eq!(policy.validate(), Err(ConfigError::InvalidAgingThreshold(0)));
    }

    #[test]
    fn name_resolution_round_trips() {
        let params = PolicyParams::default();
        for name in ["fcfs", "sjf", "srtf", "round_robin", "priority", "mlq", "mlfq"] {
            assert!(Policy::by_name(name, &params).is_ok(), "{name}");
        }
    }

    #[test]
    fn budget_without_reset_interval_rejected() {
        let policy = Policy::MultilevelQueue(MlqConfig {
            levels: vec![MlqLevel {
                discipline: LevelDiscipline::Fcfs,
                budget: Some(5),
            }],
            budget_reset_interval: None,
        });
        assert!(policy.validate().is_err());
    }
}
