/*!
 * Multilevel Queue
 * Fixed classification into System > Interactive > Batch levels, each with
 * its own discipline and optional slice budget
 */

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{TaskId, Tick};
use crate::task::{TaskSet, TaskSpec};

/// Scheduling discipline applied within a single level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelDiscipline {
    Fcfs,
    RoundRobin { quantum: Tick },
    Sjf,
}

/// Task class, decided once from static descriptor attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    System,
    Interactive,
    Batch,
}

/// Pure classification function: priority ≤ 2 is system work, short bursts
/// (≤ 5) are interactive, the rest is batch.
#[must_use]
pub fn classify(spec: &TaskSpec) -> TaskClass {
    if spec.priority <= 2 {
        TaskClass::System
    } else if spec.execution_time <= 5 {
        TaskClass::Interactive
    } else {
        TaskClass::Batch
    }
}

impl TaskClass {
    #[inline]
    #[must_use]
    pub const fn level_index(self) -> usize {
        match self {
            TaskClass::System => 0,
            TaskClass::Interactive => 1,
            TaskClass::Batch => 2,
        }
    }
}

/// Per-level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MlqLevel {
    pub discipline: LevelDiscipline,
    /// Slice budget per reset interval; `None` means unlimited
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub budget: Option<Tick>,
}

/// Multilevel queue configuration. The default mirrors the classic level
/// table: system quantum 1, interactive quantum 4, batch quantum 8, no
/// budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MlqConfig {
    pub levels: Vec<MlqLevel>,
    /// Interval at which consumed level budgets reset; only meaningful when
    /// some level carries a budget
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub budget_reset_interval: Option<Tick>,
}

impl Default for MlqConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                MlqLevel {
                    discipline: LevelDiscipline::RoundRobin { quantum: 1 },
                    budget: None,
                },
                MlqLevel {
                    discipline: LevelDiscipline::RoundRobin { quantum: 4 },
                    budget: None,
                },
                MlqLevel {
                    discipline: LevelDiscipline::RoundRobin { quantum: 8 },
                    budget: None,
                },
            ],
            budget_reset_interval: None,
        }
    }
}

#[derive(Debug)]
struct LevelQueue {
    config: MlqLevel,
    queue: VecDeque<TaskId>,
    consumed: Tick,
}

impl LevelQueue {
    fn budget_exhausted(&self) -> bool {
        self.config
            .budget
            .map_or(false, |budget| self.consumed >= budget)
    }
}

/// Ready structure for multilevel queue scheduling
#[derive(Debug)]
pub struct MlqState {
    levels: Vec<LevelQueue>,
    reset_interval: Option<Tick>,
    last_reset: Tick,
    last_selected_level: Option<usize>,
}

impl MlqState {
    #[must_use]
    pub fn new(config: &MlqConfig) -> Self {
        Self {
            levels: config
                .levels
                .iter()
                .map(|level| LevelQueue {
                    config: *level,
                    queue: VecDeque::new(),
                    consumed: 0,
                })
                .collect(),
            reset_interval: config.budget_reset_interval,
            last_reset: 0,
            last_selected_level: None,
        }
    }

    fn level_for(&self, id: TaskId, tasks: &TaskSet) -> usize {
        let class = classify(&tasks.task(id).spec);
        class.level_index().min(self.levels.len() - 1)
    }

    pub fn admit(&mut self, id: TaskId, tasks: &TaskSet) {
        let level = self.level_for(id, tasks);
        self.levels[level].queue.push_back(id);
    }

    pub fn requeue(&mut self, id: TaskId, tasks: &TaskSet) {
        self.admit(id, tasks);
    }

    /// Reset consumed budgets at each interval boundary
    pub fn prepare(&mut self, now: Tick) {
        if let Some(interval) = self.reset_interval {
            while now >= self.last_reset + interval {
                self.last_reset += interval;
                for level in &mut self.levels {
                    level.consumed = 0;
                }
            }
        }
    }

    /// Strict level order; within a level, the discipline decides
    pub fn select(&mut self, tasks: &TaskSet) -> Option<TaskId> {
        for (idx, level) in self.levels.iter_mut().enumerate() {
            if level.queue.is_empty() || level.budget_exhausted() {
                continue;
            }
            let pos = match level.config.discipline {
                LevelDiscipline::RoundRobin { .. } => 0,
                LevelDiscipline::Fcfs => pick_by(&level.queue, tasks, |t| {
                    (t.spec.arrival_time, t.id())
                }),
                LevelDiscipline::Sjf => pick_by(&level.queue, tasks, |t| {
                    (t.spec.execution_time, t.id())
                }),
            };
            let id = level.queue.remove(pos).expect("non-empty level");
            self.last_selected_level = Some(idx);
            return Some(id);
        }
        None
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|level| level.queue.is_empty())
    }

    /// Every level empty or budget-starved, but tasks still queued: the
    /// engine must advance to the next reset boundary rather than idle-jump
    /// to an arrival.
    #[must_use]
    pub fn stalled_on_budget(&self) -> bool {
        !self.is_empty()
            && self
                .levels
                .iter()
                .all(|level| level.queue.is_empty() || level.budget_exhausted())
    }

    /// Slice for the selected task: discipline bound, then remaining level
    /// budget
    #[must_use]
    pub fn slice(&self, id: TaskId, tasks: &TaskSet) -> Tick {
        let level = &self.levels[self.last_selected_level.unwrap_or(0)];
        let remaining = tasks.task(id).remaining_time;
        let by_discipline = match level.config.discipline {
            LevelDiscipline::RoundRobin { quantum } => remaining.min(quantum),
            LevelDiscipline::Fcfs | LevelDiscipline::Sjf => remaining,
        };
        match level.config.budget {
            Some(budget) => by_discipline.min(budget.saturating_sub(level.consumed).max(1)),
            None => by_discipline,
        }
    }

    /// Charge executed ticks against the level that supplied the last
    /// selection
    pub fn charge(&mut self, executed: Tick) {
        if let Some(idx) = self.last_selected_level {
            self.levels[idx].consumed += executed;
        }
    }

    /// Next budget-reset boundary, used to bound slices
    #[must_use]
    pub fn next_reset(&self) -> Option<Tick> {
        self.reset_interval.map(|interval| self.last_reset + interval)
    }
}

fn pick_by<K: Ord>(
    queue: &VecDeque<TaskId>,
    tasks: &TaskSet,
    key: impl Fn(&crate::task::Task) -> K,
) -> usize {
    queue
        .iter()
        .enumerate()
        .min_by_key(|(_, &id)| key(tasks.task(id)))
        .map(|(pos, _)| pos)
        .expect("non-empty level")
}
