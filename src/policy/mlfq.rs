/*!
 * Multilevel Feedback Queue
 * Per-level FIFO with growing quanta, demotion on quantum expiry, and a
 * periodic priority boost that returns every task to the top level
 */

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::types::{TaskId, Tick};
use crate::task::TaskSet;

/// MLFQ configuration. Defaults use the classic four-level quantum ladder
/// (1, 4, 8, 16) with a boost every 20 ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MlfqConfig {
    pub quanta: Vec<Tick>,
    pub boost_interval: Tick,
}

impl Default for MlfqConfig {
    fn default() -> Self {
        Self {
            quanta: vec![1, 4, 8, 16],
            boost_interval: 20,
        }
    }
}

/// Ready structure for multilevel feedback scheduling
#[derive(Debug)]
pub struct MlfqState {
    quanta: Vec<Tick>,
    boost_interval: Tick,
    levels: Vec<VecDeque<TaskId>>,
    level_of: HashMap<TaskId, usize>,
    last_boost: Tick,
    boosts: u64,
}

impl MlfqState {
    #[must_use]
    pub fn new(config: &MlfqConfig) -> Self {
        let depth = config.quanta.len();
        Self {
            quanta: config.quanta.clone(),
            boost_interval: config.boost_interval,
            levels: (0..depth).map(|_| VecDeque::new()).collect(),
            level_of: HashMap::new(),
            last_boost: 0,
            boosts: 0,
        }
    }

    /// New work always enters the top level
    pub fn admit(&mut self, id: TaskId) {
        self.level_of.insert(id, 0);
        self.levels[0].push_back(id);
    }

    /// Placement after a slice ends without completion. Exhausting the full
    /// level quantum demotes one level; a shorter slice (arrival or boost
    /// boundary cut it off) keeps the task where it was.
    pub fn requeue(&mut self, id: TaskId, executed: Tick) {
        let level = *self.level_of.get(&id).unwrap_or(&0);
        let demoted = if executed >= self.quanta[level] {
            (level + 1).min(self.levels.len() - 1)
        } else {
            level
        };
        self.level_of.insert(id, demoted);
        self.levels[demoted].push_back(id);
    }

    /// Unconditional periodic boost: every queued task returns to level 0,
    /// preserving level order then FIFO order within each level.
    pub fn prepare(&mut self, now: Tick) {
        while now >= self.last_boost + self.boost_interval {
            self.last_boost += self.boost_interval;
            let mut boosted = VecDeque::new();
            for level in &mut self.levels {
                while let Some(id) = level.pop_front() {
                    boosted.push_back(id);
                }
            }
            for &id in &boosted {
                self.level_of.insert(id, 0);
            }
            if !boosted.is_empty() {
                self.boosts += 1;
            }
            self.levels[0] = boosted;
        }
    }

    pub fn select(&mut self) -> Option<TaskId> {
        self.levels.iter_mut().find_map(VecDeque::pop_front)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(VecDeque::is_empty)
    }

    #[must_use]
    pub fn slice(&self, id: TaskId, tasks: &TaskSet) -> Tick {
        let level = *self.level_of.get(&id).unwrap_or(&0);
        tasks.task(id).remaining_time.min(self.quanta[level])
    }

    /// Next boost boundary, used to bound slices
    #[must_use]
    pub fn next_boost(&self) -> Tick {
        self.last_boost + self.boost_interval
    }

    /// Number of boost rounds that actually moved tasks
    #[must_use]
    pub fn boost_count(&self) -> u64 {
        self.boosts
    }
}
