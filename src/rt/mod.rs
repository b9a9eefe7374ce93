/*!
 * Real-Time Extensions
 * Periodic task model, schedulability analysis, RMS/EDF simulation, and
 * aperiodic servers
 */

use serde::{Deserialize, Serialize};

use crate::core::errors::ValidationError;
use crate::core::types::{TaskId, Tick};

pub mod analysis;
pub mod server;
mod sim;

pub use analysis::{
    edf_test, response_time_analysis, rms_analysis, rms_bound, rms_utilization_test,
    total_utilization, EdfTest, ResponseTimeEntry, RmsAnalysis, UtilizationTest,
};
pub use server::{
    simulate_with_server, AperiodicJob, ServedJob, ServerConfig, ServerKind, ServerOutcome,
};
pub use sim::{simulate, InstanceStats, RtAlgorithm, RtOutcome, RtSimConfig};

/// Periodic task descriptor for the real-time extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RtTaskSpec {
    pub id: TaskId,
    pub execution_time: Tick,
    pub period: Tick,
    pub relative_deadline: Tick,
}

impl RtTaskSpec {
    /// Implicit-deadline task: deadline equals period
    #[must_use]
    pub fn new(id: TaskId, execution_time: Tick, period: Tick) -> Self {
        Self {
            id,
            execution_time,
            period,
            relative_deadline: period,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, relative_deadline: Tick) -> Self {
        self.relative_deadline = relative_deadline;
        self
    }

    /// Fraction of the processor this task demands
    #[must_use]
    pub fn utilization(&self) -> f64 {
        self.execution_time as f64 / self.period as f64
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.execution_time == 0 {
            return Err(ValidationError::ZeroExecutionTime(self.id));
        }
        if self.period == 0 {
            return Err(ValidationError::ZeroPeriod(self.id));
        }
        if self.relative_deadline == 0 {
            return Err(ValidationError::ZeroRelativeDeadline(self.id));
        }
        Ok(())
    }
}

/// A deadline violation observed during simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeadlineMiss {
    pub task: TaskId,
    /// The deadline that passed
    pub at: Tick,
    /// How far past the deadline the instance finished (or was abandoned)
    pub lateness: Tick,
}

/// Non-fatal schedulability diagnosis attached to a run report. The
/// simulation still executes; this records what the analysis predicted and
/// what actually happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulabilityWarning {
    pub utilization_test_passed: bool,
    /// Tasks the exact analysis predicts will miss deadlines
    pub predicted_unschedulable: Vec<TaskId>,
    /// Misses actually observed during simulation
    pub observed_misses: Vec<DeadlineMiss>,
}

impl SchedulabilityWarning {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.utilization_test_passed
            && self.predicted_unschedulable.is_empty()
            && self.observed_misses.is_empty()
    }
}

pub(crate) fn gcd(a: Tick, b: Tick) -> Tick {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

pub(crate) fn lcm(a: Tick, b: Tick) -> Tick {
    a / gcd(a, b) * b
}

/// LCM of all periods, saturating at `cap` to keep simulations bounded
#[must_use]
pub fn hyperperiod(tasks: &[RtTaskSpec], cap: Tick) -> Tick {
    let mut hp: Tick = 1;
    for task in tasks {
        hp = lcm(hp, task.period);
        if hp >= cap {
            return cap;
        }
    }
    hp
}
