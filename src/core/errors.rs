/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{TaskId, Tick};

/// Configuration errors, rejected before a simulation starts
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Unknown policy name: {0}")]
    #[diagnostic(
        code(config::unknown_policy),
        help("Use one of: fcfs, sjf, srtf, round_robin, priority, mlq, mlfq, rms, edf.")
    )]
    UnknownPolicy(String),

    #[error("Time quantum must be positive, got {0}")]
    #[diagnostic(
        code(config::invalid_quantum),
        help("Round-robin style policies need a quantum of at least one tick.")
    )]
    InvalidQuantum(Tick),

    #[error("Aging threshold must be positive, got {0}")]
    #[diagnostic(
        code(config::invalid_aging_threshold),
        help("The aging threshold is the minimum wait before a priority improvement.")
    )]
    InvalidAgingThreshold(Tick),

    #[error("Priority boost interval must be positive, got {0}")]
    #[diagnostic(
        code(config::invalid_boost_interval),
        help("MLFQ boosts every task back to the top level once per interval.")
    )]
    InvalidBoostInterval(Tick),

    #[error("Server budget must be positive, got {0}")]
    #[diagnostic(
        code(config::invalid_server_budget),
        help("An aperiodic server with zero budget can never serve a request.")
    )]
    InvalidServerBudget(Tick),

    #[error("Server period must be positive, got {0}")]
    #[diagnostic(
        code(config::invalid_server_period),
        help("The server period controls budget replenishment and must be nonzero.")
    )]
    InvalidServerPeriod(Tick),

    #[error("Multilevel configuration needs at least one level")]
    #[diagnostic(
        code(config::empty_levels),
        help("Define at least one queue level for MLQ/MLFQ scheduling.")
    )]
    EmptyLevels,

    #[error("Level budgets configured without a reset interval")]
    #[diagnostic(
        code(config::missing_budget_reset),
        help("A budget-limited level starves forever unless an interval resets it.")
    )]
    MissingBudgetReset,
}

/// Per-descriptor validation errors, rejected at workload ingestion
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Task {0} has zero execution time")]
    #[diagnostic(
        code(validation::zero_execution_time),
        help("Every task must require at least one tick of work.")
    )]
    ZeroExecutionTime(TaskId),

    #[error("Periodic task {0} has zero relative deadline")]
    #[diagnostic(
        code(validation::zero_relative_deadline),
        help("A periodic task's relative deadline must be at least one tick.")
    )]
    ZeroRelativeDeadline(TaskId),

    #[error("Periodic task {0} has zero period")]
    #[diagnostic(
        code(validation::zero_period),
        help("A periodic task's period must be at least one tick.")
    )]
    ZeroPeriod(TaskId),

    #[error("Duplicate task id {0} in workload")]
    #[diagnostic(
        code(validation::duplicate_id),
        help("Task ids identify arena slots and must be unique within a workload.")
    )]
    DuplicateId(TaskId),

    #[error("Task {id} critical section exceeds execution time ({end} > {execution_time})")]
    #[diagnostic(
        code(validation::section_out_of_range),
        help("Critical sections are offsets into the task body and must fit inside it.")
    )]
    SectionOutOfRange {
        id: TaskId,
        end: Tick,
        execution_time: Tick,
    },
}

/// Fatal invariant violations, indicating an engine bug rather than bad input
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum InvariantViolation {
    #[error("Tasks {first} and {second} were both Running at tick {at}")]
    #[diagnostic(
        code(invariant::overlapping_execution),
        help("The single-core contract allows at most one Running task per instant.")
    )]
    OverlappingExecution {
        first: TaskId,
        second: TaskId,
        at: Tick,
    },

    #[error("Task {id} remaining time would underflow at tick {at}")]
    #[diagnostic(
        code(invariant::remaining_underflow),
        help("remaining_time decreases monotonically and reaches zero exactly at completion.")
    )]
    RemainingUnderflow { id: TaskId, at: Tick },

    #[error("Circular wait detected under PCP involving task {id} at tick {at}")]
    #[diagnostic(
        code(invariant::circular_wait),
        help("The ceiling protocol makes deadlock impossible; a cycle means the engine is broken.")
    )]
    CircularWait { id: TaskId, at: Tick },

    #[error("Task {id} dispatched before its arrival at tick {at}")]
    #[diagnostic(
        code(invariant::premature_dispatch),
        help("No task may execute before its arrival time.")
    )]
    PrematureDispatch { id: TaskId, at: Tick },
}

/// Top-level simulation error
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SimError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invariant(#[from] InvariantViolation),
}
