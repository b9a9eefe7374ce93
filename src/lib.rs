/*!
 * schedlab
 * Deterministic CPU scheduling simulation and evaluation engine: a
 * discrete-event task model, pluggable batch policies, real-time
 * extensions with schedulability analysis, mutual-exclusion priority
 * protocols, and a metrics/benchmark layer.
 */

pub mod bench;
pub mod core;
pub mod driver;
pub mod engine;
pub mod metrics;
pub mod policy;
pub mod protocol;
pub mod rt;
pub mod task;

// Re-exports
pub use crate::core::{ConfigError, InvariantViolation, SimError, SimResult, ValidationError};
pub use bench::{run_comparison, standard_lineup, Comparison, ComparisonRow};
pub use engine::{run, RunOutcome, SchedCounters, Slice, Timeline};
pub use metrics::{build_report, MetricsConfig, Report, TaskRecord};
pub use policy::{AgingParams, MlfqConfig, MlqConfig, Policy, PolicyParams};
pub use protocol::{BlockingEvent, ProtocolKind, ProtocolOutcome, Resource};
pub use rt::{
    edf_test, rms_analysis, EdfTest, RmsAnalysis, RtAlgorithm, RtOutcome, RtSimConfig, RtTaskSpec,
    SchedulabilityWarning, ServerConfig, ServerKind,
};
pub use task::{Task, TaskSet, TaskSpec, TaskState};
