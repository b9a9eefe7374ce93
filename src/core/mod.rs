/*!
 * Core Module
 * Shared types and error handling for the simulation engine
 */

pub mod errors;
pub mod types;

pub use errors::{ConfigError, InvariantViolation, SimError, ValidationError};
pub use types::{Priority, SimResult, TaskId, Tick};
