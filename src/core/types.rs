/*!
 * Core Types
 * Common types used across the simulation engine
 */

/// Simulation clock value, in abstract ticks
pub type Tick = u64;

/// Task identifier, stable across a run
pub type TaskId = u32;

/// Priority level (0-255, smaller = more urgent)
pub type Priority = u8;

/// Resource identifier for the mutual-exclusion protocols
pub type ResourceId = u32;

/// Common result type for simulation operations
pub type SimResult<T> = Result<T, super::errors::SimError>;
