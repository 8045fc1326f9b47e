//! Executes a creation plan entry by entry.

mod executor;

pub use executor::{ExecutionError, Executor, InvariantViolation};
