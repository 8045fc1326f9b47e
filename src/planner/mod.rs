//! Turns declared entries into an ordered, conflict-free creation plan.

mod creation_plan;

pub use creation_plan::{CreationPlan, PlanError};
