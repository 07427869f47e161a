//! Domain Services - Business logic that doesn't belong to a single entity
//!
//! Services operate on multiple entities and contain the "verbs" of the domain.

pub mod delta_applier;
pub mod impact;
pub mod objective_tracker;
pub mod score_engine;
