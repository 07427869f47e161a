//! Persistence Adapters - Repository implementations
//!
//! These implement the repository traits from grader-domain.

pub mod in_memory;

pub use in_memory::{InMemoryAgentRepository, InMemoryObjectiveRepository, InMemoryStatsRepository};
