//! Repository Traits - The "Ports" of Hexagonal Architecture
//!
//! These traits define HOW the domain wants to persist data,
//! but NOT how it's actually done. That's the adapter's job.
//!
//! ```text
//! Domain Layer          │  Adapter Layer
//! ──────────────────────┼────────────────────────
//! trait AgentRepository │  InMemoryAgentRepository
//!   fn save()           │  (document store)
//!   fn resolve()        │
//! ```

pub mod agent_repository;
pub mod objective_repository;
pub mod stats_repository;
