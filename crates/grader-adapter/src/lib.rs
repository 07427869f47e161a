//! # Grader Adapter Layer
//!
//! External system integrations (Hexagonal Architecture adapters).
//!
//! ## Structure
//!
//! - `clock` - Wall clock and a manual clock for tests
//! - `controller/` - Inbound adapters (change feed)
//! - `gateway/` - Outbound adapters (classification service, event fan-out)
//! - `repository/` - In-memory store implementations
//! - `scenario/` - Level rules and populations from files

pub mod clock;
pub mod controller;
pub mod gateway;
pub mod repository;
pub mod scenario;

pub use clock::{ManualClock, SystemClock};
pub use controller::{consume, ChangeSink, FeedStats};
pub use gateway::{BroadcastPublisher, GatewayError, OpenAiClassificationService};
pub use repository::{InMemoryAgentRepository, InMemoryObjectiveRepository, InMemoryStatsRepository};
pub use scenario::{Scenario, ScenarioLoader};
