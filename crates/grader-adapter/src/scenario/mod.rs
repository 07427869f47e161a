//! Scenario directories: level rules, agents and objectives

pub mod loader;

pub use loader::{Scenario, ScenarioLoader};
