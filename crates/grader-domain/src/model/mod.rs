//! Domain Models - The vocabulary of the grader
//!
//! These types represent the "Ubiquitous Language" of the simulation.
//! Every name here should match how we talk about the system.

pub mod action;
pub mod agent;
pub mod attribute;
pub mod category;
pub mod objective;
pub mod score;
pub mod session;
