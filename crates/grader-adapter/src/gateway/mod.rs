//! Outbound adapters: the classification service and event fan-out

pub mod openai;
pub mod publisher;

pub use openai::{GatewayError, OpenAiClassificationService};
pub use publisher::BroadcastPublisher;
