//! Inbound adapters

pub mod change_feed;

pub use change_feed::{consume, ChangeSink, FeedStats};
