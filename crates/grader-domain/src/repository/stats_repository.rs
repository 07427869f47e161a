//! Stats Repository - Archive of published score snapshots
//!
//! Write-mostly. Scoring never reads from here.

use crate::model::score::ScoreSnapshot;
use crate::model::session::Timestamp;
use crate::repository::agent_repository::RepositoryError;

/// A snapshot together with when it was published
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub recorded_at: Timestamp,
    pub snapshot: ScoreSnapshot,
}

/// Stats Repository Trait
///
/// This is a PORT in hexagonal architecture.
pub trait StatsRepository {
    /// Append a snapshot
    fn archive(&mut self, record: SnapshotRecord) -> Result<(), RepositoryError>;

    /// Number of archived snapshots
    fn count(&self) -> Result<usize, RepositoryError>;

    /// Up to `limit` most recent snapshots, newest first
    fn recent(&self, limit: usize) -> Result<Vec<SnapshotRecord>, RepositoryError>;
}
