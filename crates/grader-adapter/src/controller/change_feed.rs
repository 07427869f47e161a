//! Change feed consumer - NDJSON change records into the pending queue
//!
//! One JSON object per line:
//! `{"op": "insert", "collection": "comments", "document": {...}}`.
//! Blank lines are skipped, malformed lines are logged and skipped.

use grader_domain::{AgentRepository, ObjectiveRepository, StatsRepository};
use grader_usecase::{ChangeRecord, GradingEngine};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Anything that accepts change records
pub trait ChangeSink {
    /// Returns how many actions were queued
    fn ingest(&self, records: &[ChangeRecord]) -> usize;
}

impl<A, O, S> ChangeSink for GradingEngine<A, O, S>
where
    A: AgentRepository + Clone + Send + 'static,
    O: ObjectiveRepository + Clone + Send + 'static,
    S: StatsRepository + Send + 'static,
{
    fn ingest(&self, records: &[ChangeRecord]) -> usize {
        GradingEngine::ingest(self, records)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub records: usize,
    pub malformed: usize,
    pub queued: usize,
}

/// Read the feed to the end
pub async fn consume<R, K>(reader: R, sink: &K) -> std::io::Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
    K: ChangeSink + ?Sized,
{
    let mut stats = FeedStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<ChangeRecord>(line) {
            Ok(record) => {
                stats.records += 1;
                let queued = sink.ingest(std::slice::from_ref(&record));
                stats.queued += queued;
                debug!(line = line_no, op = %record.op, collection = %record.collection, queued, "Change record");
            }
            Err(err) => {
                stats.malformed += 1;
                warn!(line = line_no, error = %err, "Skipping malformed change record");
            }
        }
    }

    info!(
        records = stats.records,
        malformed = stats.malformed,
        queued = stats.queued,
        "Change feed finished"
    );
    Ok(stats)
}
