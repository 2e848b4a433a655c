//! Structured diagnostics and the slow-transaction log (§4.9).

use std::time::Duration;

use crate::{
    bson::Timestamp,
    concern::ReadConcern,
    router::commit::CommitType,
    transport::ShardId,
};

/// A snapshot of a transaction's state, suitable for a monitoring dump or a slow-transaction
/// log line (§4.9).
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// The session this transaction belongs to.
    pub session_id: String,
    /// The transaction number the report was taken for.
    pub txn_number: i64,
    /// The read-concern the transaction started with.
    pub read_concern: Option<ReadConcern>,
    /// Every participant contacted so far, with its coordinator/read-only flags.
    pub participants: Vec<ParticipantReport>,
    /// The commit path selected, if commit has been initiated.
    pub commit_type: CommitType,
    /// The pinned snapshot timestamp, if one has been fixed.
    pub at_cluster_time: Option<Timestamp>,
    /// Total wall-clock duration since the transaction started.
    pub total_duration: Duration,
    /// Cumulative duration spent actively processing a statement or the commit/abort path.
    pub active_duration: Duration,
    /// `total_duration - active_duration`.
    pub inactive_duration: Duration,
    /// Duration spent in the commit path, if it has started.
    pub commit_duration: Option<Duration>,
}

/// A single participant's entry in a [`Report`].
#[derive(Clone, Debug, PartialEq)]
pub struct ParticipantReport {
    /// The shard id.
    pub shard_id: ShardId,
    /// Whether this participant is the coordinator.
    pub is_coordinator: bool,
    /// The participant's read-only status, rendered for display.
    pub read_only: &'static str,
}

impl Report {
    /// Whether this report's total duration exceeds `threshold`, the trigger for the
    /// slow-transaction log (§4.9).
    pub fn is_slow(&self, threshold: Duration) -> bool {
        self.total_duration > threshold
    }

    /// Emits this report as a single `tracing::warn!` event, mirroring the fields of the
    /// structured report (§4.9, ADDED).
    pub fn log_slow(&self) {
        tracing::warn!(
            session_id = %self.session_id,
            txn_number = self.txn_number,
            participants = self.participants.len(),
            commit_type = ?self.commit_type,
            total_duration_ms = self.total_duration.as_millis() as u64,
            active_duration_ms = self.active_duration.as_millis() as u64,
            inactive_duration_ms = self.inactive_duration.as_millis() as u64,
            commit_duration_ms = self.commit_duration.map(|d| d.as_millis() as u64),
            "slow transaction",
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn report(total: Duration) -> Report {
        Report {
            session_id: "s".to_string(),
            txn_number: 1,
            read_concern: None,
            participants: Vec::new(),
            commit_type: CommitType::NotInitiated,
            at_cluster_time: None,
            total_duration: total,
            active_duration: total,
            inactive_duration: Duration::ZERO,
            commit_duration: None,
        }
    }

    #[test]
    fn is_slow_compares_against_threshold() {
        assert!(report(Duration::from_millis(600)).is_slow(Duration::from_millis(500)));
        assert!(!report(Duration::from_millis(400)).is_slow(Duration::from_millis(500)));
    }
}
