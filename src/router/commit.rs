//! Commit-path selection and command shaping (§4.6).
//!
//! Selection is a pure function of the participant set; it performs no I/O (design note, §9).

use crate::{
    bson::{doc, Document},
    error::{Error, ErrorKind, Result},
    router::participant::{Participant, ReadOnly},
    transport::ShardId,
};

/// Which of the four direct commit variants, or a hand-off, applies to the current transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitType {
    /// No `commitTransaction` has been attempted yet.
    NotInitiated,
    /// No participants were ever contacted; nothing to commit.
    NoShards,
    /// Exactly one participant.
    SingleShard,
    /// At least two participants, exactly one of which performed a write.
    SingleWriteShard,
    /// At least two participants, none of which performed a write.
    ReadOnly,
    /// At least two participants, at least two of which performed a write.
    TwoPhaseCommit,
    /// A fresh router picked up a bare `commit` statement and must recover the outcome through a
    /// client-supplied recovery token.
    RecoverWithToken,
}

/// Selects the commit path for the current participant set (§4.6), a pure function of
/// `isRecoveringCommit`, the participant count, and how many have written.
///
/// Fails with `NoSuchTransaction` if any participant is still `ReadOnly::Unset`: a prior
/// statement against it never completed successfully, so its state is unknown and committing
/// would be unsound.
pub fn select(is_recovering_commit: bool, participants: &[(&ShardId, &Participant)]) -> Result<CommitType> {
    if is_recovering_commit {
        return Ok(CommitType::RecoverWithToken);
    }
    if participants.is_empty() {
        return Ok(CommitType::NoShards);
    }
    if let Some((shard_id, _)) = participants.iter().find(|(_, p)| p.read_only == ReadOnly::Unset) {
        return Err(ErrorKind::NoSuchTransaction {
            message: format!(
                "participant {shard_id} never reported a statement outcome; its transaction state is unknown"
            ),
        }
        .into());
    }
    if participants.len() == 1 {
        return Ok(CommitType::SingleShard);
    }
    let write_count = participants
        .iter()
        .filter(|(_, p)| p.read_only == ReadOnly::NotReadOnly)
        .count();
    match write_count {
        0 => Ok(CommitType::ReadOnly),
        1 => Ok(CommitType::SingleWriteShard),
        _ => Ok(CommitType::TwoPhaseCommit),
    }
}

/// Builds a direct `commitTransaction` command for a single participant.
pub fn commit_command(txn_number: i64) -> Document {
    doc! {
        "commitTransaction": 1,
        "txnNumber": txn_number,
        "autocommit": false,
    }
}

/// Builds the coordinator hand-off command, carrying the explicit participant list (two-phase
/// commit) or an empty one (recovery-by-token, §4.6).
pub fn coordinate_commit_command(txn_number: i64, participants: &[ShardId]) -> Document {
    doc! {
        "coordinateCommitTransaction": 1,
        "participants": participants.iter().map(|s| doc! { "shardId": s.clone() }).collect::<Vec<_>>(),
        "txnNumber": txn_number,
        "autocommit": false,
    }
}

/// Classifies a commit attempt's outcome: `Ok(true)` for a successful commit, `Ok(false)` for a
/// non-retryable failure (caller should abort and record a cause), `Err` for an error whose
/// outcome is unknown and must not finalize the transaction's lifecycle (§4.6, §7).
pub fn classify_outcome(result: &Result<()>) -> CommitOutcome {
    match result {
        Ok(()) => CommitOutcome::Committed,
        Err(e) if e.is_unknown_commit_result() => CommitOutcome::Unknown,
        Err(_) => CommitOutcome::NonRetryableFailure,
    }
}

/// The three ways a commit attempt can resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The commit succeeded; the transaction's lifecycle is finalized as committed.
    Committed,
    /// The commit failed in a way the client may retry without knowing whether it was applied;
    /// the router does not finalize the transaction's lifecycle.
    Unknown,
    /// The commit failed in a way that is known not to have applied; the transaction is
    /// finalized as aborted.
    NonRetryableFailure,
}

/// Picks the first error out of a set of fan-out results, per the "first error wins, else last
/// response" rule shared by direct multi-shard commit and abort broadcasts (§4.6, §4.7).
pub fn first_error_or_last<T>(results: Vec<Result<T>>) -> Result<T> {
    let mut last = None;
    for result in results {
        match result {
            Err(e) => return Err(e),
            Ok(v) => last = Some(v),
        }
    }
    last.ok_or_else(|| {
        Error::from(ErrorKind::IllegalOperation {
            message: "commit fan-out produced no responses".to_string(),
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        concern::ReadConcern,
        router::participant::{Participant, SharedTransactionOptions},
    };

    fn participant(read_only: ReadOnly) -> Participant {
        let mut p = Participant::new(
            false,
            0,
            SharedTransactionOptions {
                txn_number: 1,
                read_concern: ReadConcern::snapshot(),
                at_cluster_time: None,
            },
        );
        p.read_only = read_only;
        p
    }

    #[test]
    fn recovering_commit_always_wins() {
        assert_eq!(select(true, &[]).unwrap(), CommitType::RecoverWithToken);
    }

    #[test]
    fn no_participants_is_no_shards() {
        assert_eq!(select(false, &[]).unwrap(), CommitType::NoShards);
    }

    #[test]
    fn single_participant_is_single_shard() {
        let a = "a".to_string();
        let p = participant(ReadOnly::ReadOnly);
        assert_eq!(select(false, &[(&a, &p)]).unwrap(), CommitType::SingleShard);
    }

    #[test]
    fn all_read_only_multi_is_read_only() {
        let (a, b) = ("a".to_string(), "b".to_string());
        let p = participant(ReadOnly::ReadOnly);
        assert_eq!(select(false, &[(&a, &p), (&b, &p)]).unwrap(), CommitType::ReadOnly);
    }

    #[test]
    fn exactly_one_write_is_single_write_shard() {
        let (a, b) = ("a".to_string(), "b".to_string());
        let ro = participant(ReadOnly::ReadOnly);
        let rw = participant(ReadOnly::NotReadOnly);
        assert_eq!(select(false, &[(&a, &ro), (&b, &rw)]).unwrap(), CommitType::SingleWriteShard);
    }

    #[test]
    fn two_or_more_writes_is_two_phase() {
        let (a, b) = ("a".to_string(), "b".to_string());
        let rw = participant(ReadOnly::NotReadOnly);
        assert_eq!(select(false, &[(&a, &rw), (&b, &rw)]).unwrap(), CommitType::TwoPhaseCommit);
    }

    #[test]
    fn any_unset_participant_fails_commit() {
        let (a, b) = ("a".to_string(), "b".to_string());
        let rw = participant(ReadOnly::NotReadOnly);
        let unset = participant(ReadOnly::Unset);
        let err = select(false, &[(&a, &rw), (&b, &unset)]).unwrap_err();
        assert!(matches!(err.kind.as_ref(), ErrorKind::NoSuchTransaction { .. }));
    }

    #[test]
    fn first_error_short_circuits() {
        let results: Vec<Result<i32>> = vec![
            Ok(1),
            Err(ErrorKind::IllegalOperation { message: "boom".into() }.into()),
            Ok(3),
        ];
        assert!(first_error_or_last(results).is_err());
    }

    #[test]
    fn no_errors_returns_last() {
        let results: Vec<Result<i32>> = vec![Ok(1), Ok(2), Ok(3)];
        assert_eq!(first_error_or_last(results).unwrap(), 3);
    }
}
