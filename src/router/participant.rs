//! Per-shard participant bookkeeping (§3, §4.3).

use crate::{bson::Timestamp, concern::ReadConcern, transport::ShardId};

/// The tri-state the router tracks for whether a participant has performed a write (§4.4).
///
/// Transitions out of `Unset` are permitted in either direction. Past that, only one direction is
/// forbidden: a participant that has reported `NotReadOnly` can never later report `ReadOnly` (a
/// shard that wrote cannot retroactively claim it didn't) — see [`ReadOnly::observe`]. The reverse
/// is allowed: a participant that looked read-only on an earlier statement may still write on a
/// later one. (See the design ledger for why this reading was chosen over a stricter
/// bidirectional rule.)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOnly {
    /// No response has yet told the router whether this participant wrote anything.
    Unset,
    /// The participant has reported, on every statement so far, that it performed no writes.
    ReadOnly,
    /// The participant has reported performing at least one write.
    NotReadOnly,
}

impl ReadOnly {
    /// Applies an observed `readOnly` marker from a participant's response, per the transition
    /// rules of §4.4. Only `NotReadOnly -> ReadOnly` is rejected; returns the corresponding
    /// protocol-violation error code (51113) in that case.
    pub(crate) fn observe(self, reported_read_only: bool) -> Result<Self, i32> {
        match (self, reported_read_only) {
            (ReadOnly::NotReadOnly, true) => {
                Err(crate::error::WRITE_SHARD_CLAIMED_READ_ONLY)
            }
            (_, true) => Ok(ReadOnly::ReadOnly),
            (_, false) => Ok(ReadOnly::NotReadOnly),
        }
    }
}

/// The transaction-scoped options every participant is sent on its first contact (§3).
#[derive(Clone, Debug, PartialEq)]
pub struct SharedTransactionOptions {
    /// The transaction number the participant was contacted under.
    pub txn_number: i64,
    /// The read-concern frozen for the transaction's lifetime.
    pub read_concern: ReadConcern,
    /// The pinned snapshot timestamp, if the transaction uses read-concern snapshot and one had
    /// already been selected when this participant was created.
    pub at_cluster_time: Option<Timestamp>,
}

/// A shard the router has contacted for the current transaction (§3).
#[derive(Clone, Debug)]
pub struct Participant {
    /// True iff this is the first participant added to the transaction (§4.3).
    pub is_coordinator: bool,
    /// The participant's current read-only status.
    pub read_only: ReadOnly,
    /// The statement id in effect when this participant was first contacted.
    pub stmt_id_created_at: u32,
    /// Options shared with this participant at creation time, frozen thereafter.
    pub shared_options: SharedTransactionOptions,
}

impl Participant {
    pub(crate) fn new(
        is_coordinator: bool,
        stmt_id_created_at: u32,
        shared_options: SharedTransactionOptions,
    ) -> Self {
        Self {
            is_coordinator,
            read_only: ReadOnly::Unset,
            stmt_id_created_at,
            shared_options,
        }
    }

    /// Whether this participant was first contacted on the statement currently in progress, and
    /// is therefore eligible for removal on statement-level retry (§4.5, "pending participant").
    pub fn is_pending(&self, latest_stmt_id: u32) -> bool {
        self.stmt_id_created_at == latest_stmt_id
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_only_transitions_out_of_unset_in_either_direction() {
        assert_eq!(ReadOnly::Unset.observe(true), Ok(ReadOnly::ReadOnly));
        assert_eq!(ReadOnly::Unset.observe(false), Ok(ReadOnly::NotReadOnly));
    }

    #[test]
    fn read_only_repeated_true_is_a_no_op() {
        assert_eq!(ReadOnly::ReadOnly.observe(true), Ok(ReadOnly::ReadOnly));
    }

    #[test]
    fn not_read_only_can_never_become_read_only_again() {
        assert_eq!(
            ReadOnly::NotReadOnly.observe(true),
            Err(crate::error::WRITE_SHARD_CLAIMED_READ_ONLY)
        );
    }

    #[test]
    fn read_only_can_still_transition_to_not_read_only() {
        // A participant that looked read-only on an earlier statement can still turn out to
        // have written on a later one; only the reverse is a protocol violation (§4.4).
        assert_eq!(ReadOnly::ReadOnly.observe(false), Ok(ReadOnly::NotReadOnly));
    }
}
