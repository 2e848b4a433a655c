//! Statement-level retry gating (§4.5).
//!
//! These are synchronous predicates, kept separate from the `on…Error` mutators in
//! [`super::TxnRouter`] (design note, §9): a caller checks a predicate, and only then commits to
//! the corresponding mutation.

/// Commands idempotent enough, under transactional semantics, to retry past a stale shard or
/// database version error even when they are not the transaction's first statement. Writes via
/// aggregation pipelines are disallowed inside a transaction, so these are safe regardless of
/// statement position.
const IDEMPOTENT_COMMANDS: [&str; 5] = ["aggregate", "distinct", "find", "getMore", "killCursors"];

/// Whether a stale shard/database routing error on `command_name` may be silently retried,
/// given whether this is the transaction's first statement and whether the feature gate is on
/// (§4.5).
pub fn can_continue_on_stale_shard_or_db_error(
    gate_enabled: bool,
    command_name: &str,
    is_first_statement: bool,
) -> bool {
    gate_enabled && (is_first_statement || IDEMPOTENT_COMMANDS.contains(&command_name))
}

/// Whether a snapshot-unavailable error may be silently retried: the feature gate is on and the
/// snapshot timestamp has not yet been fixed to an earlier statement.
pub fn can_continue_on_snapshot_error(gate_enabled: bool, at_cluster_time_can_change: bool) -> bool {
    gate_enabled && at_cluster_time_can_change
}

/// View-resolution errors are always retryable (§4.5): unlike the other two causes, resolving a
/// view never depends on a feature gate or statement position.
pub fn can_continue_on_view_resolution_error() -> bool {
    true
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stale_shard_retry_allowed_on_first_statement_regardless_of_command() {
        assert!(can_continue_on_stale_shard_or_db_error(true, "insert", true));
    }

    #[test]
    fn stale_shard_retry_requires_idempotent_command_past_first_statement() {
        assert!(!can_continue_on_stale_shard_or_db_error(true, "insert", false));
        assert!(can_continue_on_stale_shard_or_db_error(true, "find", false));
    }

    #[test]
    fn stale_shard_retry_respects_feature_gate() {
        assert!(!can_continue_on_stale_shard_or_db_error(false, "find", true));
    }

    #[test]
    fn snapshot_retry_requires_gate_and_changeable_time() {
        assert!(can_continue_on_snapshot_error(true, true));
        assert!(!can_continue_on_snapshot_error(true, false));
        assert!(!can_continue_on_snapshot_error(false, true));
    }

    #[test]
    fn view_resolution_retry_is_unconditional() {
        assert!(can_continue_on_view_resolution_error());
    }
}
