//! The snapshot-timestamp holder (§4.2).

use crate::bson::Timestamp;

/// Tracks whether, and at what timestamp, a transaction running at read-concern `snapshot` has
/// pinned its `atClusterTime`.
///
/// A transaction's snapshot timestamp is selected lazily, on the statement that contacts the
/// first participant, and is immutable for the rest of the transaction's life (§4.2) — except
/// that, per `canChange`, the router is allowed to overwrite it while still processing the same
/// statement that selected it (covers a snapshot-unavailable retry picking a later snapshot
/// before any participant has actually used the first one).
#[derive(Clone, Copy, Debug, Default)]
pub struct AtClusterTime {
    time: Option<Timestamp>,
    stmt_id_selected_at: Option<u32>,
}

impl AtClusterTime {
    /// A holder with no timestamp selected yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a timestamp has been selected.
    pub fn time_has_been_set(&self) -> bool {
        self.time.is_some()
    }

    /// The selected timestamp, if any.
    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    /// Whether the timestamp may still be overwritten, given the statement currently in
    /// progress: true if nothing has been selected yet, or if the prior selection happened on
    /// this very statement.
    pub fn can_change(&self, latest_stmt_id: u32) -> bool {
        match self.stmt_id_selected_at {
            None => true,
            Some(selected_at) => selected_at == latest_stmt_id,
        }
    }

    /// Records `time` as the snapshot timestamp, selected while processing `stmt_id`.
    pub fn set(&mut self, time: Timestamp, stmt_id: u32) {
        self.time = Some(time);
        self.stmt_id_selected_at = Some(stmt_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unset_holder_can_change_on_any_statement() {
        let holder = AtClusterTime::new();
        assert!(!holder.time_has_been_set());
        assert!(holder.can_change(0));
        assert!(holder.can_change(7));
    }

    #[test]
    fn set_holder_can_only_change_on_the_selecting_statement() {
        let mut holder = AtClusterTime::new();
        holder.set(Timestamp { time: 10, increment: 1 }, 3);
        assert!(holder.can_change(3));
        assert!(!holder.can_change(4));
        assert_eq!(holder.time(), Some(Timestamp { time: 10, increment: 1 }));
    }

    #[test]
    fn can_overwrite_within_the_same_statement() {
        let mut holder = AtClusterTime::new();
        holder.set(Timestamp { time: 10, increment: 1 }, 3);
        holder.set(Timestamp { time: 20, increment: 0 }, 3);
        assert_eq!(holder.time(), Some(Timestamp { time: 20, increment: 0 }));
    }
}
