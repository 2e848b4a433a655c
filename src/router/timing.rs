//! Wall-clock bookkeeping for the slow-transaction log (§4.9).

use std::time::{Duration, Instant};

/// A source of monotonic time, abstracted so tests can drive it without sleeping.
pub trait TickSource: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// A [`TickSource`] backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTickSource;

impl TickSource for SystemTickSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Tracks total, active, and commit-phase duration for a single transaction's lifetime (§4.9).
///
/// "Active" time excludes the gaps between statements — the router only counts time while a
/// statement or the commit/abort path is actually in progress, matching the driver's slow
/// operation log distinguishing wall-clock time from time the session spent checked out.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimingStats {
    start: Option<Instant>,
    end: Option<Instant>,
    commit_start: Option<Instant>,
    active_since: Option<Instant>,
    active_accum: Duration,
}

impl TimingStats {
    /// A stats tracker with nothing recorded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all bookkeeping and marks the transaction as started and active, as of `tick`.
    pub fn reset(&mut self, tick: &dyn TickSource) {
        let now = tick.now();
        self.start = Some(now);
        self.end = None;
        self.commit_start = None;
        self.active_since = Some(now);
        self.active_accum = Duration::ZERO;
    }

    /// Marks the start of an active span (a statement, or the commit/abort path), if one isn't
    /// already open.
    pub fn mark_active(&mut self, tick: &dyn TickSource) {
        if self.active_since.is_none() {
            self.active_since = Some(tick.now());
        }
    }

    /// Closes the currently open active span, folding its duration into the running total.
    pub fn mark_inactive(&mut self, tick: &dyn TickSource) {
        if let Some(since) = self.active_since.take() {
            self.active_accum += tick.now().saturating_duration_since(since);
        }
    }

    /// Records the start of the commit or abort path.
    pub fn mark_commit_started(&mut self, tick: &dyn TickSource) {
        self.mark_active(tick);
        self.commit_start = Some(tick.now());
    }

    /// Marks the transaction as finished, closing any open active span.
    pub fn mark_ended(&mut self, tick: &dyn TickSource) {
        self.mark_inactive(tick);
        self.end = Some(tick.now());
    }

    /// Total wall-clock duration since `reset`, to `mark_ended` or now if still open.
    pub fn total_duration(&self, tick: &dyn TickSource) -> Duration {
        let start = match self.start {
            Some(s) => s,
            None => return Duration::ZERO,
        };
        self.end.unwrap_or_else(|| tick.now()).saturating_duration_since(start)
    }

    /// Accumulated active duration, including any currently open span.
    pub fn active_duration(&self, tick: &dyn TickSource) -> Duration {
        let open = self
            .active_since
            .map(|since| tick.now().saturating_duration_since(since))
            .unwrap_or(Duration::ZERO);
        self.active_accum + open
    }

    /// Duration spent in the commit/abort path, if it has started.
    pub fn commit_duration(&self, tick: &dyn TickSource) -> Option<Duration> {
        let commit_start = self.commit_start?;
        Some(self.end.unwrap_or_else(|| tick.now()).saturating_duration_since(commit_start))
    }

    /// Whether the commit path has started but the transaction has not yet been marked ended
    /// (§4.7): the outcome is unknown, so callers must not finalize the lifecycle.
    pub fn commit_started_and_open(&self) -> bool {
        self.commit_start.is_some() && self.end.is_none()
    }
}


#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{fake::FakeTickSource, *};

    #[test]
    fn total_duration_tracks_reset_to_mark_ended() {
        let tick = FakeTickSource::new();
        let mut stats = TimingStats::new();
        stats.reset(&tick);
        tick.advance(Duration::from_millis(100));
        stats.mark_ended(&tick);
        assert_eq!(stats.total_duration(&tick), Duration::from_millis(100));
    }

    #[test]
    fn active_duration_excludes_gaps_between_statements() {
        let tick = FakeTickSource::new();
        let mut stats = TimingStats::new();
        stats.reset(&tick);
        tick.advance(Duration::from_millis(10));
        stats.mark_inactive(&tick);
        tick.advance(Duration::from_millis(900)); // idle gap between statements
        stats.mark_active(&tick);
        tick.advance(Duration::from_millis(20));
        stats.mark_ended(&tick);
        assert_eq!(stats.active_duration(&tick), Duration::from_millis(30));
        assert_eq!(stats.total_duration(&tick), Duration::from_millis(930));
    }

    #[test]
    fn commit_duration_is_none_until_commit_starts() {
        let tick = FakeTickSource::new();
        let mut stats = TimingStats::new();
        stats.reset(&tick);
        assert!(stats.commit_duration(&tick).is_none());
        tick.advance(Duration::from_millis(5));
        stats.mark_commit_started(&tick);
        tick.advance(Duration::from_millis(15));
        stats.mark_ended(&tick);
        assert_eq!(stats.commit_duration(&tick), Some(Duration::from_millis(15)));
    }

    #[test]
    fn commit_started_and_open_until_ended() {
        let tick = FakeTickSource::new();
        let mut stats = TimingStats::new();
        stats.reset(&tick);
        assert!(!stats.commit_started_and_open());
        stats.mark_commit_started(&tick);
        assert!(stats.commit_started_and_open());
        stats.mark_ended(&tick);
        assert!(!stats.commit_started_and_open());
    }
}
