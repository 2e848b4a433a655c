//! The metrics-sink collaborator (§1, §4.1). Out of scope for this crate beyond the trait
//! boundary and a callback-based handle, mirroring the driver ecosystem's event-handler pattern
//! of accepting either an `Fn` callback or a channel sender.

use std::{fmt, sync::Arc};

/// A counter-style event the router emits over the lifetime of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxnMetric {
    /// Emitted by `beginOrContinue` whenever it resets router state for a new `txnNumber`,
    /// including the commit-recovery path (§4.1).
    TransactionStarted,
    /// Emitted once `commitTransaction` observes an OK top-level and write-concern status.
    TransactionCommitted,
    /// Emitted once a transaction is finalized as aborted, explicitly or implicitly.
    TransactionAborted,
}

/// A destination for [`TxnMetric`] events.
pub trait MetricsSink: Send + Sync {
    /// Record a single event.
    fn record(&self, event: TxnMetric);
}

/// A [`MetricsSink`] that discards every event; the default for a router that wasn't given one.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _event: TxnMetric) {}
}

/// A [`MetricsSink`] backed by an arbitrary closure, for wiring into an existing metrics library
/// without implementing the trait directly.
#[derive(Clone)]
pub struct CallbackMetricsSink(Arc<dyn Fn(TxnMetric) + Send + Sync>);

impl CallbackMetricsSink {
    /// Wraps `f` as a [`MetricsSink`].
    pub fn new(f: impl Fn(TxnMetric) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CallbackMetricsSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackMetricsSink").finish_non_exhaustive()
    }
}

impl MetricsSink for CallbackMetricsSink {
    fn record(&self, event: TxnMetric) {
        (self.0)(event)
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn callback_sink_forwards_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sink = CallbackMetricsSink::new(move |event| seen_clone.lock().unwrap().push(event));
        sink.record(TxnMetric::TransactionStarted);
        assert_eq!(*seen.lock().unwrap(), vec![TxnMetric::TransactionStarted]);
    }

    #[test]
    fn noop_sink_accepts_everything() {
        NoopMetricsSink.record(TxnMetric::TransactionCommitted);
    }
}
