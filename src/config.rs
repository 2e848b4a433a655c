//! Operational configuration for the router, not specified by the distilled transaction-routing
//! contract but required to run it (§2.1).

use std::time::Duration;

use typed_builder::TypedBuilder;

/// Operational knobs for a [`crate::router::TxnRouter`].
///
/// Built with [`typed-builder`](https://crates.io/crates/typed-builder), matching the builder
/// pattern used throughout this crate's option structs.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(field_defaults(default))]
pub struct RouterConfig {
    /// Total transaction duration past which [`crate::router::reporter::Report`] is logged at
    /// `warn` level as a slow transaction (§4.9).
    #[builder(default = Duration::from_millis(500))]
    pub slow_transaction_threshold: Duration,

    /// Feature gate for the stale shard/database routing statement retry (§4.5).
    #[builder(default = true)]
    pub stale_routing_retry: bool,

    /// Feature gate for the snapshot-unavailable statement retry (§4.5).
    #[builder(default = true)]
    pub snapshot_retry: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_enable_both_retry_gates() {
        let config = RouterConfig::default();
        assert!(config.stale_routing_retry);
        assert!(config.snapshot_retry);
        assert_eq!(config.slow_transaction_threshold, Duration::from_millis(500));
    }
}
