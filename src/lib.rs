#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::cast_possible_truncation)]
#![warn(clippy::cast_possible_wrap)]
#![cfg_attr(
    feature = "cargo-clippy",
    allow(
        clippy::unreadable_literal,
        clippy::cognitive_complexity,
        clippy::float_cmp,
        clippy::match_like_matches_macro,
        clippy::derive_partial_eq_without_eq
    )
)]

pub use ::bson;

pub mod clock;
pub mod concern;
pub mod config;
pub mod error;
pub mod metrics;
pub mod router;
pub mod transport;

pub use router::TxnRouter;

/// A boxed future, used at the `async fn`-in-trait seam ([`transport::ShardTransport`]) that
/// this crate does not pull in an `async_trait`-style macro dependency for.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
