//! The shard-transport collaborator (§1, §5): dispatches a decorated command to a shard and
//! gathers its response. Out of scope for this crate beyond the trait boundary and the in-memory
//! fake used by the scenario tests (§8).

use crate::{bson::Document, error::Result, BoxFuture};

/// Identifies a shard the router can contact. Shard ids are opaque, comparable, cloneable
/// strings; the shard registry (out of scope, §1) is responsible for resolving them to an
/// address.
pub type ShardId = String;

/// A shard's reply to a command the router sent it.
#[derive(Clone, Debug, Default)]
pub struct ParticipantResponse {
    /// The raw command reply document.
    pub body: Document,
    /// Whether the shard reports it performed no writes while executing this statement.
    /// `None` when the shard's reply carries no `readOnly` marker at all (§4.4).
    pub read_only: Option<bool>,
    /// Set when the shard's top-level command status was not OK.
    pub command_error: Option<crate::error::CommandError>,
    /// Set when the command otherwise succeeded but its write concern was not satisfied.
    pub write_concern_error: Option<crate::error::CommandError>,
}

impl ParticipantResponse {
    /// An OK response with no `readOnly` marker and no error.
    pub fn ok() -> Self {
        Self::default()
    }

    /// An OK response reporting the participant's read-only status.
    pub fn read_only(read_only: bool) -> Self {
        Self {
            read_only: Some(read_only),
            ..Self::default()
        }
    }

    /// Whether this response carries any error (top-level or write-concern).
    pub fn is_err(&self) -> bool {
        self.command_error.is_some() || self.write_concern_error.is_some()
    }

    pub(crate) fn into_result(self) -> Result<ParticipantResponse> {
        if let Some(err) = self.command_error.clone() {
            return Err(crate::error::ErrorKind::Command(err).into());
        }
        if let Some(err) = self.write_concern_error.clone() {
            return Err(crate::error::ErrorKind::WriteConcern(err).into());
        }
        Ok(self)
    }
}

/// Dispatches commands to shards and gathers their responses. Implemented by the transport layer
/// surrounding the router (out of scope, §1); all outgoing shard commands are suspension points
/// for the calling operation (§5).
pub trait ShardTransport: Send + Sync {
    /// Sends `command` to `shard` and returns its response. Transport-level failures (network
    /// errors, deadline expiry, cancellation) surface as `Err` and are treated by the router as
    /// commit-unknown or statement-dispatch failures depending on context (§7).
    fn send<'a>(&'a self, shard: &'a ShardId, command: Document) -> BoxFuture<'a, Result<ParticipantResponse>>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };

    use super::*;

    /// A scripted, in-memory [`ShardTransport`] for the scenario tests: each shard has a queue of
    /// canned responses, and every call is recorded for assertions.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        responses: Mutex<HashMap<ShardId, VecDeque<Result<ParticipantResponse>>>>,
        pub(crate) sent: Mutex<Vec<(ShardId, Document)>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn push_response(&self, shard: impl Into<ShardId>, response: Result<ParticipantResponse>) {
            self.responses
                .lock()
                .unwrap()
                .entry(shard.into())
                .or_default()
                .push_back(response);
        }

        pub(crate) fn sent_to(&self, shard: &str) -> Vec<Document> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(s, _)| s == shard)
                .map(|(_, cmd)| cmd.clone())
                .collect()
        }
    }

    impl ShardTransport for FakeTransport {
        fn send<'a>(
            &'a self,
            shard: &'a ShardId,
            command: Document,
        ) -> BoxFuture<'a, Result<ParticipantResponse>> {
            Box::pin(async move {
                self.sent
                    .lock()
                    .unwrap()
                    .push((shard.clone(), command.clone()));
                self.responses
                    .lock()
                    .unwrap()
                    .get_mut(shard)
                    .and_then(|q| q.pop_front())
                    .unwrap_or_else(|| Ok(ParticipantResponse::ok()))
            })
        }
    }
}
