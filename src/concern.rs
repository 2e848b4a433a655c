//! Contains the types for read concerns and write concerns.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::bson::Timestamp;

/// Specifies the consistency and isolation properties of read operations against a transaction's
/// participants.
///
/// See the documentation [here](https://www.mongodb.com/docs/manual/reference/read-concern/) for
/// more information about read concerns.
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ReadConcern {
    /// The level of the read concern.
    pub level: ReadConcernLevel,
}

/// An internal-only read concern type that allows specification of `atClusterTime` and
/// `afterClusterTime` alongside the level, matching the shape the router attaches to outgoing
/// commands (§4.3).
#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[serde(rename = "readConcern")]
pub struct ReadConcernInternal {
    /// The level of the read concern.
    pub level: Option<ReadConcernLevel>,

    /// The snapshot read timestamp, set once the router has pinned one (§4.2).
    pub at_cluster_time: Option<Timestamp>,

    /// The causal-consistency floor supplied by the client; overwritten by `at_cluster_time` when
    /// a snapshot has been pinned (§4.3).
    pub after_cluster_time: Option<Timestamp>,
}

impl ReadConcern {
    /// Creates a read concern with level "majority".
    pub fn majority() -> Self {
        ReadConcernLevel::Majority.into()
    }

    /// Creates a read concern with level "local".
    pub fn local() -> Self {
        ReadConcernLevel::Local.into()
    }

    /// Creates a read concern with level "snapshot". Required for a transaction to pin an
    /// `atClusterTime` (§3).
    pub fn snapshot() -> Self {
        ReadConcernLevel::Snapshot.into()
    }

    /// Whether this read concern's level is one of the three the router accepts on a `start`
    /// statement (§4.1).
    pub(crate) fn is_valid_for_transaction_start(&self) -> bool {
        matches!(
            self.level,
            ReadConcernLevel::Snapshot | ReadConcernLevel::Majority | ReadConcernLevel::Local
        )
    }
}

impl From<ReadConcern> for ReadConcernInternal {
    fn from(rc: ReadConcern) -> Self {
        ReadConcernInternal {
            level: Some(rc.level),
            at_cluster_time: None,
            after_cluster_time: None,
        }
    }
}

impl From<ReadConcernLevel> for ReadConcern {
    fn from(level: ReadConcernLevel) -> Self {
        Self { level }
    }
}

/// Specifies the level of consistency and isolation of a [`ReadConcern`].
///
/// See the documentation [here](https://www.mongodb.com/docs/manual/reference/read-concern/) for
/// more information about read concerns.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ReadConcernLevel {
    /// See the documentation [here](https://www.mongodb.com/docs/manual/reference/read-concern-local/).
    Local,

    /// See the documentation [here](https://www.mongodb.com/docs/manual/reference/read-concern-majority/).
    Majority,

    /// See the documentation [here](https://www.mongodb.com/docs/manual/reference/read-concern-linearizable/).
    Linearizable,

    /// See the documentation [here](https://www.mongodb.com/docs/manual/reference/read-concern-available/).
    Available,

    /// See the documentation [here](https://www.mongodb.com/docs/manual/reference/read-concern-snapshot/).
    ///
    /// The only level under which the router pins an `atClusterTime` (§4.2).
    Snapshot,

    /// A custom read concern level, for forwards compatibility with levels this crate does not
    /// yet know about.
    Custom(String),
}

impl ReadConcernLevel {
    pub(crate) fn from_str(s: &str) -> Self {
        match s {
            "local" => ReadConcernLevel::Local,
            "majority" => ReadConcernLevel::Majority,
            "linearizable" => ReadConcernLevel::Linearizable,
            "available" => ReadConcernLevel::Available,
            "snapshot" => ReadConcernLevel::Snapshot,
            s => ReadConcernLevel::Custom(s.to_string()),
        }
    }

    /// Gets the string representation of the `ReadConcernLevel`.
    pub fn as_str(&self) -> &str {
        match self {
            ReadConcernLevel::Local => "local",
            ReadConcernLevel::Majority => "majority",
            ReadConcernLevel::Linearizable => "linearizable",
            ReadConcernLevel::Available => "available",
            ReadConcernLevel::Snapshot => "snapshot",
            ReadConcernLevel::Custom(ref s) => s,
        }
    }
}

impl<'de> Deserialize<'de> for ReadConcernLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ReadConcernLevel::from_str(&s))
    }
}

impl Serialize for ReadConcernLevel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

/// Specifies the level of acknowledgement requested from shards for the commit/abort commands
/// the router sends.
///
/// See the documentation [here](https://www.mongodb.com/docs/manual/reference/write-concern/) for
/// more information about write concerns.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct WriteConcern {
    /// Requests acknowledgement that the operation has propagated to a specific number or variety
    /// of shard replica set members.
    pub w: Option<Acknowledgment>,

    /// A time limit for the write concern. If the operation has not propagated to the requested
    /// level within the limit, the shard returns a write-concern error.
    #[serde(rename = "wtimeout", alias = "wtimeoutMS")]
    #[serde(serialize_with = "serialize_duration_option_as_millis")]
    #[serde(deserialize_with = "deserialize_duration_option_from_millis")]
    #[serde(default)]
    pub w_timeout: Option<Duration>,

    /// Requests acknowledgement that the operation has propagated to the on-disk journal.
    #[serde(rename = "j", alias = "journal")]
    pub journal: Option<bool>,
}

/// The type of the `w` field in a [`WriteConcern`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Acknowledgment {
    /// Requires acknowledgement that the write has reached the specified number of nodes.
    Nodes(u32),

    /// Requires acknowledgement that the write has reached a majority of nodes.
    Majority,

    /// A custom write concern tag set.
    Custom(String),
}

impl Serialize for Acknowledgment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Acknowledgment::Majority => serializer.serialize_str("majority"),
            Acknowledgment::Nodes(n) => serializer.serialize_u32(*n),
            Acknowledgment::Custom(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for Acknowledgment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IntOrString {
            Int(u32),
            String(String),
        }
        match IntOrString::deserialize(deserializer)? {
            IntOrString::String(s) => Ok(s.into()),
            IntOrString::Int(i) => Ok(i.into()),
        }
    }
}

impl From<u32> for Acknowledgment {
    fn from(i: u32) -> Self {
        Acknowledgment::Nodes(i)
    }
}

impl From<&str> for Acknowledgment {
    fn from(s: &str) -> Self {
        if s == "majority" {
            Acknowledgment::Majority
        } else {
            Acknowledgment::Custom(s.to_string())
        }
    }
}

impl From<String> for Acknowledgment {
    fn from(s: String) -> Self {
        Acknowledgment::from(s.as_str())
    }
}

impl WriteConcern {
    /// A `WriteConcern` requesting [`Acknowledgment::Majority`].
    pub fn majority() -> Self {
        Acknowledgment::Majority.into()
    }

    pub(crate) fn is_acknowledged(&self) -> bool {
        self.w != Some(Acknowledgment::Nodes(0)) || self.journal == Some(true)
    }

    /// Whether the write concern was created with no values specified.
    pub fn is_empty(&self) -> bool {
        self.w.is_none() && self.w_timeout.is_none() && self.journal.is_none()
    }
}

impl From<Acknowledgment> for WriteConcern {
    fn from(w: Acknowledgment) -> Self {
        WriteConcern {
            w: Some(w),
            w_timeout: None,
            journal: None,
        }
    }
}

fn serialize_duration_option_as_millis<S: Serializer>(
    val: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match val {
        Some(duration) => serializer.serialize_i64(duration.as_millis() as i64),
        None => serializer.serialize_none(),
    }
}

fn deserialize_duration_option_from_millis<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = Option::<u64>::deserialize(deserializer)?;
    Ok(millis.map(Duration::from_millis))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn read_concern_levels_round_trip_through_as_str() {
        for level in [
            ReadConcernLevel::Local,
            ReadConcernLevel::Majority,
            ReadConcernLevel::Linearizable,
            ReadConcernLevel::Available,
            ReadConcernLevel::Snapshot,
        ] {
            assert_eq!(ReadConcernLevel::from_str(level.as_str()), level);
        }
    }

    #[test]
    fn only_snapshot_majority_local_are_valid_transaction_starts() {
        assert!(ReadConcern::snapshot().is_valid_for_transaction_start());
        assert!(ReadConcern::majority().is_valid_for_transaction_start());
        assert!(ReadConcern::local().is_valid_for_transaction_start());
        assert!(!ReadConcern::from(ReadConcernLevel::Available).is_valid_for_transaction_start());
    }

    #[test]
    fn write_concern_majority_is_acknowledged() {
        assert!(WriteConcern::majority().is_acknowledged());
        assert!(!WriteConcern::from(Acknowledgment::Nodes(0)).is_acknowledged());
    }
}
