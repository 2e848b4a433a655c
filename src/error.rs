//! Contains the `Error` and `Result` types used throughout the router.

use std::{collections::HashSet, fmt, sync::Arc};

use thiserror::Error;

/// Error codes for the two shard-protocol violations the router treats as fatal assertions.
pub const PARTICIPANT_RESPONDED_WITHOUT_READ_ONLY: i32 = 51112;
pub const WRITE_SHARD_CLAIMED_READ_ONLY: i32 = 51113;

const RETRYABLE_WRITE_CODES: [i32; 12] = [
    11600, 11602, 10107, 13435, 13436, 189, 91, 7, 6, 89, 9001, 262,
];
const EXCEEDED_TIME_LIMIT_CODE: i32 = 50;
const TRANSACTION_TOO_OLD_CODE: i32 = 225;

/// Retryable write error label. Mirrors the label the driver ecosystem uses to tell callers a
/// failed write may be safely retried.
pub const RETRYABLE_WRITE_ERROR: &str = "RetryableWriteError";
/// Transient transaction error label: the whole transaction, not just the last statement, may be
/// retried from the start.
pub const TRANSIENT_TRANSACTION_ERROR: &str = "TransientTransactionError";
/// Unknown transaction commit result label: the caller does not know whether the commit was
/// applied and should retry `commitTransaction` rather than treat the transaction as aborted.
pub const UNKNOWN_TRANSACTION_COMMIT_RESULT: &str = "UnknownTransactionCommitResult";

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error produced by the router. The inner [`ErrorKind`] is wrapped in an `Arc` so that
/// errors collected from concurrent participant fan-outs can be cloned cheaply.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The specific kind of error that occurred.
    pub kind: Arc<ErrorKind>,
    labels: HashSet<String>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Arc::new(kind),
            labels: HashSet::new(),
        }
    }

    /// Returns the labels attached to this error.
    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }

    /// Whether this error carries the given label.
    pub fn contains_label<T: AsRef<str>>(&self, label: T) -> bool {
        self.labels.contains(label.as_ref())
    }

    pub(crate) fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    /// The bare command-error code reported by a shard, if this error wraps one.
    pub fn code(&self) -> Option<i32> {
        match self.kind.as_ref() {
            ErrorKind::Command(c) => Some(c.code),
            ErrorKind::WriteConcern(c) => Some(c.code),
            _ => None,
        }
    }

    /// Whether this error should cause `commitTransaction` to report the commit outcome as
    /// unknown rather than finalizing the transaction as aborted (§4.6, §7).
    pub fn is_unknown_commit_result(&self) -> bool {
        if matches!(self.kind.as_ref(), ErrorKind::TransactionTooOld) {
            return true;
        }
        if matches!(self.kind.as_ref(), ErrorKind::WriteConcern(_)) {
            return true;
        }
        match self.code() {
            Some(code) => {
                RETRYABLE_WRITE_CODES.contains(&code)
                    || code == EXCEEDED_TIME_LIMIT_CODE
                    || code == TRANSACTION_TOO_OLD_CODE
            }
            None => false,
        }
    }

    pub(crate) fn participant(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParticipantProtocolViolation {
            code,
            message: message.into(),
        })
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

/// The specific type of error encountered.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The transaction number carried by the statement is older than the one the router has on
    /// record for this session (§4.1).
    #[error("TransactionTooOld: transaction has already moved past the requested txnNumber")]
    TransactionTooOld,

    /// A `start` statement arrived for a `txnNumber` that is already in progress.
    #[error(
        "ConflictingOperationInProgress: a transaction is already in progress for this txnNumber"
    )]
    ConflictingOperationInProgress,

    /// The router has no record of the requested transaction.
    #[error("NoSuchTransaction: {message}")]
    NoSuchTransaction {
        /// Human-readable detail.
        message: String,
    },

    /// A statement supplied options the router cannot honor (e.g. a read-concern on a
    /// `continue` statement, or an unsupported read-concern level on `start`).
    #[error("InvalidOptions: {message}")]
    InvalidOptions {
        /// Human-readable detail.
        message: String,
    },

    /// An operation was requested that is not legal in the router's current state.
    #[error("IllegalOperation: {message}")]
    IllegalOperation {
        /// Human-readable detail.
        message: String,
    },

    /// A shard violated the read-only tri-state protocol (§4.4). Fatal: codes 51112/51113.
    #[error("participant protocol violation ({code}): {message}")]
    ParticipantProtocolViolation {
        /// 51112 or 51113, mirroring the historical assertion codes this is modeled on.
        code: i32,
        /// Human-readable detail.
        message: String,
    },

    /// An opaque command-level error reported by a shard or the coordinator.
    #[error("command error {0}")]
    Command(CommandError),

    /// A write-concern error reported alongside an otherwise-successful command.
    #[error("write concern error {0}")]
    WriteConcern(CommandError),

    /// The transport used to reach a shard failed (network error, timeout, cancellation).
    #[error("transport error contacting shard {shard_id}: {message}")]
    Transport {
        /// The shard that could not be reached.
        shard_id: String,
        /// Human-readable detail.
        message: String,
    },
}

/// A command error as reported by a shard, with just enough structure for the router's
/// retryable/unknown-commit classification (§4.6, §7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandError {
    /// The numeric error code.
    pub code: i32,
    /// The symbolic name of the error code (e.g. `"SnapshotUnavailable"`).
    pub code_name: String,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.code_name, self.message)
    }
}

impl CommandError {
    /// Well-known code for `SnapshotUnavailable`, used by the snapshot-retry path (§4.5).
    pub const SNAPSHOT_UNAVAILABLE: i32 = 246;
    /// Well-known code for `StaleShardVersion` / `StaleDbVersion`, used by the stale-routing
    /// retry path (§4.5).
    pub const STALE_SHARD_OR_DB_VERSION: i32 = 63;
    /// Well-known code for view-resolution failures (§4.5).
    pub const COMMAND_NOT_SUPPORTED_ON_VIEW: i32 = 166;
}
