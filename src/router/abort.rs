//! Abort command shaping (§4.7).

use crate::{
    bson::{doc, Document},
    concern::WriteConcern,
};

/// Builds an `abortTransaction` command. Explicit abort (§4.7) carries a write concern; implicit
/// abort and the best-effort abort issued while clearing pending participants (§4.5) do not.
pub fn abort_command(txn_number: i64, write_concern: Option<&WriteConcern>) -> Document {
    let mut cmd = doc! {
        "abortTransaction": 1,
        "txnNumber": txn_number,
        "autocommit": false,
    };
    if let Some(wc) = write_concern {
        if !wc.is_empty() {
            if let Ok(wc_doc) = bson::to_document(wc) {
                cmd.insert("writeConcern", wc_doc);
            }
        }
    }
    cmd
}

/// The cause recorded the first time a transaction's abort is triggered (§3, `abortCause`).
/// Explicit abort defaults to the literal string `"abort"` when no cause was already set by an
/// earlier implicit-abort signal.
pub const EXPLICIT_ABORT_CAUSE: &str = "abort";
