//! The per-session transaction router (§2–§5), the core of this crate.
//!
//! [`TxnRouter`] owns one session's worth of state behind a lock; [`Observer`] is a read-only
//! borrowed view for monitoring, and the inbound API methods on `TxnRouter` itself are the
//! mutating, checked-out-operation view (§5, §9 design note on not duplicating the observer as
//! its own type).

pub mod abort;
pub mod at_cluster_time;
pub mod commit;
pub mod participant;
pub mod reporter;
pub mod retry;
pub mod timing;


use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    bson::{Bson, Document, Timestamp},
    clock::LogicalClock,
    concern::{ReadConcern, ReadConcernLevel, WriteConcern},
    config::RouterConfig,
    error::{Error, ErrorKind, Result, PARTICIPANT_RESPONDED_WITHOUT_READ_ONLY},
    metrics::{MetricsSink, TxnMetric},
    transport::{ParticipantResponse, ShardId, ShardTransport},
};

use self::{
    abort::{abort_command, EXPLICIT_ABORT_CAUSE},
    at_cluster_time::AtClusterTime,
    commit::{classify_outcome, coordinate_commit_command, commit_command, first_error_or_last, CommitOutcome, CommitType},
    participant::{Participant, ReadOnly, SharedTransactionOptions},
    reporter::{ParticipantReport, Report},
    timing::{SystemTickSource, TickSource, TimingStats},
};

/// A client statement's role within a transaction (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementAction {
    /// The statement starts a new transaction.
    Start,
    /// The statement continues an in-progress transaction.
    Continue,
    /// The statement commits the transaction.
    Commit,
}

/// `{recoveryShardId?}`, returned to the client so a later, possibly different, router can learn
/// the transaction's outcome (§4.8, §6).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryToken {
    /// The stable recovery shard id, absent for a read-only (or zero-participant) transaction.
    pub recovery_shard_id: Option<ShardId>,
}

/// Commands that carry transaction control rather than application intent: never decorated with
/// `startTransaction` or a read-concern (§4.3).
const CONTROL_COMMANDS: [&str; 4] = [
    "abortTransaction",
    "commitTransaction",
    "prepareTransaction",
    "coordinateCommitTransaction",
];

const UNINITIALIZED_TXN_NUMBER: i64 = -1;

struct RouterState {
    session_id: String,
    txn_number: i64,
    read_concern: Option<ReadConcern>,
    at_cluster_time: Option<AtClusterTime>,
    participants: HashMap<ShardId, Participant>,
    coordinator_id: Option<ShardId>,
    recovery_shard_id: Option<ShardId>,
    commit_type: CommitType,
    is_recovering_commit: bool,
    termination_initiated: bool,
    first_stmt_id: u32,
    latest_stmt_id: u32,
    abort_cause: Option<String>,
    timing: TimingStats,
    last_client_info: Option<String>,
}

impl RouterState {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            txn_number: UNINITIALIZED_TXN_NUMBER,
            read_concern: None,
            at_cluster_time: None,
            participants: HashMap::new(),
            coordinator_id: None,
            recovery_shard_id: None,
            commit_type: CommitType::NotInitiated,
            is_recovering_commit: false,
            termination_initiated: false,
            first_stmt_id: 0,
            latest_stmt_id: 0,
            abort_cause: None,
            timing: TimingStats::new(),
            last_client_info: None,
        }
    }

    /// Clears all per-transaction state in preparation for a new `txnNumber` (§4.1).
    fn reset(&mut self, txn_number: i64, tick: &dyn TickSource) {
        self.txn_number = txn_number;
        self.read_concern = None;
        self.at_cluster_time = None;
        self.participants.clear();
        self.coordinator_id = None;
        self.recovery_shard_id = None;
        self.commit_type = CommitType::NotInitiated;
        self.is_recovering_commit = false;
        self.termination_initiated = false;
        self.first_stmt_id = 0;
        self.latest_stmt_id = 0;
        self.abort_cause = None;
        self.timing.reset(tick);
    }
}

/// The per-session transaction router. Cheaply cloneable; every clone shares the same underlying
/// state behind a `std::sync::Mutex` (§5). Methods on `TxnRouter` itself are the mutating,
/// checked-out-operation view; [`TxnRouter::observer`] borrows the read-only view.
#[derive(Clone)]
pub struct TxnRouter {
    state: Arc<Mutex<RouterState>>,
    config: RouterConfig,
    clock: Arc<dyn LogicalClock>,
    transport: Arc<dyn ShardTransport>,
    metrics: Arc<dyn MetricsSink>,
    tick: Arc<dyn TickSource>,
}

impl TxnRouter {
    /// Builds a new router for `session_id`, using the system clock for timing.
    pub fn new(
        session_id: impl Into<String>,
        config: RouterConfig,
        clock: Arc<dyn LogicalClock>,
        transport: Arc<dyn ShardTransport>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self::with_tick_source(session_id, config, clock, transport, metrics, Arc::new(SystemTickSource))
    }

    /// Builds a router with an explicit tick source, for deterministic timing under test.
    pub fn with_tick_source(
        session_id: impl Into<String>,
        config: RouterConfig,
        clock: Arc<dyn LogicalClock>,
        transport: Arc<dyn ShardTransport>,
        metrics: Arc<dyn MetricsSink>,
        tick: Arc<dyn TickSource>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RouterState::new(session_id.into()))),
            config,
            clock,
            transport,
            metrics,
            tick,
        }
    }

    /// Borrows the read-only, monitoring view of this router's current state (§2, §5).
    pub fn observer(&self) -> Observer<'_> {
        Observer {
            guard: self.state.lock().unwrap(),
            tick: self.tick.as_ref(),
        }
    }

    /// Arbitrates a client statement's transaction number against the one on record, resetting,
    /// continuing, or rejecting the statement accordingly (§4.1).
    pub fn begin_or_continue(
        &self,
        txn_number: i64,
        action: StatementAction,
        read_concern: Option<ReadConcern>,
        client_info: Option<String>,
    ) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        let stored = guard.txn_number;

        if txn_number < stored {
            return Err(ErrorKind::TransactionTooOld.into());
        }

        if txn_number == stored {
            match action {
                StatementAction::Start => {
                    return Err(ErrorKind::ConflictingOperationInProgress.into());
                }
                StatementAction::Continue => {
                    if read_concern.is_some() {
                        return Err(ErrorKind::InvalidOptions {
                            message: "read concern may only be specified on the first statement \
                                      of a transaction"
                                .to_string(),
                        }
                        .into());
                    }
                    guard.latest_stmt_id += 1;
                }
                StatementAction::Commit => {
                    guard.latest_stmt_id += 1;
                }
            }
        } else {
            match action {
                StatementAction::Start => {
                    if let Some(rc) = &read_concern {
                        if !rc.is_valid_for_transaction_start() {
                            return Err(ErrorKind::InvalidOptions {
                                message: format!(
                                    "read concern level {:?} is not valid to start a transaction",
                                    rc.level
                                ),
                            }
                            .into());
                        }
                    }
                    let effective_rc = read_concern.unwrap_or_else(ReadConcern::local);
                    let is_snapshot = effective_rc.level == ReadConcernLevel::Snapshot;
                    guard.reset(txn_number, self.tick.as_ref());
                    guard.read_concern = Some(effective_rc);
                    if is_snapshot {
                        guard.at_cluster_time = Some(AtClusterTime::new());
                    }
                    self.metrics.record(TxnMetric::TransactionStarted);
                }
                StatementAction::Continue => {
                    return Err(ErrorKind::NoSuchTransaction {
                        message: format!("no transaction in progress for txnNumber {txn_number}"),
                    }
                    .into());
                }
                StatementAction::Commit => {
                    guard.reset(txn_number, self.tick.as_ref());
                    guard.is_recovering_commit = true;
                    self.metrics.record(TxnMetric::TransactionStarted);
                }
            }
        }

        guard.last_client_info = client_info;
        guard.timing.mark_active(self.tick.as_ref());
        Ok(())
    }

    /// Picks, and pins, the transaction's snapshot read timestamp if one hasn't been fixed yet
    /// (§4.2). A no-op for non-snapshot transactions, and once the timestamp can no longer
    /// change for the current statement.
    pub fn set_default_at_cluster_time(&self, after_cluster_time: Option<Timestamp>) {
        let mut guard = self.state.lock().unwrap();
        let latest_stmt_id = guard.latest_stmt_id;
        let Some(act) = guard.at_cluster_time.as_mut() else {
            return;
        };
        if !act.can_change(latest_stmt_id) {
            return;
        }
        let cluster_time = self.clock.cluster_time();
        let chosen = match after_cluster_time {
            Some(t) if t > cluster_time => t,
            _ => cluster_time,
        };
        act.set(chosen, latest_stmt_id);
    }

    /// Decorates an outgoing command for `shard_id`, creating its participant record on first
    /// contact (§4.3). `command_name` identifies the command for the transaction-control
    /// exemption (no `startTransaction`, no read-concern). `txnNumber`/`autocommit` are filled in
    /// if absent from `cmd`; if the caller already set them, they must agree with the
    /// transaction's own values or this fails with `InvalidOptions`.
    pub fn attach_txn_fields_if_needed(
        &self,
        shard_id: &ShardId,
        mut cmd: Document,
        command_name: &str,
    ) -> Result<Document> {
        let mut guard = self.state.lock().unwrap();
        let txn_number = guard.txn_number;
        let latest_stmt_id = guard.latest_stmt_id;
        let is_control = CONTROL_COMMANDS.contains(&command_name);
        let is_new_participant = !guard.participants.contains_key(shard_id);

        if is_new_participant {
            let is_coordinator = guard.coordinator_id.is_none();
            let at_cluster_time = guard.at_cluster_time.as_ref().and_then(|a| a.time());
            let shared_options = SharedTransactionOptions {
                txn_number,
                read_concern: guard.read_concern.clone().unwrap_or_else(ReadConcern::local),
                at_cluster_time,
            };
            let participant = Participant::new(is_coordinator, latest_stmt_id, shared_options);
            if is_coordinator {
                guard.coordinator_id = Some(shard_id.clone());
            }
            guard.participants.insert(shard_id.clone(), participant);
        }

        let participant = guard
            .participants
            .get(shard_id)
            .expect("just created or already present");

        match cmd.get("txnNumber") {
            None => {
                cmd.insert("txnNumber", txn_number);
            }
            Some(existing) if existing == &Bson::Int64(txn_number) => {}
            Some(existing) => {
                return Err(ErrorKind::InvalidOptions {
                    message: format!(
                        "command already carries txnNumber {existing:?}, inconsistent with this \
                         transaction's txnNumber {txn_number}"
                    ),
                }
                .into());
            }
        }
        match cmd.get("autocommit") {
            None => {
                cmd.insert("autocommit", false);
            }
            Some(Bson::Boolean(false)) => {}
            Some(existing) => {
                return Err(ErrorKind::InvalidOptions {
                    message: format!(
                        "command already carries autocommit = {existing:?}, but transactions \
                         always run with autocommit = false"
                    ),
                }
                .into());
            }
        }

        if !is_control {
            if is_new_participant {
                cmd.insert("startTransaction", true);
                let mut read_concern_doc = Document::new();
                read_concern_doc.insert("level", participant.shared_options.read_concern.level.as_str());
                if let Some(at_cluster_time) = participant.shared_options.at_cluster_time {
                    read_concern_doc.insert("atClusterTime", at_cluster_time);
                }
                cmd.insert("readConcern", read_concern_doc);
            } else if cmd.contains_key("readConcern") {
                return Err(ErrorKind::InvalidOptions {
                    message: "a read concern may only be attached to a participant's first \
                              statement"
                        .to_string(),
                }
                .into());
            }
        }

        if participant.is_coordinator {
            cmd.insert("coordinator", true);
        }

        Ok(cmd)
    }

    /// Updates a participant's read-only status from its response to the current statement
    /// (§4.4). A no-op once `terminationInitiated`, and for any response carrying a command
    /// error (the caller handles those).
    pub fn process_participant_response(
        &self,
        shard_id: &ShardId,
        response: &ParticipantResponse,
    ) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        if guard.termination_initiated || response.is_err() {
            return Ok(());
        }
        let latest_stmt_id = guard.latest_stmt_id;
        let Some(participant) = guard.participants.get(shard_id).cloned() else {
            return Ok(());
        };

        if participant.stmt_id_created_at < latest_stmt_id && response.read_only.is_none() {
            return Err(Error::participant(
                PARTICIPANT_RESPONDED_WITHOUT_READ_ONLY,
                format!("participant {shard_id} responded on a later statement with no readOnly marker"),
            ));
        }

        let Some(reported_read_only) = response.read_only else {
            return Ok(());
        };

        let previous = participant.read_only;
        let next = previous.observe(reported_read_only).map_err(|code| {
            Error::participant(code, format!("participant {shard_id} violated the read-only protocol"))
        })?;

        if let Some(p) = guard.participants.get_mut(shard_id) {
            p.read_only = next;
        }
        if previous != ReadOnly::NotReadOnly && next == ReadOnly::NotReadOnly && guard.recovery_shard_id.is_none() {
            guard.recovery_shard_id = Some(shard_id.clone());
        }
        Ok(())
    }

    /// Whether a stale shard/database version error on `command_name` may be retried as the
    /// current statement (§4.5).
    pub fn can_continue_on_stale_shard_or_db_error(&self, command_name: &str) -> bool {
        let guard = self.state.lock().unwrap();
        let is_first_statement = guard.latest_stmt_id == guard.first_stmt_id;
        retry::can_continue_on_stale_shard_or_db_error(
            self.config.stale_routing_retry,
            command_name,
            is_first_statement,
        )
    }

    /// Whether a snapshot-unavailable error may be retried as the current statement (§4.5).
    pub fn can_continue_on_snapshot_error(&self) -> bool {
        let guard = self.state.lock().unwrap();
        let can_change = guard
            .at_cluster_time
            .as_ref()
            .map(|act| act.can_change(guard.latest_stmt_id))
            .unwrap_or(false);
        retry::can_continue_on_snapshot_error(self.config.snapshot_retry, can_change)
    }

    /// Whether a view-resolution error may be retried as the current statement (§4.5, always
    /// true).
    pub fn can_continue_on_view_resolution_error(&self) -> bool {
        retry::can_continue_on_view_resolution_error()
    }

    /// Recovers from a stale shard/database version error by clearing this statement's pending
    /// participants (§4.5).
    pub async fn on_stale_shard_or_db_error(&self) -> Result<()> {
        self.clear_pending_participants().await
    }

    /// Recovers from a view-resolution error by clearing this statement's pending participants
    /// (§4.5).
    pub async fn on_view_resolution_error(&self) -> Result<()> {
        self.clear_pending_participants().await
    }

    /// Recovers from a snapshot-unavailable error by clearing every participant (including the
    /// coordinator) and resetting the snapshot holder so the next statement picks a fresh
    /// timestamp (§4.5).
    pub async fn on_snapshot_error(&self) -> Result<()> {
        let (txn_number, shard_ids) = {
            let guard = self.state.lock().unwrap();
            (guard.txn_number, guard.participants.keys().cloned().collect::<Vec<_>>())
        };
        for shard_id in &shard_ids {
            let _ = self.transport.send(shard_id, abort_command(txn_number, None)).await;
        }
        let mut guard = self.state.lock().unwrap();
        guard.participants.clear();
        guard.coordinator_id = None;
        guard.recovery_shard_id = None;
        guard.at_cluster_time = Some(AtClusterTime::new());
        Ok(())
    }

    async fn clear_pending_participants(&self) -> Result<()> {
        let (txn_number, pending) = {
            let guard = self.state.lock().unwrap();
            let latest = guard.latest_stmt_id;
            let pending: Vec<ShardId> = guard
                .participants
                .iter()
                .filter(|(_, p)| p.is_pending(latest))
                .map(|(id, _)| id.clone())
                .collect();
            (guard.txn_number, pending)
        };
        for shard_id in &pending {
            let _ = self.transport.send(shard_id, abort_command(txn_number, None)).await;
        }
        let mut guard = self.state.lock().unwrap();
        for shard_id in &pending {
            guard.participants.remove(shard_id);
        }
        if let Some(recovery) = &guard.recovery_shard_id {
            if pending.contains(recovery) {
                guard.recovery_shard_id = None;
            }
        }
        if guard.participants.is_empty() {
            guard.coordinator_id = None;
        }
        Ok(())
    }

    /// Selects and executes the commit path for this transaction (§4.6). Re-entrant: a retried
    /// call after a prior unknown-outcome commit re-reads the same participant/commit-type state
    /// instead of re-deriving it (§9 design note), so a retried `singleWriteShard` commit never
    /// re-commits an already-committed read-only participant through a different path.
    pub async fn commit_transaction(&self, recovery_token: Option<RecoveryToken>) -> Result<ParticipantResponse> {
        let (commit_type, txn_number, is_recovering_commit, coordinator_id, participants) = {
            let mut guard = self.state.lock().unwrap();
            guard.termination_initiated = true;
            guard.timing.mark_commit_started(self.tick.as_ref());
            let snapshot: Vec<(ShardId, Participant)> =
                guard.participants.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let refs: Vec<_> = snapshot.iter().map(|(k, v)| (k, v)).collect();
            let commit_type = commit::select(guard.is_recovering_commit, &refs)?;
            guard.commit_type = commit_type;
            (
                commit_type,
                guard.txn_number,
                guard.is_recovering_commit,
                guard.coordinator_id.clone(),
                snapshot,
            )
        };

        let result = self
            .execute_commit(commit_type, txn_number, is_recovering_commit, coordinator_id, &participants, recovery_token)
            .await;
        self.finalize_commit(&result);
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_commit(
        &self,
        commit_type: CommitType,
        txn_number: i64,
        is_recovering_commit: bool,
        coordinator_id: Option<ShardId>,
        participants: &[(ShardId, Participant)],
        recovery_token: Option<RecoveryToken>,
    ) -> Result<ParticipantResponse> {
        match commit_type {
            CommitType::NotInitiated => unreachable!("commit::select never returns NotInitiated"),
            CommitType::RecoverWithToken => {
                debug_assert!(is_recovering_commit);
                let shard_id = recovery_token
                    .and_then(|token| token.recovery_shard_id)
                    .ok_or_else(|| ErrorKind::InvalidOptions {
                        message: "commit recovery requires a recovery token with a recoveryShardId".to_string(),
                    })?;
                self.transport
                    .send(&shard_id, coordinate_commit_command(txn_number, &[]))
                    .await?
                    .into_result()
            }
            CommitType::NoShards => Ok(ParticipantResponse::ok()),
            CommitType::SingleShard => {
                let (shard_id, _) = &participants[0];
                self.transport.send(shard_id, commit_command(txn_number)).await?.into_result()
            }
            CommitType::ReadOnly => {
                let mut results = Vec::with_capacity(participants.len());
                for (shard_id, _) in participants {
                    results.push(
                        self.transport
                            .send(shard_id, commit_command(txn_number))
                            .await
                            .and_then(ParticipantResponse::into_result),
                    );
                }
                first_error_or_last(results)
            }
            CommitType::SingleWriteShard => {
                for (shard_id, participant) in participants {
                    if participant.read_only == ReadOnly::ReadOnly {
                        self.transport.send(shard_id, commit_command(txn_number)).await?.into_result()?;
                    }
                }
                let (shard_id, _) = participants
                    .iter()
                    .find(|(_, p)| p.read_only == ReadOnly::NotReadOnly)
                    .expect("singleWriteShard commit type implies exactly one write participant");
                self.transport.send(shard_id, commit_command(txn_number)).await?.into_result()
            }
            CommitType::TwoPhaseCommit => {
                let coordinator_id = coordinator_id.ok_or_else(|| ErrorKind::IllegalOperation {
                    message: "two-phase commit requires a coordinator".to_string(),
                })?;
                let participant_ids: Vec<ShardId> = participants.iter().map(|(id, _)| id.clone()).collect();
                self.transport
                    .send(&coordinator_id, coordinate_commit_command(txn_number, &participant_ids))
                    .await?
                    .into_result()
            }
        }
    }

    fn finalize_commit(&self, result: &Result<ParticipantResponse>) {
        let outcome_for_classification: Result<()> = match result {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        };
        let outcome = classify_outcome(&outcome_for_classification);
        let mut guard = self.state.lock().unwrap();
        match outcome {
            CommitOutcome::Committed => {
                guard.timing.mark_ended(self.tick.as_ref());
                self.metrics.record(TxnMetric::TransactionCommitted);
            }
            CommitOutcome::Unknown => {}
            CommitOutcome::NonRetryableFailure => {
                if guard.abort_cause.is_none() {
                    guard.abort_cause = result.as_ref().err().map(|e| e.to_string());
                }
                guard.timing.mark_ended(self.tick.as_ref());
                self.metrics.record(TxnMetric::TransactionAborted);
            }
        }
    }

    /// Explicitly aborts the transaction, broadcasting `abortTransaction` with `write_concern` to
    /// every participant (§4.7). Fails with `NoSuchTransaction` if there are no participants.
    pub async fn abort_transaction(&self, write_concern: WriteConcern) -> Result<ParticipantResponse> {
        let (txn_number, participants) = {
            let mut guard = self.state.lock().unwrap();
            if guard.participants.is_empty() {
                return Err(ErrorKind::NoSuchTransaction {
                    message: "no participants to abort".to_string(),
                }
                .into());
            }
            guard.termination_initiated = true;
            (guard.txn_number, guard.participants.keys().cloned().collect::<Vec<_>>())
        };

        let mut results = Vec::with_capacity(participants.len());
        for shard_id in &participants {
            results.push(
                self.transport
                    .send(shard_id, abort_command(txn_number, Some(&write_concern)))
                    .await
                    .and_then(ParticipantResponse::into_result),
            );
        }
        let result = first_error_or_last(results);

        let mut guard = self.state.lock().unwrap();
        if guard.abort_cause.is_none() {
            guard.abort_cause = Some(EXPLICIT_ABORT_CAUSE.to_string());
        }
        guard.timing.mark_ended(self.tick.as_ref());
        drop(guard);
        self.metrics.record(TxnMetric::TransactionAborted);
        result
    }

    /// Best-effort abort triggered by any transactional failure (§4.7). A no-op once the
    /// coordinator or recovery shard owns the outcome (`twoPhaseCommit`/`recoverWithToken`);
    /// otherwise swallows every participant error. Does not finalize the transaction's lifecycle
    /// if commit had already started but not finished, since the outcome remains unknown.
    pub async fn implicitly_abort_transaction(&self, error_status: impl Into<String>) {
        let error_status = error_status.into();
        let (commit_type, txn_number, participants) = {
            let mut guard = self.state.lock().unwrap();
            if guard.abort_cause.is_none() {
                guard.abort_cause = Some(error_status);
            }
            (guard.commit_type, guard.txn_number, guard.participants.keys().cloned().collect::<Vec<_>>())
        };

        if matches!(commit_type, CommitType::TwoPhaseCommit | CommitType::RecoverWithToken) {
            return;
        }

        for shard_id in &participants {
            let _ = self.transport.send(shard_id, abort_command(txn_number, None)).await;
        }

        let mut guard = self.state.lock().unwrap();
        if !guard.timing.commit_started_and_open() {
            guard.termination_initiated = true;
            guard.timing.mark_ended(self.tick.as_ref());
        }
    }

    /// The recovery token for the transaction's current state (§4.8): empty for a read-only (or
    /// zero-participant) transaction, otherwise the stable recovery shard id.
    pub fn recovery_token(&self) -> RecoveryToken {
        let guard = self.state.lock().unwrap();
        RecoveryToken {
            recovery_shard_id: guard.recovery_shard_id.clone(),
        }
    }

    /// Marks the session inactive, e.g. when it is checked back in (§4.9, `stash`).
    pub fn stash(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.timing.mark_inactive(self.tick.as_ref());
    }

    /// Logs a slow-transaction warning if the transaction's total duration exceeds the
    /// configured threshold (§4.9, ADDED). Intended to be called from `stash`/termination sites.
    pub fn log_if_slow(&self) {
        let report = self.observer().report();
        if report.is_slow(self.config.slow_transaction_threshold) {
            report.log_slow();
        }
    }
}

/// A read-only, borrowed view onto a [`TxnRouter`]'s current state, for monitoring (§2, §5).
pub struct Observer<'a> {
    guard: std::sync::MutexGuard<'a, RouterState>,
    tick: &'a dyn TickSource,
}

impl Observer<'_> {
    /// The transaction number on record.
    pub fn txn_number(&self) -> i64 {
        self.guard.txn_number
    }

    /// The number of participants contacted so far.
    pub fn participant_count(&self) -> usize {
        self.guard.participants.len()
    }

    /// The coordinator shard, if one has been chosen.
    pub fn coordinator_id(&self) -> Option<&ShardId> {
        self.guard.coordinator_id.as_ref()
    }

    /// The recovery shard, if one has been elected.
    pub fn recovery_shard_id(&self) -> Option<&ShardId> {
        self.guard.recovery_shard_id.as_ref()
    }

    /// The commit path selected so far.
    pub fn commit_type(&self) -> CommitType {
        self.guard.commit_type
    }

    /// Whether this router is recovering a commit outcome via token (§4.1).
    pub fn is_recovering_commit(&self) -> bool {
        self.guard.is_recovering_commit
    }

    /// The pinned snapshot timestamp, if one has been fixed.
    pub fn at_cluster_time(&self) -> Option<Timestamp> {
        self.guard.at_cluster_time.as_ref().and_then(|act| act.time())
    }

    /// A structured snapshot of this router's state, for monitoring or the slow-transaction log
    /// (§4.9).
    pub fn report(&self) -> Report {
        let participants = self
            .guard
            .participants
            .iter()
            .map(|(shard_id, p)| ParticipantReport {
                shard_id: shard_id.clone(),
                is_coordinator: p.is_coordinator,
                read_only: match p.read_only {
                    ReadOnly::Unset => "unset",
                    ReadOnly::ReadOnly => "readOnly",
                    ReadOnly::NotReadOnly => "notReadOnly",
                },
            })
            .collect();
        let total_duration = self.guard.timing.total_duration(self.tick);
        let active_duration = self.guard.timing.active_duration(self.tick);
        Report {
            session_id: self.guard.session_id.clone(),
            txn_number: self.guard.txn_number,
            read_concern: self.guard.read_concern.clone(),
            participants,
            commit_type: self.guard.commit_type,
            at_cluster_time: self.at_cluster_time(),
            total_duration,
            active_duration,
            inactive_duration: total_duration.saturating_sub(active_duration),
            commit_duration: self.guard.timing.commit_duration(self.tick),
        }
    }
}
