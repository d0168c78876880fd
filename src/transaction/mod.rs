//! Transaction state machines.
//!
//! [`Tx`] is the per-session state machine that talks to the transport.
//! [`Transaction`] wraps one `Tx` for client code: it queues statements and
//! fires the client events around every send.

mod client;

pub use client::Transaction;

use std::fmt;

use crate::error::GraphMiddlewareError;
use crate::pipeline::ensure_result_count;
use crate::results::{ResultCollection, StatementResult};
use crate::session::{SessionHandle, TransactionId};
use crate::statement::Statement;

/// Lifecycle state of a [`Tx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxState {
    /// Created, `begin` not called yet.
    Unstarted,
    Open,
    Committed,
    RolledBack,
}

impl TxState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TxState::Unstarted => "UNSTARTED",
            TxState::Open => "OPEN",
            TxState::Committed => "COMMITTED",
            TxState::RolledBack => "ROLLED_BACK",
        }
    }

    /// Committed and rolled-back transactions never reopen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TxState::Committed | TxState::RolledBack)
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit transaction bound to one session.
///
/// `Unstarted -> Open -> Committed | RolledBack`. Every guard is checked before
/// the session is contacted, and nothing is retried. A transport failure whose
/// declared effect is `Rollback` closes the transaction as `RolledBack` before
/// the error is returned.
///
/// Dropping an open `Tx` does not roll it back; finish it explicitly.
#[derive(Debug)]
pub struct Tx {
    session: SessionHandle,
    state: TxState,
    id: Option<TransactionId>,
}

impl Tx {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Self {
            session,
            state: TxState::Unstarted,
            id: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> TxState {
        self.state
    }

    #[must_use]
    pub fn id(&self) -> Option<TransactionId> {
        self.id
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == TxState::Open
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.state == TxState::Committed
    }

    #[must_use]
    pub fn is_rolled_back(&self) -> bool {
        self.state == TxState::RolledBack
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Open the transaction on the session.
    ///
    /// # Errors
    /// Returns `IllegalState` unless the transaction is unstarted, or the transport error.
    pub async fn begin(&mut self) -> Result<(), GraphMiddlewareError> {
        if self.state != TxState::Unstarted {
            return Err(GraphMiddlewareError::IllegalState(format!(
                "cannot begin, transaction is {}",
                self.state
            )));
        }
        let id = self.session.session().begin().await?;
        tracing::debug!(tx = %id, "transaction opened");
        self.id = Some(id);
        self.state = TxState::Open;
        Ok(())
    }

    /// Run one statement inside the transaction.
    ///
    /// # Errors
    /// Returns `IllegalState` unless open, `InvalidStatement` for empty text,
    /// or the transport error (after applying its effect).
    pub async fn run(
        &mut self,
        statement: Statement,
    ) -> Result<StatementResult, GraphMiddlewareError> {
        let results = self.run_multiple(vec![statement]).await?;
        results.into_iter().next().ok_or_else(|| {
            GraphMiddlewareError::ExecutionError("transaction returned no result".into())
        })
    }

    /// Run several statements inside the transaction in one round trip.
    ///
    /// # Errors
    /// Returns `IllegalState` unless open, `InvalidStatement` for empty text,
    /// `ExecutionError` on a result-count mismatch, or the transport error.
    pub async fn run_multiple(
        &mut self,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        let id = self.assert_open()?;
        for statement in &statements {
            statement.validate()?;
        }
        let expected = statements.len();
        let outcome = self
            .session
            .session()
            .push_to_transaction(id, statements)
            .await;
        let results = self.observe(outcome)?;
        ensure_result_count(expected, &results)?;
        Ok(results)
    }

    /// Commit the transaction.
    ///
    /// # Errors
    /// Returns `IllegalState` unless open, or the transport error (a
    /// rollback-effect failure leaves the transaction `RolledBack`).
    pub async fn commit(&mut self) -> Result<(), GraphMiddlewareError> {
        let id = self.assert_open()?;
        let outcome = self.session.session().commit_transaction(id).await;
        self.observe(outcome)?;
        tracing::debug!(tx = %id, "transaction committed");
        self.state = TxState::Committed;
        Ok(())
    }

    /// Alias for [`commit`](Tx::commit).
    ///
    /// # Errors
    /// See [`commit`](Tx::commit).
    pub async fn success(&mut self) -> Result<(), GraphMiddlewareError> {
        self.commit().await
    }

    /// Roll the transaction back. The state becomes `RolledBack` even when the
    /// session reports an error, which is still returned.
    ///
    /// # Errors
    /// Returns `IllegalState` unless open, or the transport error.
    pub async fn rollback(&mut self) -> Result<(), GraphMiddlewareError> {
        let id = self.assert_open()?;
        let outcome = self.session.session().rollback_transaction(id).await;
        self.state = TxState::RolledBack;
        tracing::debug!(tx = %id, "transaction rolled back");
        outcome
    }

    /// Check the transaction can accept statements, without touching the session.
    ///
    /// # Errors
    /// Returns `IllegalState` when unstarted or closed.
    pub fn ensure_open(&self) -> Result<(), GraphMiddlewareError> {
        self.assert_open().map(|_| ())
    }

    fn assert_open(&self) -> Result<TransactionId, GraphMiddlewareError> {
        match (self.state, self.id) {
            (TxState::Open, Some(id)) => Ok(id),
            (TxState::Unstarted, _) | (TxState::Open, None) => Err(
                GraphMiddlewareError::IllegalState("transaction not started".into()),
            ),
            (state, _) => Err(GraphMiddlewareError::IllegalState(format!(
                "transaction is closed ({state})"
            ))),
        }
    }

    /// Apply the declared effect of a failed round trip to the state.
    fn observe<T>(
        &mut self,
        outcome: Result<T, GraphMiddlewareError>,
    ) -> Result<T, GraphMiddlewareError> {
        if let Err(err) = &outcome
            && err.is_rollback_effect()
        {
            tracing::warn!(
                tx = ?self.id,
                status = err.status_code().unwrap_or_default(),
                "server rolled back transaction"
            );
            self.state = TxState::RolledBack;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureEffect, TransportFailure};
    use crate::test_utils::{MockSession, SessionCall};

    fn rollback_failure() -> TransportFailure {
        TransportFailure::new("Neo.ClientError.Statement.SyntaxError", "Invalid input")
    }

    #[tokio::test]
    async fn happy_path_transitions() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        assert_eq!(tx.status(), TxState::Unstarted);
        tx.begin().await.unwrap();
        assert!(tx.is_open());
        let result = tx.run(Statement::new("MATCH (n) RETURN n")).await.unwrap();
        assert_eq!(result.statement().text(), "MATCH (n) RETURN n");
        tx.commit().await.unwrap();
        assert!(tx.is_committed());
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn unstarted_guards_fire_before_transport() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        for err in [
            tx.run(Statement::new("RETURN 1")).await.unwrap_err(),
            tx.commit().await.unwrap_err(),
            tx.rollback().await.unwrap_err(),
        ] {
            assert!(
                matches!(&err, GraphMiddlewareError::IllegalState(msg) if msg.contains("not started"))
            );
        }
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn begin_twice_is_illegal() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        tx.begin().await.unwrap();
        let err = tx.begin().await.unwrap_err();
        assert!(matches!(&err, GraphMiddlewareError::IllegalState(msg) if msg.contains("OPEN")));
    }

    #[tokio::test]
    async fn closed_after_commit() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        tx.begin().await.unwrap();
        tx.commit().await.unwrap();
        let calls_before = mock.calls().len();
        assert!(matches!(
            tx.run(Statement::new("RETURN 1")).await,
            Err(GraphMiddlewareError::IllegalState(msg)) if msg.contains("closed")
        ));
        assert!(tx.commit().await.is_err());
        assert!(tx.rollback().await.is_err());
        assert_eq!(mock.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn rollback_effect_failure_closes_transaction() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        tx.begin().await.unwrap();
        mock.fail_next(rollback_failure());
        let err = tx.run(Statement::new("RETRUN 1")).await.unwrap_err();
        assert!(err.is_rollback_effect());
        assert!(tx.is_rolled_back());
        assert!(tx.commit().await.is_err());
    }

    #[tokio::test]
    async fn transient_failure_keeps_transaction_open() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        tx.begin().await.unwrap();
        mock.fail_next(TransportFailure::with_effect(
            "Neo.TransientError.Transaction.DeadlockDetected",
            "deadlock",
            FailureEffect::None,
        ));
        assert!(tx.run(Statement::new("RETURN 1")).await.is_err());
        assert!(tx.is_open());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn rollback_effect_on_commit() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        tx.begin().await.unwrap();
        mock.fail_next(rollback_failure());
        assert!(tx.commit().await.is_err());
        assert!(tx.is_rolled_back());
    }

    #[tokio::test]
    async fn rollback_is_unconditional() {
        let mock = MockSession::new();
        let mut tx = mock.handle().transaction();
        tx.begin().await.unwrap();
        mock.fail_next(TransportFailure::with_effect(
            "Neo.TransientError.General.Unavailable",
            "gone",
            FailureEffect::None,
        ));
        assert!(tx.rollback().await.is_err());
        assert!(tx.is_rolled_back());
        assert!(matches!(mock.calls().last(), Some(SessionCall::Rollback(_))));
    }
}
