//! In-memory session and connector for tests.
//!
//! `MockSession` answers every statement with one result holding a single
//! `statement` column that echoes the statement text, and records each call
//! so tests can assert on round trips.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::connection::Connector;
use crate::driver::Driver;
use crate::error::GraphMiddlewareError;
use crate::results::{ResultCollection, StatementResult};
use crate::session::{Session, SessionHandle, TransactionId};
use crate::statement::Statement;
use crate::types::{Protocol, Value};

/// One call observed by a [`MockSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Run(Statement),
    Pipeline(Vec<Statement>),
    Begin,
    Push(TransactionId, Vec<Statement>),
    Commit(TransactionId),
    Rollback(TransactionId),
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<SessionCall>,
    failures: VecDeque<GraphMiddlewareError>,
    next_tx: u64,
    short_pipelines: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle sharing this mock's call log.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.clone())
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SessionCall> {
        self.lock().calls.clone()
    }

    /// Fail the next call (after recording it) with `error`.
    pub fn fail_next(&self, error: impl Into<GraphMiddlewareError>) {
        self.lock().failures.push_back(error.into());
    }

    /// Batches answer with one result fewer than they were sent.
    pub fn drop_last_result_in_pipelines(&self) {
        self.lock().short_pipelines = true;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // a panicking test thread must not hide the log from the others
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, call: SessionCall) -> Result<(), GraphMiddlewareError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn answer_batch(&self, statements: Vec<Statement>) -> ResultCollection {
        let short = self.lock().short_pipelines;
        let keep = if short {
            statements.len().saturating_sub(1)
        } else {
            statements.len()
        };
        ResultCollection::new(statements.into_iter().take(keep).map(echo).collect())
    }
}

fn echo(statement: Statement) -> StatementResult {
    let text = statement.text().to_owned();
    let mut result = StatementResult::new(statement, vec!["statement".to_owned()]);
    result.push_record(vec![Value::Text(text)]);
    result
}

#[async_trait]
impl Session for MockSession {
    async fn run(&self, statement: Statement) -> Result<StatementResult, GraphMiddlewareError> {
        self.record(SessionCall::Run(statement.clone()))?;
        Ok(echo(statement))
    }

    async fn run_pipeline(
        &self,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        self.record(SessionCall::Pipeline(statements.clone()))?;
        Ok(self.answer_batch(statements))
    }

    async fn begin(&self) -> Result<TransactionId, GraphMiddlewareError> {
        self.record(SessionCall::Begin)?;
        let mut state = self.lock();
        state.next_tx += 1;
        Ok(TransactionId(state.next_tx))
    }

    async fn push_to_transaction(
        &self,
        id: TransactionId,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        self.record(SessionCall::Push(id, statements.clone()))?;
        Ok(self.answer_batch(statements))
    }

    async fn commit_transaction(&self, id: TransactionId) -> Result<(), GraphMiddlewareError> {
        self.record(SessionCall::Commit(id))
    }

    async fn rollback_transaction(&self, id: TransactionId) -> Result<(), GraphMiddlewareError> {
        self.record(SessionCall::Rollback(id))
    }
}

/// Connector handing out one [`MockSession`] per connected driver.
///
/// Every session shares nothing with the others; `sessions()` returns them in
/// connection order so tests can inspect which endpoint received what.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    sessions: Arc<Mutex<Vec<(Protocol, String, MockSession)>>>,
}

impl MockConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions created so far as `(protocol, endpoint, session)`.
    #[must_use]
    pub fn sessions(&self) -> Vec<(Protocol, String, MockSession)> {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The session opened for `endpoint`, if any.
    #[must_use]
    pub fn session_for(&self, endpoint: &str) -> Option<MockSession> {
        self.sessions()
            .into_iter()
            .find(|(_, ep, _)| ep == endpoint)
            .map(|(_, _, session)| session)
    }

    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.sessions().len()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, driver: &Driver) -> Result<SessionHandle, GraphMiddlewareError> {
        let session = MockSession::new();
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((driver.protocol(), driver.endpoint(), session.clone()));
        Ok(session.handle())
    }
}
