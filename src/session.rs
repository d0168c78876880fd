use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GraphMiddlewareError;
use crate::pipeline::Pipeline;
use crate::results::{ResultCollection, StatementResult};
use crate::statement::Statement;
use crate::transaction::Tx;

/// Server-side identifier of an explicit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live conversation with one endpoint.
///
/// Implemented by each transport. Methods take `&self`; a session shared
/// between callers must serialise its own I/O. Protocol-level errors are
/// reported as `GraphMiddlewareError::Transport` so the declared effect
/// survives to the transaction state machine.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run one statement in autocommit mode.
    async fn run(&self, statement: Statement) -> Result<StatementResult, GraphMiddlewareError>;

    /// Send a batch in one round trip; one result per statement, in order.
    async fn run_pipeline(
        &self,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError>;

    /// Open an explicit transaction and return its id.
    async fn begin(&self) -> Result<TransactionId, GraphMiddlewareError>;

    /// Send statements into an open transaction.
    async fn push_to_transaction(
        &self,
        id: TransactionId,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError>;

    async fn commit_transaction(&self, id: TransactionId) -> Result<(), GraphMiddlewareError>;

    async fn rollback_transaction(&self, id: TransactionId) -> Result<(), GraphMiddlewareError>;
}

/// Cloneable handle to a connection's single session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<dyn Session>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionHandle").field(&"<Session>").finish()
    }
}

impl SessionHandle {
    pub fn new(session: impl Session + 'static) -> Self {
        Self {
            inner: Arc::new(session),
        }
    }

    #[must_use]
    pub fn from_arc(session: Arc<dyn Session>) -> Self {
        Self { inner: session }
    }

    /// Run one statement after checking it is non-empty.
    ///
    /// # Errors
    /// Returns `InvalidStatement` for empty text, or whatever the transport raises.
    pub async fn run(&self, statement: Statement) -> Result<StatementResult, GraphMiddlewareError> {
        statement.validate()?;
        self.inner.run(statement).await
    }

    /// Start a pipeline, optionally seeded with a first statement.
    #[must_use]
    pub fn create_pipeline(&self, first: Option<Statement>) -> Pipeline {
        let mut pipeline = Pipeline::new(self.clone());
        if let Some(statement) = first {
            pipeline.push(statement);
        }
        pipeline
    }

    /// A fresh, unstarted transaction bound to this session.
    #[must_use]
    pub fn transaction(&self) -> Tx {
        Tx::new(self.clone())
    }

    pub(crate) fn session(&self) -> &dyn Session {
        self.inner.as_ref()
    }
}
