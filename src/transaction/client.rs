use std::sync::Arc;

use crate::error::GraphMiddlewareError;
use crate::events::EventDispatcher;
use crate::results::{ResultCollection, StatementResult};
use crate::stack::Stack;
use crate::statement::{Batched, Statement, flatten};

use super::{Tx, TxState};

/// Client-facing transaction: queues work, fires events, owns one [`Tx`].
///
/// Nothing is sent until [`run`](Transaction::run), [`run_stack`](Transaction::run_stack)
/// or [`commit`](Transaction::commit). Queued statements and stacks go out as a
/// single batch on commit, ahead of the commit itself.
///
/// A transport failure suppressed by a failure listener turns into `Ok(None)`;
/// the transaction state still reflects the failure's declared effect.
#[derive(Debug)]
pub struct Transaction {
    tx: Tx,
    queue: Vec<Batched>,
    events: Arc<EventDispatcher>,
}

impl Transaction {
    pub(crate) fn new(tx: Tx, events: Arc<EventDispatcher>) -> Self {
        Self {
            tx,
            queue: Vec::new(),
            events,
        }
    }

    /// Queue a statement without sending it.
    pub fn push(&mut self, statement: impl Into<Statement>) {
        self.queue.push(Batched::Statement(statement.into()));
    }

    /// Queue a whole stack without sending it.
    pub fn push_stack(&mut self, stack: Stack) {
        self.queue.push(Batched::Stack(stack));
    }

    /// Number of queued statements (stacks counted by their size).
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue
            .iter()
            .map(|item| match item {
                Batched::Statement(_) => 1,
                Batched::Stack(stack) => stack.size(),
            })
            .sum()
    }

    /// # Errors
    /// Returns `IllegalState` if already begun, or the transport error.
    pub async fn begin(&mut self) -> Result<(), GraphMiddlewareError> {
        self.tx.begin().await
    }

    /// Send one statement now.
    ///
    /// # Errors
    /// Returns `IllegalState` unless open, `InvalidStatement` for empty text, or
    /// an unsuppressed transport error.
    pub async fn run(
        &mut self,
        statement: impl Into<Statement>,
    ) -> Result<Option<StatementResult>, GraphMiddlewareError> {
        let statement = statement.into();
        self.tx.ensure_open()?;
        statement.validate()?;

        let events = Arc::clone(&self.events);
        events
            .around_send(
                std::slice::from_ref(&statement),
                self.tx.run(statement.clone()),
                |result| ResultCollection::with_result(result.clone()),
            )
            .await
    }

    /// Send a stack's statements now, in one round trip.
    ///
    /// # Errors
    /// Returns `IllegalState` unless open, `InvalidStatement` for empty text, or
    /// an unsuppressed transport error.
    pub async fn run_stack(
        &mut self,
        stack: Stack,
    ) -> Result<Option<ResultCollection>, GraphMiddlewareError> {
        self.tx.ensure_open()?;
        let tag = stack.tag().map(str::to_owned);
        let statements = stack.into_statements();
        let results = self.send_batch(statements).await?;
        Ok(results.map(|mut results| {
            if let Some(tag) = tag {
                results.set_tag(tag);
            }
            results
        }))
    }

    /// Flush the queue in one batch, then commit.
    ///
    /// With an empty queue this is a plain commit and returns an empty collection.
    ///
    /// # Errors
    /// Returns `IllegalState` unless open (the queue is left untouched), or an
    /// unsuppressed transport error from the flush or the commit.
    pub async fn commit(&mut self) -> Result<Option<ResultCollection>, GraphMiddlewareError> {
        self.tx.ensure_open()?;
        let queue = std::mem::take(&mut self.queue);

        let results = if queue.is_empty() {
            ResultCollection::default()
        } else {
            match self.send_batch(flatten(queue)).await? {
                Some(results) => results,
                None => return Ok(None),
            }
        };

        match self.tx.commit().await {
            Ok(()) => Ok(Some(results)),
            Err(err) => self.events.handle_failure(err).map(|()| None),
        }
    }

    /// # Errors
    /// Returns `IllegalState` unless open, or the transport error. The
    /// transaction is rolled back either way.
    pub async fn rollback(&mut self) -> Result<(), GraphMiddlewareError> {
        self.tx.rollback().await
    }

    async fn send_batch(
        &mut self,
        statements: Vec<Statement>,
    ) -> Result<Option<ResultCollection>, GraphMiddlewareError> {
        if statements.is_empty() {
            return Ok(Some(ResultCollection::default()));
        }
        for statement in &statements {
            statement.validate()?;
        }
        let events = Arc::clone(&self.events);
        events
            .around_send(
                &statements,
                self.tx.run_multiple(statements.clone()),
                Clone::clone,
            )
            .await
    }

    #[must_use]
    pub fn status(&self) -> TxState {
        self.tx.status()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.tx.is_open()
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.tx.is_committed()
    }

    #[must_use]
    pub fn is_rolled_back(&self) -> bool {
        self.tx.is_rolled_back()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// The underlying driver-level transaction.
    #[must_use]
    pub fn inner(&self) -> &Tx {
        &self.tx
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::TransportFailure;
    use crate::events::{EventKind, ListenerDecision};
    use crate::test_utils::{MockSession, SessionCall};

    #[derive(Default)]
    struct Counts {
        pre: usize,
        post: usize,
        failure: usize,
    }

    fn counting(suppress: bool) -> (Arc<EventDispatcher>, Arc<Mutex<Counts>>) {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut events = EventDispatcher::new();
        let c = Arc::clone(&counts);
        events.add_listener(EventKind::PreRun, move |_| {
            c.lock().unwrap().pre += 1;
            ListenerDecision::Continue
        });
        let c = Arc::clone(&counts);
        events.add_listener(EventKind::PostRun, move |_| {
            c.lock().unwrap().post += 1;
            ListenerDecision::Continue
        });
        let c = Arc::clone(&counts);
        events.add_listener(EventKind::Failure, move |_| {
            c.lock().unwrap().failure += 1;
            if suppress {
                ListenerDecision::SuppressError
            } else {
                ListenerDecision::Continue
            }
        });
        (Arc::new(events), counts)
    }

    fn transaction(mock: &MockSession, events: Arc<EventDispatcher>) -> Transaction {
        Transaction::new(mock.handle().transaction(), events)
    }

    #[tokio::test]
    async fn queued_work_is_sent_once_on_commit() {
        let mock = MockSession::new();
        let (events, counts) = counting(false);
        let mut tx = transaction(&mock, events);
        tx.begin().await.unwrap();

        tx.push("CREATE (a)");
        let mut stack = Stack::new(None, None);
        stack.push_write("CREATE (b)");
        stack.push_write("CREATE (c)");
        tx.push_stack(stack);
        assert_eq!(tx.queued(), 3);

        let results = tx.commit().await.unwrap().unwrap();
        assert_eq!(results.len(), 3);
        assert!(tx.is_committed());
        assert_eq!(tx.queued(), 0);

        let calls = mock.calls();
        assert!(matches!(&calls[..], [
            SessionCall::Begin,
            SessionCall::Push(_, statements),
            SessionCall::Commit(_),
        ] if statements.len() == 3));
        let counts = counts.lock().unwrap();
        assert_eq!((counts.pre, counts.post, counts.failure), (1, 1, 0));
    }

    #[tokio::test]
    async fn empty_queue_commits_directly() {
        let mock = MockSession::new();
        let (events, counts) = counting(false);
        let mut tx = transaction(&mock, events);
        tx.begin().await.unwrap();
        let results = tx.commit().await.unwrap().unwrap();
        assert!(results.is_empty());
        assert!(matches!(&mock.calls()[..], [SessionCall::Begin, SessionCall::Commit(_)]));
        assert_eq!(counts.lock().unwrap().pre, 0);
    }

    #[tokio::test]
    async fn no_implicit_begin() {
        let mock = MockSession::new();
        let (events, counts) = counting(true);
        let mut tx = transaction(&mock, events);
        tx.push("RETURN 1");
        assert!(matches!(
            tx.run("RETURN 1").await,
            Err(GraphMiddlewareError::IllegalState(_))
        ));
        assert!(matches!(
            tx.commit().await,
            Err(GraphMiddlewareError::IllegalState(_))
        ));
        assert_eq!(tx.queued(), 1);
        assert!(mock.calls().is_empty());
        let counts = counts.lock().unwrap();
        assert_eq!((counts.pre, counts.failure), (0, 0));
    }

    #[tokio::test]
    async fn suppressed_failure_returns_none() {
        let mock = MockSession::new();
        let (events, counts) = counting(true);
        let mut tx = transaction(&mock, events);
        tx.begin().await.unwrap();
        mock.fail_next(TransportFailure::with_effect(
            "Neo.TransientError.Transaction.LockClientStopped",
            "stopped",
            crate::error::FailureEffect::None,
        ));
        assert!(tx.run("RETURN 1").await.unwrap().is_none());
        assert!(tx.is_open());
        assert_eq!(counts.lock().unwrap().failure, 1);
    }

    #[tokio::test]
    async fn suppressed_rollback_effect_still_closes() {
        let mock = MockSession::new();
        let (events, _) = counting(true);
        let mut tx = transaction(&mock, events);
        tx.begin().await.unwrap();
        tx.push("CREATE (n:Broken");
        mock.fail_next(TransportFailure::new(
            "Neo.ClientError.Statement.SyntaxError",
            "Invalid input",
        ));
        assert!(tx.commit().await.unwrap().is_none());
        assert!(tx.is_rolled_back());
        assert!(!mock.calls().iter().any(|c| matches!(c, SessionCall::Commit(_))));
    }

    #[tokio::test]
    async fn unsuppressed_failure_propagates() {
        let mock = MockSession::new();
        let (events, counts) = counting(false);
        let mut tx = transaction(&mock, events);
        tx.begin().await.unwrap();
        mock.fail_next(TransportFailure::new(
            "Neo.ClientError.Statement.SyntaxError",
            "Invalid input",
        ));
        let err = tx.run("RETRUN 1").await.unwrap_err();
        assert!(err.is_rollback_effect());
        assert!(tx.is_rolled_back());
        let counts = counts.lock().unwrap();
        assert_eq!((counts.pre, counts.post, counts.failure), (1, 0, 1));
    }

    #[tokio::test]
    async fn empty_stacks_skip_the_round_trip() {
        let mock = MockSession::new();
        let (events, counts) = counting(false);
        let mut tx = transaction(&mock, events);
        tx.begin().await.unwrap();

        let results = tx
            .run_stack(Stack::new(Some("empty".into()), None))
            .await
            .unwrap()
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(results.tag(), Some("empty"));

        tx.push_stack(Stack::new(None, None));
        assert!(tx.commit().await.unwrap().unwrap().is_empty());
        assert!(tx.is_committed());

        assert!(matches!(&mock.calls()[..], [SessionCall::Begin, SessionCall::Commit(_)]));
        let counts = counts.lock().unwrap();
        assert_eq!((counts.pre, counts.post, counts.failure), (0, 0, 0));
    }

    #[tokio::test]
    async fn run_stack_applies_tag() {
        let mock = MockSession::new();
        let mut tx = transaction(&mock, Arc::new(EventDispatcher::new()));
        tx.begin().await.unwrap();
        let mut stack = Stack::new(Some("batch".into()), None);
        stack.push("RETURN 1");
        let results = tx.run_stack(stack).await.unwrap().unwrap();
        assert_eq!(results.tag(), Some("batch"));
        tx.rollback().await.unwrap();
        assert!(tx.is_rolled_back());
    }
}
