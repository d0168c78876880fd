use std::sync::Arc;

use crate::config::{ClientBuilder, ClientConfig};
use crate::connection::{Connection, ConnectionManager};
use crate::error::GraphMiddlewareError;
use crate::events::EventDispatcher;
use crate::results::{ResultCollection, StatementResult};
use crate::stack::Stack;
use crate::statement::{Batched, Statement, flatten};
use crate::transaction::Transaction;
use crate::types::Value;

/// Single entry point over every registered connection.
///
/// Every send fires `PreRun` before and `PostRun` after success. Transport
/// failures go to the failure listeners; when one of them suppresses the
/// error the call returns `Ok(None)`. Empty batches are answered locally and
/// fire nothing.
#[derive(Debug)]
pub struct Client {
    manager: ConnectionManager,
    events: Arc<EventDispatcher>,
}

impl Client {
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build the registry from a validated configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is invalid or a URI is rejected.
    pub fn new(config: ClientConfig) -> Result<Self, GraphMiddlewareError> {
        config.validate()?;
        let mut manager = ConnectionManager::new();
        for spec in &config.connections {
            manager.register(
                &spec.alias,
                &spec.uri,
                config.driver_config(spec),
                Arc::clone(&config.connector),
            )?;
        }
        if let Some(master) = &config.master {
            manager.set_master(master)?;
        }
        Ok(Self {
            manager,
            events: Arc::new(config.events),
        })
    }

    /// Run one statement on `alias`, or on the default connection.
    ///
    /// # Errors
    /// Returns `ConfigError` for an unknown alias, `InvalidStatement` for empty
    /// text, or an unsuppressed transport error.
    pub async fn run(
        &self,
        statement: impl Into<Statement>,
        alias: Option<&str>,
    ) -> Result<Option<StatementResult>, GraphMiddlewareError> {
        let connection = self.manager.resolve(alias)?;
        self.run_on(connection, statement.into()).await
    }

    /// Run one statement on the master connection.
    ///
    /// # Errors
    /// As [`run`](Self::run); fails with `ConfigError` when there is no write target.
    pub async fn run_write(
        &self,
        statement: impl Into<Statement>,
    ) -> Result<Option<StatementResult>, GraphMiddlewareError> {
        let connection = self.manager.master_connection()?;
        self.run_on(connection, statement.into()).await
    }

    async fn run_on(
        &self,
        connection: &Connection,
        statement: Statement,
    ) -> Result<Option<StatementResult>, GraphMiddlewareError> {
        statement.validate()?;
        self.events
            .around_send(
                std::slice::from_ref(&statement),
                connection.run(statement.clone()),
                |result| ResultCollection::with_result(result.clone()),
            )
            .await
    }

    /// A new, empty stack.
    #[must_use]
    pub fn stack(&self, tag: Option<String>, alias: Option<String>) -> Stack {
        Stack::new(tag, alias)
    }

    /// Send a stack's statements in one round trip. Preflights are not sent.
    ///
    /// The stack's alias picks the connection; without one, stacks holding
    /// writes go to the master and others to the default connection.
    ///
    /// # Errors
    /// As [`run`](Self::run); `ExecutionError` on a result-count mismatch.
    pub async fn run_stack(
        &self,
        stack: Stack,
    ) -> Result<Option<ResultCollection>, GraphMiddlewareError> {
        let connection = self.route_stack(&stack)?;
        let tag = stack.tag().map(str::to_owned);
        self.send_batch(connection, stack.into_statements(), tag)
            .await
    }

    /// Send the stack's preflights first, let `check` inspect their results,
    /// then send the main batch on the same connection.
    ///
    /// A stack without preflights behaves like [`run_stack`](Self::run_stack)
    /// and `check` is not called.
    ///
    /// # Errors
    /// Whatever `check` returns stops the stack before the main batch is sent;
    /// otherwise as [`run_stack`](Self::run_stack).
    pub async fn run_stack_with_preflights<F>(
        &self,
        stack: Stack,
        check: F,
    ) -> Result<Option<ResultCollection>, GraphMiddlewareError>
    where
        F: FnOnce(&ResultCollection) -> Result<(), GraphMiddlewareError>,
    {
        let connection = self.route_stack(&stack)?;
        if stack.has_preflights() {
            let preflights = stack.preflights().to_vec();
            tracing::debug!(
                alias = connection.alias(),
                preflights = preflights.len(),
                "sending preflights"
            );
            let Some(results) = self.send_batch(connection, preflights, None).await? else {
                return Ok(None);
            };
            check(&results)?;
        }
        let tag = stack.tag().map(str::to_owned);
        self.send_batch(connection, stack.into_statements(), tag)
            .await
    }

    /// Send loose statements and whole stacks, in order, as one batch.
    ///
    /// # Errors
    /// As [`run_stack`](Self::run_stack).
    pub async fn run_mixed(
        &self,
        items: Vec<Batched>,
        alias: Option<&str>,
        tag: Option<String>,
    ) -> Result<Option<ResultCollection>, GraphMiddlewareError> {
        let connection = self.manager.resolve(alias)?;
        self.send_batch(connection, flatten(items), tag).await
    }

    fn route_stack(&self, stack: &Stack) -> Result<&Connection, GraphMiddlewareError> {
        match stack.connection_alias() {
            Some(alias) => self.manager.resolve(Some(alias)),
            None if stack.has_writes() => self.manager.master_connection(),
            None => self.manager.resolve(None),
        }
    }

    async fn send_batch(
        &self,
        connection: &Connection,
        statements: Vec<Statement>,
        tag: Option<String>,
    ) -> Result<Option<ResultCollection>, GraphMiddlewareError> {
        if statements.is_empty() {
            let mut results = ResultCollection::default();
            if let Some(tag) = tag {
                results.set_tag(tag);
            }
            return Ok(Some(results));
        }
        for statement in &statements {
            statement.validate()?;
        }
        let send = async {
            let mut pipeline = connection.create_pipeline(None).await?;
            pipeline.extend(statements.iter().cloned());
            if let Some(tag) = tag {
                pipeline.set_tag(tag);
            }
            pipeline.run().await
        };
        self.events
            .around_send(&statements, send, Clone::clone)
            .await
    }

    /// An unstarted transaction on `alias`, or on the default connection.
    ///
    /// # Errors
    /// Returns `ConfigError` for an unknown alias, or the connector error if the
    /// session cannot be opened.
    pub async fn transaction(
        &self,
        alias: Option<&str>,
    ) -> Result<Transaction, GraphMiddlewareError> {
        let connection = self.manager.resolve(alias)?;
        let tx = connection.transaction().await?;
        Ok(Transaction::new(tx, Arc::clone(&self.events)))
    }

    /// Node labels known to the endpoint.
    ///
    /// # Errors
    /// As [`run`](Self::run).
    pub async fn labels(
        &self,
        alias: Option<&str>,
    ) -> Result<Option<Vec<String>>, GraphMiddlewareError> {
        let Some(result) = self.run("CALL db.labels()", alias).await? else {
            return Ok(None);
        };
        let labels = result
            .records()
            .iter()
            .filter_map(|record| match record.get_by_index(0) {
                Some(Value::Text(label)) => Some(label.clone()),
                _ => None,
            })
            .collect();
        Ok(Some(labels))
    }

    #[must_use]
    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.manager
    }

    #[must_use]
    pub fn event_dispatcher(&self) -> &EventDispatcher {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, ListenerDecision};
    use crate::test_utils::{MockConnector, SessionCall};

    fn client(connector: &MockConnector) -> Client {
        ClientBuilder::new()
            .add_connection("read", "bolt://read.local")
            .add_connection("write", "http://write.local:7474")
            .set_master("write")
            .unwrap()
            .connector(connector.clone())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn writes_go_to_master() {
        let connector = MockConnector::new();
        let client = client(&connector);
        client.run_write("CREATE (n)").await.unwrap().unwrap();
        client.run("MATCH (n) RETURN n", Some("read")).await.unwrap().unwrap();

        let write = connector.session_for("http://write.local:7474").unwrap();
        let read = connector.session_for("read.local:7687").unwrap();
        assert!(matches!(&write.calls()[..], [SessionCall::Run(s)] if s.text() == "CREATE (n)"));
        assert_eq!(read.calls().len(), 1);
    }

    #[tokio::test]
    async fn stack_routing() {
        let connector = MockConnector::new();
        let client = client(&connector);

        let mut reads = client.stack(Some("r".into()), Some("read".into()));
        reads.push("RETURN 1");
        reads.push("RETURN 2");
        let results = client.run_stack(reads).await.unwrap().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.tag(), Some("r"));

        let mut writes = client.stack(None, None);
        writes.push_write("CREATE (n)");
        client.run_stack(writes).await.unwrap().unwrap();

        let read = connector.session_for("read.local:7687").unwrap();
        let write = connector.session_for("http://write.local:7474").unwrap();
        assert!(matches!(&read.calls()[..], [SessionCall::Pipeline(s)] if s.len() == 2));
        assert!(matches!(&write.calls()[..], [SessionCall::Pipeline(_)]));
    }

    #[tokio::test]
    async fn preflights_run_first_and_can_abort() {
        let connector = MockConnector::new();
        let client = client(&connector);
        let mut stack = client.stack(None, Some("read".into()));
        stack.add_preflight("CALL dbms.components()");
        stack.push("MATCH (n) RETURN n");

        let err = client
            .run_stack_with_preflights(stack.clone(), |results| {
                assert_eq!(results.len(), 1);
                Err(GraphMiddlewareError::ExecutionError("unsupported version".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GraphMiddlewareError::ExecutionError(_)));

        client
            .run_stack_with_preflights(stack, |_| Ok(()))
            .await
            .unwrap()
            .unwrap();
        let calls = connector.session_for("read.local:7687").unwrap().calls();
        let texts: Vec<Vec<&str>> = calls
            .iter()
            .map(|call| match call {
                SessionCall::Pipeline(s) => s.iter().map(Statement::text).collect(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                vec!["CALL dbms.components()"],
                vec!["CALL dbms.components()"],
                vec!["MATCH (n) RETURN n"],
            ]
        );
    }

    #[tokio::test]
    async fn run_stack_ignores_preflights() {
        let connector = MockConnector::new();
        let client = client(&connector);
        let mut stack = client.stack(None, Some("read".into()));
        stack.add_preflight("CALL dbms.components()");
        stack.push("RETURN 1");
        client.run_stack(stack).await.unwrap();
        let calls = connector.session_for("read.local:7687").unwrap().calls();
        assert!(matches!(&calls[..], [SessionCall::Pipeline(s)] if s[0].text() == "RETURN 1"));
    }

    #[tokio::test]
    async fn empty_stack_sends_nothing() {
        let connector = MockConnector::new();
        let mut events = EventDispatcher::new();
        let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        for kind in [EventKind::PreRun, EventKind::PostRun] {
            let fired = Arc::clone(&fired);
            events.add_listener(kind, move |_| {
                fired.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                ListenerDecision::Continue
            });
        }
        let client = Client {
            events: Arc::new(events),
            ..client(&connector)
        };

        let results = client
            .run_stack(client.stack(Some("nothing".into()), Some("read".into())))
            .await
            .unwrap()
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(results.tag(), Some("nothing"));
        let results = client.run_mixed(Vec::new(), None, None).await.unwrap().unwrap();
        assert!(results.is_empty());

        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(connector.sessions().iter().all(|(_, _, session)| session.calls().is_empty()));
    }

    #[tokio::test]
    async fn labels_from_first_column() {
        let connector = MockConnector::new();
        let client = client(&connector);
        let labels = client.labels(Some("read")).await.unwrap().unwrap();
        // the mock echoes the statement text as the only column
        assert_eq!(labels, ["CALL db.labels()"]);
    }
}
