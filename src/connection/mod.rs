//! Named connections and the registry that routes between them.

mod connector;
mod manager;

pub use connector::{Connector, DefaultConnector};
pub use manager::ConnectionManager;

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::driver::{Driver, DriverConfig, redact};
use crate::error::GraphMiddlewareError;
use crate::pipeline::Pipeline;
use crate::results::{ResultCollection, StatementResult};
use crate::session::SessionHandle;
use crate::statement::{Batched, Statement, flatten};
use crate::transaction::Tx;

/// One alias bound to one endpoint.
///
/// The driver is built when the connection is created; the session is opened
/// on first use and reused for every later call.
pub struct Connection {
    alias: String,
    uri: String,
    driver: Driver,
    connector: Arc<dyn Connector>,
    session: OnceCell<SessionHandle>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("alias", &self.alias)
            .field("uri", &redact(&self.uri))
            .field("protocol", &self.driver.protocol())
            .field("connected", &self.session.initialized())
            .finish()
    }
}

impl Connection {
    /// # Errors
    /// Returns `ConfigError` if the URI scheme is not recognised or the URI is malformed.
    pub fn new(
        alias: impl Into<String>,
        uri: impl Into<String>,
        config: DriverConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, GraphMiddlewareError> {
        let uri = uri.into();
        let driver = Driver::from_uri(&uri, config)?;
        Ok(Self {
            alias: alias.into(),
            uri,
            driver,
            connector,
            session: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The URI as registered, credentials included.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.initialized()
    }

    /// The connection's session, opened through the connector on first call.
    ///
    /// Concurrent first callers wait on the same attempt. A failed attempt is
    /// not cached; the next call tries again.
    ///
    /// # Errors
    /// Returns whatever the connector raises.
    pub async fn session(&self) -> Result<SessionHandle, GraphMiddlewareError> {
        self.session
            .get_or_try_init(|| async {
                tracing::debug!(
                    alias = %self.alias,
                    endpoint = %self.driver.endpoint(),
                    protocol = ?self.driver.protocol(),
                    "opening session"
                );
                self.connector.connect(&self.driver).await
            })
            .await
            .cloned()
    }

    /// Run one autocommit statement.
    ///
    /// # Errors
    /// Returns `InvalidStatement` for empty text, or the connector/transport error.
    pub async fn run(&self, statement: Statement) -> Result<StatementResult, GraphMiddlewareError> {
        statement.validate()?;
        self.session().await?.run(statement).await
    }

    /// # Errors
    /// Returns the connector error if the session cannot be opened.
    pub async fn create_pipeline(
        &self,
        first: Option<Statement>,
    ) -> Result<Pipeline, GraphMiddlewareError> {
        Ok(self.session().await?.create_pipeline(first))
    }

    /// Flatten statements and stacks into one pipeline and send it.
    ///
    /// # Errors
    /// See [`Pipeline::run`].
    pub async fn run_mixed(
        &self,
        items: Vec<Batched>,
        tag: Option<String>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        let mut pipeline = self.create_pipeline(None).await?;
        pipeline.extend(flatten(items));
        if let Some(tag) = tag {
            pipeline.set_tag(tag);
        }
        pipeline.run().await
    }

    /// An unstarted transaction on this connection's session.
    ///
    /// # Errors
    /// Returns the connector error if the session cannot be opened.
    pub async fn transaction(&self) -> Result<Tx, GraphMiddlewareError> {
        Ok(self.session().await?.transaction())
    }
}
