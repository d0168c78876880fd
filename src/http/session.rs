use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};

use super::HttpDriver;
use super::body::{RequestBody, ResponseBody, parse_transaction_id};
use crate::error::GraphMiddlewareError;
use crate::results::{ResultCollection, StatementResult};
use crate::session::{Session, TransactionId};
use crate::statement::Statement;

/// Session over the HTTP transactional endpoint.
///
/// Holds one `reqwest::Client`, so keep-alive connections are shared by every
/// request the session makes. The driver's timeout applies per request.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    driver: HttpDriver,
}

impl HttpSession {
    /// # Errors
    /// Returns `HttpError` if the HTTP client cannot be built.
    pub fn new(driver: HttpDriver) -> Result<Self, GraphMiddlewareError> {
        let client = Client::builder().timeout(driver.config().timeout).build()?;
        Ok(Self { client, driver })
    }

    #[must_use]
    pub fn driver(&self) -> &HttpDriver {
        &self.driver
    }

    async fn post(
        &self,
        url: &str,
        statements: &[Statement],
    ) -> Result<ResponseBody, GraphMiddlewareError> {
        let request = self.client.post(url).json(&RequestBody::new(statements));
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<ResponseBody, GraphMiddlewareError> {
        let request = match self.driver.credentials() {
            Some(creds) => request.basic_auth(&creds.user, Some(&creds.password)),
            None => request,
        };
        let response = request
            .header(ACCEPT, "application/json; charset=UTF-8")
            .send()
            .await
            .map_err(|e| {
                GraphMiddlewareError::ConnectionError(format!("{}: {e}", self.driver.base_url()))
            })?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let decoded = if bytes.is_empty() {
            Ok(ResponseBody::default())
        } else {
            serde_json::from_slice::<ResponseBody>(&bytes)
        };
        if !status.is_success() {
            // a failed status never counts as success, even with a clean body
            if let Ok(body) = &decoded {
                body.check()?;
            }
            return Err(GraphMiddlewareError::ConnectionError(format!(
                "{} answered HTTP {status}",
                self.driver.base_url()
            )));
        }
        decoded.map_err(|e| {
            GraphMiddlewareError::ConnectionError(format!(
                "{} sent an unreadable body: {e}",
                self.driver.base_url()
            ))
        })
    }

    async fn send_batch(
        &self,
        url: &str,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        tracing::debug!(url, statements = statements.len(), "posting statements");
        let body = self.post(url, &statements).await?;
        body.into_results(statements)
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn run(&self, statement: Statement) -> Result<StatementResult, GraphMiddlewareError> {
        let results = self
            .send_batch(&self.driver.autocommit_url(), vec![statement])
            .await?;
        results.into_iter().next().ok_or_else(|| {
            GraphMiddlewareError::ExecutionError("endpoint returned no result".into())
        })
    }

    async fn run_pipeline(
        &self,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        self.send_batch(&self.driver.autocommit_url(), statements)
            .await
    }

    async fn begin(&self) -> Result<TransactionId, GraphMiddlewareError> {
        let body = self.post(&self.driver.begin_url(), &[]).await?;
        body.check()?;
        let commit = body.commit.as_deref().ok_or_else(|| {
            GraphMiddlewareError::ExecutionError("begin response carried no commit url".into())
        })?;
        parse_transaction_id(commit)
    }

    async fn push_to_transaction(
        &self,
        id: TransactionId,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        self.send_batch(&self.driver.transaction_url(id), statements)
            .await
    }

    async fn commit_transaction(&self, id: TransactionId) -> Result<(), GraphMiddlewareError> {
        self.post(&self.driver.commit_url(id), &[]).await?.check()
    }

    async fn rollback_transaction(&self, id: TransactionId) -> Result<(), GraphMiddlewareError> {
        let request = self.client.delete(self.driver.transaction_url(id));
        self.send(request).await?.check()
    }
}
