use crate::error::GraphMiddlewareError;
use crate::results::ResultCollection;
use crate::session::SessionHandle;
use crate::statement::Statement;

/// Statements buffered client-side and sent to one session in a single round trip.
#[derive(Debug)]
pub struct Pipeline {
    session: SessionHandle,
    statements: Vec<Statement>,
    tag: Option<String>,
}

impl Pipeline {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Self {
            session,
            statements: Vec::new(),
            tag: None,
        }
    }

    pub fn push(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
    }

    pub fn extend(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.extend(statements);
    }

    /// Tag copied onto the resulting `ResultCollection`.
    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = Some(tag.into());
    }

    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Send every buffered statement in one round trip.
    ///
    /// An empty pipeline returns an empty collection without contacting the endpoint.
    ///
    /// # Errors
    /// Returns `InvalidStatement` if any statement is empty (nothing is sent),
    /// `ExecutionError` if the session answers with a different number of results,
    /// or the transport error.
    pub async fn run(self) -> Result<ResultCollection, GraphMiddlewareError> {
        let Pipeline {
            session,
            statements,
            tag,
        } = self;
        if statements.is_empty() {
            return Ok(with_tag(ResultCollection::default(), tag));
        }
        for statement in &statements {
            statement.validate()?;
        }

        let expected = statements.len();
        tracing::debug!(statements = expected, "flushing pipeline");
        let results = session.session().run_pipeline(statements).await?;
        ensure_result_count(expected, &results)?;
        Ok(with_tag(results, tag))
    }
}

fn with_tag(mut results: ResultCollection, tag: Option<String>) -> ResultCollection {
    if let Some(tag) = tag {
        results.set_tag(tag);
    }
    results
}

/// A batch must answer with exactly one cursor per statement.
pub(crate) fn ensure_result_count(
    expected: usize,
    results: &ResultCollection,
) -> Result<(), GraphMiddlewareError> {
    if results.len() != expected {
        return Err(GraphMiddlewareError::ExecutionError(format!(
            "sent {expected} statements but received {} results",
            results.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockSession, SessionCall};

    #[tokio::test]
    async fn results_follow_push_order() {
        let mock = MockSession::new();
        let handle = mock.handle();
        let mut pipeline = handle.create_pipeline(Some(Statement::new("A")));
        pipeline.push("B");
        pipeline.push(Statement::new("C").with_tag("c"));
        pipeline.set_tag("batch");

        let results = pipeline.run().await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.tag(), Some("batch"));
        let texts: Vec<_> = results.iter().map(|r| r.statement().text()).collect();
        assert_eq!(texts, ["A", "B", "C"]);
        assert!(results.by_tag("c").is_some());
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_pipeline_skips_round_trip() {
        let mock = MockSession::new();
        let results = mock.handle().create_pipeline(None).run().await.unwrap();
        assert!(results.is_empty());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_statement_blocks_whole_batch() {
        let mock = MockSession::new();
        let mut pipeline = mock.handle().create_pipeline(None);
        pipeline.push("RETURN 1");
        pipeline.push("");
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, GraphMiddlewareError::InvalidStatement(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn short_answers_are_rejected() {
        let mock = MockSession::new();
        mock.drop_last_result_in_pipelines();
        let mut pipeline = mock.handle().create_pipeline(None);
        pipeline.push("A");
        pipeline.push("B");
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, GraphMiddlewareError::ExecutionError(_)));
        assert!(matches!(mock.calls()[0], SessionCall::Pipeline(_)));
    }
}
