//! JSON bodies of the transactional endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{GraphMiddlewareError, TransportFailure};
use crate::results::{ResultCollection, StatementResult, UpdateStatistics};
use crate::session::TransactionId;
use crate::statement::Statement;
use crate::types::{Value, params_to_json};

#[derive(Debug, Serialize)]
pub(crate) struct RequestBody<'a> {
    statements: Vec<RequestStatement<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestStatement<'a> {
    statement: &'a str,
    parameters: JsonValue,
    result_data_contents: [&'static str; 1],
    include_stats: bool,
}

impl<'a> RequestBody<'a> {
    pub(crate) fn new(statements: &'a [Statement]) -> Self {
        Self {
            statements: statements
                .iter()
                .map(|statement| RequestStatement {
                    statement: statement.text(),
                    parameters: params_to_json(statement.params()),
                    result_data_contents: ["row"],
                    include_stats: true,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseBody {
    #[serde(default)]
    results: Vec<ResponseResult>,
    #[serde(default)]
    errors: Vec<ResponseError>,
    /// Present when a transaction was opened or left open.
    #[serde(default)]
    pub(crate) commit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<ResponseRow>,
    #[serde(default)]
    stats: Option<UpdateStatistics>,
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    #[serde(default)]
    row: Vec<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    code: String,
    #[serde(default)]
    message: String,
}

impl ResponseBody {
    /// The first server error, as a typed transport failure.
    pub(crate) fn check(&self) -> Result<(), GraphMiddlewareError> {
        match self.errors.first() {
            Some(err) => Err(TransportFailure::new(err.code.clone(), err.message.clone()).into()),
            None => Ok(()),
        }
    }

    /// Pair each returned result with the statement that produced it.
    ///
    /// A count mismatch is left for the caller to reject.
    pub(crate) fn into_results(
        self,
        statements: Vec<Statement>,
    ) -> Result<ResultCollection, GraphMiddlewareError> {
        self.check()?;
        let results = statements
            .into_iter()
            .zip(self.results)
            .map(|(statement, raw)| {
                let mut result = StatementResult::new(statement, raw.columns);
                for row in raw.data {
                    result.push_record(row.row.iter().map(Value::from_json).collect());
                }
                if let Some(stats) = raw.stats {
                    result.set_stats(stats);
                }
                result
            })
            .collect();
        Ok(ResultCollection::new(results))
    }
}

/// The id is the second-to-last segment of `.../transaction/{id}/commit`.
pub(crate) fn parse_transaction_id(commit_url: &str) -> Result<TransactionId, GraphMiddlewareError> {
    let segments: Vec<&str> = commit_url.trim_end_matches('/').rsplit('/').collect();
    segments
        .get(1)
        .and_then(|segment| segment.parse::<u64>().ok())
        .map(TransactionId)
        .ok_or_else(|| {
            GraphMiddlewareError::ExecutionError(format!(
                "cannot read transaction id from \"{commit_url}\""
            ))
        })
}
