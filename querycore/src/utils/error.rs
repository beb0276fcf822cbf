// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use thiserror::Error;

#[derive(Debug, Clone, Error, Eq, PartialEq)]
/// Enum for errors raised while executing a query. These are accumulated in the
/// error list of a result rather than returned up the call stack.
pub enum QueryError {
  #[error("Query already running for qid {0}.")]
  QueryAlreadyRunning(u64),

  #[error("Query not found for qid {0}.")]
  QueryNotFound(u64),

  #[error("empty array of Index Names provided")]
  EmptyIndexNames,

  #[error("no results found")]
  NoResultsFound,

  #[error("Query registry error: {0}")]
  RegistryError(String),

  #[error("Metrics query error: {0}")]
  MetricsQueryError(String),

  #[error("No async runtime available to run the query.")]
  NoAsyncRuntime,

  #[error("Query task failed: {0}")]
  TaskJoinError(String),
}

impl From<tokio::task::JoinError> for QueryError {
  fn from(error: tokio::task::JoinError) -> Self {
    QueryError::TaskJoinError(error.to_string())
  }
}
