// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Query execution core for logs and metrics.
//!
//! [`QueryExecutor`] drives a parsed log query (a filter tree plus an optional
//! aggregation pipeline) to a [`NodeResult`], either on the calling thread or on
//! a background task, and runs metrics sub-queries whose results are combined
//! with arithmetic, comparison and set operators into one [`MetricsResult`].
//!
//! Segment scan, aggregation and metrics lookups are performed by collaborators
//! injected into the executor, along with the [`QueryRegistry`] that tracks each
//! running query.

pub mod log;
pub mod metric;
pub mod query_manager;
pub mod request_manager;
pub mod utils;

pub use crate::log::node_result::{NodeResult, RecordRef};
pub use crate::metric::metrics_result::{MetricsResult, MetricsResultState, SeriesMap};
pub use crate::query_manager::collaborators::{
  AggregationPipeline, MetricsQueryRunner, QueryIdGenerator, QueryIdSource, SegmentScanner,
};
pub use crate::query_manager::executor::QueryExecutor;
pub use crate::query_manager::registry::{InMemoryQueryRegistry, QueryRegistry};
pub use crate::query_manager::running_query::{QueryState, QueryStateEvent, RunningQueryState};
pub use crate::utils::config::{QuerySettings, Settings};
pub use crate::utils::error::QueryError;
