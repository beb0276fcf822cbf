// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Services the executor drives: segment scan, aggregation pipeline, metrics
//! query runner and query id source.

use crossbeam::atomic::AtomicCell;

use crate::log::node_result::NodeResult;
use crate::metric::metrics_result::MetricsResult;
use crate::request_manager::query_structs::{
  AstNode, MetricsQuery, MetricsTimeRange, QueryAggregators, QueryContext, TimeRange,
};

/// Runs a filter tree over the segments of the queried tables.
pub trait SegmentScanner: Send + Sync {
  /// Apply the filter to all segments in the time range. Partial failures are
  /// reported in the result's error list.
  fn apply_filter_operator(
    &self,
    ast_node: &AstNode,
    time_range: &TimeRange,
    aggs: Option<&QueryAggregators>,
    qid: u64,
    query_context: &QueryContext,
  ) -> NodeResult;
}

/// Post-processes raw search results with the query's aggregators.
pub trait AggregationPipeline: Send + Sync {
  /// Reshape and regroup the raw records of a search.
  fn post_query_bucket_cleaning(
    &self,
    node_result: NodeResult,
    aggs: &QueryAggregators,
    total_segments: u64,
  ) -> NodeResult;

  /// Evaluate a query that is a pure vector-arithmetic expression.
  fn apply_vector_arithmetic(&self, aggs: &QueryAggregators, qid: u64) -> NodeResult;
}

/// Runs a single metrics query.
pub trait MetricsQueryRunner: Send + Sync {
  fn apply_metrics_query(
    &self,
    mquery: &MetricsQuery,
    time_range: &MetricsTimeRange,
    qid: u64,
  ) -> MetricsResult;
}

/// Source of query ids. Ids must be unique among concurrently running queries.
pub trait QueryIdSource: Send + Sync {
  fn next_qid(&self) -> u64;
}

/// Monotonic query id source.
#[derive(Debug)]
pub struct QueryIdGenerator {
  next_qid: AtomicCell<u64>,
}

impl QueryIdGenerator {
  /// Create a generator whose first id is `first_qid`.
  pub fn new(first_qid: u64) -> Self {
    QueryIdGenerator {
      next_qid: AtomicCell::new(first_qid),
    }
  }
}

impl Default for QueryIdGenerator {
  fn default() -> Self {
    Self::new(1)
  }
}

impl QueryIdSource for QueryIdGenerator {
  fn next_qid(&self) -> u64 {
    self.next_qid.fetch_add(1)
  }
}
