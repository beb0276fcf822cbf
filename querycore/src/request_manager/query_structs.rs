// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Structures describing a parsed query, as handed to the executor by the
//! query-handling layer. The filter tree and aggregators are opaque here: they
//! are interpreted by the segment scanner and the aggregation pipeline.

use serde::{Deserialize, Serialize};

/// Time range of a log query, in milliseconds from epoch.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct TimeRange {
  start_epoch_ms: u64,
  end_epoch_ms: u64,
}

impl TimeRange {
  pub fn new(start_epoch_ms: u64, end_epoch_ms: u64) -> Self {
    TimeRange {
      start_epoch_ms,
      end_epoch_ms,
    }
  }

  pub fn get_start_epoch_ms(&self) -> u64 {
    self.start_epoch_ms
  }

  pub fn get_end_epoch_ms(&self) -> u64 {
    self.end_epoch_ms
  }
}

/// Time range of a metrics query, in seconds from epoch.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct MetricsTimeRange {
  start_epoch_sec: u32,
  end_epoch_sec: u32,
}

impl MetricsTimeRange {
  pub fn new(start_epoch_sec: u32, end_epoch_sec: u32) -> Self {
    MetricsTimeRange {
      start_epoch_sec,
      end_epoch_sec,
    }
  }

  pub fn get_start_epoch_sec(&self) -> u32 {
    self.start_epoch_sec
  }

  pub fn get_end_epoch_sec(&self) -> u32 {
    self.end_epoch_sec
  }
}

/// Root of a filter tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AstNode {
  /// Filter expression, in the syntax understood by the segment scanner.
  filter: String,

  /// Time range the filter applies to.
  time_range: TimeRange,
}

impl AstNode {
  pub fn new(filter: &str, time_range: TimeRange) -> Self {
    AstNode {
      filter: filter.to_owned(),
      time_range,
    }
  }

  pub fn get_filter(&self) -> &str {
    &self.filter
  }

  pub fn get_time_range(&self) -> &TimeRange {
    &self.time_range
  }
}

/// Kind of a stage in the aggregation pipeline.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum PipeCommandType {
  OutputTransform,
  MeasureAggregators,
  GroupBy,
  /// The whole query is an arithmetic expression over vectors; no filter is run.
  VectorArithmeticExpr,
}

/// One stage of the aggregation pipeline, with an optional continuation stage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryAggregators {
  pipe_command_type: PipeCommandType,

  /// Expression evaluated by this stage, in the syntax understood by the pipeline.
  expression: String,

  next: Option<Box<QueryAggregators>>,
}

impl QueryAggregators {
  /// Create a single-stage pipeline.
  pub fn new(pipe_command_type: PipeCommandType, expression: &str) -> Self {
    QueryAggregators {
      pipe_command_type,
      expression: expression.to_owned(),
      next: None,
    }
  }

  /// Create a pipeline stage followed by the given continuation stage.
  pub fn new_with_next(
    pipe_command_type: PipeCommandType,
    expression: &str,
    next: QueryAggregators,
  ) -> Self {
    QueryAggregators {
      pipe_command_type,
      expression: expression.to_owned(),
      next: Some(Box::new(next)),
    }
  }

  pub fn get_pipe_command_type(&self) -> PipeCommandType {
    self.pipe_command_type
  }

  pub fn get_expression(&self) -> &str {
    &self.expression
  }

  pub fn get_next(&self) -> Option<&QueryAggregators> {
    self.next.as_deref()
  }

  /// Whether this pipeline has a stage after the current one.
  pub fn has_next(&self) -> bool {
    self.next.is_some()
  }

  /// Whether the query is a pure vector-arithmetic expression.
  pub fn is_vector_arithmetic(&self) -> bool {
    self.pipe_command_type == PipeCommandType::VectorArithmeticExpr
  }
}

/// Per-query execution context.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueryContext {
  table_names: Vec<String>,

  /// Maximum number of records returned. None means no limit.
  size_limit: Option<u64>,

  /// Number of leading records to skip in synchronous results.
  scroll: usize,

  org_id: u64,
}

impl QueryContext {
  pub fn new(
    table_names: Vec<String>,
    size_limit: Option<u64>,
    scroll: usize,
    org_id: u64,
  ) -> Self {
    QueryContext {
      table_names,
      size_limit,
      scroll,
      org_id,
    }
  }

  /// Create a context from a raw size limit, where `u64::MAX` stands for "no limit".
  pub fn new_with_raw_size_limit(
    table_names: Vec<String>,
    raw_size_limit: u64,
    scroll: usize,
    org_id: u64,
  ) -> Self {
    let size_limit = if raw_size_limit == u64::MAX {
      None
    } else {
      Some(raw_size_limit)
    };
    Self::new(table_names, size_limit, scroll, org_id)
  }

  pub fn get_table_names(&self) -> &[String] {
    &self.table_names
  }

  pub fn get_num_tables(&self) -> usize {
    self.table_names.len()
  }

  pub fn get_size_limit(&self) -> Option<u64> {
    self.size_limit
  }

  /// Bound used when truncating results. It never exceeds `i64::MAX`, and no
  /// limit maps to `i64::MAX`.
  pub fn get_effective_size_limit(&self) -> u64 {
    let max_bound = i64::MAX as u64;
    self.size_limit.map_or(max_bound, |limit| limit.min(max_bound))
  }

  pub fn get_scroll(&self) -> usize {
    self.scroll
  }

  pub fn get_org_id(&self) -> u64 {
    self.org_id
  }
}

/// A single metrics sub-query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MetricsQuery {
  metric_name: String,

  /// Label matchers, e.g. `host="a"`, interpreted by the metrics query runner.
  label_matchers: Vec<String>,

  org_id: u64,
}

impl MetricsQuery {
  pub fn new(metric_name: &str, label_matchers: Vec<String>, org_id: u64) -> Self {
    MetricsQuery {
      metric_name: metric_name.to_owned(),
      label_matchers,
      org_id,
    }
  }

  pub fn get_metric_name(&self) -> &str {
    &self.metric_name
  }

  pub fn get_label_matchers(&self) -> &[String] {
    &self.label_matchers
  }

  pub fn get_org_id(&self) -> u64 {
    self.org_id
  }
}
