// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::collections::HashMap;

use crate::utils::error::QueryError;

/// Values of one series, keyed by timestamp (seconds from epoch).
pub type TimeSeriesValues = HashMap<u32, f64>;

/// Series keyed by group id. A group id is the metric name followed by the
/// sorted label pairs, e.g. `cpu{host:a,region:us}`.
pub type SeriesMap = HashMap<String, TimeSeriesValues>;

/// Processing state of a metrics result.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MetricsResultState {
  Raw,
  Aggregated,
}

/// Result of one metrics sub-query, or of combining several of them.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsResult {
  results: SeriesMap,
  metric_name: String,
  state: MetricsResultState,
  err_list: Vec<QueryError>,
}

impl MetricsResult {
  /// Create an empty raw result for the given metric name.
  pub fn new(metric_name: &str) -> Self {
    MetricsResult {
      results: SeriesMap::new(),
      metric_name: metric_name.to_owned(),
      state: MetricsResultState::Raw,
      err_list: Vec::new(),
    }
  }

  /// Create a result with the given series and state.
  pub fn new_with_params(metric_name: &str, results: SeriesMap, state: MetricsResultState) -> Self {
    MetricsResult {
      results,
      metric_name: metric_name.to_owned(),
      state,
      err_list: Vec::new(),
    }
  }

  /// Create a result that carries only an error.
  pub fn new_with_error(error: QueryError) -> Self {
    MetricsResult {
      results: SeriesMap::new(),
      metric_name: String::new(),
      state: MetricsResultState::Raw,
      err_list: vec![error],
    }
  }

  /// Create the aggregated result of a combination.
  pub fn new_aggregated(results: SeriesMap) -> Self {
    Self::new_with_params("", results, MetricsResultState::Aggregated)
  }

  pub fn get_results(&self) -> &SeriesMap {
    &self.results
  }

  /// Take the series out of this result, leaving it empty.
  pub fn take_results(&mut self) -> SeriesMap {
    std::mem::take(&mut self.results)
  }

  pub fn get_metric_name(&self) -> &str {
    &self.metric_name
  }

  pub fn get_state(&self) -> MetricsResultState {
    self.state
  }

  pub fn get_err_list(&self) -> &[QueryError] {
    &self.err_list
  }

  /// Append an error to this result.
  pub fn add_error(&mut self, error: QueryError) {
    self.err_list.push(error);
  }

  /// Whether any error was recorded on this result.
  pub fn has_errors(&self) -> bool {
    !self.err_list.is_empty()
  }

  /// Number of series (group ids) in this result.
  pub fn get_num_series(&self) -> usize {
    self.results.len()
  }

  /// Insert (or replace) the values of one series.
  pub fn insert_series(&mut self, group_id: &str, values: TimeSeriesValues) {
    self.results.insert(group_id.to_owned(), values);
  }
}
