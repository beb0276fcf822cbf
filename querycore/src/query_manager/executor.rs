// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::collections::HashMap;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use super::collaborators::{AggregationPipeline, MetricsQueryRunner, QueryIdSource, SegmentScanner};
use super::diagnostics::log_query_node;
use super::registry::QueryRegistry;
use super::running_query::{QueryState, QueryStateEvent, RunningQueryState};
use crate::log::node_result::NodeResult;
use crate::metric::metrics_result::MetricsResult;
use crate::request_manager::metrics_arithmetic::apply_query_arithmetic;
use crate::request_manager::query_arithmetic::QueryArithmetic;
use crate::request_manager::query_structs::{
  AstNode, MetricsQuery, MetricsTimeRange, QueryAggregators, QueryContext,
};
use crate::utils::config::QuerySettings;
use crate::utils::error::QueryError;
use crate::utils::sync::Arc;

/// Drives log and metrics queries to a result, tracking each query in the registry.
#[derive(Clone)]
pub struct QueryExecutor {
  settings: QuerySettings,
  registry: Arc<dyn QueryRegistry>,
  scanner: Arc<dyn SegmentScanner>,
  pipeline: Arc<dyn AggregationPipeline>,
  metrics_runner: Arc<dyn MetricsQueryRunner>,
  id_source: Arc<dyn QueryIdSource>,
}

impl QueryExecutor {
  pub fn new(
    settings: QuerySettings,
    registry: Arc<dyn QueryRegistry>,
    scanner: Arc<dyn SegmentScanner>,
    pipeline: Arc<dyn AggregationPipeline>,
    metrics_runner: Arc<dyn MetricsQueryRunner>,
    id_source: Arc<dyn QueryIdSource>,
  ) -> Self {
    QueryExecutor {
      settings,
      registry,
      scanner,
      pipeline,
      metrics_runner,
      id_source,
    }
  }

  pub fn get_settings(&self) -> &QuerySettings {
    &self.settings
  }

  /// Execute a log query on the calling thread.
  ///
  /// The first `scroll` records of the query context are skipped, and the
  /// result's total count is the number of records matched by the filter. The
  /// query is removed from the registry before returning.
  pub fn execute_query(
    &self,
    ast_node: &AstNode,
    aggs: Option<&QueryAggregators>,
    qid: u64,
    query_context: &QueryContext,
  ) -> NodeResult {
    let rqs = match self.registry.start_query(qid, false) {
      Ok(rqs) => rqs,
      Err(err) => {
        error!("qid={}, Failed to start query: {}", qid, err);
        return NodeResult::new_with_error(err);
      }
    };

    let mut result = self.execute_query_body(&rqs, ast_node, aggs, query_context);
    result.apply_scroll(query_context.get_scroll());

    match self.registry.get_num_matched_records(qid) {
      Ok(count) => result.set_total_rrc_count(count),
      Err(err) => error!("qid={}, Failed to get the number of matched records: {}", qid, err),
    }

    self.registry.delete_query(qid);
    result
  }

  /// Execute a log query on a background task and return the consumer side of
  /// its state channel.
  ///
  /// The channel receives `Running`, then either `Complete` or `Error`, and is
  /// closed afterwards. The query stays in the registry: the caller must delete
  /// it once done. Nothing is scheduled when registration fails.
  pub fn execute_async_query(
    &self,
    ast_node: AstNode,
    aggs: Option<QueryAggregators>,
    qid: u64,
    query_context: QueryContext,
  ) -> Result<mpsc::Receiver<QueryStateEvent>, QueryError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| QueryError::NoAsyncRuntime)?;

    let rqs = self.registry.start_query(qid, true).map_err(|err| {
      error!("qid={}, Failed to start async query: {}", qid, err);
      err
    })?;

    let Some(receiver) = rqs.take_state_receiver() else {
      error!("qid={}, State channel already taken", qid);
      self.registry.delete_query(qid);
      return Err(QueryError::RegistryError(format!(
        "state channel for qid {} already taken",
        qid
      )));
    };

    let executor = self.clone();
    handle.spawn(async move {
      executor
        .run_async_query(rqs, ast_node, aggs, query_context)
        .await;
    });

    Ok(receiver)
  }

  /// Execute a single metrics query on the calling thread.
  pub fn execute_metrics_query(
    &self,
    mquery: &MetricsQuery,
    time_range: &MetricsTimeRange,
    qid: u64,
  ) -> MetricsResult {
    match self.run_metrics_query(mquery, time_range, qid) {
      Ok(result) => {
        info!(
          "qid={}, Metrics query returned {} series",
          qid,
          result.get_num_series()
        );
        result
      }
      Err(err) => MetricsResult::new_with_error(err),
    }
  }

  /// Execute metrics sub-queries one after the other and combine their results
  /// with `query_ops`. Each sub-query result is keyed by the hash at the same
  /// position in `hash_list`. The first sub-query runs with `qid`, the following
  /// ones with ids taken from the query id source.
  pub fn execute_multiple_metrics_query(
    &self,
    hash_list: &[u64],
    mqueries: &[MetricsQuery],
    query_ops: &[QueryArithmetic],
    time_range: &MetricsTimeRange,
    qid: u64,
  ) -> MetricsResult {
    if hash_list.len() != mqueries.len() {
      return MetricsResult::new_with_error(QueryError::MetricsQueryError(format!(
        "got {} hashes for {} metrics queries",
        hash_list.len(),
        mqueries.len()
      )));
    }

    if self.settings.get_log_query_structures() {
      log_query_node("QueryArithmetic:", query_ops, qid);
    }

    let mut res_map = HashMap::with_capacity(mqueries.len());
    let mut qid = qid;
    for (hash, mquery) in hash_list.iter().zip(mqueries) {
      let result = match self.run_metrics_query(mquery, time_range, qid) {
        Ok(result) => result,
        Err(err) => return MetricsResult::new_with_error(err),
      };
      qid = self.id_source.next_qid();

      if mqueries.len() == 1 && query_ops.is_empty() {
        return result;
      }
      res_map.insert(*hash, result);
    }

    apply_query_arithmetic(query_ops, res_map)
  }

  async fn run_async_query(
    &self,
    rqs: Arc<RunningQueryState>,
    ast_node: AstNode,
    aggs: Option<QueryAggregators>,
    query_context: QueryContext,
  ) {
    let qid = rqs.get_qid();
    let timeout = self.settings.get_state_send_timeout();
    let has_next = aggs.as_ref().map_or(false, QueryAggregators::has_next);

    // Keep a slot for the terminal event so that a slow consumer still gets the result.
    let terminal_permit = rqs.reserve_terminal_slot();
    rqs.send_event(QueryStateEvent::Running { qid }, timeout).await;

    let executor = self.clone();
    let body_rqs = rqs.clone();
    let body = tokio::task::spawn_blocking(move || {
      executor.execute_query_body(&body_rqs, &ast_node, aggs.as_ref(), &query_context)
    })
    .await;

    let event = match body {
      Ok(result) if !result.has_errors() => {
        if has_next {
          if let Err(err) = self.registry.set_final_stats(qid, &result) {
            error!("qid={}, Failed to set final stats: {}", qid, err);
          }
        }
        QueryStateEvent::Complete { qid, result }
      }
      Ok(result) => QueryStateEvent::Error {
        qid,
        err_list: result.get_err_list().to_vec(),
      },
      Err(err) => {
        error!("qid={}, Query task failed: {}", qid, err);
        rqs.set_state(QueryState::Failed);
        QueryStateEvent::Error {
          qid,
          err_list: vec![QueryError::from(err)],
        }
      }
    };

    rqs
      .send_terminal_event(terminal_permit, event, timeout)
      .await;
    rqs.close_state_chan();
    debug!("qid={}, Async query finished", qid);
  }

  fn execute_query_body(
    &self,
    rqs: &RunningQueryState,
    ast_node: &AstNode,
    aggs: Option<&QueryAggregators>,
    query_context: &QueryContext,
  ) -> NodeResult {
    let result = self.execute_query_internal(rqs, ast_node, aggs, query_context);
    let state = if result.has_errors() {
      QueryState::Failed
    } else {
      QueryState::Completed
    };
    rqs.set_state(state);
    result
  }

  fn execute_query_internal(
    &self,
    rqs: &RunningQueryState,
    ast_node: &AstNode,
    aggs: Option<&QueryAggregators>,
    query_context: &QueryContext,
  ) -> NodeResult {
    let qid = rqs.get_qid();
    rqs.set_state(QueryState::Running);
    let start_time = Utc::now().timestamp_millis();

    if self.settings.get_log_query_structures() {
      log_query_node("AstNode:", ast_node, qid);
      log_query_node("QueryAggregators:", &aggs, qid);
      log_query_node("QueryContext:", query_context, qid);
    }

    if query_context.get_num_tables() == 0 {
      error!("qid={}, No tables to search", qid);
      return NodeResult::new_with_error(QueryError::EmptyIndexNames);
    }

    let size_limit = usize::try_from(query_context.get_effective_size_limit()).unwrap_or(usize::MAX);

    if let Some(aggs) = aggs.filter(|aggs| aggs.is_vector_arithmetic()) {
      let result = self.pipeline.apply_vector_arithmetic(aggs, qid);
      info!(
        "qid={}, Finished vector arithmetic in {} ms",
        qid,
        Utc::now().timestamp_millis() - start_time
      );
      return result;
    }

    let mut result = self.scanner.apply_filter_operator(
      ast_node,
      ast_node.get_time_range(),
      aggs,
      qid,
      query_context,
    );
    rqs.set_num_matched_records(result.get_all_records().len() as u64);

    if let Some(aggs) = aggs {
      let total_segments = match self.registry.get_total_segments_to_search(qid) {
        Ok(total_segments) => total_segments,
        Err(err) => {
          warn!("qid={}, Failed to get the total segments to search: {}", qid, err);
          0
        }
      };
      result = self
        .pipeline
        .post_query_bucket_cleaning(result, aggs, total_segments);
    }

    result.truncate(size_limit);

    info!(
      "qid={}, Finished execution in {} ms",
      qid,
      Utc::now().timestamp_millis() - start_time
    );
    result
  }

  fn run_metrics_query(
    &self,
    mquery: &MetricsQuery,
    time_range: &MetricsTimeRange,
    qid: u64,
  ) -> Result<MetricsResult, QueryError> {
    let rqs = self.registry.start_query(qid, false).map_err(|err| {
      error!("qid={}, Failed to start metrics query: {}", qid, err);
      err
    })?;
    rqs.set_state(QueryState::Running);

    if self.settings.get_log_query_structures() {
      log_query_node("MetricsQuery:", mquery, qid);
    }

    let result = self.metrics_runner.apply_metrics_query(mquery, time_range, qid);
    let state = if result.has_errors() {
      QueryState::Failed
    } else {
      QueryState::Completed
    };
    rqs.set_state(state);

    self.registry.delete_query(qid);
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use mockall::predicate::eq;

  use super::*;
  use crate::log::node_result::RecordRef;
  use crate::metric::metrics_result::{MetricsResultState, SeriesMap, TimeSeriesValues};
  use crate::query_manager::collaborators::QueryIdGenerator;
  use crate::query_manager::registry::{InMemoryQueryRegistry, MockQueryRegistry};
  use crate::request_manager::query_arithmetic::BinaryOperator;
  use crate::request_manager::query_structs::{PipeCommandType, TimeRange};
  use crate::utils::sync::{is_sync_send, Mutex};

  struct FakeScanner {
    num_records: u16,
    num_calls: Mutex<usize>,
  }

  impl SegmentScanner for FakeScanner {
    fn apply_filter_operator(
      &self,
      _ast_node: &AstNode,
      _time_range: &TimeRange,
      _aggs: Option<&QueryAggregators>,
      _qid: u64,
      _query_context: &QueryContext,
    ) -> NodeResult {
      *self.num_calls.lock() += 1;
      NodeResult::new_with_records(create_records(self.num_records))
    }
  }

  #[derive(Default)]
  struct FakePipeline {
    total_segments_seen: Mutex<Vec<u64>>,
  }

  impl AggregationPipeline for FakePipeline {
    fn post_query_bucket_cleaning(
      &self,
      mut node_result: NodeResult,
      _aggs: &QueryAggregators,
      total_segments: u64,
    ) -> NodeResult {
      self.total_segments_seen.lock().push(total_segments);
      // Keep every other record, in reverse order.
      let records = node_result
        .take_all_records()
        .into_iter()
        .rev()
        .step_by(2)
        .collect();
      NodeResult::new_with_records(records)
    }

    fn apply_vector_arithmetic(&self, _aggs: &QueryAggregators, _qid: u64) -> NodeResult {
      NodeResult::new_with_records(vec![RecordRef::new("vector", 0, 0)])
    }
  }

  #[derive(Default)]
  struct FakeMetricsRunner {
    qids_seen: Mutex<Vec<u64>>,
  }

  impl MetricsQueryRunner for FakeMetricsRunner {
    fn apply_metrics_query(
      &self,
      mquery: &MetricsQuery,
      _time_range: &MetricsTimeRange,
      qid: u64,
    ) -> MetricsResult {
      self.qids_seen.lock().push(qid);
      let metric_name = mquery.get_metric_name();
      let value = if metric_name == "cpu" { 4.0 } else { 2.0 };
      let results = SeriesMap::from([(
        format!("{}{{host=a}}", metric_name),
        TimeSeriesValues::from([(0, value)]),
      )]);
      MetricsResult::new_with_params(metric_name, results, MetricsResultState::Raw)
    }
  }

  struct TestExecutor {
    executor: QueryExecutor,
    registry: Arc<InMemoryQueryRegistry>,
    scanner: Arc<FakeScanner>,
    pipeline: Arc<FakePipeline>,
    metrics_runner: Arc<FakeMetricsRunner>,
  }

  fn init_logger() {
    let _ = env_logger::builder()
      .is_test(true)
      .filter_level(log::LevelFilter::Debug)
      .try_init();
  }

  fn create_records(count: u16) -> Vec<RecordRef> {
    (0..count).map(|i| RecordRef::new("seg-1", 0, i)).collect()
  }

  fn create_executor(num_records: u16) -> TestExecutor {
    create_executor_with_settings(num_records, QuerySettings::new_with_params(1, 5000, true))
  }

  fn create_executor_with_settings(num_records: u16, settings: QuerySettings) -> TestExecutor {
    init_logger();

    let registry = Arc::new(InMemoryQueryRegistry::new_with_settings(&settings));
    let scanner = Arc::new(FakeScanner {
      num_records,
      num_calls: Mutex::new(0),
    });
    let pipeline = Arc::new(FakePipeline::default());
    let metrics_runner = Arc::new(FakeMetricsRunner::default());
    let executor = QueryExecutor::new(
      settings,
      registry.clone(),
      scanner.clone(),
      pipeline.clone(),
      metrics_runner.clone(),
      Arc::new(QueryIdGenerator::new(1)),
    );

    TestExecutor {
      executor,
      registry,
      scanner,
      pipeline,
      metrics_runner,
    }
  }

  fn create_executor_with_registry(registry: MockQueryRegistry) -> QueryExecutor {
    init_logger();
    QueryExecutor::new(
      QuerySettings::default(),
      Arc::new(registry),
      Arc::new(FakeScanner {
        num_records: 5,
        num_calls: Mutex::new(0),
      }),
      Arc::new(FakePipeline::default()),
      Arc::new(FakeMetricsRunner::default()),
      Arc::new(QueryIdGenerator::default()),
    )
  }

  fn create_query_context(size_limit: Option<u64>, scroll: usize) -> QueryContext {
    QueryContext::new(vec!["logs".to_owned()], size_limit, scroll, 0)
  }

  fn create_ast_node() -> AstNode {
    AstNode::new("level:error", TimeRange::new(0, 1000))
  }

  fn get_record_nums(result: &NodeResult) -> Vec<u16> {
    result
      .get_all_records()
      .iter()
      .map(|record| record.get_record_num())
      .collect()
  }

  async fn drain(receiver: &mut mpsc::Receiver<QueryStateEvent>) -> Vec<QueryStateEvent> {
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
      events.push(event);
    }
    events
  }

  #[test]
  fn check_query_executor_sync_send() {
    is_sync_send::<QueryExecutor>();
  }

  #[test]
  fn test_execute_query_truncate_and_scroll() {
    let te = create_executor(10);

    let result = te
      .executor
      .execute_query(&create_ast_node(), None, 1, &create_query_context(Some(4), 1));
    assert!(!result.has_errors());
    assert_eq!(get_record_nums(&result), vec![1, 2, 3]);
    assert_eq!(result.get_total_rrc_count(), 10);
    assert_eq!(te.registry.num_running_queries(), 0);
  }

  #[test]
  fn test_execute_query_no_size_limit() {
    let te = create_executor(10);

    let query_context = QueryContext::new_with_raw_size_limit(vec!["logs".to_owned()], u64::MAX, 0, 0);
    let result = te
      .executor
      .execute_query(&create_ast_node(), None, 1, &query_context);
    assert_eq!(result.get_all_records().len(), 10);
  }

  #[test]
  fn test_execute_query_empty_tables() {
    let te = create_executor(10);

    let query_context = QueryContext::new(vec![], None, 0, 0);
    let result = te
      .executor
      .execute_query(&create_ast_node(), None, 1, &query_context);
    assert_eq!(result.get_err_list(), &[QueryError::EmptyIndexNames]);
    assert!(result.get_all_records().is_empty());
    assert_eq!(*te.scanner.num_calls.lock(), 0);
    assert_eq!(te.registry.num_running_queries(), 0);
  }

  #[test]
  fn test_execute_query_with_aggregators() {
    let te = create_executor(6);
    let aggs = QueryAggregators::new(PipeCommandType::GroupBy, "stats count by host");

    let rqs_registry = te.registry.clone();
    let result = te.executor.execute_query(
      &create_ast_node(),
      Some(&aggs),
      3,
      &create_query_context(Some(2), 0),
    );
    assert_eq!(get_record_nums(&result), vec![5, 3]);
    assert_eq!(result.get_total_rrc_count(), 6);
    assert_eq!(*te.pipeline.total_segments_seen.lock(), vec![0]);
    assert!(rqs_registry.get_running_query(3).is_none());
  }

  #[test]
  fn test_execute_query_vector_arithmetic() {
    let te = create_executor(6);
    let aggs = QueryAggregators::new(PipeCommandType::VectorArithmeticExpr, "1 + 2");

    let result = te.executor.execute_query(
      &create_ast_node(),
      Some(&aggs),
      1,
      &create_query_context(None, 0),
    );
    assert_eq!(result.get_all_records(), &[RecordRef::new("vector", 0, 0)]);
    assert_eq!(*te.scanner.num_calls.lock(), 0);
  }

  #[test]
  fn test_execute_query_start_failure() {
    let mut registry = MockQueryRegistry::new();
    registry
      .expect_start_query()
      .returning(|_, _| Err(QueryError::RegistryError("registry is full".to_owned())));
    registry.expect_delete_query().times(0);
    let executor = create_executor_with_registry(registry);

    let result = executor.execute_query(&create_ast_node(), None, 1, &create_query_context(None, 0));
    assert_eq!(
      result.get_err_list(),
      &[QueryError::RegistryError("registry is full".to_owned())]
    );
    assert!(result.get_all_records().is_empty());
  }

  #[test]
  fn test_execute_query_matched_count_failure_is_not_fatal() {
    let mut registry = MockQueryRegistry::new();
    registry
      .expect_start_query()
      .returning(|qid, is_async| Ok(Arc::new(RunningQueryState::new(qid, is_async, 1))));
    registry
      .expect_get_num_matched_records()
      .returning(|qid| Err(QueryError::QueryNotFound(qid)));
    registry.expect_delete_query().times(1).return_const(());
    let executor = create_executor_with_registry(registry);

    let result = executor.execute_query(&create_ast_node(), None, 1, &create_query_context(None, 0));
    assert!(!result.has_errors());
    assert_eq!(result.get_all_records().len(), 5);
    assert_eq!(result.get_total_rrc_count(), 0);
  }

  #[tokio::test]
  async fn test_execute_async_query() {
    let te = create_executor(5);

    let mut receiver = te
      .executor
      .execute_async_query(create_ast_node(), None, 7, create_query_context(Some(3), 0))
      .unwrap();
    let events = drain(&mut receiver).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], QueryStateEvent::Running { qid: 7 });
    match &events[1] {
      QueryStateEvent::Complete { qid, result } => {
        assert_eq!(*qid, 7);
        assert_eq!(get_record_nums(result), vec![0, 1, 2]);
      }
      event => panic!("unexpected event {:?}", event),
    }

    // The caller owns the cleanup of async queries.
    let rqs = te.registry.get_running_query(7).unwrap();
    assert_eq!(rqs.get_state(), QueryState::Completed);
    assert_eq!(rqs.get_final_num_records(), None);
    te.registry.delete_query(7);
    assert_eq!(te.registry.num_running_queries(), 0);
  }

  #[tokio::test]
  async fn test_execute_async_query_slow_consumer() {
    let te = create_executor_with_settings(4, QuerySettings::new_with_params(1, 50, false));

    let mut receiver = te
      .executor
      .execute_async_query(create_ast_node(), None, 12, create_query_context(None, 0))
      .unwrap();

    // Only start reading well after the send timeout has expired.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let events = drain(&mut receiver).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], QueryStateEvent::Running { qid: 12 });
    match &events[1] {
      QueryStateEvent::Complete { qid, result } => {
        assert_eq!(*qid, 12);
        assert_eq!(result.get_all_records().len(), 4);
      }
      event => panic!("unexpected event {:?}", event),
    }
  }

  #[tokio::test]
  async fn test_execute_async_query_sets_final_stats() {
    let te = create_executor(6);
    let aggs = QueryAggregators::new_with_next(
      PipeCommandType::GroupBy,
      "stats count by host",
      QueryAggregators::new(PipeCommandType::OutputTransform, "sort count"),
    );

    let mut receiver = te
      .executor
      .execute_async_query(create_ast_node(), Some(aggs), 8, create_query_context(None, 0))
      .unwrap();
    let events = drain(&mut receiver).await;

    assert!(matches!(events.last(), Some(QueryStateEvent::Complete { qid: 8, .. })));
    let rqs = te.registry.get_running_query(8).unwrap();
    assert_eq!(rqs.get_final_num_records(), Some(3));
    assert_eq!(rqs.get_num_matched_records(), 6);
  }

  #[tokio::test]
  async fn test_execute_async_query_error() {
    let te = create_executor(5);

    let query_context = QueryContext::new(vec![], None, 0, 0);
    let mut receiver = te
      .executor
      .execute_async_query(create_ast_node(), None, 9, query_context)
      .unwrap();
    let events = drain(&mut receiver).await;

    assert_eq!(
      events,
      vec![
        QueryStateEvent::Running { qid: 9 },
        QueryStateEvent::Error {
          qid: 9,
          err_list: vec![QueryError::EmptyIndexNames],
        },
      ]
    );
    assert_eq!(
      te.registry.get_running_query(9).unwrap().get_state(),
      QueryState::Failed
    );
  }

  #[tokio::test]
  async fn test_execute_async_query_start_failure() {
    let te = create_executor(5);
    te.registry.start_query(10, false).unwrap();

    let result = te
      .executor
      .execute_async_query(create_ast_node(), None, 10, create_query_context(None, 0));
    assert_eq!(result.unwrap_err(), QueryError::QueryAlreadyRunning(10));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*te.scanner.num_calls.lock(), 0);
  }

  #[tokio::test]
  async fn test_execute_async_query_receiver_taken() {
    let mut registry = MockQueryRegistry::new();
    registry.expect_start_query().returning(|qid, is_async| {
      let rqs = RunningQueryState::new(qid, is_async, 1);
      let _ = rqs.take_state_receiver();
      Ok(Arc::new(rqs))
    });
    // The registered query is removed again since the caller gets no channel.
    registry
      .expect_delete_query()
      .with(eq(13))
      .times(1)
      .return_const(());
    let executor = create_executor_with_registry(registry);

    let result = executor.execute_async_query(create_ast_node(), None, 13, create_query_context(None, 0));
    assert!(matches!(result, Err(QueryError::RegistryError(_))));
  }

  #[test]
  fn test_execute_async_query_without_runtime() {
    let te = create_executor(5);

    let result = te
      .executor
      .execute_async_query(create_ast_node(), None, 11, create_query_context(None, 0));
    assert_eq!(result.unwrap_err(), QueryError::NoAsyncRuntime);
    assert_eq!(te.registry.num_running_queries(), 0);
  }

  #[test]
  fn test_execute_metrics_query() {
    let te = create_executor(0);

    let mquery = MetricsQuery::new("cpu", vec!["host=\"a\"".to_owned()], 0);
    let result = te
      .executor
      .execute_metrics_query(&mquery, &MetricsTimeRange::new(0, 60), 20);
    assert_eq!(result.get_num_series(), 1);
    assert_eq!(result.get_results()["cpu{host=a}"][&0], 4.0);
    assert_eq!(te.registry.num_running_queries(), 0);

    // A query id that is already running is rejected.
    te.registry.start_query(21, false).unwrap();
    let result = te
      .executor
      .execute_metrics_query(&mquery, &MetricsTimeRange::new(0, 60), 21);
    assert_eq!(result.get_err_list(), &[QueryError::QueryAlreadyRunning(21)]);
  }

  #[test]
  fn test_execute_multiple_metrics_query_single() {
    let te = create_executor(0);

    let mqueries = [MetricsQuery::new("cpu", vec![], 0)];
    let result = te.executor.execute_multiple_metrics_query(
      &[111],
      &mqueries,
      &[],
      &MetricsTimeRange::new(0, 60),
      100,
    );
    assert_eq!(result.get_state(), MetricsResultState::Raw);
    assert_eq!(result.get_metric_name(), "cpu");
    assert_eq!(*te.metrics_runner.qids_seen.lock(), vec![100]);
  }

  #[test]
  fn test_execute_multiple_metrics_query_with_arithmetic() {
    let te = create_executor(0);

    let mqueries = [
      MetricsQuery::new("cpu", vec![], 0),
      MetricsQuery::new("mem", vec![], 0),
    ];
    let ops = [QueryArithmetic::new_vector_op(
      111,
      222,
      BinaryOperator::Divide,
      false,
    )];
    let result = te.executor.execute_multiple_metrics_query(
      &[111, 222],
      &mqueries,
      &ops,
      &MetricsTimeRange::new(0, 60),
      100,
    );

    assert!(!result.has_errors());
    assert_eq!(result.get_state(), MetricsResultState::Aggregated);
    assert_eq!(result.get_results()["cpu{host=a}"][&0], 2.0);
    assert_eq!(*te.metrics_runner.qids_seen.lock(), vec![100, 1]);
    assert_eq!(te.registry.num_running_queries(), 0);
  }

  #[test]
  fn test_execute_multiple_metrics_query_registration_failure() {
    let te = create_executor(0);
    // The id source hands out 1 to the second sub-query.
    te.registry.start_query(1, false).unwrap();

    let mqueries = [
      MetricsQuery::new("cpu", vec![], 0),
      MetricsQuery::new("mem", vec![], 0),
    ];
    let ops = [QueryArithmetic::new_vector_op(
      111,
      222,
      BinaryOperator::Add,
      false,
    )];
    let result = te.executor.execute_multiple_metrics_query(
      &[111, 222],
      &mqueries,
      &ops,
      &MetricsTimeRange::new(0, 60),
      100,
    );

    assert_eq!(result.get_err_list(), &[QueryError::QueryAlreadyRunning(1)]);
    assert!(result.get_results().is_empty());
    assert_eq!(*te.metrics_runner.qids_seen.lock(), vec![100]);
    assert!(te.registry.get_running_query(100).is_none());
    assert_eq!(te.registry.num_running_queries(), 1);
  }

  #[test]
  fn test_execute_multiple_metrics_query_hash_mismatch() {
    let te = create_executor(0);

    let mqueries = [MetricsQuery::new("cpu", vec![], 0)];
    let result = te.executor.execute_multiple_metrics_query(
      &[1, 2],
      &mqueries,
      &[],
      &MetricsTimeRange::new(0, 60),
      100,
    );
    assert!(result.has_errors());
    assert!(te.metrics_runner.qids_seen.lock().is_empty());
  }
}
