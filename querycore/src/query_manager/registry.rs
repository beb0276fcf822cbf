// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;

use super::running_query::{QueryState, RunningQueryState};
use crate::log::node_result::NodeResult;
use crate::utils::config::QuerySettings;
use crate::utils::error::QueryError;
use crate::utils::sync::Arc;

/// Registry of running queries, keyed by query id.
///
/// `start_query` fails for an id that is already registered, and `delete_query`
/// may be called on an id that is no longer registered.
#[cfg_attr(test, mockall::automock)]
pub trait QueryRegistry: Send + Sync {
  /// Register a query and return its tracked state.
  fn start_query(&self, qid: u64, is_async: bool) -> Result<Arc<RunningQueryState>, QueryError>;

  /// Mark a query as deleted and stop tracking it.
  fn delete_query(&self, qid: u64);

  /// Number of records matched by the query's filter.
  fn get_num_matched_records(&self, qid: u64) -> Result<u64, QueryError>;

  /// Number of segments the query has to search.
  fn get_total_segments_to_search(&self, qid: u64) -> Result<u64, QueryError>;

  /// Record the final statistics of a query from its result.
  fn set_final_stats(&self, qid: u64, result: &NodeResult) -> Result<(), QueryError>;
}

/// QueryRegistry backed by a concurrent map.
#[derive(Debug)]
pub struct InMemoryQueryRegistry {
  running_queries: DashMap<u64, Arc<RunningQueryState>>,
  state_channel_capacity: usize,
}

impl InMemoryQueryRegistry {
  pub fn new(state_channel_capacity: usize) -> Self {
    InMemoryQueryRegistry {
      running_queries: DashMap::new(),
      state_channel_capacity,
    }
  }

  /// Create a registry whose queries get state channels sized from the settings.
  pub fn new_with_settings(settings: &QuerySettings) -> Self {
    Self::new(settings.get_state_channel_capacity())
  }

  /// Get the tracked state of a running query.
  pub fn get_running_query(&self, qid: u64) -> Option<Arc<RunningQueryState>> {
    self.running_queries.get(&qid).map(|entry| entry.value().clone())
  }

  /// Set the number of segments a query has to search.
  pub fn set_total_segments_to_search(&self, qid: u64, total_segments: u64) -> Result<(), QueryError> {
    let rqs = self.get_running_query_or_err(qid)?;
    rqs.set_total_segments(total_segments);
    Ok(())
  }

  pub fn num_running_queries(&self) -> usize {
    self.running_queries.len()
  }

  fn get_running_query_or_err(&self, qid: u64) -> Result<Arc<RunningQueryState>, QueryError> {
    self
      .get_running_query(qid)
      .ok_or(QueryError::QueryNotFound(qid))
  }
}

impl QueryRegistry for InMemoryQueryRegistry {
  fn start_query(&self, qid: u64, is_async: bool) -> Result<Arc<RunningQueryState>, QueryError> {
    match self.running_queries.entry(qid) {
      Entry::Occupied(_) => Err(QueryError::QueryAlreadyRunning(qid)),
      Entry::Vacant(entry) => {
        let rqs = Arc::new(RunningQueryState::new(
          qid,
          is_async,
          self.state_channel_capacity,
        ));
        entry.insert(rqs.clone());
        debug!("qid={}, Started query, is_async={}", qid, is_async);
        Ok(rqs)
      }
    }
  }

  fn delete_query(&self, qid: u64) {
    if let Some((_, rqs)) = self.running_queries.remove(&qid) {
      rqs.set_state(QueryState::Deleted);
      rqs.close_state_chan();
      debug!("qid={}, Deleted query", qid);
    }
  }

  fn get_num_matched_records(&self, qid: u64) -> Result<u64, QueryError> {
    Ok(self.get_running_query_or_err(qid)?.get_num_matched_records())
  }

  fn get_total_segments_to_search(&self, qid: u64) -> Result<u64, QueryError> {
    Ok(self.get_running_query_or_err(qid)?.get_total_segments())
  }

  fn set_final_stats(&self, qid: u64, result: &NodeResult) -> Result<(), QueryError> {
    let rqs = self.get_running_query_or_err(qid)?;
    rqs.set_final_num_records(result.get_all_records().len() as u64);
    Ok(())
  }
}
