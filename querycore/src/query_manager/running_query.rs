// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::time::Duration;

use crossbeam::atomic::AtomicCell;
use log::{debug, warn};
use tokio::sync::mpsc;

use crate::log::node_result::NodeResult;
use crate::utils::error::QueryError;
use crate::utils::sync::Mutex;

/// Lifecycle of a query: Created -> Running -> {Completed, Failed} -> Deleted.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum QueryState {
  Created,
  Running,
  Completed,
  Failed,
  Deleted,
}

/// Events sent to the consumer of an asynchronous query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryStateEvent {
  /// The background task has started executing the query.
  Running { qid: u64 },

  /// The query finished. The final result is handed off to the consumer.
  Complete { qid: u64, result: NodeResult },

  /// The query failed with the given errors.
  Error { qid: u64, err_list: Vec<QueryError> },
}

/// Tracked state of one running query.
#[derive(Debug)]
pub struct RunningQueryState {
  qid: u64,
  is_async: bool,
  state: AtomicCell<QueryState>,

  /// Number of progress events the state channel buffers. One more slot is kept
  /// for the terminal event.
  state_channel_capacity: usize,

  /// Producer side of the state channel. Taken out (closing the channel) when the query finishes.
  state_sender: Mutex<Option<mpsc::Sender<QueryStateEvent>>>,

  /// Consumer side of the state channel. Handed to the caller once.
  state_receiver: Mutex<Option<mpsc::Receiver<QueryStateEvent>>>,

  num_matched_records: AtomicCell<u64>,
  total_segments: AtomicCell<u64>,
  final_num_records: AtomicCell<Option<u64>>,
}

impl RunningQueryState {
  /// Create a new RunningQueryState whose state channel buffers `state_channel_capacity`
  /// progress events, plus the terminal event.
  pub fn new(qid: u64, is_async: bool, state_channel_capacity: usize) -> Self {
    let state_channel_capacity = state_channel_capacity.max(1);
    let (sender, receiver) = mpsc::channel(state_channel_capacity + 1);
    RunningQueryState {
      qid,
      is_async,
      state: AtomicCell::new(QueryState::Created),
      state_channel_capacity,
      state_sender: Mutex::new(Some(sender)),
      state_receiver: Mutex::new(Some(receiver)),
      num_matched_records: AtomicCell::new(0),
      total_segments: AtomicCell::new(0),
      final_num_records: AtomicCell::new(None),
    }
  }

  pub fn get_qid(&self) -> u64 {
    self.qid
  }

  pub fn is_async(&self) -> bool {
    self.is_async
  }

  pub fn get_state(&self) -> QueryState {
    self.state.load()
  }

  pub fn set_state(&self, state: QueryState) {
    self.state.store(state);
  }

  pub fn get_state_channel_capacity(&self) -> usize {
    self.state_channel_capacity
  }

  /// Take the consumer side of the state channel. Returns None if it was already taken.
  pub fn take_state_receiver(&self) -> Option<mpsc::Receiver<QueryStateEvent>> {
    self.state_receiver.lock().take()
  }

  /// Send an event to the consumer, giving up after `timeout`. Returns whether the event was sent.
  pub async fn send_event(&self, event: QueryStateEvent, timeout: Duration) -> bool {
    // Clone the sender so that the lock is not held across the await.
    let sender = self.state_sender.lock().clone();
    let Some(sender) = sender else {
      debug!("qid={}, State channel already closed, dropping event", self.qid);
      return false;
    };

    match tokio::time::timeout(timeout, sender.send(event)).await {
      Ok(Ok(())) => true,
      Ok(Err(_)) => {
        debug!("qid={}, State channel receiver dropped", self.qid);
        false
      }
      Err(_) => {
        warn!(
          "qid={}, Timed out after {:?} sending a state event",
          self.qid, timeout
        );
        false
      }
    }
  }

  /// Reserve the channel slot of the terminal event. Must be called before any
  /// progress event is sent, while the channel is still empty. Returns None when
  /// the channel is closed.
  pub fn reserve_terminal_slot(&self) -> Option<mpsc::OwnedPermit<QueryStateEvent>> {
    let sender = self.state_sender.lock().clone()?;
    match sender.try_reserve_owned() {
      Ok(permit) => Some(permit),
      Err(err) => {
        warn!("qid={}, Could not reserve the terminal state event: {}", self.qid, err);
        None
      }
    }
  }

  /// Send the terminal event of the query. With a reserved slot the event is
  /// delivered however late the consumer reads; otherwise it is sent like any
  /// other event.
  pub async fn send_terminal_event(
    &self,
    permit: Option<mpsc::OwnedPermit<QueryStateEvent>>,
    event: QueryStateEvent,
    timeout: Duration,
  ) -> bool {
    match permit {
      Some(permit) => {
        permit.send(event);
        true
      }
      None => self.send_event(event, timeout).await,
    }
  }

  /// Close the producer side of the state channel. Idempotent.
  pub fn close_state_chan(&self) {
    self.state_sender.lock().take();
  }

  pub fn get_num_matched_records(&self) -> u64 {
    self.num_matched_records.load()
  }

  pub fn set_num_matched_records(&self, num_matched_records: u64) {
    self.num_matched_records.store(num_matched_records);
  }

  pub fn get_total_segments(&self) -> u64 {
    self.total_segments.load()
  }

  pub fn set_total_segments(&self, total_segments: u64) {
    self.total_segments.store(total_segments);
  }

  /// Final record count, once the statistics have been finalized.
  pub fn get_final_num_records(&self) -> Option<u64> {
    self.final_num_records.load()
  }

  pub fn set_final_num_records(&self, final_num_records: u64) {
    self.final_num_records.store(Some(final_num_records));
  }
}
