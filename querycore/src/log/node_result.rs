// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use crate::utils::error::QueryError;

/// Reference to one matching record in a segment.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordRef {
  /// Key of the segment holding the record.
  segment_key: String,

  /// Block within the segment.
  block_num: u16,

  /// Record within the block.
  record_num: u16,
}

impl RecordRef {
  /// Create a new RecordRef.
  pub fn new(segment_key: &str, block_num: u16, record_num: u16) -> Self {
    RecordRef {
      segment_key: segment_key.to_owned(),
      block_num,
      record_num,
    }
  }

  pub fn get_segment_key(&self) -> &str {
    &self.segment_key
  }

  pub fn get_block_num(&self) -> u16 {
    self.block_num
  }

  pub fn get_record_num(&self) -> u16 {
    self.record_num
  }
}

/// Result of a log/event search. Handed from one pipeline stage to the next,
/// never shared between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeResult {
  all_records: Vec<RecordRef>,
  total_rrc_count: u64,
  err_list: Vec<QueryError>,
}

impl NodeResult {
  /// Create an empty NodeResult.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a NodeResult from the records matched by a search.
  pub fn new_with_records(all_records: Vec<RecordRef>) -> Self {
    NodeResult {
      all_records,
      total_rrc_count: 0,
      err_list: Vec::new(),
    }
  }

  /// Create a NodeResult that carries only an error.
  pub fn new_with_error(error: QueryError) -> Self {
    NodeResult {
      all_records: Vec::new(),
      total_rrc_count: 0,
      err_list: vec![error],
    }
  }

  pub fn get_all_records(&self) -> &[RecordRef] {
    &self.all_records
  }

  /// Take the records out of this result, leaving it empty.
  pub fn take_all_records(&mut self) -> Vec<RecordRef> {
    std::mem::take(&mut self.all_records)
  }

  pub fn get_total_rrc_count(&self) -> u64 {
    self.total_rrc_count
  }

  pub fn set_total_rrc_count(&mut self, total_rrc_count: u64) {
    self.total_rrc_count = total_rrc_count;
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

  /// Keep only the first `size_limit` records, preserving their order.
  pub fn truncate(&mut self, size_limit: usize) {
    self.all_records.truncate(size_limit);
  }

  /// Skip the first `scroll` records. Scrolling past the end leaves no records.
  pub fn apply_scroll(&mut self, scroll: usize) {
    if scroll == 0 {
      return;
    }

    if self.all_records.len() <= scroll {
      self.all_records.clear();
      return;
    }

    self.all_records.drain(..scroll);
  }
}
