// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use log::{debug, log_enabled, Level};
use serde::Serialize;

/// Serialize a query structure and log it at debug level, prefixed by `prefix`.
pub fn log_query_node<T: Serialize + ?Sized>(prefix: &str, node: &T, qid: u64) {
  if !log_enabled!(Level::Debug) {
    return;
  }

  match serialize_query_node(node) {
    Ok(json) => debug!("qid={}, {} {}", qid, prefix, json),
    Err(err) => debug!("qid={}, {} could not be serialized: {}", qid, prefix, err),
  }
}

fn serialize_query_node<T: Serialize + ?Sized>(node: &T) -> Result<String, serde_json::Error> {
  serde_json::to_string(node)
}
