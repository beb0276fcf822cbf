// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Results of log/event searches.

pub mod node_result;
