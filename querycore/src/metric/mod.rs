// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Results of metrics queries.
//!
//! A result maps group ids, i.e. a metric name followed by a label set, to the
//! values of that time series keyed by timestamp.

pub mod metrics_result;
