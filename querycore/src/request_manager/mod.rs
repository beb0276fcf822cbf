// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Query requests and the evaluation of arithmetic, comparison and set
//! operators between metrics results.
//!
//! Series of two results are matched on the labels that follow the metric name
//! in their group ids. `on`, `ignoring` and group modifiers are not supported.

pub mod binary_operator;
pub mod metrics_arithmetic;
pub mod query_arithmetic;
pub mod query_structs;
