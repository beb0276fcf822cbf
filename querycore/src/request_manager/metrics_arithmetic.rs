// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use std::collections::HashMap;

use log::{debug, warn};

use super::binary_operator::{apply_scalar_operation, apply_vector_operation};
use super::query_arithmetic::QueryArithmetic;
use crate::metric::metrics_result::{MetricsResult, SeriesMap};
use crate::utils::error::QueryError;

/// Combine sub-query results, keyed by sub-query hash, by applying `query_ops`
/// in order. The output of each step is merged into one final series map, later
/// steps overwriting group ids written by earlier ones.
///
/// A single result with no steps is returned as is. When no step produces any
/// series, a single result is returned as the (aggregated) final output, while
/// several results lead to a "no results found" error.
pub fn apply_query_arithmetic(
  query_ops: &[QueryArithmetic],
  mut res_map: HashMap<u64, MetricsResult>,
) -> MetricsResult {
  if res_map.len() == 1 && query_ops.is_empty() {
    if let Some(result) = res_map.into_values().next() {
      return result;
    }
    return MetricsResult::new_with_error(QueryError::NoResultsFound);
  }

  let mut final_result = SeriesMap::new();

  for query_op in query_ops {
    let step_result = if query_op.is_constant_op() {
      apply_constant_step(query_op, &res_map)
    } else {
      apply_vector_step(query_op, &res_map)
    };

    if let Some(step_result) = step_result {
      final_result.extend(step_result);
    }
  }

  if final_result.is_empty() {
    if res_map.len() != 1 {
      return MetricsResult::new_with_error(QueryError::NoResultsFound);
    }

    // Steps between constants only are not evaluated, so the result is passed through.
    if let Some(result) = res_map.values_mut().next() {
      final_result = result.take_results();
    }
  }

  MetricsResult::new_aggregated(final_result)
}

// Returns None when neither side resolves to a result, i.e. both sides are constants.
fn apply_constant_step(
  query_op: &QueryArithmetic,
  res_map: &HashMap<u64, MetricsResult>,
) -> Option<SeriesMap> {
  let (series, swapped) = match res_map.get(&query_op.get_lhs()) {
    Some(result) => (result, false),
    None => match res_map.get(&query_op.get_rhs()) {
      Some(result) => (result, true),
      None => {
        debug!(
          "Skipping {:?} between two constants",
          query_op.get_operation()
        );
        return None;
      }
    },
  };

  Some(apply_scalar_operation(
    series.get_results(),
    query_op.get_operation(),
    query_op.get_constant(),
    swapped,
    query_op.get_return_bool(),
  ))
}

fn apply_vector_step(
  query_op: &QueryArithmetic,
  res_map: &HashMap<u64, MetricsResult>,
) -> Option<SeriesMap> {
  let lhs = res_map.get(&query_op.get_lhs());
  let rhs = res_map.get(&query_op.get_rhs());

  match (lhs, rhs) {
    (Some(lhs), Some(rhs)) => Some(apply_vector_operation(
      lhs,
      rhs,
      query_op.get_operation(),
      query_op.get_return_bool(),
    )),
    _ => {
      warn!(
        "Skipping {:?}: missing operand for lhs {} or rhs {}",
        query_op.get_operation(),
        query_op.get_lhs(),
        query_op.get_rhs()
      );
      None
    }
  }
}
