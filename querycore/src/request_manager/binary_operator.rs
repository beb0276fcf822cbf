// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

//! Evaluate binary operators over metrics results.
//!
//! Two forms are supported:
//! - scalar: one operand is a series map, the other a constant;
//! - vector: both operands are metrics results, and series are matched one-to-one
//!   when the label suffixes of their group ids (the part after the metric name)
//!   are textually identical. Matching modifiers such as `on`, `ignoring` and
//!   `group_left` are not supported.
//!
//! Both forms are pure and return a fresh series map keyed by group id.

use std::collections::HashSet;

use log::debug;

use super::query_arithmetic::BinaryOperator;
use crate::metric::metrics_result::{MetricsResult, SeriesMap, TimeSeriesValues};

/// Apply `operation` between every point of `series` and `constant`.
///
/// `swapped` is set when the constant is the left-hand operand of the expression,
/// e.g. `10 - cpu`. Divisions by a zero constant omit the point. Comparisons
/// keep the series value when they hold, unless `return_bool` is set, in which
/// case every point is emitted as 0 or 1.
pub fn apply_scalar_operation(
  series: &SeriesMap,
  operation: BinaryOperator,
  constant: f64,
  swapped: bool,
  return_bool: bool,
) -> SeriesMap {
  let mut output = SeriesMap::with_capacity(series.len());

  for (group_id, values) in series {
    let combined: TimeSeriesValues = values
      .iter()
      .filter_map(|(&timestamp, &value)| {
        evaluate_point(operation, value, constant, swapped, return_bool).map(|v| (timestamp, v))
      })
      .collect();
    output.insert(group_id.clone(), combined);
  }

  output
}

/// Apply `operation` between two metrics results, matching series by label suffix.
///
/// For arithmetic and comparison operators, left series without a match on the
/// right are dropped, and a timestamp missing from the matched right series is
/// read as 0. For set operators:
/// - `and` keeps the matched left series;
/// - `or` keeps every left series and adds right series whose labels are not on the left;
/// - `unless` keeps the left series whose labels are not on the right.
pub fn apply_vector_operation(
  lhs: &MetricsResult,
  rhs: &MetricsResult,
  operation: BinaryOperator,
  return_bool: bool,
) -> SeriesMap {
  let lhs_metric_name = lhs.get_metric_name();
  let rhs_metric_name = rhs.get_metric_name();
  let rhs_results = rhs.get_results();

  let mut output = SeriesMap::new();
  let mut lhs_label_sets: HashSet<&str> = HashSet::new();

  for (l_group_id, lhs_values) in lhs.get_results() {
    let label_str = get_label_suffix(l_group_id, lhs_metric_name);
    let r_group_id = label_str
      .map(|label_str| format!("{}{}", rhs_metric_name, label_str))
      .unwrap_or_default();
    lhs_label_sets.insert(label_str.unwrap_or_default());

    let rhs_values = rhs_results.get(&r_group_id);

    if operation.is_set_operator() {
      if operation == BinaryOperator::And && rhs_values.is_none() {
        continue;
      }
      output.insert(l_group_id.clone(), lhs_values.clone());
      continue;
    }

    // Series without a matching right-hand series are dropped.
    let Some(rhs_values) = rhs_values else {
      continue;
    };

    let combined: TimeSeriesValues = lhs_values
      .iter()
      .filter_map(|(&timestamp, &lhs_value)| {
        let rhs_value = rhs_values.get(&timestamp).copied().unwrap_or(0.0);
        evaluate_point(operation, lhs_value, rhs_value, false, return_bool).map(|v| (timestamp, v))
      })
      .collect();
    output.insert(l_group_id.clone(), combined);
  }

  match operation {
    BinaryOperator::Or => {
      for (r_group_id, rhs_values) in rhs_results {
        let label_str = get_label_suffix(r_group_id, rhs_metric_name).unwrap_or_default();
        if !lhs_label_sets.contains(label_str) {
          output.insert(r_group_id.clone(), rhs_values.clone());
        }
      }
    }
    BinaryOperator::Unless => {
      for r_group_id in rhs_results.keys() {
        let label_str = get_label_suffix(r_group_id, rhs_metric_name).unwrap_or_default();
        output.remove(&format!("{}{}", lhs_metric_name, label_str));
      }
    }
    _ => {}
  }

  debug!(
    "Applied {:?} between {} and {}: {} output series",
    operation,
    lhs_metric_name,
    rhs_metric_name,
    output.len()
  );

  output
}

/// Label portion of a group id, i.e. everything after the metric name. None when
/// the group id is shorter than the metric name.
fn get_label_suffix<'a>(group_id: &'a str, metric_name: &str) -> Option<&'a str> {
  group_id.get(metric_name.len()..)
}

/// Evaluate one point. `value` is the series value and `operand` the other side;
/// when `swapped`, `operand` is logically on the left. Returns None when the
/// point is omitted from the output.
fn evaluate_point(
  operation: BinaryOperator,
  value: f64,
  operand: f64,
  swapped: bool,
  return_bool: bool,
) -> Option<f64> {
  match operation {
    BinaryOperator::Add => Some(value + operand),
    BinaryOperator::Multiply => Some(value * operand),
    BinaryOperator::Subtract => {
      let difference = value - operand;
      Some(if swapped { -difference } else { difference })
    }
    BinaryOperator::Divide => {
      if operand == 0.0 {
        return None;
      }
      if swapped {
        if value == 0.0 {
          return None;
        }
        Some(operand / value)
      } else {
        Some(value / operand)
      }
    }
    BinaryOperator::Modulo => Some(if swapped {
      operand % value
    } else {
      value % operand
    }),
    BinaryOperator::Power => Some(if swapped {
      operand.powf(value)
    } else {
      value.powf(operand)
    }),
    BinaryOperator::GreaterThan => {
      let holds = if swapped { value < operand } else { value > operand };
      compare_point(holds, value, return_bool)
    }
    BinaryOperator::GreaterThanOrEqualTo => {
      let holds = if swapped {
        value <= operand
      } else {
        value >= operand
      };
      compare_point(holds, value, return_bool)
    }
    BinaryOperator::LessThan => {
      let holds = if swapped { value > operand } else { value < operand };
      compare_point(holds, value, return_bool)
    }
    BinaryOperator::LessThanOrEqualTo => {
      let holds = if swapped {
        value >= operand
      } else {
        value <= operand
      };
      compare_point(holds, value, return_bool)
    }
    BinaryOperator::Equals => compare_point(value == operand, value, return_bool),
    BinaryOperator::NotEquals => compare_point(value != operand, value, return_bool),
    // Set operators act on whole series and have no per-point value.
    BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Unless => None,
  }
}

// With the bool modifier, emit 0/1 rather than filtering.
fn compare_point(holds: bool, value: f64, return_bool: bool) -> Option<f64> {
  if return_bool {
    Some(if holds { 1.0 } else { 0.0 })
  } else if holds {
    Some(value)
  } else {
    None
  }
}
