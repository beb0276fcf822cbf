// This code is licensed under Elastic License 2.0
// https://www.elastic.co/licensing/elastic-license

use serde::{Deserialize, Serialize};

/// Binary operators between metrics results: https://prometheus.io/docs/prometheus/latest/querying/operators/
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum BinaryOperator {
  // Arithmetic
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulo,
  Power,

  // Comparison
  GreaterThan,
  GreaterThanOrEqualTo,
  LessThan,
  LessThanOrEqualTo,
  Equals,
  NotEquals,

  // Set
  And,
  Or,
  Unless,
}

impl BinaryOperator {
  /// Whether this operator works on whole series (matched by labels) rather than on values.
  pub fn is_set_operator(&self) -> bool {
    matches!(
      self,
      BinaryOperator::And | BinaryOperator::Or | BinaryOperator::Unless
    )
  }
}

/// One combination step between two sub-query results, or a sub-query result
/// and a constant. `lhs` and `rhs` refer to sub-query result hashes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryArithmetic {
  lhs: u64,
  rhs: u64,
  constant_op: bool,
  constant: f64,
  operation: BinaryOperator,
  return_bool: bool,
}

impl QueryArithmetic {
  /// Create a step combining two sub-query results.
  pub fn new_vector_op(lhs: u64, rhs: u64, operation: BinaryOperator, return_bool: bool) -> Self {
    QueryArithmetic {
      lhs,
      rhs,
      constant_op: false,
      constant: 0.0,
      operation,
      return_bool,
    }
  }

  /// Create a step combining a sub-query result with a constant. The result is
  /// looked up under `lhs` first; when only `rhs` resolves, the constant is
  /// treated as the left-hand operand.
  pub fn new_constant_op(
    lhs: u64,
    rhs: u64,
    constant: f64,
    operation: BinaryOperator,
    return_bool: bool,
  ) -> Self {
    QueryArithmetic {
      lhs,
      rhs,
      constant_op: true,
      constant,
      operation,
      return_bool,
    }
  }

  pub fn get_lhs(&self) -> u64 {
    self.lhs
  }

  pub fn get_rhs(&self) -> u64 {
    self.rhs
  }

  pub fn is_constant_op(&self) -> bool {
    self.constant_op
  }

  pub fn get_constant(&self) -> f64 {
    self.constant
  }

  pub fn get_operation(&self) -> BinaryOperator {
    self.operation
  }

  pub fn get_return_bool(&self) -> bool {
    self.return_bool
  }
}
