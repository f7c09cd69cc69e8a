//! Comparison and arithmetic operators over [`XPathValue`]s.
//!
//! Comparisons involving node-sets are existential: they hold if the comparison
//! holds for at least one node's string value.

use super::ast::BinaryOperator;
use super::engine::{XPathValue, parse_number};
use crate::datasource::NodeNavigator;

/// Applies a numeric operator after converting both operands to numbers.
pub fn arithmetic<N: NodeNavigator>(
    left: XPathValue<N>,
    right: XPathValue<N>,
    op: impl Fn(f64, f64) -> f64,
) -> XPathValue<N> {
    XPathValue::Number(op(left.to_number(), right.to_number()))
}

/// A non-node-set operand, borrowed for the duration of one comparison.
#[derive(Debug, Clone, Copy)]
enum Scalar<'v> {
    Boolean(bool),
    Number(f64),
    String(&'v str),
}

impl<'v> Scalar<'v> {
    fn of<N>(value: &'v XPathValue<N>) -> Option<Self> {
        match value {
            XPathValue::Boolean(b) => Some(Scalar::Boolean(*b)),
            XPathValue::Number(n) => Some(Scalar::Number(*n)),
            XPathValue::String(s) => Some(Scalar::String(s)),
            XPathValue::NodeSet(_) => None,
        }
    }

    fn to_bool(self) -> bool {
        match self {
            Scalar::Boolean(b) => b,
            Scalar::Number(n) => n != 0.0 && !n.is_nan(),
            Scalar::String(s) => !s.is_empty(),
        }
    }

    fn to_number(self) -> f64 {
        match self {
            Scalar::Boolean(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Scalar::Number(n) => n,
            Scalar::String(s) => parse_number(s),
        }
    }
}

fn compare_scalars(op: BinaryOperator, left: Scalar<'_>, right: Scalar<'_>) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let equal = match (left, right) {
                (Scalar::Boolean(_), _) | (_, Scalar::Boolean(_)) => {
                    left.to_bool() == right.to_bool()
                }
                (Scalar::Number(_), _) | (_, Scalar::Number(_)) => {
                    left.to_number() == right.to_number()
                }
                (Scalar::String(a), Scalar::String(b)) => a == b,
            };
            (op == BinaryOperator::Equals) == equal
        }
        BinaryOperator::LessThan => left.to_number() < right.to_number(),
        BinaryOperator::LessThanOrEqual => left.to_number() <= right.to_number(),
        BinaryOperator::GreaterThan => left.to_number() > right.to_number(),
        BinaryOperator::GreaterThanOrEqual => left.to_number() >= right.to_number(),
        _ => false,
    }
}

/// Evaluates one of the six comparison operators.
pub fn compare<N: NodeNavigator>(op: BinaryOperator, left: &XPathValue<N>, right: &XPathValue<N>) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(left_nodes), XPathValue::NodeSet(right_nodes)) => {
            let right_values: Vec<String> = right_nodes.iter().map(|n| n.value()).collect();
            left_nodes.iter().any(|l| {
                let l = l.value();
                right_values
                    .iter()
                    .any(|r| compare_scalars(op, Scalar::String(&l), Scalar::String(r)))
            })
        }
        // A node-set compared with a boolean is converted as a whole.
        (XPathValue::NodeSet(nodes), XPathValue::Boolean(b)) => compare_scalars(
            op,
            Scalar::Boolean(!nodes.is_empty()),
            Scalar::Boolean(*b),
        ),
        (XPathValue::Boolean(b), XPathValue::NodeSet(nodes)) => compare_scalars(
            op,
            Scalar::Boolean(*b),
            Scalar::Boolean(!nodes.is_empty()),
        ),
        (XPathValue::NodeSet(nodes), other) => match Scalar::of(other) {
            Some(other) => nodes
                .iter()
                .any(|n| compare_scalars(op, Scalar::String(&n.value()), other)),
            None => false,
        },
        (other, XPathValue::NodeSet(nodes)) => match Scalar::of(other) {
            Some(other) => nodes
                .iter()
                .any(|n| compare_scalars(op, other, Scalar::String(&n.value()))),
            None => false,
        },
        (l, r) => match (Scalar::of(l), Scalar::of(r)) {
            (Some(l), Some(r)) => compare_scalars(op, l, r),
            _ => false,
        },
    }
}
