//! The evaluation engine for executing a query plan against any [`NodeNavigator`].
//!
//! Evaluation is infallible: every error is caught while compiling, and run-time
//! type mismatches degrade per the XPath 1.0 coercion rules.

use super::ast::{BinaryOperator, Expression, UnaryOperator, ValueType};
use super::functions;
use super::operators;
use super::query::Query;
use crate::datasource::NodeNavigator;
use std::fmt;

/// Maps a namespace URI to the prefix used in the expression text.
pub type NamespaceResolver = dyn Fn(&str) -> String + Send + Sync;

/// Represents the possible result types of an XPath expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<N> {
    /// Nodes in document order, without duplicates.
    NodeSet(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<N: NodeNavigator> XPathValue<N> {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map_or(f64::NAN, |n| parse_number(&n.value())),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            XPathValue::NodeSet(_) => ValueType::NodeSet,
            XPathValue::String(_) => ValueType::String,
            XPathValue::Number(_) => ValueType::Number,
            XPathValue::Boolean(_) => ValueType::Boolean,
        }
    }
}

impl<N: NodeNavigator> fmt::Display for XPathValue<N> {
    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => match nodes.first() {
                Some(n) => f.write_str(&n.value()),
                None => Ok(()),
            },
            XPathValue::String(s) => f.write_str(s),
            XPathValue::Number(n) => f.write_str(&format_number(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Parses a string the way XPath's `number()` does: surrounding whitespace is
/// ignored, and anything other than `-?digits(.digits?)?` or `-?.digits` is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches([' ', '\t', '\r', '\n']);
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let has_digits = !integer.is_empty() || fraction.is_some_and(|f| !f.is_empty());
    if !has_digits || !all_digits(integer) || !fraction.is_none_or(all_digits) {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Formats a number the way XPath's `string()` does.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // Covers negative zero as well.
        "0".to_string()
    } else {
        // `Display` for f64 never uses an exponent and drops a zero fraction.
        n.to_string()
    }
}

/// A container for all state needed during expression evaluation.
pub struct EvaluationContext<'c, N> {
    pub context_node: &'c N,
    /// 1-based index of the context node in the sequence being filtered.
    pub context_position: usize,
    pub context_size: usize,
    pub resolver: &'c NamespaceResolver,
}

impl<'c, N: NodeNavigator> EvaluationContext<'c, N> {
    pub fn new(context_node: &'c N, resolver: &'c NamespaceResolver) -> Self {
        Self {
            context_node,
            context_position: 1,
            context_size: 1,
            resolver,
        }
    }

    /// A context for one member of a sequence being filtered by a predicate.
    pub fn for_predicate<'n>(
        &self,
        context_node: &'n N,
        context_position: usize,
        context_size: usize,
    ) -> EvaluationContext<'n, N>
    where
        'c: 'n,
    {
        EvaluationContext {
            context_node,
            context_position,
            context_size,
            resolver: self.resolver,
        }
    }
}

/// Evaluates a plan node and returns a concrete `XPathValue`.
pub fn evaluate<N: NodeNavigator>(expr: &Expression, e_ctx: &EvaluationContext<'_, N>) -> XPathValue<N> {
    match expr {
        Expression::Literal(s) => XPathValue::String(s.clone()),
        Expression::Number(n) => XPathValue::Number(*n),
        Expression::LocationPath(_)
        | Expression::Filter { .. }
        | Expression::BinaryOp {
            op: BinaryOperator::Union,
            ..
        } => XPathValue::NodeSet(select_all(expr, e_ctx)),
        Expression::Variable(name) => {
            // Compilation rejects every variable reference.
            log::warn!("Reference to unbound variable ${} evaluated to an empty string", name);
            XPathValue::String(String::new())
        }
        Expression::FunctionCall { name, args } => functions::evaluate_function(name, args, e_ctx),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => XPathValue::Boolean(evaluate_boolean(left, e_ctx) && evaluate_boolean(right, e_ctx)),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Or,
            right,
        } => XPathValue::Boolean(evaluate_boolean(left, e_ctx) || evaluate_boolean(right, e_ctx)),
        Expression::BinaryOp {
            left,
            op:
                op @ (BinaryOperator::Equals
                | BinaryOperator::NotEquals
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual),
            right,
        } => {
            let left_val = evaluate(left, e_ctx);
            let right_val = evaluate(right, e_ctx);
            XPathValue::Boolean(operators::compare(*op, &left_val, &right_val))
        }
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Plus,
            right,
        } => operators::arithmetic(evaluate(left, e_ctx), evaluate(right, e_ctx), |a, b| a + b),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Minus,
            right,
        } => operators::arithmetic(evaluate(left, e_ctx), evaluate(right, e_ctx), |a, b| a - b),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Multiply,
            right,
        } => operators::arithmetic(evaluate(left, e_ctx), evaluate(right, e_ctx), |a, b| a * b),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Divide,
            right,
        } => operators::arithmetic(evaluate(left, e_ctx), evaluate(right, e_ctx), |a, b| a / b),
        // Truncated remainder: the result takes the sign of the dividend.
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Modulo,
            right,
        } => operators::arithmetic(evaluate(left, e_ctx), evaluate(right, e_ctx), |a, b| a % b),
        Expression::UnaryOp { op, expr } => {
            let val = evaluate(expr, e_ctx);
            match op {
                UnaryOperator::Minus => XPathValue::Number(-val.to_number()),
            }
        }
    }
}

/// Evaluates an expression as a boolean. Node-set expressions stop at the first match.
pub fn evaluate_boolean<N: NodeNavigator>(expr: &Expression, e_ctx: &EvaluationContext<'_, N>) -> bool {
    if expr.value_type() == ValueType::NodeSet {
        Query::build(expr).select(e_ctx).is_some()
    } else {
        evaluate(expr, e_ctx).to_bool()
    }
}

/// Runs a node-set expression to completion.
pub fn select_all<N: NodeNavigator>(expr: &Expression, e_ctx: &EvaluationContext<'_, N>) -> Vec<N> {
    let mut query = Query::build(expr);
    let mut nodes = Vec::new();
    while let Some(node) = query.select(e_ctx) {
        nodes.push(node);
    }
    nodes
}

/// Filters a sequence by each predicate in turn, left to right.
///
/// Positions are 1-based indexes into the sequence as it stands before each
/// predicate. A predicate evaluating to a number keeps only the node at that
/// position; anything else is converted to a boolean.
pub fn apply_predicates<N: NodeNavigator>(
    nodes: Vec<N>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'_, N>,
) -> Vec<N> {
    let mut final_nodes = nodes;
    for predicate in predicates {
        if final_nodes.is_empty() {
            break;
        }
        let context_size = final_nodes.len();
        let mut position = 0;
        final_nodes.retain(|node| {
            position += 1;
            let predicate_ctx = e_ctx.for_predicate(node, position, context_size);
            match predicate.value_type() {
                ValueType::Number => {
                    evaluate(predicate, &predicate_ctx).to_number() == position as f64
                }
                _ => evaluate_boolean(predicate, &predicate_ctx),
            }
        });
    }
    final_nodes
}
