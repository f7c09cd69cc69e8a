//! The query plan: an immutable tree of expression nodes produced by the parser.
//!
//! Evaluation state never lives here. Every selection derives its own
//! iterator state from these nodes (see [`crate::query`]), so one plan can
//! drive any number of independent selections.

use std::fmt;

/// The top-level expression that can be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    /// A `$name` reference. Parsed, but rejected at compile time since no
    /// variable bindings exist.
    Variable(String),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    /// A primary expression narrowed by predicates, e.g. `(//a)[1]`.
    /// Positions count in document order over the whole node-set.
    Filter {
        primary: Box<Expression>,
        predicates: Vec<Expression>,
    },
}

/// The static result type of an expression. XPath 1.0 has no variables bound
/// here, so every expression's type is known before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    NodeSet,
    Boolean,
    Number,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::NodeSet => "node-set",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
        })
    }
}

impl Expression {
    /// The type this expression evaluates to.
    pub fn value_type(&self) -> ValueType {
        match self {
            Expression::Literal(_) | Expression::Variable(_) => ValueType::String,
            Expression::Number(_) | Expression::UnaryOp { .. } => ValueType::Number,
            Expression::LocationPath(_) | Expression::Filter { .. } => ValueType::NodeSet,
            Expression::FunctionCall { name, .. } => crate::functions::return_type(name),
            Expression::BinaryOp { op, .. } => op.value_type(),
        }
    }

    /// Visits this expression and every nested one, depth first.
    pub fn walk<'e>(&'e self, visit: &mut impl FnMut(&'e Expression)) {
        visit(self);
        match self {
            Expression::LocationPath(path) => {
                if let Some(start) = &path.start_point {
                    start.walk(visit);
                }
                for step in &path.steps {
                    for predicate in &step.predicates {
                        predicate.walk(visit);
                    }
                }
            }
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expression::UnaryOp { expr, .. } => expr.walk(visit),
            Expression::Filter {
                primary,
                predicates,
            } => {
                primary.walk(visit);
                for predicate in predicates {
                    predicate.walk(visit);
                }
            }
            Expression::Literal(_) | Expression::Number(_) | Expression::Variable(_) => {}
        }
    }
}

/// A unary operator used in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
}

/// A binary operator used in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Additive
    Plus,
    Minus,
    // Multiplicative
    Multiply,
    Divide,
    Modulo,
    // Set
    Union,
}

impl BinaryOperator {
    pub fn value_type(self) -> ValueType {
        match self {
            BinaryOperator::Union => ValueType::NodeSet,
            BinaryOperator::Plus
            | BinaryOperator::Minus
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo => ValueType::Number,
            _ => ValueType::Boolean,
        }
    }
}

/// Represents a full location path, like `/child::foo`, `descendant::bar[1]`, or `(//a)/b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// An optional starting expression, for paths like `(//a | //b)/c`.
    /// If `None`, the path starts from the context node or root.
    pub start_point: Option<Box<Expression>>,
    /// True if the path starts from the root (e.g., `/foo`).
    /// Meaningless if `start_point` is `Some`.
    pub is_absolute: bool,
    pub steps: Vec<Step>,
}

/// Represents a single step in a location path, like `child::foo[position() > 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

impl Step {
    pub fn new(axis: Axis, node_test: NodeTest) -> Self {
        Self {
            axis,
            node_test,
            predicates: vec![],
        }
    }

    /// The `descendant-or-self::node()` step that `//` abbreviates.
    pub fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::NodeType(NodeTypeTest::Node))
    }
}

/// The axis of movement from the context node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Attribute,
    Parent,
    Ancestor,
    AncestorOrSelf,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
}

impl Axis {
    pub fn from_name(name: &str) -> Option<Axis> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "attribute" => Axis::Attribute,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "self" => Axis::SelfAxis,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "following" => Axis::Following,
            "preceding" => Axis::Preceding,
            _ => return None,
        })
    }

    /// Reverse axes yield nodes nearest-first, i.e. in reverse document order.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }
}

/// A qualified name in a name test, such as `svg:rect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub local_part: String,
}

impl QualifiedName {
    pub fn parse(name: &str) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local_part: local.to_string(),
            },
            None => Self {
                prefix: None,
                local_part: name.to_string(),
            },
        }
    }
}

/// A test to apply to nodes on a given axis to see if they should be included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A qualified name test (e.g., `foo`, `svg:rect`).
    Name(QualifiedName),
    /// A wildcard test (`*`).
    Wildcard,
    /// A namespace wildcard (`svg:*`).
    PrefixWildcard(String),
    /// A node type test (e.g., `text()`, `node()`).
    NodeType(NodeTypeTest),
}

impl NodeTest {
    pub fn name(name: &str) -> Self {
        NodeTest::Name(QualifiedName::parse(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTypeTest {
    Text,
    Node,
    Comment,
    /// `processing-instruction()`, optionally restricted to one target.
    ProcessingInstruction(Option<String>),
}
