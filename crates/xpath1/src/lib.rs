//! An XPath 1.0 compiler and lazy evaluation engine.
//!
//! Expressions compile into an immutable [`Expr`]; selecting from a
//! [`NodeNavigator`] pulls matching nodes one at a time in document order.

pub mod ast;
pub mod axes;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod expr;
pub mod functions;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod query;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, Step, ValueType};
pub use datasource::{NodeNavigator, NodeType};
pub use engine::{EvaluationContext, NamespaceResolver, XPathValue, evaluate};
pub use expr::{Evaluation, Expr, NodeIterator, compile, must_compile};
#[allow(deprecated)]
pub use expr::select;

// Re-export test utilities for integration testing in downstream crates
pub use datasource::tests;
pub use error::XPathError;
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::parse_expression;
