//! Compiled expressions and the iterators they hand out.
//!
//! ```
//! use gxpath_xpath1::{compile, datasource::tests::{create_html_tree, HTML_ELEMENT}};
//!
//! let tree = create_html_tree();
//! let expr = compile("//a[@href='/']/text()").unwrap();
//! let mut iter = expr.select(&tree.navigator(HTML_ELEMENT));
//! assert!(iter.move_next());
//! assert_eq!(iter.current().label(), "Home");
//! ```

use crate::ast::{
    Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step, ValueType,
};
use crate::datasource::NodeNavigator;
use crate::engine::{self, EvaluationContext, NamespaceResolver, XPathValue};
use crate::error::XPathError;
use crate::functions;
use crate::parser::parse_expression;
use crate::query::Query;
use std::fmt;
use std::sync::Arc;

/// An immutable, compiled XPath expression. Cheap to share between threads;
/// every selection derives its own iterator state from the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    source: String,
    plan: Expression,
}

/// Compiles an expression, checking variables, function calls and operand types.
pub fn compile(text: &str) -> Result<Expr, XPathError> {
    Expr::compile(text)
}

/// Compiles `text`, or returns an expression that selects nothing when it
/// does not compile. The failure is only logged.
pub fn must_compile(text: &str) -> Expr {
    Expr::must_compile(text)
}

/// Compiles `text` and selects from `nav` in one go.
///
/// # Panics
///
/// Panics if `text` does not compile.
#[deprecated(note = "compile the expression once with `compile` and call `Expr::select`")]
pub fn select<N: NodeNavigator>(nav: &N, text: &str) -> NodeIterator<N> {
    match compile(text) {
        Ok(expr) => expr.select(nav),
        Err(err) => panic!("{}", err),
    }
}

fn identity_resolver() -> Arc<NamespaceResolver> {
    Arc::new(|uri: &str| uri.to_string())
}

impl Expr {
    pub fn compile(text: &str) -> Result<Self, XPathError> {
        if text.trim().is_empty() {
            return Err(XPathError::EmptyExpression);
        }
        let plan = parse_expression(text)?;
        check_plan(&plan, text)?;
        log::debug!("Compiled XPath expression '{}' ({})", text, plan.value_type());
        Ok(Self {
            source: text.to_string(),
            plan,
        })
    }

    /// Like [`compile`](Self::compile), but never fails: on error the result
    /// keeps `text` as its source and evaluates to an empty node-set.
    pub fn must_compile(text: &str) -> Self {
        match Self::compile(text) {
            Ok(expr) => expr,
            Err(err) => {
                log::warn!("Falling back to an empty selection for '{}': {}", text, err);
                Self {
                    source: text.to_string(),
                    plan: empty_plan(),
                }
            }
        }
    }

    /// The expression text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled plan.
    pub fn plan(&self) -> &Expression {
        &self.plan
    }

    /// The type `evaluate` produces for this expression.
    pub fn value_type(&self) -> ValueType {
        self.plan.value_type()
    }

    /// Selects nodes relative to `nav`, which also serves as the starting
    /// `current()` of the returned iterator.
    pub fn select<N: NodeNavigator>(&self, nav: &N) -> NodeIterator<N> {
        self.select_with_resolver(nav, identity_resolver())
    }

    /// Like [`select`](Self::select), with a namespace-URI-to-prefix resolver
    /// for prefixed name tests and `name()`.
    pub fn select_with_ns<N, F>(&self, nav: &N, resolver: F) -> NodeIterator<N>
    where
        N: NodeNavigator,
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.select_with_resolver(nav, Arc::new(resolver))
    }

    fn select_with_resolver<N: NodeNavigator>(
        &self,
        nav: &N,
        resolver: Arc<NamespaceResolver>,
    ) -> NodeIterator<N> {
        NodeIterator {
            query: Query::build(&self.plan),
            start: nav.clone(),
            current: nav.clone(),
            resolver,
            exhausted: false,
        }
    }

    /// Evaluates the expression with `nav` as the context node.
    pub fn evaluate<N: NodeNavigator>(&self, nav: &N) -> Evaluation<N> {
        self.evaluate_with_resolver(nav, identity_resolver())
    }

    pub fn evaluate_with_ns<N, F>(&self, nav: &N, resolver: F) -> Evaluation<N>
    where
        N: NodeNavigator,
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.evaluate_with_resolver(nav, Arc::new(resolver))
    }

    fn evaluate_with_resolver<N: NodeNavigator>(
        &self,
        nav: &N,
        resolver: Arc<NamespaceResolver>,
    ) -> Evaluation<N> {
        if self.plan.value_type() == ValueType::NodeSet {
            return Evaluation::NodeSet(self.select_with_resolver(nav, resolver));
        }
        let e_ctx = EvaluationContext::new(nav, &*resolver);
        match engine::evaluate(&self.plan, &e_ctx) {
            XPathValue::Boolean(b) => Evaluation::Boolean(b),
            XPathValue::Number(n) => Evaluation::Number(n),
            XPathValue::String(s) => Evaluation::String(s),
            XPathValue::NodeSet(_) => Evaluation::NodeSet(self.select_with_resolver(nav, resolver)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// `self::node()[false()]`
fn empty_plan() -> Expression {
    let mut step = Step::new(Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node));
    step.predicates.push(Expression::FunctionCall {
        name: "false".to_string(),
        args: Vec::new(),
    });
    Expression::LocationPath(LocationPath {
        start_point: None,
        is_absolute: false,
        steps: vec![step],
    })
}

fn require_node_set(expr: &Expression, role: &str) -> Result<(), XPathError> {
    match expr.value_type() {
        ValueType::NodeSet => Ok(()),
        found => Err(XPathError::TypeError(format!(
            "{} must be a node-set, got {}",
            role, found
        ))),
    }
}

fn check_expression(expr: &Expression) -> Result<(), XPathError> {
    match expr {
        Expression::FunctionCall { name, args } => functions::check_call(name, args),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Union,
            right,
        } => {
            require_node_set(left, "union operand")?;
            require_node_set(right, "union operand")
        }
        Expression::LocationPath(LocationPath {
            start_point: Some(start),
            ..
        }) => require_node_set(start, "path start"),
        Expression::Filter { primary, .. } => require_node_set(primary, "filtered expression"),
        _ => Ok(()),
    }
}

/// Static checks run after parsing. Variables are reported first, as there is
/// no way to bind one.
fn check_plan(plan: &Expression, source: &str) -> Result<(), XPathError> {
    let mut has_variable = false;
    let mut result = Ok(());
    plan.walk(&mut |expr| {
        has_variable |= matches!(expr, Expression::Variable(_));
        if result.is_ok() {
            result = check_expression(expr);
        }
    });
    if has_variable {
        return Err(XPathError::UndeclaredVariable {
            expression: source.to_string(),
        });
    }
    result
}

/// The result of [`Expr::evaluate`].
#[derive(Debug)]
pub enum Evaluation<N> {
    Boolean(bool),
    Number(f64),
    String(String),
    NodeSet(NodeIterator<N>),
}

/// Pull-based iteration over the nodes an expression selects, in document order.
///
/// `move_next` advances; `current` is the node it moved to. Once `move_next`
/// has returned `false` it keeps returning `false`.
pub struct NodeIterator<N> {
    query: Query<N>,
    start: N,
    current: N,
    resolver: Arc<NamespaceResolver>,
    exhausted: bool,
}

impl<N: NodeNavigator> NodeIterator<N> {
    /// Moves to the next selected node. Returns `false` once the selection is exhausted.
    pub fn move_next(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let e_ctx = EvaluationContext::new(&self.start, &*self.resolver);
        match self.query.select(&e_ctx) {
            Some(node) => {
                // Reuse the cursor when possible; fall back to the node itself.
                if !self.current.move_to(&node) {
                    self.current = node;
                }
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    /// The node the last successful `move_next` landed on (initially the
    /// node the selection started from).
    pub fn current(&self) -> &N {
        &self.current
    }

    pub fn namespace_to_prefix(&self, uri: &str) -> String {
        (self.resolver)(uri)
    }
}

impl<N: NodeNavigator> Iterator for NodeIterator<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        if self.move_next() {
            Some(self.current.clone())
        } else {
            None
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for NodeIterator<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIterator")
            .field("current", &self.current)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::tests::{HTML_ELEMENT, MockNavigator, create_html_tree};

    fn labels(iter: NodeIterator<MockNavigator<'_>>) -> Vec<String> {
        iter.map(|n| n.label().to_string()).collect()
    }

    #[test]
    fn test_expr_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expr>();
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(compile(""), Err(XPathError::EmptyExpression));
        assert_eq!(compile("   "), Err(XPathError::EmptyExpression));

        let err = compile("//a[@id=$id]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "undeclared variable in expression: //a[@id=$id]"
        );
        assert_eq!(
            compile("frobnicate(1)"),
            Err(XPathError::UnknownFunction {
                name: "frobnicate".into()
            })
        );
        assert!(matches!(compile("1 | //a"), Err(XPathError::TypeError(_))));
        assert!(matches!(compile("count(1)"), Err(XPathError::TypeError(_))));
        assert!(matches!(compile("'a'/b"), Err(XPathError::TypeError(_))));
        assert!(matches!(compile("(1)[1]"), Err(XPathError::TypeError(_))));
        assert!(matches!(compile("not()"), Err(XPathError::FunctionArity { .. })));
        assert!(matches!(compile("//a[@id"), Err(XPathError::Syntax { .. })));
        assert!(matches!(compile("//a[#]"), Err(XPathError::Lex { .. })));
    }

    #[test]
    fn test_accessors_and_display() {
        let expr = compile("count(//li)").unwrap();
        assert_eq!(expr.as_str(), "count(//li)");
        assert_eq!(expr.to_string(), "count(//li)");
        assert_eq!(expr.value_type(), ValueType::Number);
        assert!(matches!(expr.plan(), Expression::FunctionCall { .. }));
    }

    #[test]
    fn test_select_starts_at_context_and_is_idempotent_when_exhausted() {
        let tree = create_html_tree();
        let nav = tree.navigator(HTML_ELEMENT);
        let expr = compile("//h1").unwrap();
        let mut iter = expr.select(&nav);
        assert_eq!(iter.current().label(), "html");
        assert!(iter.move_next());
        assert_eq!(iter.current().label(), "h1");
        assert!(!iter.move_next());
        assert!(!iter.move_next());
        assert_eq!(iter.current().label(), "h1");
    }

    #[test]
    fn test_selections_are_independent() {
        let tree = create_html_tree();
        let nav = tree.navigator(HTML_ELEMENT);
        let expr = compile("//li/a").unwrap();
        let mut first = expr.select(&nav);
        assert!(first.move_next());
        let second = labels(expr.select(&nav));
        assert_eq!(second.len(), 3);
        assert!(first.move_next());
        assert_eq!(first.current().value(), "about");
        // The navigator handed in is never moved.
        assert_eq!(nav.label(), "html");
    }

    #[test]
    fn test_evaluate_returns_typed_results() {
        let tree = create_html_tree();
        let nav = tree.navigator(HTML_ELEMENT);
        match compile("count(//li)").unwrap().evaluate(&nav) {
            Evaluation::Number(n) => assert_eq!(n, 4.0),
            other => panic!("Expected a number, got {:?}", other),
        }
        match compile("//p = 'x'").unwrap().evaluate(&nav) {
            Evaluation::Boolean(b) => assert!(!b),
            other => panic!("Expected a boolean, got {:?}", other),
        }
        match compile("concat(//title, '!')").unwrap().evaluate(&nav) {
            Evaluation::String(s) => assert_eq!(s, "Hello!"),
            other => panic!("Expected a string, got {:?}", other),
        }
        match compile("//li[a]").unwrap().evaluate(&nav) {
            Evaluation::NodeSet(iter) => assert_eq!(iter.count(), 3),
            other => panic!("Expected a node-set, got {:?}", other),
        }
    }

    #[test]
    fn test_namespace_resolver() {
        let mut tree = create_html_tree();
        let ul = tree.element_ids("ul")[0];
        tree.set_namespace(ul, "http://example.com/list");
        let nav = tree.navigator(HTML_ELEMENT);

        let resolver = |uri: &str| match uri {
            "http://example.com/list" => "l".to_string(),
            _ => String::new(),
        };
        let expr = compile("//l:ul/li").unwrap();
        let iter = expr.select_with_ns(&nav, resolver);
        assert_eq!(iter.namespace_to_prefix("http://example.com/list"), "l");
        assert_eq!(iter.count(), 4);

        // With the default identity resolver the prefix must equal the URI.
        assert_eq!(expr.select(&nav).count(), 0);
        // Unprefixed tests ignore namespaces.
        assert_eq!(compile("//ul").unwrap().select(&nav).count(), 1);

        match compile("name(//ul)").unwrap().evaluate_with_ns(&nav, resolver) {
            Evaluation::String(s) => assert_eq!(s, "l:ul"),
            other => panic!("Expected a string, got {:?}", other),
        }
    }

    #[test]
    fn test_must_compile_falls_back_to_empty_selection() {
        let _ = env_logger::builder().is_test(true).try_init();
        let tree = create_html_tree();
        let nav = tree.navigator(HTML_ELEMENT);

        let broken = must_compile("//li[");
        assert_eq!(broken.as_str(), "//li[");
        assert_eq!(broken.value_type(), ValueType::NodeSet);
        let mut iter = broken.select(&nav);
        assert!(!iter.move_next());
        match broken.evaluate(&nav) {
            Evaluation::NodeSet(nodes) => assert_eq!(nodes.count(), 0),
            other => panic!("Expected a node-set, got {:?}", other),
        }
        assert!(labels(must_compile("$undeclared").select(&nav)).is_empty());

        let working = Expr::must_compile("//li[1]/a");
        assert_eq!(working, compile("//li[1]/a").unwrap());
        assert_eq!(labels(working.select(&nav)), vec!["a"]);
    }

    #[test]
    #[allow(deprecated)]
    fn test_deprecated_select() {
        let tree = create_html_tree();
        let nav = tree.navigator(HTML_ELEMENT);
        assert_eq!(labels(select(&nav, "//footer")), vec!["footer"]);
    }

    #[test]
    #[allow(deprecated)]
    #[should_panic(expected = "undeclared variable")]
    fn test_deprecated_select_panics_on_bad_expression() {
        let tree = create_html_tree();
        let nav = tree.navigator(HTML_ELEMENT);
        let _ = select(&nav, "$missing");
    }
}
