#![allow(dead_code)]

pub mod fixtures;

use gxpath::{NodeNavigator, XPathError, compile};
use gxpath_xpath1::tests::MockNavigator;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Every node `expr` selects from `nav`, in the order the iterator yields them.
pub fn select_all<'a>(
    nav: &MockNavigator<'a>,
    expr: &str,
) -> Result<Vec<MockNavigator<'a>>, XPathError> {
    Ok(compile(expr)?.select(nav).collect())
}

pub fn select_first<'a>(
    nav: &MockNavigator<'a>,
    expr: &str,
) -> Result<Option<MockNavigator<'a>>, XPathError> {
    Ok(compile(expr)?.select(nav).next())
}

/// Element names, text contents or attribute names of the selected nodes.
pub fn labels<'a>(nav: &MockNavigator<'a>, expr: &str) -> Result<Vec<&'a str>, XPathError> {
    Ok(select_all(nav, expr)?.iter().map(|n| n.label()).collect())
}

pub fn values<N: NodeNavigator>(nodes: &[N]) -> Vec<String> {
    nodes.iter().map(|n| n.value()).collect()
}

/// Asserts that `expr` selects something from `nav` and that the first node's label is `expected`.
#[macro_export]
macro_rules! assert_first_label {
    ($nav:expr, $expr:expr, $expected:expr) => {{
        let first = common::select_first(&$nav, $expr)?;
        match first {
            Some(node) => assert_eq!(node.label(), $expected, "first node of `{}`", $expr),
            None => panic!("`{}` selected nothing", $expr),
        }
    }};
}

/// Asserts how many nodes `expr` selects from `nav`.
#[macro_export]
macro_rules! assert_count {
    ($nav:expr, $expr:expr, $expected:expr) => {{
        let count = common::select_all(&$nav, $expr)?.len();
        assert_eq!(count, $expected, "node count of `{}`", $expr);
    }};
}
