//! Defines the signature table and built-in implementations for XPath 1.0 functions.
//!
//! Arity and argument types are checked once at compile time through
//! [`check_call`], so the implementations below can index their arguments
//! directly and never fail.

use super::ast::{Expression, ValueType};
use super::engine::{self, EvaluationContext, XPathValue, parse_number};
use crate::datasource::{NodeNavigator, NodeType};
use crate::error::XPathError;

/// Static description of a built-in function.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions (`concat`).
    pub max_args: Option<usize>,
    pub returns: ValueType,
    /// Whether the (optional) argument must be a node-set.
    pub node_set_argument: bool,
}

const fn sig(
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    returns: ValueType,
) -> Signature {
    Signature {
        name,
        min_args,
        max_args,
        returns,
        node_set_argument: false,
    }
}

const fn node_set_sig(name: &'static str, min_args: usize, returns: ValueType) -> Signature {
    Signature {
        name,
        min_args,
        max_args: Some(1),
        returns,
        node_set_argument: true,
    }
}

pub const SIGNATURES: &[Signature] = &[
    // Node-set
    sig("last", 0, Some(0), ValueType::Number),
    sig("position", 0, Some(0), ValueType::Number),
    node_set_sig("count", 1, ValueType::Number),
    node_set_sig("local-name", 0, ValueType::String),
    node_set_sig("namespace-uri", 0, ValueType::String),
    node_set_sig("name", 0, ValueType::String),
    // String
    sig("string", 0, Some(1), ValueType::String),
    sig("concat", 2, None, ValueType::String),
    sig("starts-with", 2, Some(2), ValueType::Boolean),
    sig("ends-with", 2, Some(2), ValueType::Boolean),
    sig("contains", 2, Some(2), ValueType::Boolean),
    sig("substring-before", 2, Some(2), ValueType::String),
    sig("substring-after", 2, Some(2), ValueType::String),
    sig("substring", 2, Some(3), ValueType::String),
    sig("string-length", 0, Some(1), ValueType::Number),
    sig("normalize-space", 0, Some(1), ValueType::String),
    sig("translate", 3, Some(3), ValueType::String),
    // Boolean
    sig("boolean", 1, Some(1), ValueType::Boolean),
    sig("not", 1, Some(1), ValueType::Boolean),
    sig("true", 0, Some(0), ValueType::Boolean),
    sig("false", 0, Some(0), ValueType::Boolean),
    sig("lang", 1, Some(1), ValueType::Boolean),
    // Number
    sig("number", 0, Some(1), ValueType::Number),
    node_set_sig("sum", 1, ValueType::Number),
    sig("floor", 1, Some(1), ValueType::Number),
    sig("ceiling", 1, Some(1), ValueType::Number),
    sig("round", 1, Some(1), ValueType::Number),
];

pub fn lookup(name: &str) -> Option<&'static Signature> {
    SIGNATURES.iter().find(|s| s.name == name)
}

/// The result type of a call to `name`. Unknown names are rejected at compile
/// time, so the fallback is never observed by a caller.
pub fn return_type(name: &str) -> ValueType {
    lookup(name).map_or(ValueType::String, |s| s.returns)
}

fn arity_message(signature: &Signature) -> String {
    match (signature.min_args, signature.max_args) {
        (min, None) => format!("Expected at least {} arguments", min),
        (1, Some(1)) => "Expected 1 argument".to_string(),
        (min, Some(max)) if min == max => format!("Expected {} arguments", min),
        (min, Some(max)) => format!("Expected {} or {} arguments", min, max),
    }
}

/// Validates a call site: the function must exist, the argument count must fit
/// its signature, and node-set parameters must receive node-set expressions.
pub fn check_call(name: &str, args: &[Expression]) -> Result<(), XPathError> {
    let signature = lookup(name).ok_or_else(|| XPathError::UnknownFunction {
        name: name.to_string(),
    })?;
    let too_few = args.len() < signature.min_args;
    let too_many = signature.max_args.is_some_and(|max| args.len() > max);
    if too_few || too_many {
        return Err(XPathError::FunctionArity {
            function: format!("{}()", name),
            message: arity_message(signature),
        });
    }
    if signature.node_set_argument {
        if let Some(arg) = args.first() {
            let found = arg.value_type();
            if found != ValueType::NodeSet {
                return Err(XPathError::TypeError(format!(
                    "{}() argument must be a node-set, got {}",
                    name, found
                )));
            }
        }
    }
    Ok(())
}

/// Dispatches a function call to the correct implementation.
pub fn evaluate_function<N: NodeNavigator>(
    name: &str,
    args: &[Expression],
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    // `boolean()`/`not()` only need to know whether a node-set is empty.
    match name {
        "boolean" => return XPathValue::Boolean(engine::evaluate_boolean(&args[0], e_ctx)),
        "not" => return XPathValue::Boolean(!engine::evaluate_boolean(&args[0], e_ctx)),
        _ => {}
    }

    let args: Vec<XPathValue<N>> = args
        .iter()
        .map(|arg| engine::evaluate(arg, e_ctx))
        .collect();

    match name {
        // Node-set
        "last" => XPathValue::Number(e_ctx.context_size as f64),
        "position" => XPathValue::Number(e_ctx.context_position as f64),
        "count" => func_count(args),
        "local-name" => func_local_name(args, e_ctx),
        "namespace-uri" => func_namespace_uri(args, e_ctx),
        "name" => func_name(args, e_ctx),

        // String
        "string" => func_string(args, e_ctx),
        "concat" => func_concat(args),
        "starts-with" => func_starts_with(args),
        "ends-with" => func_ends_with(args),
        "contains" => func_contains(args),
        "substring-before" => func_substring_before(args),
        "substring-after" => func_substring_after(args),
        "substring" => func_substring(args),
        "string-length" => func_string_length(args, e_ctx),
        "normalize-space" => func_normalize_space(args, e_ctx),
        "translate" => func_translate(args),

        // Boolean
        "true" => XPathValue::Boolean(true),
        "false" => XPathValue::Boolean(false),
        "lang" => func_lang(args, e_ctx),

        // Number
        "number" => func_number(args, e_ctx),
        "sum" => func_sum(args),
        "floor" => XPathValue::Number(args[0].to_number().floor()),
        "ceiling" => XPathValue::Number(args[0].to_number().ceil()),
        "round" => func_round(args),

        _ => {
            log::warn!("Call to unchecked function '{}' evaluated to an empty string", name);
            XPathValue::String(String::new())
        }
    }
}

// --- Helpers ---

/// Takes the single optional argument as a string, defaulting to the context node's value.
fn string_or_context<N: NodeNavigator>(
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> String {
    match args.pop() {
        Some(value) => value.to_string(),
        None => e_ctx.context_node.value(),
    }
}

/// The first node of the optional node-set argument, or the context node.
fn node_or_context<N: NodeNavigator>(
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> Option<N> {
    match args.pop() {
        Some(XPathValue::NodeSet(mut nodes)) => {
            if nodes.is_empty() {
                None
            } else {
                Some(nodes.swap_remove(0))
            }
        }
        Some(_) => None,
        None => Some(e_ctx.context_node.clone()),
    }
}

fn two_strings<N: NodeNavigator>(mut args: Vec<XPathValue<N>>) -> (String, String) {
    let s2 = args.remove(1).to_string();
    let s1 = args.remove(0).to_string();
    (s1, s2)
}

// --- Node-Set Functions ---

fn func_count<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let count = match &args[0] {
        XPathValue::NodeSet(nodes) => nodes.len(),
        _ => 0,
    };
    XPathValue::Number(count as f64)
}

fn func_local_name<N: NodeNavigator>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    let name = node_or_context(args, e_ctx)
        .map(|n| n.local_name().to_string())
        .unwrap_or_default();
    XPathValue::String(name)
}

fn func_namespace_uri<N: NodeNavigator>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    let uri = node_or_context(args, e_ctx)
        .map(|n| n.namespace_uri().to_string())
        .unwrap_or_default();
    XPathValue::String(uri)
}

fn func_name<N: NodeNavigator>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    let name = node_or_context(args, e_ctx)
        .map(|n| {
            let uri = n.namespace_uri();
            let prefix = if uri.is_empty() {
                String::new()
            } else {
                (e_ctx.resolver)(uri)
            };
            if prefix.is_empty() {
                n.local_name().to_string()
            } else {
                format!("{}:{}", prefix, n.local_name())
            }
        })
        .unwrap_or_default();
    XPathValue::String(name)
}

// --- String Functions ---

fn func_string<N: NodeNavigator>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    XPathValue::String(string_or_context(args, e_ctx))
}

fn func_concat<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let result = args.iter().map(|v| v.to_string()).collect::<String>();
    XPathValue::String(result)
}

fn func_starts_with<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let (s1, s2) = two_strings(args);
    XPathValue::Boolean(s1.starts_with(&s2))
}

fn func_ends_with<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let (s1, s2) = two_strings(args);
    XPathValue::Boolean(s1.ends_with(&s2))
}

fn func_contains<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let (s1, s2) = two_strings(args);
    XPathValue::Boolean(s1.contains(&s2))
}

fn func_substring_before<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let (s1, s2) = two_strings(args);
    let result = s1.find(&s2).map(|i| &s1[..i]).unwrap_or("");
    XPathValue::String(result.to_string())
}

fn func_substring_after<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let (s1, s2) = two_strings(args);
    let result = s1.find(&s2).map(|i| &s1[i + s2.len()..]).unwrap_or("");
    XPathValue::String(result.to_string())
}

fn func_substring<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let s = args[0].to_string();
    let start = xpath_round(args[1].to_number());
    let end = match args.get(2) {
        Some(length) => start + xpath_round(length.to_number()),
        None => f64::INFINITY,
    };

    // Character positions are 1-based; NaN bounds make every comparison false.
    let result: String = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let position = (*i + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect();
    XPathValue::String(result)
}

fn func_string_length<N: NodeNavigator>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    let s = string_or_context(args, e_ctx);
    XPathValue::Number(s.chars().count() as f64)
}

fn func_normalize_space<N: NodeNavigator>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    let s = string_or_context(args, e_ctx);
    XPathValue::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn func_translate<N: NodeNavigator>(mut args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let to: Vec<char> = args.remove(2).to_string().chars().collect();
    let from: Vec<char> = args.remove(1).to_string().chars().collect();
    let s = args.remove(0).to_string();

    let result = s
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(index) => to.get(index).copied(),
            None => Some(c),
        })
        .collect();
    XPathValue::String(result)
}

// --- Boolean Functions ---

/// `lang(s)`: true if the nearest `lang` attribute on the context node or its
/// ancestors equals `s` or starts with `s-`, ignoring case.
fn func_lang<N: NodeNavigator>(
    args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    let wanted = args[0].to_string().to_lowercase();
    let mut cursor = e_ctx.context_node.clone();
    loop {
        if cursor.node_type() == NodeType::Element {
            let mut attr = cursor.clone();
            while attr.move_to_next_attribute() {
                if attr.local_name() == "lang" {
                    let lang = attr.value().to_lowercase();
                    let matched = lang == wanted
                        || lang
                            .strip_prefix(wanted.as_str())
                            .is_some_and(|rest| rest.starts_with('-'));
                    return XPathValue::Boolean(matched);
                }
            }
        }
        if !cursor.move_to_parent() {
            return XPathValue::Boolean(false);
        }
    }
}

// --- Number Functions ---

fn func_number<N: NodeNavigator>(
    mut args: Vec<XPathValue<N>>,
    e_ctx: &EvaluationContext<'_, N>,
) -> XPathValue<N> {
    let n = match args.pop() {
        Some(value) => value.to_number(),
        None => parse_number(&e_ctx.context_node.value()),
    };
    XPathValue::Number(n)
}

fn func_sum<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    let sum = match &args[0] {
        XPathValue::NodeSet(nodes) => nodes.iter().map(|n| parse_number(&n.value())).sum(),
        _ => f64::NAN,
    };
    XPathValue::Number(sum)
}

fn func_round<N: NodeNavigator>(args: Vec<XPathValue<N>>) -> XPathValue<N> {
    XPathValue::Number(xpath_round(args[0].to_number()))
}

/// Rounds to the nearest integer, ties towards positive infinity. NaN and
/// infinities are kept, and values in `[-0.5, 0)` round to negative zero.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    let rounded = if n - n.floor() == 0.5 {
        (n + 0.5).floor()
    } else {
        n.round()
    };
    if rounded == 0.0 && n.is_sign_negative() {
        -0.0
    } else {
        rounded
    }
}
