use thiserror::Error;

/// Everything that can go wrong while turning expression text into an [`Expr`](crate::Expr).
///
/// Evaluation itself never fails: type mismatches at run time degrade per the
/// XPath 1.0 coercion rules (NaN, empty string, `false`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath expression is empty")]
    EmptyExpression,

    #[error("Unexpected character '{character}' at position {position}")]
    Lex { position: usize, character: char },

    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedLiteral { position: usize },

    #[error("XPath syntax error in '{expression}' at position {position}: {message}")]
    Syntax {
        expression: String,
        position: usize,
        message: String,
    },

    #[error("Unknown axis '{name}'")]
    UnknownAxis { name: String },

    #[error("Unsupported node test '{name}()'")]
    UnsupportedNodeTest { name: String },

    #[error("undeclared variable in expression: {expression}")]
    UndeclaredVariable { expression: String },

    #[error("Unknown XPath function '{name}'")]
    UnknownFunction { name: String },

    #[error("Function '{function}' error: {message}")]
    FunctionArity { function: String, message: String },

    #[error("Type error: {0}")]
    TypeError(String),
}

impl XPathError {
    pub(crate) fn syntax(
        expression: impl Into<String>,
        position: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            expression: expression.into(),
            position,
            message: message.into(),
        }
    }
}
