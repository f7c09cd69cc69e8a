//! A recursive-descent parser turning the token stream into a query plan.
//!
//! One method per precedence level, lowest first:
//! `or` → `and` → equality → relational → additive → multiplicative →
//! unary minus → union → path → step → primary.

use super::ast::*;
use crate::error::XPathError;
use crate::lexer::{Token, TokenKind, tokenize};

// --- Main Public Parser ---

pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        source: input,
        tokens: &tokens,
        pos: 0,
    };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error_at(
            token,
            format!("Parser did not consume all input. Remainder starts at '{}'", token.text),
        )),
    }
}

type ParseResult<T> = Result<T, XPathError>;

struct Parser<'s, 't> {
    source: &'s str,
    tokens: &'t [Token<'s>],
    pos: usize,
}

impl<'s, 't> Parser<'s, 't> {
    // --- Token helpers ---

    fn peek(&self) -> Option<&'t Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token<'s>> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> ParseResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    fn error_at(&self, token: &Token<'_>, message: impl Into<String>) -> XPathError {
        XPathError::syntax(self.source, token.position, message)
    }

    fn error_here(&self, message: impl Into<String>) -> XPathError {
        match self.peek() {
            Some(token) => {
                let message = format!("{}, found '{}'", message.into(), token.text);
                self.error_at(token, message)
            }
            None => XPathError::syntax(
                self.source,
                self.source.len(),
                format!("{} at end of expression", message.into()),
            ),
        }
    }

    /// Parses `sub (op sub)*`, folding left.
    fn binary_chain(
        &mut self,
        sub_expr: fn(&mut Self) -> ParseResult<Expression>,
        operator: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> ParseResult<Expression> {
        let mut left = sub_expr(self)?;
        while let Some(op) = self.peek_kind().and_then(operator) {
            self.pos += 1;
            let right = sub_expr(self)?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // --- Expression Parsers (in order of precedence) ---

    fn expression(&mut self) -> ParseResult<Expression> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> ParseResult<Expression> {
        self.binary_chain(Self::and_expr, |kind| match kind {
            TokenKind::Or => Some(BinaryOperator::Or),
            _ => None,
        })
    }

    fn and_expr(&mut self) -> ParseResult<Expression> {
        self.binary_chain(Self::equality_expr, |kind| match kind {
            TokenKind::And => Some(BinaryOperator::And),
            _ => None,
        })
    }

    fn equality_expr(&mut self) -> ParseResult<Expression> {
        self.binary_chain(Self::relational_expr, |kind| match kind {
            TokenKind::Equal => Some(BinaryOperator::Equals),
            TokenKind::NotEqual => Some(BinaryOperator::NotEquals),
            _ => None,
        })
    }

    fn relational_expr(&mut self) -> ParseResult<Expression> {
        self.binary_chain(Self::additive_expr, |kind| match kind {
            TokenKind::LessThan => Some(BinaryOperator::LessThan),
            TokenKind::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
            TokenKind::GreaterThan => Some(BinaryOperator::GreaterThan),
            TokenKind::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
            _ => None,
        })
    }

    fn additive_expr(&mut self) -> ParseResult<Expression> {
        self.binary_chain(Self::multiplicative_expr, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Plus),
            TokenKind::Minus => Some(BinaryOperator::Minus),
            _ => None,
        })
    }

    fn multiplicative_expr(&mut self) -> ParseResult<Expression> {
        self.binary_chain(Self::unary_expr, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Div => Some(BinaryOperator::Divide),
            TokenKind::Mod => Some(BinaryOperator::Modulo),
            _ => None,
        })
    }

    fn unary_expr(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::Minus) {
            let expr = self.unary_expr()?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(expr),
            });
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> ParseResult<Expression> {
        self.binary_chain(Self::path_expr, |kind| match kind {
            TokenKind::Pipe => Some(BinaryOperator::Union),
            _ => None,
        })
    }

    /// A location path, or a filter expression optionally followed by a relative path.
    fn path_expr(&mut self) -> ParseResult<Expression> {
        let starts_filter = matches!(
            self.peek_kind(),
            Some(
                TokenKind::Variable(_)
                    | TokenKind::LeftParen
                    | TokenKind::Literal(_)
                    | TokenKind::Number(_)
                    | TokenKind::FunctionName(_)
            )
        );
        if !starts_filter {
            return self.location_path().map(Expression::LocationPath);
        }

        let start = self.filter_expr()?;
        if !matches!(
            self.peek_kind(),
            Some(TokenKind::Slash | TokenKind::DoubleSlash)
        ) {
            return Ok(start);
        }
        let mut steps = Vec::new();
        while let Some(separator) = self.separator() {
            if separator == TokenKind::DoubleSlash {
                steps.push(Step::descendant_or_self());
            }
            steps.push(self.step()?);
        }
        Ok(Expression::LocationPath(LocationPath {
            start_point: Some(Box::new(start)),
            is_absolute: false,
            steps,
        }))
    }

    fn filter_expr(&mut self) -> ParseResult<Expression> {
        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(Expression::Filter {
                primary: Box::new(primary),
                predicates,
            })
        }
    }

    fn primary_expr(&mut self) -> ParseResult<Expression> {
        let Some(token) = self.advance() else {
            return Err(self.error_here("expected an expression"));
        };
        match &token.kind {
            TokenKind::Variable(name) => Ok(Expression::Variable(name.clone())),
            TokenKind::Literal(s) => Ok(Expression::Literal(s.clone())),
            TokenKind::Number(n) => Ok(Expression::Number(*n)),
            TokenKind::LeftParen => {
                let expr = self.expression()?;
                self.expect(&TokenKind::RightParen, "')' to close '('")?;
                Ok(expr)
            }
            TokenKind::FunctionName(name) => self.function_call(name),
            _ => Err(self.error_at(token, format!("unexpected token '{}'", token.text))),
        }
    }

    // --- Function Call Parser ---
    fn function_call(&mut self, name: &str) -> ParseResult<Expression> {
        self.expect(&TokenKind::LeftParen, "'(' after function name")?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RightParen) {
            loop {
                args.push(self.expression()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(&TokenKind::RightParen, "',' or ')' in argument list")?;
                break;
            }
        }
        Ok(Expression::FunctionCall {
            name: name.to_string(),
            args,
        })
    }

    // --- Path Parsers ---

    fn separator(&mut self) -> Option<TokenKind> {
        match self.peek_kind() {
            Some(kind @ (TokenKind::Slash | TokenKind::DoubleSlash)) => {
                let kind = kind.clone();
                self.pos += 1;
                Some(kind)
            }
            _ => None,
        }
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::NameTest(_)
                    | TokenKind::AxisName(_)
                    | TokenKind::NodeType(_)
                    | TokenKind::FunctionName(_)
                    | TokenKind::At
                    | TokenKind::Dot
                    | TokenKind::DotDot
            )
        )
    }

    fn location_path(&mut self) -> ParseResult<LocationPath> {
        let mut steps = Vec::new();
        let is_absolute = match self.peek_kind() {
            Some(TokenKind::Slash) => {
                self.pos += 1;
                // A lone `/` selects the root.
                if !self.at_step_start() {
                    return Ok(LocationPath {
                        start_point: None,
                        is_absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(TokenKind::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.step()?);
        while let Some(separator) = self.separator() {
            if separator == TokenKind::DoubleSlash {
                steps.push(Step::descendant_or_self());
            }
            steps.push(self.step()?);
        }

        Ok(LocationPath {
            start_point: None,
            is_absolute,
            steps,
        })
    }

    fn step(&mut self) -> ParseResult<Step> {
        if self.eat(&TokenKind::Dot) {
            return Ok(Step::new(Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node)));
        }
        if self.eat(&TokenKind::DotDot) {
            return Ok(Step::new(Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node)));
        }

        let axis = match self.peek_kind() {
            Some(TokenKind::AxisName(name)) => {
                let axis = Axis::from_name(name)
                    .ok_or_else(|| XPathError::UnknownAxis { name: name.clone() })?;
                self.pos += 1;
                self.expect(&TokenKind::ColonColon, "'::' after axis name")?;
                axis
            }
            Some(TokenKind::At) => {
                self.pos += 1;
                Axis::Attribute
            }
            _ => Axis::Child,
        };
        let node_test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn node_test(&mut self) -> ParseResult<NodeTest> {
        let Some(token) = self.peek() else {
            return Err(self.error_here("expected a node test"));
        };
        match &token.kind {
            TokenKind::NameTest(name) => {
                self.pos += 1;
                Ok(if name == "*" {
                    NodeTest::Wildcard
                } else if let Some(prefix) = name.strip_suffix(":*") {
                    NodeTest::PrefixWildcard(prefix.to_string())
                } else {
                    NodeTest::name(name)
                })
            }
            TokenKind::NodeType(name) => {
                self.pos += 1;
                self.expect(&TokenKind::LeftParen, "'(' after node type")?;
                let test = match name.as_str() {
                    "text" => NodeTypeTest::Text,
                    "comment" => NodeTypeTest::Comment,
                    "processing-instruction" => {
                        let target = match self.peek_kind() {
                            Some(TokenKind::Literal(target)) => {
                                self.pos += 1;
                                Some(target.clone())
                            }
                            _ => None,
                        };
                        NodeTypeTest::ProcessingInstruction(target)
                    }
                    _ => NodeTypeTest::Node,
                };
                self.expect(&TokenKind::RightParen, "')' to close node type test")?;
                Ok(NodeTest::NodeType(test))
            }
            TokenKind::FunctionName(name) => {
                Err(XPathError::UnsupportedNodeTest { name: name.clone() })
            }
            _ => Err(self.error_here("expected a node test")),
        }
    }

    fn predicates(&mut self) -> ParseResult<Vec<Expression>> {
        let mut predicates = Vec::new();
        while self.eat(&TokenKind::LeftBracket) {
            predicates.push(self.expression()?);
            self.expect(&TokenKind::RightBracket, "']' to close predicate")?;
        }
        Ok(predicates)
    }
}
