//! A `nom`-based tokenizer for XPath 1.0 expressions.
//!
//! Raw lexemes are recognized with `nom` combinators; the surrounding loop then
//! applies the disambiguation rules of XPath 1.0 §3.7, which depend on the
//! previous token and on what follows a name.

use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1},
    combinator::{map, opt, recognize},
    sequence::{delimited, pair, preceded},
};

/// Names that denote node-type tests rather than functions when followed by `(`.
pub const NODE_TYPE_NAMES: [&str; 4] = ["node", "text", "comment", "processing-instruction"];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    At,
    Dot,
    DotDot,
    ColonColon,
    // Operators
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    /// `*` in operator position (multiplication).
    Star,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Mod,
    Div,
    // Literals
    Number(f64),
    Literal(String),
    // Names
    /// A name test: a QName, `*` or `prefix:*`.
    NameTest(String),
    FunctionName(String),
    NodeType(String),
    AxisName(String),
    /// A `$name` reference, without the `$`.
    Variable(String),
}

impl TokenKind {
    /// True for tokens after which `*` multiplies and `and`/`or`/`mod`/`div` are operators.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::RightParen
                | TokenKind::RightBracket
                | TokenKind::Dot
                | TokenKind::DotDot
                | TokenKind::Number(_)
                | TokenKind::Literal(_)
                | TokenKind::NameTest(_)
                | TokenKind::Variable(_)
        )
    }
}

/// A token with the source text it was read from and its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub position: usize,
}

// --- Raw lexemes ---

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lexeme<'a> {
    Number(f64),
    Literal(&'a str),
    Variable(&'a str),
    Name(&'a str),
    Symbol(&'a str),
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_name_start), take_while(is_name_char))).parse(input)
}

/// A QName, or a `prefix:*` namespace wildcard.
fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), alt((tag("*"), nc_name)))))).parse(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        // Only ASCII digits and one dot were recognized, so this parse cannot fail.
        |digits: &str| digits.parse().unwrap_or(f64::NAN),
    )
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))
    .parse(input)
}

fn symbol(input: &str) -> IResult<&str, &str> {
    alt((
        alt((
            tag("//"),
            tag("/"),
            tag("::"),
            tag(".."),
            tag("."),
            tag("!="),
            tag("<="),
            tag(">="),
            tag("<"),
            tag(">"),
            tag("="),
        )),
        alt((
            tag("("),
            tag(")"),
            tag("["),
            tag("]"),
            tag(","),
            tag("@"),
            tag("|"),
            tag("+"),
            tag("-"),
            tag("*"),
        )),
    ))
    .parse(input)
}

fn lexeme(input: &str) -> IResult<&str, Lexeme<'_>> {
    alt((
        map(number, Lexeme::Number),
        map(literal, Lexeme::Literal),
        map(preceded(char('$'), name), Lexeme::Variable),
        map(name, Lexeme::Name),
        map(symbol, Lexeme::Symbol),
    ))
    .parse(input)
}

fn skip_whitespace(input: &str) -> &str {
    input.trim_start_matches([' ', '\t', '\r', '\n'])
}

fn symbol_kind(symbol: &str, after_operand: bool) -> TokenKind {
    match symbol {
        "//" => TokenKind::DoubleSlash,
        "/" => TokenKind::Slash,
        "::" => TokenKind::ColonColon,
        ".." => TokenKind::DotDot,
        "." => TokenKind::Dot,
        "!=" => TokenKind::NotEqual,
        "<=" => TokenKind::LessThanOrEqual,
        ">=" => TokenKind::GreaterThanOrEqual,
        "<" => TokenKind::LessThan,
        ">" => TokenKind::GreaterThan,
        "=" => TokenKind::Equal,
        "(" => TokenKind::LeftParen,
        ")" => TokenKind::RightParen,
        "[" => TokenKind::LeftBracket,
        "]" => TokenKind::RightBracket,
        "," => TokenKind::Comma,
        "@" => TokenKind::At,
        "|" => TokenKind::Pipe,
        "+" => TokenKind::Plus,
        "-" => TokenKind::Minus,
        _ if after_operand => TokenKind::Star,
        _ => TokenKind::NameTest("*".to_string()),
    }
}

fn name_kind(name: &str, after_operand: bool, rest: &str) -> TokenKind {
    if after_operand {
        match name {
            "and" => return TokenKind::And,
            "or" => return TokenKind::Or,
            "mod" => return TokenKind::Mod,
            "div" => return TokenKind::Div,
            _ => {}
        }
    }
    let lookahead = skip_whitespace(rest);
    if lookahead.starts_with("::") {
        TokenKind::AxisName(name.to_string())
    } else if lookahead.starts_with('(') {
        if NODE_TYPE_NAMES.contains(&name) {
            TokenKind::NodeType(name.to_string())
        } else {
            TokenKind::FunctionName(name.to_string())
        }
    } else {
        TokenKind::NameTest(name.to_string())
    }
}

/// Splits an expression into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, XPathError> {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut rest = skip_whitespace(source);

    while !rest.is_empty() {
        let position = source.len() - rest.len();
        let (remaining, raw) = match lexeme(rest) {
            Ok(parsed) => parsed,
            Err(_) => {
                let character = rest.chars().next().unwrap_or_default();
                return Err(if character == '"' || character == '\'' {
                    XPathError::UnterminatedLiteral { position }
                } else {
                    XPathError::Lex {
                        position,
                        character,
                    }
                });
            }
        };
        let text = &rest[..rest.len() - remaining.len()];
        let after_operand = tokens.last().is_some_and(|t| t.kind.ends_operand());

        let kind = match raw {
            Lexeme::Number(n) => TokenKind::Number(n),
            Lexeme::Literal(s) => TokenKind::Literal(s.to_string()),
            Lexeme::Variable(v) => TokenKind::Variable(v.to_string()),
            Lexeme::Name(n) => name_kind(n, after_operand, remaining),
            Lexeme::Symbol(s) => symbol_kind(s, after_operand),
        };
        tokens.push(Token {
            kind,
            text,
            position,
        });
        rest = skip_whitespace(remaining);
    }

    log::trace!("Tokenized '{}' into {} tokens", source, tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_abbreviated_path() {
        assert_eq!(
            kinds("//a[@href='/']/text()"),
            vec![
                TokenKind::DoubleSlash,
                TokenKind::NameTest("a".into()),
                TokenKind::LeftBracket,
                TokenKind::At,
                TokenKind::NameTest("href".into()),
                TokenKind::Equal,
                TokenKind::Literal("/".into()),
                TokenKind::RightBracket,
                TokenKind::Slash,
                TokenKind::NodeType("text".into()),
                TokenKind::LeftParen,
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn test_star_disambiguation() {
        assert_eq!(
            kinds("* * 2"),
            vec![
                TokenKind::NameTest("*".into()),
                TokenKind::Star,
                TokenKind::Number(2.0),
            ]
        );
        assert_eq!(
            kinds("svg:*"),
            vec![TokenKind::NameTest("svg:*".into())]
        );
    }

    #[test]
    fn test_operator_names_depend_on_previous_token() {
        assert_eq!(
            kinds("div div div"),
            vec![
                TokenKind::NameTest("div".into()),
                TokenKind::Div,
                TokenKind::NameTest("div".into()),
            ]
        );
        assert_eq!(
            kinds("@id=1 or @id=3"),
            vec![
                TokenKind::At,
                TokenKind::NameTest("id".into()),
                TokenKind::Equal,
                TokenKind::Number(1.0),
                TokenKind::Or,
                TokenKind::At,
                TokenKind::NameTest("id".into()),
                TokenKind::Equal,
                TokenKind::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_axis_and_function_names() {
        assert_eq!(
            kinds("following-sibling :: li[last ()]"),
            vec![
                TokenKind::AxisName("following-sibling".into()),
                TokenKind::ColonColon,
                TokenKind::NameTest("li".into()),
                TokenKind::LeftBracket,
                TokenKind::FunctionName("last".into()),
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::RightBracket,
            ]
        );
    }

    #[test]
    fn test_numbers_and_dots() {
        assert_eq!(
            kinds(".5 + 1. - .."),
            vec![
                TokenKind::Number(0.5),
                TokenKind::Plus,
                TokenKind::Number(1.0),
                TokenKind::Minus,
                TokenKind::DotDot,
            ]
        );
    }

    #[test]
    fn test_positions_and_text() {
        let tokens = tokenize("  count( $items )").unwrap();
        assert_eq!(tokens[0].position, 2);
        assert_eq!(tokens[0].text, "count");
        assert_eq!(tokens[2].kind, TokenKind::Variable("items".into()));
        assert_eq!(tokens[2].text, "$items");
        assert_eq!(tokens[2].position, 9);
    }

    #[test]
    fn test_lex_errors() {
        assert_eq!(
            tokenize("//a[#]"),
            Err(XPathError::Lex {
                position: 4,
                character: '#'
            })
        );
        assert_eq!(
            tokenize("a != b ! c"),
            Err(XPathError::Lex {
                position: 7,
                character: '!'
            })
        );
        assert_eq!(
            tokenize("@href='/about"),
            Err(XPathError::UnterminatedLiteral { position: 6 })
        );
    }
}
