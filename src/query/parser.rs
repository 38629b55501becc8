//! Recursive-descent parser for query text
//!
//! ```text
//! query   := or_expr EOF
//! or_expr := and_expr ("OR" and_expr)*
//! and_expr:= unary (["AND"] unary)*
//! unary   := ("-" | "!" | "NOT") unary | primary
//! primary := "(" or_expr ")" | WORD ":" arg | WORD | PHRASE
//!          | NAME "=(" or_expr ")" | "$" NAME          (patterns only)
//! arg     := WORD | PHRASE | "(" or_expr ")" | "*"     ("*" in patterns only)
//! ```

use std::ops::Range;

use logos::Logos;

use super::errors::{ParseResult, QueryParseError};
use super::tree::{FieldArg, QueryNode, Term};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(":")]
    Colon,
    #[token("-")]
    Minus,
    #[token("!")]
    Bang,
    #[token("AND")]
    And,
    #[token("OR")]
    Or,
    #[token("NOT")]
    Not,
    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    Phrase,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*=\(")]
    VarOpen,
    #[regex(r"\$[A-Za-z_][A-Za-z0-9_]*")]
    VarAny,
    #[regex(r#"[^\s"():\-!$][^\s"():]*"#)]
    Word,
}

impl Token {
    fn describe(&self) -> &'static str {
        match self {
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::Colon => "':'",
            Token::Minus => "'-'",
            Token::Bang => "'!'",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::Phrase => "phrase",
            Token::VarOpen | Token::VarAny => "variable",
            Token::Word => "word",
        }
    }
}

/// Parse query text
///
/// Rewrite-pattern syntax (variables, `field:*`) is rejected.
pub fn parse(query: &str) -> ParseResult<QueryNode> {
    Parser::new(query, false)?.parse()
}

/// Parse a rewrite pattern
pub fn parse_pattern(pattern: &str) -> ParseResult<QueryNode> {
    Parser::new(pattern, true)?.parse()
}

struct Parser<'q> {
    source: &'q str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    patterns: bool,
}

impl<'q> Parser<'q> {
    fn new(source: &'q str, patterns: bool) -> ParseResult<Self> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => tokens.push((token, lexer.span())),
                Err(()) => {
                    return Err(QueryParseError::syntax(
                        lexer.span().start,
                        "unexpected character",
                        &source[lexer.span().start..],
                    ))
                }
            }
        }
        Ok(Self {
            source,
            tokens,
            pos: 0,
            patterns,
        })
    }

    fn parse(mut self) -> ParseResult<QueryNode> {
        if self.tokens.is_empty() {
            return Err(QueryParseError::syntax(0, "empty query", ""));
        }
        let node = self.parse_or()?;
        if let Some((token, span)) = self.tokens.get(self.pos).cloned() {
            return Err(self.error_at(span, format!("unexpected {}", token.describe())));
        }
        Ok(node)
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn text(&self, span: &Range<usize>) -> &'q str {
        &self.source[span.clone()]
    }

    fn error_at(&self, span: Range<usize>, message: impl Into<String>) -> QueryParseError {
        QueryParseError::syntax(span.start, message, &self.source[span])
    }

    fn eof_error(&self, message: &str) -> QueryParseError {
        QueryParseError::syntax(self.source.len(), message, "")
    }

    fn expect_close(&mut self) -> ParseResult<()> {
        match self.advance() {
            Some((Token::RParen, _)) => Ok(()),
            Some((token, span)) => {
                Err(self.error_at(span, format!("expected ')', found {}", token.describe())))
            }
            None => Err(self.eof_error("missing ')'")),
        }
    }

    fn parse_or(&mut self) -> ParseResult<QueryNode> {
        let mut children = vec![self.parse_and()?];
        while self.peek() == Some(Token::Or) {
            self.advance();
            children.push(self.parse_and()?);
        }
        Ok(collapse(children, QueryNode::Or))
    }

    fn parse_and(&mut self) -> ParseResult<QueryNode> {
        let mut children = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                None | Some(Token::RParen) | Some(Token::Or) => break,
                Some(Token::And) => {
                    self.advance();
                    children.push(self.parse_unary()?);
                }
                Some(_) => children.push(self.parse_unary()?),
            }
        }
        Ok(collapse(children, QueryNode::And))
    }

    fn parse_unary(&mut self) -> ParseResult<QueryNode> {
        match self.peek() {
            Some(Token::Minus) | Some(Token::Bang) | Some(Token::Not) => {
                self.advance();
                Ok(QueryNode::Not(Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ParseResult<QueryNode> {
        let (token, span) = self
            .advance()
            .ok_or_else(|| self.eof_error("expected a term"))?;
        match token {
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect_close()?;
                Ok(inner)
            }
            Token::VarOpen => {
                let text = self.text(&span);
                self.require_patterns(text)?;
                let name = text[..text.len() - 2].to_string();
                let inner = self.parse_or()?;
                self.expect_close()?;
                Ok(QueryNode::Variable {
                    name,
                    pattern: Some(Box::new(inner)),
                })
            }
            Token::VarAny => {
                let text = self.text(&span);
                self.require_patterns(text)?;
                Ok(QueryNode::Variable {
                    name: text[1..].to_string(),
                    pattern: None,
                })
            }
            Token::Word => {
                let word = self.text(&span);
                if self.peek() == Some(Token::Colon) {
                    self.advance();
                    let arg = self.parse_arg(word)?;
                    Ok(QueryNode::FieldName {
                        name: word.to_string(),
                        arg,
                    })
                } else {
                    Ok(QueryNode::DefaultField(Term::Word(word.to_string())))
                }
            }
            Token::Phrase => Ok(QueryNode::DefaultField(Term::Phrase(unquote(self.text(&span))))),
            other => Err(self.error_at(span, format!("unexpected {}", other.describe()))),
        }
    }

    fn parse_arg(&mut self, name: &str) -> ParseResult<FieldArg> {
        let message = format!("expected a value after '{}:'", name);
        let (token, span) = self.advance().ok_or_else(|| self.eof_error(&message))?;
        match token {
            Token::Word => {
                let word = self.text(&span);
                if word == "*" && self.patterns {
                    Ok(FieldArg::Wildcard)
                } else {
                    Ok(FieldArg::Term(Term::Word(word.to_string())))
                }
            }
            Token::Minus => match self.tokens.get(self.pos).cloned() {
                Some((Token::Word, word)) if word.start == span.end => {
                    self.advance();
                    let value = self.text(&(span.start..word.end));
                    Ok(FieldArg::Term(Term::Word(value.to_string())))
                }
                _ => Err(self.error_at(span, message)),
            },
            Token::Phrase => Ok(FieldArg::Term(Term::Phrase(unquote(self.text(&span))))),
            Token::LParen => {
                let group = self.parse_or()?;
                self.expect_close()?;
                Ok(FieldArg::Group(Box::new(group)))
            }
            _ => Err(self.error_at(span, message)),
        }
    }

    fn require_patterns(&self, fragment: &str) -> ParseResult<()> {
        if self.patterns {
            Ok(())
        } else {
            Err(QueryParseError::VariableNotAllowed(fragment.to_string()))
        }
    }
}

fn collapse(mut children: Vec<QueryNode>, make: fn(Vec<QueryNode>) -> QueryNode) -> QueryNode {
    if children.len() == 1 {
        children.remove(0)
    } else {
        make(children)
    }
}

/// Strip the surrounding quotes and resolve backslash escapes
fn unquote(phrase: &str) -> String {
    let inner = &phrase[1..phrase.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(query: &str) -> String {
        parse(query).unwrap().to_string()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[test]
    fn test_field_and_default_terms() {
        assert_eq!(tree("status:open"), "(FIELD_NAME status open)");
        assert_eq!(tree("fix"), "(DEFAULT_FIELD fix)");
        assert_eq!(tree("\"a \\\"b\\\" c\""), "(DEFAULT_FIELD \"a \\\"b\\\" c\")");
    }

    /// Juxtaposition binds tighter than OR.
    #[test]
    fn test_precedence() {
        assert_eq!(
            tree("a b OR c AND d"),
            "(OR (AND (DEFAULT_FIELD a) (DEFAULT_FIELD b)) (AND (DEFAULT_FIELD c) (DEFAULT_FIELD d)))"
        );
        assert_eq!(
            tree("a (b OR c)"),
            "(AND (DEFAULT_FIELD a) (OR (DEFAULT_FIELD b) (DEFAULT_FIELD c)))"
        );
    }

    /// A `-` right after the colon belongs to the value.
    #[test]
    fn test_negative_field_value() {
        assert_eq!(tree("added:-5"), "(FIELD_NAME added -5)");
        assert_eq!(tree("-delta:-10"), "(NOT (FIELD_NAME delta -10))");
        assert!(parse("added:- 5").is_err());
    }

    #[test]
    fn test_negation_forms() {
        assert_eq!(tree("-status:open"), "(NOT (FIELD_NAME status open))");
        assert_eq!(tree("!is:private"), "(NOT (FIELD_NAME is private))");
        assert_eq!(tree("NOT (a b)"), "(NOT (AND (DEFAULT_FIELD a) (DEFAULT_FIELD b)))");
    }

    #[test]
    fn test_values_with_punctuation() {
        assert_eq!(tree("after:2024-01-31"), "(FIELD_NAME after 2024-01-31)");
        assert_eq!(tree("added:>=10"), "(FIELD_NAME added >=10)");
        assert_eq!(tree("file:src/main.rs"), "(FIELD_NAME file src/main.rs)");
        assert_eq!(tree("message:\"fix the bug\""), "(FIELD_NAME message \"fix the bug\")");
    }

    #[test]
    fn test_field_group() {
        assert_eq!(
            tree("topic:(a OR -b)"),
            "(FIELD_NAME topic (OR (DEFAULT_FIELD a) (NOT (DEFAULT_FIELD b))))"
        );
    }

    /// A literal `*` is an ordinary value outside patterns.
    #[test]
    fn test_star_is_literal_in_queries() {
        assert_eq!(tree("topic:*"), "(FIELD_NAME topic *)");
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn test_syntax_errors() {
        let cases = ["", "(a b", "a )", "status:", "status:)", "\"open", "a OR"];
        for query in cases {
            let err = parse(query).unwrap_err();
            assert_eq!(err.code(), "QDX_QUERY_SYNTAX", "query {:?} gave {:?}", query, err);
        }
    }

    #[test]
    fn test_error_position_and_fragment() {
        match parse("status:open )").unwrap_err() {
            QueryParseError::Syntax {
                position, fragment, ..
            } => {
                assert_eq!(position, 12);
                assert_eq!(fragment, ")");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_variables_rejected_in_queries() {
        assert_eq!(
            parse("S=(status:open)").unwrap_err(),
            QueryParseError::VariableNotAllowed("S=(".into())
        );
        assert_eq!(parse("$S").unwrap_err().code(), "QDX_PATTERN_IN_QUERY");
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    #[test]
    fn test_pattern_variables_and_wildcards() {
        let pattern = parse_pattern("A=(after:*) B=(before:*)").unwrap().to_string();
        assert_eq!(
            pattern,
            "(AND (VARIABLE A (FIELD_NAME after *)) (VARIABLE B (FIELD_NAME before *)))"
        );
        assert_eq!(parse_pattern("-$S").unwrap().to_string(), "(NOT (VARIABLE S))");
    }
}
