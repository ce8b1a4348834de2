use crate::Span;
use crate::lexer::{Token, TokenKind};
use crate::types::Node;
use std::collections::VecDeque;
use thiserror::Error;

/// All of these are syntax errors: the input is not a well-formed form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Syntax error [at {span}]: unexpected token '{found}', expected {expected}")]
    UnexpectedToken {
        found: String,
        span: Span,
        expected: String,
    },
    #[error("Syntax error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    #[error("Syntax error [at {1}]: integer literal '{0}' does not fit in 64 bits")]
    IntegerOutOfRange(String, Span),
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

/// Which reader rules to follow for a list that starts with an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grammar {
    /// Ordinary s-expression grammar: every element is parsed recursively.
    #[default]
    Canonical,
    /// Bug-compatible reader: after a leading atom, the tokens up to the next
    /// `)` are taken verbatim, without recursing into nested lists.
    Legacy,
}

/// Consumes a token queue one top-level form at a time, so a single line can
/// hold several back-to-back forms.
pub struct Parser<'src> {
    tokens: VecDeque<Token<'src>>,
    grammar: Grammar,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token<'src>>) -> Self {
        Parser::with_grammar(tokens, Grammar::Canonical)
    }

    pub fn with_grammar(tokens: Vec<Token<'src>>, grammar: Grammar) -> Self {
        Parser {
            tokens: tokens.into(),
            grammar,
        }
    }

    /// True once every token has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.tokens.is_empty()
    }

    fn next_token(&mut self) -> Option<Token<'src>> {
        self.tokens.pop_front()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.front().map(|t| t.kind)
    }

    /// Parses exactly one form, leaving any remaining tokens queued.
    pub fn parse_expr(&mut self) -> ParseResult<Node> {
        let token = self
            .next_token()
            .ok_or_else(|| ParseError::UnexpectedEof("an expression".to_string()))?;
        match token.kind {
            TokenKind::LParen => self.parse_list(token.span),
            TokenKind::RParen => Err(ParseError::UnexpectedToken {
                found: token.text.to_string(),
                span: token.span,
                expected: "an atom or '('".to_string(),
            }),
            TokenKind::Atom => match self.grammar {
                Grammar::Canonical => parse_atom(&token),
                Grammar::Legacy => self.parse_legacy_run(&token),
            },
        }
    }

    /// Parses the children of a list whose `(` has already been consumed.
    fn parse_list(&mut self, open_span: Span) -> ParseResult<Node> {
        let mut children = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::RParen) => {
                    let close = self.next_token();
                    let end = close.map_or(open_span, |t| t.span);
                    return Ok(Node::new_list(children, open_span.merge(end)));
                }
                Some(_) => children.push(self.parse_expr()?),
                None => return Err(ParseError::UnexpectedEof("')'".to_string())),
            }
        }
    }

    /// Legacy rule: a leading atom and everything up to the next
    /// `)` become one list, and the `)` is left for the caller.
    fn parse_legacy_run(&mut self, head: &Token<'src>) -> ParseResult<Node> {
        let mut span = head.span;
        let mut elements = vec![parse_atom(head)?];
        loop {
            match self.peek_kind() {
                Some(TokenKind::RParen) => return Ok(Node::new_list(elements, span)),
                Some(_) => {
                    if let Some(raw) = self.next_token() {
                        span = span.merge(raw.span);
                        elements.push(match raw.kind {
                            TokenKind::Atom => parse_atom(&raw)?,
                            _ => Node::new_symbol(raw.text, raw.span),
                        });
                    }
                }
                None => return Err(ParseError::UnexpectedEof("')'".to_string())),
            }
        }
    }

    /// Parses every remaining form.
    pub fn parse_all(mut self) -> ParseResult<Vec<Node>> {
        let mut forms = Vec::new();
        while !self.is_exhausted() {
            forms.push(self.parse_expr()?);
        }
        Ok(forms)
    }

    /// Parses a single form and rejects trailing tokens.
    pub fn parse(mut self) -> ParseResult<Node> {
        let expr = self.parse_expr()?;
        match self.next_token() {
            Some(found) => Err(ParseError::UnexpectedToken {
                found: found.text.to_string(),
                span: found.span,
                expected: "end of input".to_string(),
            }),
            None => Ok(expr),
        }
    }
}

/// An atom made only of decimal digits is an integer; anything else is a symbol.
fn parse_atom(token: &Token<'_>) -> ParseResult<Node> {
    let text = token.text;
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse::<i64>()
            .map(|n| Node::new_integer(n, token.span))
            .map_err(|_| ParseError::IntegerOutOfRange(text.to_string(), token.span))
    } else {
        Ok(Node::new_symbol(text, token.span))
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Node> {
    Parser::new(crate::lexer::tokenize(input)).parse()
}

/// Lexes and parses every top-level form in `input`.
pub fn parse_program(input: &str) -> ParseResult<Vec<Node>> {
    Parser::new(crate::lexer::tokenize(input)).parse_all()
}
