use logos::Logos;
use std::fmt;

use crate::Span;

/// The three shapes a token can take. Everything that is not whitespace or a
/// parenthesis is glued into an atom; classifying atoms is the parser's job.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"\s+")] // Skip whitespace
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r"[^\s()]+")]
    Atom,
}

/// A token borrows its text from the source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub span: Span,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Splits `input` into parentheses and atoms. Never fails: every character is
/// either whitespace, a parenthesis or part of an atom.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| Token {
            // The atom pattern covers every non-space character, so an error
            // slot can only ever hold atom text.
            kind: result.unwrap_or(TokenKind::Atom),
            text: &input[range.clone()],
            span: Span::new(range.start, range.end),
        })
        .collect()
}
