use serde::Serialize;

/// Source location for diagnostics and skipped-range reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    /// Unquoted word.
    Word,
    /// Quoted span (`"..."` or `'...'`), quotes kept in the text.
    QuotedString,
    /// Comment (`# ...`).
    Comment,
    /// Opening brace `{`.
    OpenBrace,
    /// Closing brace `}`.
    CloseBrace,
}

/// A single token with its kind, literal text, and source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    /// True for `{` and `}`.
    #[must_use]
    pub const fn is_brace(&self) -> bool {
        matches!(self.kind, TokenKind::OpenBrace | TokenKind::CloseBrace)
    }

    #[must_use]
    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }
}
