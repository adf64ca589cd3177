//! Top-level structural classification.
//!
//! Decides whether a top-level token starts the global options block, a
//! snippet definition, or a site block. Context is a small forward state
//! ([`TopLevelState`]) threaded through the top-level pass instead of a
//! backward scan over previous tokens.

use serde::Serialize;

use crate::directives::DirectiveTable;
use crate::token::{Token, TokenKind};

/// What a top-level position starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BlockStart {
    /// A lone `{` with no site or snippet key before it.
    GlobalOptions,
    /// `(name)`: a snippet definition.
    Snippet(String),
    /// A token that looks like a site address.
    Site,
    /// Anything else: directive continuation, comment, stray token.
    Other,
}

/// Forward state of the top-level pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TopLevelState {
    /// At the document start or right after a top-level block closed.
    #[default]
    Boundary,
    /// A site address or snippet name has been seen since the last boundary.
    Keyed,
}

impl TopLevelState {
    /// State after the token classified as `start`.
    #[must_use]
    pub const fn after(self, start: &BlockStart) -> Self {
        match start {
            BlockStart::Snippet(_) | BlockStart::Site => Self::Keyed,
            BlockStart::GlobalOptions | BlockStart::Other => self,
        }
    }
}

/// Classifies top-level tokens against a directive table.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    directives: &'a DirectiveTable,
}

impl<'a> Classifier<'a> {
    #[must_use]
    pub const fn new(directives: &'a DirectiveTable) -> Self {
        Self { directives }
    }

    /// Classify the token at `pos`. Out-of-range positions are `Other`.
    #[must_use]
    pub fn classify(&self, tokens: &[Token], pos: usize, state: TopLevelState) -> BlockStart {
        let Some(token) = tokens.get(pos) else {
            return BlockStart::Other;
        };

        match token.kind {
            TokenKind::OpenBrace if state == TopLevelState::Boundary => BlockStart::GlobalOptions,
            TokenKind::OpenBrace
            | TokenKind::CloseBrace
            | TokenKind::Comment
            | TokenKind::QuotedString => BlockStart::Other,
            TokenKind::Word => {
                if let Some(name) = snippet_name(&token.text) {
                    BlockStart::Snippet(name.to_string())
                } else if self.is_site_address(&token.text) {
                    BlockStart::Site
                } else {
                    BlockStart::Other
                }
            }
        }
    }

    /// Heuristic address test. For a comma-joined list only the first
    /// entry is judged.
    #[must_use]
    pub fn is_site_address(&self, token: &str) -> bool {
        let token = token.split(',').next().unwrap_or(token);
        if token.is_empty() || self.directives.contains(token) {
            return false;
        }
        if token.starts_with('(') || token.starts_with('@') {
            return false;
        }

        token.contains('.')
            || token.starts_with(':')
            || token.starts_with("http://")
            || token.starts_with("https://")
            || is_localhost(token)
    }
}

/// Name inside `(name)`, if the token is a snippet definition key.
#[must_use]
pub fn snippet_name(token: &str) -> Option<&str> {
    token
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|name| !name.is_empty())
}

fn is_localhost(token: &str) -> bool {
    match token.strip_prefix("localhost") {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix(':')
            .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}
