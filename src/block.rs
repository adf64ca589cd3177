//! Brace-delimited block parsing.
//!
//! Statements have no terminator other than whitespace. A directive's
//! argument list ends at a brace, a comment, a known directive name once
//! at least one argument was collected, or (with `line_breaks`) a token
//! on a later source line.

use std::ops::Range;

use crate::ast::{Directive, unquote};
use crate::directives::DirectiveTable;
use crate::token::{Token, TokenKind};

/// Index of the `}` matching the `{` at `open`, or `None` when the
/// block is unterminated or `open` is not an opening brace.
#[must_use]
pub fn find_block_end(tokens: &[Token], open: usize) -> Option<usize> {
    if tokens.get(open)?.kind != TokenKind::OpenBrace {
        return None;
    }

    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::OpenBrace => depth += 1,
            TokenKind::CloseBrace => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Directives recovered from one block body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedBlock {
    pub directives: Vec<Directive>,
    /// `import` targets found anywhere in the block, unquoted.
    pub imports: Vec<String>,
}

/// Parses the tokens strictly inside a pair of braces.
#[derive(Debug, Clone, Copy)]
pub struct BlockParser<'a> {
    tokens: &'a [Token],
    directives: &'a DirectiveTable,
    line_breaks: bool,
}

impl<'a> BlockParser<'a> {
    #[must_use]
    pub const fn new(tokens: &'a [Token], directives: &'a DirectiveTable, line_breaks: bool) -> Self {
        Self {
            tokens,
            directives,
            line_breaks,
        }
    }

    /// Parse `body`, the token range between a block's braces.
    #[must_use]
    pub fn parse(&self, body: Range<usize>) -> ParsedBlock {
        let mut imports = Vec::new();
        let end = body.end.min(self.tokens.len());
        let directives = self.parse_range(body.start, end, &mut imports);
        ParsedBlock {
            directives,
            imports,
        }
    }

    fn parse_range(&self, mut pos: usize, end: usize, imports: &mut Vec<String>) -> Vec<Directive> {
        let mut directives = Vec::new();

        while pos < end {
            let token = &self.tokens[pos];
            match token.kind {
                TokenKind::Comment | TokenKind::CloseBrace => pos += 1,
                TokenKind::OpenBrace => {
                    // nameless block: keep its contents in the parent
                    let close = self.close_of(pos, end);
                    directives.extend(self.parse_range(pos + 1, close, imports));
                    pos = close + 1;
                }
                TokenKind::Word | TokenKind::QuotedString => {
                    let (directive, next) = self.parse_directive(pos, end, imports);
                    directives.push(directive);
                    pos = next;
                }
            }
        }

        directives
    }

    fn parse_directive(
        &self,
        start: usize,
        end: usize,
        imports: &mut Vec<String>,
    ) -> (Directive, usize) {
        let name_token = &self.tokens[start];
        let mut arguments: Vec<String> = Vec::new();
        let mut block = None;
        let mut last_line = end_line(name_token);
        let mut pos = start + 1;

        while pos < end {
            let token = &self.tokens[pos];
            match token.kind {
                TokenKind::Comment | TokenKind::CloseBrace => break,
                TokenKind::OpenBrace => {
                    let close = self.close_of(pos, end);
                    block = Some(self.parse_range(pos + 1, close, imports));
                    pos = close + 1;
                    break;
                }
                TokenKind::Word | TokenKind::QuotedString => {
                    if self.line_breaks && token.span.line > last_line {
                        break;
                    }
                    if !arguments.is_empty() && self.directives.contains(&token.text) {
                        break;
                    }
                    arguments.push(token.text.clone());
                    last_line = end_line(token);
                    pos += 1;
                }
            }
        }

        if name_token.text == "import" {
            if let Some(target) = arguments.first() {
                imports.push(unquote(target).to_string());
            }
        }

        let mut raw = name_token.text.clone();
        for arg in &arguments {
            raw.push(' ');
            raw.push_str(arg);
        }

        let directive = Directive {
            name: name_token.text.clone(),
            arguments,
            block,
            raw,
        };
        (directive, pos.min(end))
    }

    fn close_of(&self, open: usize, end: usize) -> usize {
        find_block_end(self.tokens, open)
            .filter(|&close| close < end)
            .unwrap_or(end)
    }
}

/// Line on which a token ends (quoted spans may cross lines).
fn end_line(token: &Token) -> usize {
    token.span.line + token.text.bytes().filter(|&b| b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_body(input: &str, line_breaks: bool) -> ParsedBlock {
        let tokens = tokenize(input);
        let table = DirectiveTable::caddy();
        BlockParser::new(&tokens, &table, line_breaks).parse(0..tokens.len())
    }

    fn names(directives: &[Directive]) -> Vec<&str> {
        directives.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn block_end_matches_depth() {
        let tokens = tokenize("{ a { b } c } d }");
        assert_eq!(find_block_end(&tokens, 0), Some(6));
        assert_eq!(find_block_end(&tokens, 2), Some(4));
        assert_eq!(find_block_end(&tokens, 1), None);
        assert_eq!(find_block_end(&tokenize("{ a {"), 0), None);
        assert_eq!(find_block_end(&[], 0), None);
    }

    #[test]
    fn one_directive_per_line() {
        let block = parse_body("reverse_proxy localhost:8080\nencode gzip zstd\nlog", true);
        assert_eq!(names(&block.directives), ["reverse_proxy", "encode", "log"]);
        assert_eq!(block.directives[1].arguments, ["gzip", "zstd"]);
        assert!(block.directives[2].arguments.is_empty());
    }

    #[test]
    fn known_name_after_argument_starts_new_statement() {
        let block = parse_body("reverse_proxy app:80 encode gzip", false);
        assert_eq!(names(&block.directives), ["reverse_proxy", "encode"]);
        assert_eq!(block.directives[0].arguments, ["app:80"]);
    }

    #[test]
    fn known_name_as_first_argument_is_an_argument() {
        let block = parse_body("log encode", false);
        assert_eq!(block.directives.len(), 1);
        assert_eq!(block.directives[0].arguments, ["encode"]);
    }

    #[test]
    fn unknown_names_merge_without_line_breaks() {
        // known limitation of the whitespace-only grammar
        let block = parse_body("X-Frame-Options DENY\nX-Test yes", false);
        assert_eq!(block.directives.len(), 1);
        assert_eq!(
            block.directives[0].arguments,
            ["DENY", "X-Test", "yes"]
        );

        let block = parse_body("X-Frame-Options DENY\nX-Test yes", true);
        assert_eq!(names(&block.directives), ["X-Frame-Options", "X-Test"]);
    }

    #[test]
    fn nested_blocks_recurse() {
        let block = parse_body(
            "handle /api/* {\n\treverse_proxy {\n\t\tto app:3000\n\t}\n}\nlog",
            true,
        );
        assert_eq!(names(&block.directives), ["handle", "log"]);
        let handle = &block.directives[0];
        assert_eq!(handle.arguments, ["/api/*"]);
        let proxy = &handle.block.as_ref().expect("handle block")[0];
        assert_eq!(proxy.name, "reverse_proxy");
        let to = proxy.child("to").expect("to");
        assert_eq!(to.arguments, ["app:3000"]);
    }

    #[test]
    fn comments_end_statements_and_are_dropped() {
        let block = parse_body("encode gzip # compress\nlog", true);
        assert_eq!(names(&block.directives), ["encode", "log"]);
        assert_eq!(block.directives[0].arguments, ["gzip"]);
    }

    #[test]
    fn imports_recorded_at_any_depth() {
        let block = parse_body(
            "import common\nhandle {\n\timport \"inner\"\n}\nimport",
            true,
        );
        assert_eq!(block.imports, ["common", "inner"]);
        assert_eq!(names(&block.directives), ["import", "handle", "import"]);
    }

    #[test]
    fn raw_keeps_header_text() {
        let block = parse_body("respond \"Hello World\" 200 {\n\tclose\n}", true);
        assert_eq!(block.directives[0].raw, "respond \"Hello World\" 200");
    }

    #[test]
    fn quoted_argument_spanning_lines_does_not_split() {
        let block = parse_body("respond \"a\nb\" 200\nlog", true);
        assert_eq!(names(&block.directives), ["respond", "log"]);
        assert_eq!(block.directives[0].arguments, ["\"a\nb\"", "200"]);
    }

    #[test]
    fn nameless_block_is_flattened() {
        let block = parse_body("{\n\tlog\n}\nencode gzip", true);
        assert_eq!(names(&block.directives), ["log", "encode"]);
    }
}
