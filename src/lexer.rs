use crate::token::{Span, Token, TokenKind};

/// Lexer switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexOptions {
    /// Treat a brace as a token only when it stands alone between
    /// whitespace, so placeholders like `{host}` or `/a/{path}` stay
    /// inside their word. Off by default: every brace outside quotes
    /// is its own token.
    pub placeholders: bool,
}

/// Tokenize Caddyfile source into a flat sequence of tokens.
///
/// The tokenizer never rejects input. An unterminated quote consumes
/// the rest of the input into a single quoted token. No token is ever
/// empty.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    tokenize_with(input, LexOptions::default())
}

/// Tokenize with explicit [`LexOptions`].
#[must_use]
pub fn tokenize_with(input: &str, options: LexOptions) -> Vec<Token> {
    Lexer::new(input, options).tokenize()
}

struct Lexer<'a> {
    src: &'a str,
    input: &'a [u8],
    options: LexOptions,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, options: LexOptions) -> Self {
        let bytes = src.as_bytes();
        let start = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            3
        } else {
            0
        };
        Self {
            src,
            input: bytes,
            options,
            pos: start,
            line: 1,
            col: 1,
        }
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                c if c.is_ascii_whitespace() => self.advance(),
                b'{' | b'}' if self.options.placeholders && !self.brace_stands_alone() => {
                    tokens.push(self.read_word());
                }
                b'{' => tokens.push(self.single(TokenKind::OpenBrace)),
                b'}' => tokens.push(self.single(TokenKind::CloseBrace)),
                b'#' => tokens.push(self.read_comment()),
                b'"' | b'\'' => tokens.push(self.read_quoted(ch)),
                _ => tokens.push(self.read_word()),
            }
        }

        tokens
    }

    const fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.col,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        let Some(ch) = self.peek() else {
            return;
        };
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // continuation bytes do not start a new column
            self.col += 1;
        }
        self.pos += 1;
    }

    fn brace_stands_alone(&self) -> bool {
        self.input
            .get(self.pos + 1)
            .is_none_or(u8::is_ascii_whitespace)
    }

    fn token_from(&self, kind: TokenKind, start: usize, span: Span) -> Token {
        Token {
            kind,
            text: self.src[start..self.pos].to_string(),
            span,
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let span = self.span();
        let start = self.pos;
        self.advance();
        self.token_from(kind, start, span)
    }

    fn read_comment(&mut self) -> Token {
        let span = self.span();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == b'\n' || ch == b'\r' {
                break;
            }
            self.advance();
        }
        self.token_from(TokenKind::Comment, start, span)
    }

    fn read_quoted(&mut self, quote: u8) -> Token {
        let span = self.span();
        let start = self.pos;
        self.advance(); // opening quote

        while let Some(ch) = self.peek() {
            self.advance();
            if ch == b'\\' {
                // escaped character is kept verbatim
                self.advance();
            } else if ch == quote {
                break;
            }
        }

        self.token_from(TokenKind::QuotedString, start, span)
    }

    fn read_word(&mut self) -> Token {
        let span = self.span();
        let start = self.pos;
        let braces_split = !self.options.placeholders;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() || (braces_split && (ch == b'{' || ch == b'}')) {
                break;
            }
            self.advance();
        }
        self.token_from(TokenKind::Word, start, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn simple_words() {
        let tokens = tokenize("reverse_proxy localhost:8080");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "reverse_proxy");
        assert_eq!(tokens[1].text, "localhost:8080");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Word));
    }

    #[test]
    fn braces_split_adjacent_text() {
        assert_eq!(texts("example.com{log}"), ["example.com", "{", "log", "}"]);
        let kinds: Vec<_> = tokenize("a{").iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [TokenKind::Word, TokenKind::OpenBrace]);
    }

    #[test]
    fn double_quotes_keep_whitespace_and_braces() {
        let tokens = tokenize(r#"respond "Hello { World }" 200"#);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::QuotedString);
        assert_eq!(tokens[1].text, r#""Hello { World }""#);
    }

    #[test]
    fn single_quotes() {
        let tokens = tokenize("header X-Test 'a \"b\" c'");
        assert_eq!(tokens[2].text, "'a \"b\" c'");
        assert_eq!(tokens[2].kind, TokenKind::QuotedString);
    }

    #[test]
    fn escaped_quote_does_not_close() {
        let tokens = tokenize(r#""say \"hi\"" next"#);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, r#""say \"hi\"""#);
        assert_eq!(tokens[1].text, "next");
    }

    #[test]
    fn unterminated_quote_consumes_rest() {
        let tokens = tokenize("respond \"unclosed {\n}\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "\"unclosed {\n}\n");
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let tokens = tokenize("log # access log\nfile_server");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "# access log");
        assert_eq!(tokens[2].text, "file_server");
    }

    #[test]
    fn hash_inside_word_is_not_a_comment() {
        assert_eq!(texts("redir /a#frag"), ["redir", "/a#frag"]);
    }

    #[test]
    fn crlf_is_whitespace() {
        assert_eq!(texts("a\r\nb"), ["a", "b"]);
    }

    #[test]
    fn bom_is_ignored() {
        let tokens = tokenize("\u{FEFF}example.com");
        assert_eq!(tokens[0].text, "example.com");
    }

    #[test]
    fn no_empty_tokens() {
        let tokens = tokenize("  {}\n\t\"\" '' # \n}{ x");
        assert!(tokens.iter().all(|t| !t.text.is_empty()));
    }

    #[test]
    fn span_tracking() {
        let tokens = tokenize("a\nb c");
        assert_eq!(tokens[0].span, Span { line: 1, column: 1 });
        assert_eq!(tokens[1].span, Span { line: 2, column: 1 });
        assert_eq!(tokens[2].span, Span { line: 2, column: 3 });
    }

    #[test]
    fn placeholders_stay_in_words() {
        let options = LexOptions { placeholders: true };
        let tokens = tokenize_with("respond {path} /a/{file} {\n}", options);
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["respond", "{path}", "/a/{file}", "{", "}"]);
        assert_eq!(tokens[3].kind, TokenKind::OpenBrace);
        assert_eq!(tokens[4].kind, TokenKind::CloseBrace);
    }

    #[test]
    fn placeholders_off_splits_braces() {
        assert_eq!(texts("respond {path}"), ["respond", "{", "path", "}"]);
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let tokens = tokenize("respond \"héllo wörld\" ünï");
        assert_eq!(tokens[1].text, "\"héllo wörld\"");
        assert_eq!(tokens[2].text, "ünï");
        assert_eq!(tokens[2].span.column, 23);
    }
}
