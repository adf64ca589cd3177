//! Lexer edge cases.

use caddyfile_engine::{LexOptions, TokenKind, tokenize, tokenize_with};

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input).into_iter().map(|t| t.kind).collect()
}

fn texts(input: &str) -> Vec<String> {
    tokenize(input).into_iter().map(|t| t.text).collect()
}

// -----------------------------------------------------------
// Basic lexer behaviour.
// -----------------------------------------------------------

#[test]
fn lex_empty_input() {
    assert!(tokenize("").is_empty());
}

#[test]
fn lex_only_whitespace() {
    assert!(tokenize("   \t  \n\n \r\n ").is_empty());
}

#[test]
fn lex_multiple_comments() {
    let tokens = tokenize("# comment 1\n# comment 2\n");
    assert_eq!(tokens.len(), 2);
    assert!(tokens.iter().all(|t| t.kind == TokenKind::Comment));
    assert_eq!(tokens[1].text, "# comment 2");
}

#[test]
fn lex_site_block_shape() {
    assert_eq!(
        kinds("example.com {\n\treverse_proxy app:3000\n}\n"),
        [
            TokenKind::Word,
            TokenKind::OpenBrace,
            TokenKind::Word,
            TokenKind::Word,
            TokenKind::CloseBrace,
        ]
    );
}

#[test]
fn lex_consecutive_braces() {
    assert_eq!(texts("{{}}"), ["{", "{", "}", "}"]);
    assert_eq!(texts("a{b}c"), ["a", "{", "b", "}", "c"]);
}

#[test]
fn lex_multiple_spaces_between_tokens() {
    assert_eq!(texts("  encode   gzip\t\tzstd  "), ["encode", "gzip", "zstd"]);
}

#[test]
fn lex_crlf_line_endings() {
    let tokens = tokenize("a.com {\r\n\tlog\r\n}\r\n");
    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[2].text, "log");
    assert_eq!(tokens[2].span.line, 2);
}

// -----------------------------------------------------------
// Quoting.
// -----------------------------------------------------------

#[test]
fn lex_quoted_with_newline() {
    let tokens = tokenize("respond \"line one\nline two\" 200");
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[1].kind, TokenKind::QuotedString);
    assert_eq!(tokens[1].text, "\"line one\nline two\"");
    assert_eq!(tokens[2].span.line, 2);
}

#[test]
fn lex_quoted_braces_and_hash_are_literal() {
    assert_eq!(
        texts("key \"{remote_host} # not a comment\""),
        ["key", "\"{remote_host} # not a comment\""]
    );
}

#[test]
fn lex_single_quotes_do_not_close_double() {
    assert_eq!(texts("\"it's fine\" x"), ["\"it's fine\"", "x"]);
    assert_eq!(texts("'say \"hi\"' x"), ["'say \"hi\"'", "x"]);
}

#[test]
fn lex_quoted_string_all_escapes() {
    let tokens = tokenize(r#"header X "a \"b\" \\ c""#);
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[2].text, r#""a \"b\" \\ c""#);
}

#[test]
fn lex_quote_mid_word_is_part_of_word() {
    assert_eq!(texts("it's here"), ["it's", "here"]);
}

#[test]
fn lex_unterminated_quote_consumes_to_end() {
    let tokens = tokenize("respond \"open {\n}\nnext.com {");
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[1].kind, TokenKind::QuotedString);
    assert!(tokens[1].text.ends_with("next.com {"));
}

#[test]
fn lex_trailing_backslash_in_unterminated_quote() {
    let tokens = tokenize("\"abc\\");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].text, "\"abc\\");
}

// -----------------------------------------------------------
// Comments.
// -----------------------------------------------------------

#[test]
fn lex_trailing_comment_after_directive() {
    let tokens = tokenize("encode gzip # compress\nlog");
    assert_eq!(
        tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
        [
            TokenKind::Word,
            TokenKind::Word,
            TokenKind::Comment,
            TokenKind::Word,
        ]
    );
    assert_eq!(tokens[2].text, "# compress");
}

#[test]
fn lex_comment_stops_at_carriage_return() {
    let tokens = tokenize("# note\r\nlog");
    assert_eq!(tokens[0].text, "# note");
    assert_eq!(tokens[1].text, "log");
}

#[test]
fn lex_hash_inside_word() {
    assert_eq!(texts("redir /a#frag"), ["redir", "/a#frag"]);
}

// -----------------------------------------------------------
// Placeholders.
// -----------------------------------------------------------

#[test]
fn lex_placeholders_option() {
    let options = LexOptions { placeholders: true };
    let texts: Vec<String> = tokenize_with("rewrite * /v2{path} {\n\t{host}\n}", options)
        .into_iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(texts, ["rewrite", "*", "/v2{path}", "{", "{host}", "}"]);
}

#[test]
fn lex_placeholders_default_off() {
    assert_eq!(texts("/v2{path}"), ["/v2", "{", "path", "}"]);
}

// -----------------------------------------------------------
// Spans and encodings.
// -----------------------------------------------------------

#[test]
fn lex_spans_are_one_based() {
    let tokens = tokenize("a.com {\n  log\n}");
    assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
    assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 7));
    assert_eq!((tokens[2].span.line, tokens[2].span.column), (2, 3));
    assert_eq!((tokens[3].span.line, tokens[3].span.column), (3, 1));
}

#[test]
fn lex_bom_input() {
    let tokens = tokenize("\u{FEFF}example.com {\n}");
    assert_eq!(tokens[0].text, "example.com");
    assert_eq!(tokens[0].span.column, 1);
}

#[test]
fn lex_non_ascii_word() {
    assert_eq!(texts("respond héllo→wörld"), ["respond", "héllo→wörld"]);
}

#[test]
fn lex_never_produces_empty_tokens() {
    for input in ["\"\"", "''", "{}", "#", "\"", "a\"", " \n#\n "] {
        for token in tokenize(input) {
            assert!(!token.text.is_empty(), "empty token from {input:?}");
        }
    }
}
