#![allow(dead_code)]

use caddyfile_engine::{Document, ParseOptions, parse_str, parse_str_with, write_document};

pub fn roundtrip(input: &str) {
    let doc = parse_str(input);
    let output = write_document(&doc);
    assert_eq!(
        output, input,
        "round-trip mismatch:\n--- expected ---\n{input}\n--- got ---\n{output}"
    );
}

/// Helper: write a document, parse it back, assert structural equality.
pub fn assert_document_roundtrip(original: &Document) {
    let written = write_document(original);
    let parsed = parse_str(&written);

    assert_eq!(
        original.global, parsed.global,
        "global mismatch\n--- written ---\n{written}"
    );
    assert_eq!(
        original.snippets, parsed.snippets,
        "snippets mismatch\n--- written ---\n{written}"
    );
    assert_eq!(
        original.sites, parsed.sites,
        "sites mismatch\n--- written ---\n{written}"
    );
}

/// Parse with the whitespace-only statement grammar.
pub fn parse_without_line_breaks(input: &str) -> Document {
    let options = ParseOptions {
        line_breaks: false,
        ..ParseOptions::default()
    };
    parse_str_with(input, &options)
}

/// Directive names of the first site, in order.
pub fn site_directive_names(doc: &Document) -> Vec<&str> {
    doc.sites
        .first()
        .map(|s| s.directives.iter().map(|d| d.name.as_str()).collect())
        .unwrap_or_default()
}
