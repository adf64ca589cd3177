//! Caddyfile tokenizer, parser, writer, and validation bridge.
//!
//! Recovers global options, snippets, and site blocks from Caddyfile
//! text into a typed [`Document`], writes documents back to canonical
//! text, and checks generated text against the proxy itself before it
//! is saved and reloaded.
//!
//! # Quick start
//!
//! ## Parse and re-write a Caddyfile
//!
//! ```
//! use caddyfile_engine::{parse_str, write_document};
//!
//! let input = "example.com {\n\treverse_proxy localhost:8080\n}\n";
//! let document = parse_str(input);
//! assert_eq!(document.sites[0].addresses, ["example.com"]);
//! assert_eq!(write_document(&document), input);
//! ```
//!
//! ## Build a document programmatically
//!
//! ```
//! use caddyfile_engine::{Document, GlobalOptions, Site, write_document};
//!
//! let document = Document::new()
//!     .global(GlobalOptions::default().email("ops@example.com"))
//!     .site(Site::new("example.com")
//!         .reverse_proxy("app:3000")
//!         .encode_gzip()
//!         .log());
//!
//! let output = write_document(&document);
//! assert!(output.contains("email ops@example.com"));
//! assert!(output.contains("reverse_proxy app:3000"));
//! ```
//!
//! ## Decode validator output
//!
//! ```
//! use caddyfile_engine::diagnostics::decode;
//!
//! let d = decode("Caddyfile:10 - Error: unrecognized directive");
//! assert_eq!(d[0].line, 10);
//! assert_eq!(d[0].message, "Error: unrecognized directive");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod admin;
pub mod apply;
pub mod ast;
pub mod block;
pub mod builder;
pub mod classify;
pub mod diagnostics;
pub mod directives;
pub mod lexer;
pub mod parser;
pub mod settings;
pub mod source;
pub mod token;
pub mod validate;
pub mod writer;

pub use admin::{AdminClient, AdminError, CaInfo};
pub use apply::{ApplyError, apply};
pub use ast::{
    Directive, Document, DocumentError, GlobalOptions, LogConfig, OrderHint, Site, Snippet,
};
pub use classify::{BlockStart, Classifier, TopLevelState};
pub use diagnostics::Diagnostic;
pub use directives::DirectiveTable;
pub use lexer::{LexOptions, tokenize, tokenize_with};
pub use parser::{
    ParseOptions, ParseReport, SkipReason, Skipped, parse, parse_global_options, parse_report,
    parse_sites, parse_snippets,
};
pub use settings::Settings;
pub use source::{SourceError, load_document, read_config, write_config};
pub use token::{Span, Token, TokenKind};
pub use validate::{
    AdminValidator, BridgeError, CommandValidator, ValidationState, Validator, Verdict,
};
pub use writer::{quote, write_document};

/// Unified error type over the fallible parts of the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("{0}")]
    Document(#[from] DocumentError),
    #[error("{0}")]
    Bridge(#[from] BridgeError),
    #[error("{0}")]
    Admin(#[from] AdminError),
    #[error("{0}")]
    Apply(#[from] ApplyError),
    #[error("{0}")]
    Settings(#[from] settings::SettingsError),
}

/// Tokenize and parse Caddyfile text in one step with default options.
#[must_use]
pub fn parse_str(input: &str) -> Document {
    parse_str_with(input, &ParseOptions::default())
}

/// Tokenize and parse with explicit options.
#[must_use]
pub fn parse_str_with(input: &str, options: &ParseOptions) -> Document {
    let tokens = tokenize_with(input, options.lex_options());
    parse(&tokens, options)
}
