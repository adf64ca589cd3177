//! Document assembly.
//!
//! Three independent scans over the top level recover the global
//! options, the snippets, and the sites. Each scan walks the whole token
//! stream with [`TopLevel`], interprets only its own block kind, and
//! jumps over the brace-matched extent of the others.
//!
//! Parsing never fails. Tokens that cannot be placed are skipped and
//! reported through [`ParseReport::skipped`].

use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::ast::{Directive, Document, GlobalOptions, LogConfig, OrderHint, Site, Snippet};
use crate::block::{BlockParser, find_block_end};
use crate::classify::{BlockStart, Classifier, TopLevelState};
use crate::directives::DirectiveTable;
use crate::lexer::LexOptions;
use crate::token::{Span, Token, TokenKind};

/// Parser settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Known directive names for site and snippet blocks.
    pub directives: DirectiveTable,
    /// Known option names for the global options block.
    pub global_options: DirectiveTable,
    /// A token on a later line than the previous one ends a statement.
    pub line_breaks: bool,
    /// Keep `{placeholder}` braces inside words when tokenizing text.
    pub placeholders: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            directives: DirectiveTable::caddy(),
            global_options: DirectiveTable::global_options(),
            line_breaks: true,
            placeholders: false,
        }
    }
}

impl ParseOptions {
    /// Lexer settings matching these options.
    #[must_use]
    pub const fn lex_options(&self) -> LexOptions {
        LexOptions {
            placeholders: self.placeholders,
        }
    }
}

/// Why a top-level token range was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Tokens that start no block.
    Unclassified,
    /// A `{` with no matching `}` before end of input.
    UnterminatedBlock,
    /// A snippet name or site address not followed by `{`.
    MissingBlock,
    /// A block whose key is not a recognizable site address.
    AddresslessBlock,
    /// A keyless block after another top-level block.
    MisplacedGlobalOptions,
}

/// A dropped top-level range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub span: Span,
    pub reason: SkipReason,
    /// Token texts of the range, space joined.
    pub text: String,
}

/// A document plus everything the lenient parser dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ParseReport {
    pub document: Document,
    pub skipped: Vec<Skipped>,
}

/// Parse a token stream into a [`Document`].
#[must_use]
pub fn parse(tokens: &[Token], options: &ParseOptions) -> Document {
    Document {
        global: parse_global_options(tokens, options),
        snippets: parse_snippets(tokens, options),
        sites: parse_sites(tokens, options),
    }
}

/// Parse a token stream and report skipped ranges.
#[must_use]
pub fn parse_report(tokens: &[Token], options: &ParseOptions) -> ParseReport {
    let document = parse(tokens, options);
    let skipped: Vec<Skipped> = TopLevel::new(tokens, options)
        .filter_map(|item| match item {
            TopItem::Skipped(skipped) => Some(skipped),
            TopItem::Block(_) => None,
        })
        .collect();

    for s in &skipped {
        debug!(
            line = s.span.line,
            column = s.span.column,
            reason = ?s.reason,
            text = %s.text,
            "skipped top-level tokens"
        );
    }
    debug!(
        global = document.global.is_some(),
        snippets = document.snippets.len(),
        sites = document.sites.len(),
        skipped = skipped.len(),
        "parsed document"
    );

    ParseReport { document, skipped }
}

/// Scan for the global options block.
#[must_use]
pub fn parse_global_options(tokens: &[Token], options: &ParseOptions) -> Option<GlobalOptions> {
    TopLevel::new(tokens, options).find_map(|item| match item {
        TopItem::Block(TopBlock {
            kind: BlockKind::Global,
            body,
            comments,
        }) => {
            let parser = BlockParser::new(tokens, &options.global_options, options.line_breaks);
            let mut global = interpret_global(parser.parse(body).directives);
            global.comments = comments;
            Some(global)
        }
        _ => None,
    })
}

/// Scan for snippet definitions.
#[must_use]
pub fn parse_snippets(tokens: &[Token], options: &ParseOptions) -> Vec<Snippet> {
    let parser = BlockParser::new(tokens, &options.directives, options.line_breaks);
    TopLevel::new(tokens, options)
        .filter_map(|item| match item {
            TopItem::Block(TopBlock {
                kind: BlockKind::Snippet(name),
                body,
                comments,
            }) => Some(Snippet {
                name,
                directives: parser.parse(body).directives,
                comments,
            }),
            _ => None,
        })
        .collect()
}

/// Scan for site blocks.
#[must_use]
pub fn parse_sites(tokens: &[Token], options: &ParseOptions) -> Vec<Site> {
    let parser = BlockParser::new(tokens, &options.directives, options.line_breaks);
    TopLevel::new(tokens, options)
        .filter_map(|item| match item {
            TopItem::Block(TopBlock {
                kind: BlockKind::Site(addresses),
                body,
                comments,
            }) => {
                let block = parser.parse(body);
                Some(Site {
                    addresses,
                    directives: block.directives,
                    imports: block.imports,
                    comments,
                })
            }
            _ => None,
        })
        .collect()
}

#[derive(Debug)]
enum BlockKind {
    Global,
    Snippet(String),
    Site(Vec<String>),
}

#[derive(Debug)]
struct TopBlock {
    kind: BlockKind,
    /// Tokens strictly between the braces.
    body: Range<usize>,
    comments: Vec<String>,
}

#[derive(Debug)]
enum TopItem {
    Block(TopBlock),
    Skipped(Skipped),
}

/// Forward walk over top-level blocks.
struct TopLevel<'a> {
    tokens: &'a [Token],
    classifier: Classifier<'a>,
    line_breaks: bool,
    pos: usize,
    state: TopLevelState,
    seen_block: bool,
    stray_start: Option<usize>,
    comments: Vec<String>,
}

impl<'a> TopLevel<'a> {
    fn new(tokens: &'a [Token], options: &'a ParseOptions) -> Self {
        Self {
            tokens,
            classifier: Classifier::new(&options.directives),
            line_breaks: options.line_breaks,
            pos: 0,
            state: TopLevelState::Boundary,
            seen_block: false,
            stray_start: None,
            comments: Vec::new(),
        }
    }

    fn skipped(&self, range: Range<usize>, reason: SkipReason) -> TopItem {
        let end = range.end.min(self.tokens.len());
        let start = range.start.min(end);
        let text = self.tokens[start..end]
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let span = self.tokens.get(start).map(|t| t.span).unwrap_or_default();
        TopItem::Skipped(Skipped { span, reason, text })
    }

    fn flush_stray(&mut self) -> Option<TopItem> {
        let start = self.stray_start.take()?;
        Some(self.skipped(start..self.pos, SkipReason::Unclassified))
    }

    fn close_block(&mut self, close: usize) {
        self.pos = close + 1;
        self.state = TopLevelState::Boundary;
        self.seen_block = true;
    }

    /// Emit a block opened at `open`, or an unterminated skip.
    fn block_at(&mut self, from: usize, open: usize, kind: BlockKind) -> TopItem {
        let comments = std::mem::take(&mut self.comments);
        if let Some(close) = find_block_end(self.tokens, open) {
            self.close_block(close);
            TopItem::Block(TopBlock {
                kind,
                body: open + 1..close,
                comments,
            })
        } else {
            self.pos = self.tokens.len();
            self.skipped(from..self.pos, SkipReason::UnterminatedBlock)
        }
    }

    fn read_global(&mut self) -> TopItem {
        let open = self.pos;
        if self.seen_block {
            self.comments.clear();
            return match find_block_end(self.tokens, open) {
                Some(close) => {
                    self.close_block(close);
                    self.skipped(open..close + 1, SkipReason::MisplacedGlobalOptions)
                }
                None => {
                    self.pos = self.tokens.len();
                    self.skipped(open..self.pos, SkipReason::UnterminatedBlock)
                }
            };
        }
        self.block_at(open, open, BlockKind::Global)
    }

    fn read_addressless(&mut self) -> TopItem {
        let from = self.stray_start.take().unwrap_or(self.pos);
        self.comments.clear();
        match find_block_end(self.tokens, self.pos) {
            Some(close) => {
                self.close_block(close);
                self.skipped(from..close + 1, SkipReason::AddresslessBlock)
            }
            None => {
                self.pos = self.tokens.len();
                self.skipped(from..self.pos, SkipReason::UnterminatedBlock)
            }
        }
    }

    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !self.tokens[i].is_comment())
    }

    fn read_snippet(&mut self, name: String) -> TopItem {
        let from = self.pos;
        match self.next_significant(from + 1) {
            Some(open) if self.tokens[open].kind == TokenKind::OpenBrace => {
                self.block_at(from, open, BlockKind::Snippet(name))
            }
            _ => {
                self.pos = from + 1;
                self.comments.clear();
                self.skipped(from..self.pos, SkipReason::MissingBlock)
            }
        }
    }

    fn read_site(&mut self) -> TopItem {
        let tokens = self.tokens;
        let from = self.pos;
        let mut addresses = Vec::new();
        let mut i = from;
        let mut last: Option<&Token> = None;

        while let Some(token) = tokens.get(i) {
            match token.kind {
                TokenKind::Comment => {}
                TokenKind::OpenBrace | TokenKind::CloseBrace => break,
                TokenKind::Word | TokenKind::QuotedString => {
                    let continues = last.is_none_or(|prev| {
                        !self.line_breaks
                            || token.span.line == prev.span.line
                            || prev.text.ends_with(',')
                    });
                    if !continues {
                        break;
                    }
                    if token.kind == TokenKind::Word {
                        addresses.extend(
                            token
                                .text
                                .split(',')
                                .filter(|a| !a.is_empty())
                                .map(str::to_string),
                        );
                    } else {
                        addresses.push(token.text.trim_end_matches(',').to_string());
                    }
                    last = Some(token);
                }
            }
            i += 1;
        }

        let opens = tokens
            .get(i)
            .is_some_and(|t| t.kind == TokenKind::OpenBrace);
        if opens && !addresses.is_empty() {
            self.block_at(from, i, BlockKind::Site(addresses))
        } else {
            self.pos = i.max(from + 1);
            self.comments.clear();
            self.skipped(from..self.pos, SkipReason::MissingBlock)
        }
    }
}

impl Iterator for TopLevel<'_> {
    type Item = TopItem;

    fn next(&mut self) -> Option<TopItem> {
        let tokens = self.tokens;
        loop {
            let Some(token) = tokens.get(self.pos) else {
                return self.flush_stray();
            };

            if token.is_comment() {
                if self.stray_start.is_none() {
                    self.comments.push(token.text.clone());
                }
                self.pos += 1;
                continue;
            }

            let start = self.classifier.classify(tokens, self.pos, self.state);
            self.state = self.state.after(&start);

            match start {
                BlockStart::GlobalOptions if self.stray_start.is_none() => {
                    return Some(self.read_global());
                }
                BlockStart::GlobalOptions | BlockStart::Other
                    if token.kind == TokenKind::OpenBrace =>
                {
                    return Some(self.read_addressless());
                }
                BlockStart::GlobalOptions | BlockStart::Other => {
                    self.stray_start.get_or_insert(self.pos);
                    self.comments.clear();
                    self.pos += 1;
                }
                BlockStart::Snippet(name) => {
                    if let Some(stray) = self.flush_stray() {
                        return Some(stray);
                    }
                    return Some(self.read_snippet(name));
                }
                BlockStart::Site => {
                    if let Some(stray) = self.flush_stray() {
                        return Some(stray);
                    }
                    return Some(self.read_site());
                }
            }
        }
    }
}

/// Fold global option directives into typed fields. Anything that does
/// not fit a field, including repeats, stays in `extra`.
fn interpret_global(directives: Vec<Directive>) -> GlobalOptions {
    let mut global = GlobalOptions::default();

    for d in directives {
        let single = single_argument(&d);
        match d.name.as_str() {
            "email" if global.email.is_none() && single.is_some() => global.email = single,
            "acme_ca" if global.acme_ca.is_none() && single.is_some() => global.acme_ca = single,
            "admin" if global.admin.is_none() && single.is_some() => global.admin = single,
            "debug" if !global.debug && d.arguments.is_empty() && d.block.is_none() => {
                global.debug = true;
            }
            "order" => match order_hint(&d) {
                Some((hint, true)) => global.order_before.push(hint),
                Some((hint, false)) => global.order_after.push(hint),
                None => global.extra.push(d),
            },
            "log" if global.log.is_none() => match log_config(&d) {
                Some(log) => global.log = Some(log),
                None => global.extra.push(d),
            },
            "servers" if d.arguments.is_empty() && d.block.is_some() => {
                global.servers.extend(d.block.unwrap_or_default());
            }
            _ => global.extra.push(d),
        }
    }

    global
}

fn single_argument(d: &Directive) -> Option<String> {
    match (d.arguments.as_slice(), &d.block) {
        ([value], None) => Some(value.clone()),
        _ => None,
    }
}

fn order_hint(d: &Directive) -> Option<(OrderHint, bool)> {
    if d.block.is_some() {
        return None;
    }
    match d.arguments.as_slice() {
        [directive, position, anchor] if position == "before" || position == "after" => {
            Some((OrderHint::new(directive, anchor), position == "before"))
        }
        _ => None,
    }
}

/// Typed view of `log { ... }`, or `None` when the block holds anything
/// the typed fields cannot carry.
fn log_config(d: &Directive) -> Option<LogConfig> {
    if !d.arguments.is_empty() {
        return None;
    }
    let mut log = LogConfig::default();

    for child in d.block.as_ref()? {
        let value = (!child.arguments.is_empty()).then(|| child.arguments.join(" "));
        match (child.name.as_str(), &child.block) {
            ("output", inner) if log.output.is_none() && value.is_some() => {
                log.output = value;
                for roll in inner.iter().flatten() {
                    set_roll(&mut log, roll)?;
                }
            }
            ("format", None) if log.format.is_none() && value.is_some() => log.format = value,
            ("level", None) if log.level.is_none() && value.is_some() => log.level = value,
            ("roll_size" | "roll_keep", None) => set_roll(&mut log, child)?,
            _ => return None,
        }
    }

    Some(log)
}

fn set_roll(log: &mut LogConfig, d: &Directive) -> Option<()> {
    let value = single_argument(d)?;
    let slot = match d.name.as_str() {
        "roll_size" => &mut log.roll_size,
        "roll_keep" => &mut log.roll_keep,
        _ => return None,
    };
    if slot.is_some() {
        return None;
    }
    *slot = Some(value);
    Some(())
}
