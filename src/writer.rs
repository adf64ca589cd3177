//! Serializes a [`Document`] back into canonical Caddyfile text.
//!
//! Produces tab-indented output: global options first, then snippets,
//! then sites, with one blank line between top-level blocks. Comments
//! are not written. Any document yields balanced, well-formed text.

use std::borrow::Cow;

use crate::ast::{Directive, Document, GlobalOptions, LogConfig, OrderHint, Site, Snippet};
use crate::lexer::tokenize;

/// Write a document as Caddyfile text.
#[must_use]
pub fn write_document(document: &Document) -> String {
    let mut out = String::new();
    let mut first_block = document.global.as_ref().is_none_or(|global| {
        write_global_options(&mut out, global);
        false
    });

    for snippet in &document.snippets {
        if !first_block {
            out.push('\n');
        }
        write_snippet(&mut out, snippet);
        first_block = false;
    }

    for site in &document.sites {
        if !first_block {
            out.push('\n');
        }
        write_site(&mut out, site);
        first_block = false;
    }

    out
}

/// Quote a value for output.
///
/// A value already wrapped in matching quotes is returned as is. A value
/// containing whitespace, a brace, or a double quote is wrapped in double
/// quotes with `"` and `\` escaped; so are empty values and values that
/// would otherwise start a comment or an unterminated quote.
#[must_use]
pub fn quote(value: &str) -> Cow<'_, str> {
    if is_wrapped(value) || !needs_quotes(value) {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// True when the whole value lexes as one terminated quoted span.
fn is_wrapped(value: &str) -> bool {
    let bytes = value.as_bytes();
    let Some(&quote) = bytes.first() else {
        return false;
    };
    if quote != b'"' && quote != b'\'' {
        return false;
    }

    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return i == bytes.len() - 1,
            _ => i += 1,
        }
    }
    false
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.starts_with('#')
        || value.starts_with('\'')
        || value
            .bytes()
            .any(|b| b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b'"'))
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push('\t');
    }
}

fn write_line<'a>(
    out: &mut String,
    level: usize,
    name: &str,
    args: impl IntoIterator<Item = &'a str>,
) {
    indent(out, level);
    out.push_str(&quote(name));
    for arg in args {
        out.push(' ');
        out.push_str(&quote(arg));
    }
}

/// Split a multi-word setting (`file /var/log/x.log`) into arguments.
fn setting_args(value: &str) -> Vec<String> {
    tokenize(value).into_iter().map(|t| t.text).collect()
}

fn write_setting(out: &mut String, level: usize, name: &str, value: &str) {
    let args = setting_args(value);
    write_line(out, level, name, args.iter().map(String::as_str));
    out.push('\n');
}

fn write_global_options(out: &mut String, global: &GlobalOptions) {
    out.push_str("{\n");

    for (name, value) in [
        ("email", global.email.as_deref()),
        ("acme_ca", global.acme_ca.as_deref()),
        ("admin", global.admin.as_deref()),
    ] {
        if let Some(value) = value {
            write_line(out, 1, name, [value]);
            out.push('\n');
        }
    }

    if global.debug {
        out.push_str("\tdebug\n");
    }

    write_order_hints(out, &global.order_before, "before");
    write_order_hints(out, &global.order_after, "after");

    if let Some(log) = &global.log {
        write_log(out, log);
    }

    if !global.servers.is_empty() {
        out.push_str("\tservers {\n");
        write_directives(out, &global.servers, 2);
        out.push_str("\t}\n");
    }

    write_directives(out, &global.extra, 1);
    out.push_str("}\n");
}

fn write_order_hints(out: &mut String, hints: &[OrderHint], position: &str) {
    for hint in hints {
        write_line(
            out,
            1,
            "order",
            [hint.directive.as_str(), position, hint.anchor.as_str()],
        );
        out.push('\n');
    }
}

fn write_log(out: &mut String, log: &LogConfig) {
    out.push_str("\tlog {\n");

    let rolls = [
        ("roll_size", log.roll_size.as_deref()),
        ("roll_keep", log.roll_keep.as_deref()),
    ];
    let has_roll = rolls.iter().any(|(_, value)| value.is_some());

    if let Some(output) = &log.output {
        let args = setting_args(output);
        write_line(out, 2, "output", args.iter().map(String::as_str));
        if has_roll {
            out.push_str(" {\n");
            write_rolls(out, &rolls, 3);
            out.push_str("\t\t}\n");
        } else {
            out.push('\n');
        }
    } else {
        write_rolls(out, &rolls, 2);
    }

    if let Some(format) = &log.format {
        write_setting(out, 2, "format", format);
    }
    if let Some(level) = &log.level {
        write_setting(out, 2, "level", level);
    }

    out.push_str("\t}\n");
}

fn write_rolls(out: &mut String, rolls: &[(&str, Option<&str>)], level: usize) {
    for &(name, value) in rolls {
        if let Some(value) = value {
            write_line(out, level, name, [value]);
            out.push('\n');
        }
    }
}

fn write_snippet(out: &mut String, snippet: &Snippet) {
    out.push('(');
    // a snippet key is one bare word
    out.extend(snippet.name.chars().map(|c| {
        if c.is_ascii_whitespace() || c == '{' || c == '}' {
            '_'
        } else {
            c
        }
    }));
    out.push_str(") {\n");
    write_directives_with_spacing(out, &snippet.directives, 1);
    out.push_str("}\n");
}

fn write_site(out: &mut String, site: &Site) {
    for (i, address) in site.addresses.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&quote(address));
    }

    out.push_str(" {\n");
    write_directives_with_spacing(out, &site.directives, 1);
    out.push_str("}\n");
}

fn write_directives(out: &mut String, directives: &[Directive], level: usize) {
    for directive in directives {
        write_directive(out, directive, level);
    }
}

/// Write directives with blank lines around those that have sub-blocks.
fn write_directives_with_spacing(out: &mut String, directives: &[Directive], level: usize) {
    let mut prev_had_block = false;

    for (i, directive) in directives.iter().enumerate() {
        let has_block = directive.block.is_some();
        if i > 0 && (has_block || prev_had_block) {
            out.push('\n');
        }
        write_directive(out, directive, level);
        prev_had_block = has_block;
    }
}

fn write_directive(out: &mut String, directive: &Directive, level: usize) {
    write_line(
        out,
        level,
        &directive.name,
        directive.arguments.iter().map(String::as_str),
    );

    if let Some(block) = &directive.block {
        out.push_str(" {\n");
        write_directives_with_spacing(out, block, level + 1);
        indent(out, level);
        out.push_str("}\n");
    } else {
        out.push('\n');
    }
}
