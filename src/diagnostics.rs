//! Decoding of validator output into line-addressed diagnostics.
//!
//! The validating authority reports problems as free text, one per line,
//! usually carrying a `Caddyfile:NN` location. Its log output may be
//! interleaved as JSON lines; only error-level entries count.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used when the authority failed without saying why.
pub const GENERIC_FAILURE: &str = "configuration rejected without diagnostics";

/// One structured validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based source line, or 0 when the message carries no location.
    pub line: usize,
    pub message: String,
    /// Source name from the location prefix, when present.
    pub file: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            file: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (_, 0) => write!(f, "{}", self.message),
            (Some(file), line) => write!(f, "{file}:{line}: {}", self.message),
            (None, line) => write!(f, "line {line}: {}", self.message),
        }
    }
}

// Caddyfile:10 - Error: unrecognized directive
static DASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:.*?:\s+)?(?P<file>[^\s:]+):(?P<line>\d+) - (?P<msg>.+)$")
        .expect("valid pattern")
});

// line 10: unexpected '}'
static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:.*?:\s+)?line (?P<line>\d+):\s*(?P<msg>.+)$").expect("valid pattern")
});

// Error: adapting config using caddyfile: Caddyfile:3: unrecognized directive: foo
static COLON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:.*?:\s+)?(?P<file>[^\s:]+):(?P<line>\d+):\s*(?P<msg>.+)$")
        .expect("valid pattern")
});

// wrong argument count or unexpected line ending after 'tls', at Caddyfile:5 import chain [...]
static AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<msg>.+?),? at (?P<file>[^\s:]+):(?P<line>\d+)(?:\s.*)?$")
        .expect("valid pattern")
});

// 2024/01/02 03:04:05.678	INFO	using config from file
static PLAIN_LOG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?\s+(?:DEBUG|INFO|WARN)\b")
        .expect("valid pattern")
});

/// Decode validator output. Lines with no recognizable content are
/// dropped; lines with no location get line 0.
#[must_use]
pub fn decode(output: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || PLAIN_LOG.is_match(line) {
            continue;
        }

        if line.starts_with('{') {
            if let Ok(Value::Object(entry)) = serde_json::from_str::<Value>(line) {
                if let Some(text) = json_error_text(&entry) {
                    diagnostics.extend(decode(&text));
                }
                continue;
            }
        }

        diagnostics.push(decode_line(line));
    }
    diagnostics
}

/// Decode a failed response or process output. Never empty.
#[must_use]
pub fn decode_failure(output: &str) -> Vec<Diagnostic> {
    let diagnostics = decode(output);
    if diagnostics.is_empty() {
        vec![Diagnostic::new(0, GENERIC_FAILURE)]
    } else {
        diagnostics
    }
}

/// Decode one non-empty line of text.
#[must_use]
pub fn decode_line(line: &str) -> Diagnostic {
    for pattern in [&*DASH, &*LINE, &*COLON, &*AT] {
        if let Some(caps) = pattern.captures(line) {
            let number = caps
                .name("line")
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let message = caps.name("msg").map_or(line, |m| m.as_str()).trim();
            return Diagnostic {
                line: number,
                message: message.to_string(),
                file: caps.name("file").map(|m| m.as_str().to_string()),
            };
        }
    }
    Diagnostic::new(0, line)
}

/// Text worth decoding from a JSON line: the `error` of a response body,
/// or the message of an error-level log entry.
fn json_error_text(entry: &serde_json::Map<String, Value>) -> Option<String> {
    let error = entry.get("error").and_then(Value::as_str);
    let Some(level) = entry.get("level").and_then(Value::as_str) else {
        return error.map(str::to_string);
    };
    if !is_error_level(level) {
        return None;
    }

    let msg = entry.get("msg").and_then(Value::as_str).unwrap_or_default();
    match (msg, error) {
        ("", None) => None,
        ("", Some(error)) => Some(error.to_string()),
        (msg, None) => Some(msg.to_string()),
        (msg, Some(error)) => Some(format!("{msg}: {error}")),
    }
}

fn is_error_level(level: &str) -> bool {
    matches!(
        level.to_ascii_lowercase().as_str(),
        "error" | "dpanic" | "panic" | "fatal"
    )
}

/// The `error` string of a JSON error body, or the trimmed body itself.
#[must_use]
pub fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.trim().to_string(), |b| b.error)
}

#[derive(Debug, Deserialize)]
struct AdaptBody {
    #[serde(default)]
    warnings: Vec<AdaptWarning>,
}

#[derive(Debug, Deserialize)]
struct AdaptWarning {
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    line: usize,
    #[serde(default)]
    directive: Option<String>,
    #[serde(default)]
    message: String,
}

/// Warnings from a successful `/adapt` response body.
#[must_use]
pub fn adapt_warnings(body: &str) -> Vec<Diagnostic> {
    let Ok(body) = serde_json::from_str::<AdaptBody>(body) else {
        return Vec::new();
    };
    body.warnings
        .into_iter()
        .map(|w| Diagnostic {
            line: w.line,
            message: match w.directive {
                Some(directive) if !directive.is_empty() => format!("{directive}: {}", w.message),
                _ => w.message,
            },
            file: w.file.filter(|f| !f.is_empty()),
        })
        .collect()
}
