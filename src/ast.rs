use std::collections::HashSet;

use serde::Serialize;

/// Complete Caddyfile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub global: Option<GlobalOptions>,
    pub snippets: Vec<Snippet>,
    pub sites: Vec<Site>,
}

/// Global options block (first block, no keys).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GlobalOptions {
    pub email: Option<String>,
    pub acme_ca: Option<String>,
    /// Admin endpoint setting (`off`, `localhost:2019`, ...).
    pub admin: Option<String>,
    pub debug: bool,
    /// `order <directive> before <anchor>`.
    pub order_before: Vec<OrderHint>,
    /// `order <directive> after <anchor>`.
    pub order_after: Vec<OrderHint>,
    pub log: Option<LogConfig>,
    /// Children of the `servers { ... }` block.
    pub servers: Vec<Directive>,
    /// Global options without a typed field, in source order.
    pub extra: Vec<Directive>,
    /// Comments directly above the block. Not written back.
    pub comments: Vec<String>,
}

/// One directive ordering hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderHint {
    pub directive: String,
    pub anchor: String,
}

/// Default logger settings from the global `log` option.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LogConfig {
    /// Output destination with its arguments, e.g. `file /var/log/caddy.log`.
    pub output: Option<String>,
    pub format: Option<String>,
    pub level: Option<String>,
    pub roll_size: Option<String>,
    pub roll_keep: Option<String>,
}

/// Reusable snippet: `(name) { ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub name: String,
    pub directives: Vec<Directive>,
    pub comments: Vec<String>,
}

/// Site block: one or more addresses + directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub addresses: Vec<String>,
    pub directives: Vec<Directive>,
    /// Snippet names pulled in with `import`, anywhere in the block.
    pub imports: Vec<String>,
    pub comments: Vec<String>,
}

/// A directive: name, positional arguments, optional sub-block.
///
/// Arguments keep their literal form, quotes included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<String>,
    pub block: Option<Vec<Self>>,
    /// Header as written in the source (name and arguments, space joined).
    /// Empty for directives built in code.
    pub raw: String,
}

/// Uniqueness violations found before a document is accepted for writing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("duplicate snippet name: {0}")]
    DuplicateSnippet(String),
    #[error("duplicate site address: {0}")]
    DuplicateAddress(String),
    #[error("site block has no address")]
    EmptySite,
}

impl Document {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.snippets.is_empty() && self.sites.is_empty()
    }

    #[must_use]
    pub fn find_snippet(&self, name: &str) -> Option<&Snippet> {
        self.snippets.iter().find(|s| s.name == name)
    }

    /// First site listing `address`.
    #[must_use]
    pub fn find_site(&self, address: &str) -> Option<&Site> {
        self.sites
            .iter()
            .find(|s| s.addresses.iter().any(|a| a == address))
    }

    pub fn find_site_mut(&mut self, address: &str) -> Option<&mut Site> {
        self.sites
            .iter_mut()
            .find(|s| s.addresses.iter().any(|a| a == address))
    }

    /// Remove every site listing `address`. Returns how many were removed.
    pub fn remove_site(&mut self, address: &str) -> usize {
        let before = self.sites.len();
        self.sites.retain(|s| !s.addresses.iter().any(|a| a == address));
        before - self.sites.len()
    }

    /// Imports that name no snippet in this document.
    #[must_use]
    pub fn unresolved_imports(&self) -> Vec<&str> {
        self.sites
            .iter()
            .flat_map(|s| s.imports.iter())
            .filter(|name| self.find_snippet(name).is_none())
            .map(String::as_str)
            .collect()
    }

    /// Enforce unique snippet names and site addresses.
    pub fn check_unique(&self) -> Result<(), DocumentError> {
        let mut names = HashSet::new();
        for snippet in &self.snippets {
            if !names.insert(snippet.name.as_str()) {
                return Err(DocumentError::DuplicateSnippet(snippet.name.clone()));
            }
        }

        let mut addresses = HashSet::new();
        for site in &self.sites {
            if site.addresses.is_empty() {
                return Err(DocumentError::EmptySite);
            }
            for address in &site.addresses {
                if !addresses.insert(address.as_str()) {
                    return Err(DocumentError::DuplicateAddress(address.clone()));
                }
            }
        }

        Ok(())
    }
}

/// Strip one layer of matching `"` or `'` quotes, if present.
#[must_use]
pub fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
