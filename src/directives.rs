//! Known directive names.
//!
//! The config language has no fixed directive set, so the parser leans
//! on a table of names it recognizes. The table drives two heuristics:
//! a token in the table is never a site address, and a token in the
//! table that follows at least one argument starts a new statement.
//!
//! A custom plugin directive that looks like a domain name (`my.plugin`)
//! is read as a site address until it is added to the table.

use std::collections::BTreeSet;

/// Directives the proxy ships with, usable inside site blocks and snippets.
pub const CADDY_DIRECTIVES: &[&str] = &[
    "abort",
    "acme_server",
    "basic_auth",
    "basicauth",
    "bind",
    "encode",
    "error",
    "file_server",
    "forward_auth",
    "fs",
    "handle",
    "handle_errors",
    "handle_path",
    "header",
    "import",
    "intercept",
    "invoke",
    "log",
    "log_append",
    "log_name",
    "log_skip",
    "map",
    "method",
    "metrics",
    "php_fastcgi",
    "push",
    "redir",
    "request_body",
    "request_header",
    "respond",
    "reverse_proxy",
    "rewrite",
    "root",
    "route",
    "skip_log",
    "templates",
    "tls",
    "tracing",
    "try_files",
    "uri",
    "vars",
];

/// Options accepted inside the global options block.
pub const GLOBAL_OPTIONS: &[&str] = &[
    "acme_ca",
    "acme_ca_root",
    "acme_dns",
    "acme_eab",
    "admin",
    "auto_https",
    "cert_issuer",
    "debug",
    "default_bind",
    "default_sni",
    "email",
    "grace_period",
    "http_port",
    "https_port",
    "local_certs",
    "log",
    "ocsp_stapling",
    "on_demand_tls",
    "order",
    "persist_config",
    "pki",
    "preferred_chains",
    "servers",
    "shutdown_delay",
    "skip_install_trust",
    "storage",
    "storage_clean_interval",
];

/// An explicit, injectable set of directive names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectiveTable {
    names: BTreeSet<String>,
}

impl DirectiveTable {
    /// An empty table: no token is a known directive.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// The proxy's standard site directives.
    #[must_use]
    pub fn caddy() -> Self {
        CADDY_DIRECTIVES.iter().copied().collect()
    }

    /// Global option names.
    #[must_use]
    pub fn global_options() -> Self {
        GLOBAL_OPTIONS.iter().copied().collect()
    }

    /// Add a name (for plugin directives).
    #[must_use]
    pub fn with(mut self, name: &str) -> Self {
        self.names.insert(name.to_string());
        self
    }

    /// Remove a name.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.names.remove(name);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for DirectiveTable {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(str::to_string).collect(),
        }
    }
}
