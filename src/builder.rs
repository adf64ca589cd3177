use crate::ast::{Directive, Document, GlobalOptions, OrderHint, Site, Snippet, unquote};

impl Document {
    /// Create an empty document.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            global: None,
            snippets: Vec::new(),
            sites: Vec::new(),
        }
    }

    /// Add a site block.
    #[must_use]
    pub fn site(mut self, site: Site) -> Self {
        self.sites.push(site);
        self
    }

    /// Set the global options block.
    #[must_use]
    pub fn global(mut self, opts: GlobalOptions) -> Self {
        self.global = Some(opts);
        self
    }

    /// Add a snippet.
    #[must_use]
    pub fn snippet(mut self, snippet: Snippet) -> Self {
        self.snippets.push(snippet);
        self
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalOptions {
    #[must_use]
    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    #[must_use]
    pub fn admin(mut self, admin: &str) -> Self {
        self.admin = Some(admin.to_string());
        self
    }

    /// Add an `order <directive> before <anchor>` hint.
    #[must_use]
    pub fn order_before(mut self, directive: &str, anchor: &str) -> Self {
        self.order_before.push(OrderHint::new(directive, anchor));
        self
    }

    /// Add an `order <directive> after <anchor>` hint.
    #[must_use]
    pub fn order_after(mut self, directive: &str, anchor: &str) -> Self {
        self.order_after.push(OrderHint::new(directive, anchor));
        self
    }

    /// Add a global option with no typed field.
    #[must_use]
    pub fn option(mut self, d: Directive) -> Self {
        self.extra.push(d);
        self
    }
}

impl OrderHint {
    #[must_use]
    pub fn new(directive: &str, anchor: &str) -> Self {
        Self {
            directive: directive.to_string(),
            anchor: anchor.to_string(),
        }
    }
}

impl Snippet {
    /// Create an empty snippet.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            directives: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Add a directive to this snippet.
    #[must_use]
    pub fn directive(mut self, d: Directive) -> Self {
        self.directives.push(d);
        self
    }
}

impl Site {
    /// Create a new site block with one address.
    #[must_use]
    pub fn new(address: &str) -> Self {
        Self {
            addresses: vec![address.to_string()],
            directives: Vec::new(),
            imports: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Add another address to this site block.
    #[must_use]
    pub fn address(mut self, addr: &str) -> Self {
        self.addresses.push(addr.to_string());
        self
    }

    /// Add a directive to this site block. An `import` also lands in
    /// [`Site::imports`].
    #[must_use]
    pub fn directive(mut self, d: Directive) -> Self {
        if d.name == "import" {
            if let Some(target) = d.arguments.first() {
                self.imports.push(unquote(target).to_string());
            }
        }
        self.directives.push(d);
        self
    }

    /// Add an `import <snippet>` directive.
    #[must_use]
    pub fn import(self, snippet: &str) -> Self {
        self.directive(Directive::new("import").arg(snippet))
    }

    /// Add a `reverse_proxy` directive.
    #[must_use]
    pub fn reverse_proxy(self, upstream: &str) -> Self {
        self.directive(Directive::new("reverse_proxy").arg(upstream))
    }

    /// Add an `encode gzip` directive.
    #[must_use]
    pub fn encode_gzip(self) -> Self {
        self.directive(Directive::new("encode").arg("gzip"))
    }

    /// Add a `tls` directive with arguments.
    #[must_use]
    pub fn tls(self, args: &[&str]) -> Self {
        let d = args.iter().fold(Directive::new("tls"), |d, arg| d.arg(arg));
        self.directive(d)
    }

    #[must_use]
    pub fn log(self) -> Self {
        self.directive(Directive::new("log"))
    }

    #[must_use]
    pub fn file_server(self) -> Self {
        self.directive(Directive::new("file_server"))
    }
}

impl Directive {
    /// Create a new directive with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arguments: Vec::new(),
            block: None,
            raw: String::new(),
        }
    }

    /// Add an argument, kept verbatim.
    #[must_use]
    pub fn arg(mut self, value: &str) -> Self {
        self.arguments.push(value.to_string());
        self
    }

    /// Set a sub-block of directives.
    #[must_use]
    pub fn block(mut self, directives: Vec<Self>) -> Self {
        self.block = Some(directives);
        self
    }

    /// First sub-block entry named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.block.as_ref()?.iter().find(|d| d.name == name)
    }
}
