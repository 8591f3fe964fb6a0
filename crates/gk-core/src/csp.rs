//! Content-Security-Policy object model
//!
//! A four-level tree mirroring the CSP grammar: a header is a `,`-separated
//! list of policies, a policy a `;`-separated list of directives, a directive
//! a whitespace-separated list of source values. Parsing is best effort and
//! never fails; a malformed header degrades to inert tokens the browser will
//! ignore.

// =============================================================================
// Values
// =============================================================================

/// Classification of a single CSP source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CspValueKind {
    /// Quoted keyword such as `'self'` or `'unsafe-inline'`
    Keyword,
    /// `'nonce-…'` source
    Nonce,
    /// `'sha256-…'` / `'sha384-…'` / `'sha512-…'` source
    Hash,
    /// Scheme source such as `https:`
    Scheme,
    /// Anything else: a host source expression
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspValue {
    pub raw: String,
    pub kind: CspValueKind,
}

impl CspValue {
    pub fn new(token: &str) -> Self {
        Self {
            raw: token.to_string(),
            kind: classify(token),
        }
    }
}

fn classify(token: &str) -> CspValueKind {
    if token.starts_with("'nonce-") {
        CspValueKind::Nonce
    } else if token.starts_with("'sha") {
        CspValueKind::Hash
    } else if token.starts_with('\'') {
        CspValueKind::Keyword
    } else if token.ends_with(':') {
        CspValueKind::Scheme
    } else {
        CspValueKind::Host
    }
}

// =============================================================================
// Directives and policies
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspDirective {
    /// Directive name, lowercased.
    pub name: String,
    pub values: Vec<CspValue>,
}

impl CspDirective {
    /// Parse one `;`-delimited directive segment. Returns `None` for an
    /// empty segment.
    pub fn parse(text: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let name = tokens.next()?.to_ascii_lowercase();
        let values = tokens.map(CspValue::new).collect();
        Some(Self { name, values })
    }

    pub fn serialize(&self) -> String {
        let mut out = self.name.clone();
        for value in &self.values {
            out.push(' ');
            out.push_str(&value.raw);
        }
        out
    }

    fn has_keyword(&self, token: &str) -> bool {
        self.values.iter().any(|v| v.raw == token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CspPolicy {
    pub directives: Vec<CspDirective>,
}

impl CspPolicy {
    pub fn parse(text: &str) -> Self {
        Self {
            directives: text.split(';').filter_map(CspDirective::parse).collect(),
        }
    }

    pub fn serialize(&self) -> String {
        self.directives
            .iter()
            .map(CspDirective::serialize)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn directive(&self, name: &str) -> Option<&CspDirective> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn remove_directive(&mut self, name: &str) {
        self.directives.retain(|d| d.name != name);
    }

    /// Replace the directive with the same name, or append.
    pub fn set_directive(&mut self, directive: CspDirective) {
        match self.directives.iter_mut().find(|d| d.name == directive.name) {
            Some(existing) => *existing = directive,
            None => self.directives.push(directive),
        }
    }
}

// =============================================================================
// Header
// =============================================================================

/// Directive lookup order for the policy's effective script directive.
const SCRIPT_DIRECTIVE_PRECEDENCE: [&str; 3] = ["script-src-elem", "script-src", "object-src"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CspHeader {
    pub policies: Vec<CspPolicy>,
}

impl CspHeader {
    pub fn parse(text: &str) -> Self {
        Self {
            policies: text.split(',').map(CspPolicy::parse).collect(),
        }
    }

    pub fn serialize(&self) -> String {
        self.policies
            .iter()
            .map(CspPolicy::serialize)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Rewrite every policy so inline script execution is permitted.
    ///
    /// Removes `report-to`/`report-uri` so the alteration is not reported,
    /// then clones the effective script directive, strips nonce and hash
    /// sources (`'unsafe-inline'` is ignored while any of those are present)
    /// and re-installs it as `script-src-elem` with `'unsafe-inline'` added.
    pub fn allow_inline_scripts(&mut self) {
        for policy in &mut self.policies {
            policy.remove_directive("report-to");
            policy.remove_directive("report-uri");

            let script = SCRIPT_DIRECTIVE_PRECEDENCE
                .iter()
                .find_map(|name| policy.directive(name))
                .cloned();

            let Some(mut directive) = script else {
                continue;
            };

            directive.name = "script-src-elem".to_string();
            directive
                .values
                .retain(|v| !matches!(v.kind, CspValueKind::Nonce | CspValueKind::Hash));
            if !directive.has_keyword("'unsafe-inline'") {
                directive.values.push(CspValue::new("'unsafe-inline'"));
            }
            policy.set_directive(directive);
        }
    }
}
