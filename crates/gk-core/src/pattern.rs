//! User-script match pattern parser
//!
//! A raw pattern is either a regex rule (`/body/flags`) tested against the
//! full URL, or a wildcarded-domain rule (`*.example.com`) tested against the
//! hostname only. Either form may carry a leading `-` to negate it. Text that
//! fits neither grammar parses to `None` and is skipped everywhere; user
//! input must never abort matching.

use regex::Regex;

/// Inline flag letters the `regex` crate accepts. Anything else in the
/// user-supplied flags segment is dropped silently.
const ENGINE_FLAGS: &str = "imsxuU";

/// Flag letters valid in a JavaScript regex literal, for guard emission.
const JS_FLAGS: &str = "dgimsuvy";

// =============================================================================
// Parsed Pattern
// =============================================================================

/// Which grammar a raw pattern matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `/body/flags` form
    Regex,
    /// Bareword domain form, possibly wildcarded
    Domain,
}

/// The string a rule is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTarget {
    /// The complete URL
    FullUrl,
    /// The hostname component only
    Hostname,
}

/// A classified, testable match pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPattern {
    pub kind: PatternKind,
    /// The pattern text with negation stripped.
    pub original: String,
    /// Regex body to test with. For domain rules this is the translated
    /// hostname regex; anchoring happens in [`ParsedPattern::to_regex`].
    pub source: String,
    /// Filtered regex flags (regex rules only).
    pub flags: String,
    pub target: MatchTarget,
    pub negated: bool,
}

impl ParsedPattern {
    /// Build the compiled regex for this rule. Hostname rules are anchored
    /// to the whole host; regex rules run unanchored over the full URL.
    /// Returns `None` when the body is not a valid regex.
    pub fn to_regex(&self) -> Option<Regex> {
        let pattern = match self.target {
            MatchTarget::Hostname => format!("^(?:{})$", self.source),
            MatchTarget::FullUrl => {
                if self.flags.is_empty() {
                    self.source.clone()
                } else {
                    format!("(?{}){}", self.flags, self.source)
                }
            }
        };
        Regex::new(&pattern).ok()
    }

    /// Flags re-filtered to the letters a JavaScript regex literal accepts.
    pub fn js_flags(&self) -> String {
        self.flags.chars().filter(|c| JS_FLAGS.contains(*c)).collect()
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse one raw pattern string. Returns `None` for anything that matches
/// neither grammar; never fails.
pub fn parse(raw: &str) -> Option<ParsedPattern> {
    let trimmed = raw.trim();
    let (negated, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };

    if rest.is_empty() {
        return None;
    }

    if let Some(body) = rest.strip_prefix('/') {
        return parse_regex_rule(rest, body, negated);
    }

    parse_domain_rule(rest, negated)
}

fn parse_regex_rule(original: &str, body: &str, negated: bool) -> Option<ParsedPattern> {
    // The flags segment starts after the last '/'.
    let slash = body.rfind('/')?;
    let source = &body[..slash];
    if source.is_empty() {
        return None;
    }

    let flags: String = body[slash + 1..]
        .chars()
        .filter(|c| ENGINE_FLAGS.contains(*c))
        .collect();

    Some(ParsedPattern {
        kind: PatternKind::Regex,
        original: original.to_string(),
        source: source.to_string(),
        flags,
        target: MatchTarget::FullUrl,
        negated,
    })
}

fn parse_domain_rule(word: &str, negated: bool) -> Option<ParsedPattern> {
    if !is_domain_word(word) {
        return None;
    }

    Some(ParsedPattern {
        kind: PatternKind::Domain,
        original: word.to_string(),
        source: domain_source(word),
        flags: String::new(),
        target: MatchTarget::Hostname,
        negated,
    })
}

fn is_domain_word(word: &str) -> bool {
    !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'*')
}

/// Translate a domain bareword into a hostname regex body.
///
/// A leading `*.` becomes one quantified group matching zero or more labels,
/// so `*.example.com` also matches bare `example.com`. Any other `*` matches
/// an arbitrary run of characters. Dots are literal.
fn domain_source(word: &str) -> String {
    let (mut out, rest) = match word.strip_prefix("*.") {
        Some(rest) => (String::from(r"(?:[^.]+\.)*"), rest),
        None => (String::new(), word),
    };

    for ch in rest.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '.' => out.push_str(r"\."),
            _ => out.push(ch.to_ascii_lowercase()),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_regex_rule() {
        let p = parse("/example\\.com\\/path/i").unwrap();
        assert_eq!(p.kind, PatternKind::Regex);
        assert_eq!(p.target, MatchTarget::FullUrl);
        assert_eq!(p.source, "example\\.com\\/path");
        assert_eq!(p.flags, "i");
        assert!(!p.negated);
    }

    #[test]
    fn test_parse_regex_negated_with_space() {
        let p = parse("- /tracker/").unwrap();
        assert!(p.negated);
        assert_eq!(p.original, "/tracker/");
        assert_eq!(p.source, "tracker");
    }

    #[test]
    fn test_unknown_flags_dropped() {
        let p = parse("/abc/giqz").unwrap();
        assert_eq!(p.flags, "i");
    }

    #[test]
    fn test_parse_domain_rule() {
        let p = parse("example.com").unwrap();
        assert_eq!(p.kind, PatternKind::Domain);
        assert_eq!(p.target, MatchTarget::Hostname);
        assert_eq!(p.source, "example\\.com");
    }

    #[test]
    fn test_parse_invalid_returns_none() {
        assert!(parse("").is_none());
        assert!(parse("-").is_none());
        assert!(parse("/unclosed").is_none());
        assert!(parse("//").is_none());
        assert!(parse("exa mple.com").is_none());
        assert!(parse("http://example.com/").is_none());
    }

    #[test]
    fn test_leading_wildcard_matches_bare_domain() {
        let re = parse("*.example.com").unwrap().to_regex().unwrap();
        assert!(re.is_match("example.com"));
        assert!(re.is_match("a.example.com"));
        assert!(re.is_match("a.b.example.com"));
        assert!(!re.is_match("notexample.com"));
        assert!(!re.is_match("example.com.org"));
    }

    #[test]
    fn test_inner_wildcard() {
        let re = parse("cdn*.example.com").unwrap().to_regex().unwrap();
        assert!(re.is_match("cdn1.example.com"));
        assert!(re.is_match("cdn.example.com"));
        assert!(!re.is_match("img.example.com"));
    }

    #[test]
    fn test_invalid_regex_body_yields_no_regex() {
        let p = parse("/[unclosed/").unwrap();
        assert!(p.to_regex().is_none());
    }

    #[test]
    fn test_js_flags_filtered() {
        let p = parse("/abc/iU").unwrap();
        assert_eq!(p.flags, "iU");
        assert_eq!(p.js_flags(), "i");
    }
}
