//! Ordered pattern evaluation
//!
//! The rule list is folded in author order and every matching rule overwrites
//! the running decision with its own polarity, so the last matching rule
//! wins. Callers must preserve script-authored pattern order.

use log::debug;
use url::Url;

use crate::pattern::{self, MatchTarget};

/// Extract the hostname of a URL, if it has one. Non-hierarchical schemes
/// (`data:`, `about:`) yield `None`.
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

/// Evaluate a raw pattern list against a URL.
///
/// Unparsable rules are skipped. Hostname rules are skipped when the URL has
/// no host. An empty or all-non-matching list yields `false`.
pub fn evaluate<S: AsRef<str>>(url: &str, patterns: &[S]) -> bool {
    let host = hostname(url);
    let mut decision = false;

    for raw in patterns {
        let raw = raw.as_ref();
        let parsed = match pattern::parse(raw) {
            Some(parsed) => parsed,
            None => {
                debug!("skipping unparsable pattern {raw:?}");
                continue;
            }
        };

        let haystack = match parsed.target {
            MatchTarget::FullUrl => url,
            MatchTarget::Hostname => match host.as_deref() {
                Some(host) => host,
                None => continue,
            },
        };

        let re = match parsed.to_regex() {
            Some(re) => re,
            None => {
                debug!("skipping pattern with invalid regex body {raw:?}");
                continue;
            }
        };

        if re.is_match(haystack) {
            decision = !parsed.negated;
        }
    }

    decision
}
