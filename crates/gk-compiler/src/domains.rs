//! Domain-pattern compiler
//!
//! Translates a raw pattern list into the coarser match-pattern grammar the
//! host scripting API understands. The translation is lossy but safe: where
//! the host grammar cannot express a rule (regex bodies, wildcards anywhere
//! but a single leading `*.`) the compiler widens to a match-everything
//! include and leaves exactness to the generated guard code.

use log::debug;

use gk_core::pattern::{self, PatternKind};
use gk_core::types::DomainPatternSet;

/// Host pattern matching every URL, file scheme included.
pub const MATCH_ALL_URLS: &str = "<all_urls>";

/// Host pattern matching everything except the file scheme.
pub const MATCH_ALL_HTTP: &str = "*://*/*";

/// Placeholder on a reserved-by-RFC host, substituted when a script's
/// include set would otherwise be empty (the host API forbids an empty
/// match list, and registering unrestricted instead would be worse).
pub const UNREACHABLE_MATCH: &str = "*://greasekit.invalid/*";

/// Compile a raw pattern list into host-native include/exclude sets.
///
/// A left-to-right single-pass fold mirroring the matcher's sequential
/// override semantics as closely as the host grammar allows. Previously
/// pruned exclusions are not re-validated against later inclusions; the
/// fold order is the contract.
pub fn compile<S: AsRef<str>>(patterns: &[S]) -> DomainPatternSet {
    let mut set = DomainPatternSet::default();

    for raw in patterns {
        let parsed = match pattern::parse(raw.as_ref()) {
            Some(parsed) => parsed,
            None => continue,
        };

        match parsed.kind {
            PatternKind::Regex => {
                // Regex rules cannot be narrowed to a host pattern. A
                // non-negated one gives up precision entirely; a negated one
                // contributes nothing and is enforced by the guard.
                if !parsed.negated {
                    set.include = vec![MATCH_ALL_URLS.to_string()];
                    set.exclude.clear();
                }
            }
            PatternKind::Domain => {
                // Host patterns are case-insensitive on the host side but
                // compared textually here, so normalize once.
                let word = parsed.original.to_ascii_lowercase();
                compile_domain_rule(&mut set, &word, parsed.negated);
            }
        }
    }

    set
}

fn compile_domain_rule(set: &mut DomainPatternSet, word: &str, negated: bool) {
    let bare = word.strip_prefix("*.").unwrap_or(word);

    if bare.contains('*') {
        // Wildcard placement the host grammar cannot express.
        if !negated {
            set.include = vec![MATCH_ALL_HTTP.to_string()];
            set.exclude.clear();
        }
        return;
    }

    let native = format!("*://{word}/*");

    if negated {
        if !set.exclude.contains(&native) {
            set.exclude.push(native);
        }
        return;
    }

    // A broader existing exclusion would blank out this inclusion (host
    // exclude rules apply after includes), and a narrower one becomes
    // redundant. Drop both kinds before appending.
    set.exclude.retain(|excluded| {
        let keep = !patterns_overlap(excluded, &native);
        if !keep {
            debug!("pruning exclusion {excluded:?} overlapped by inclusion {native:?}");
        }
        keep
    });

    if !set.include.contains(&native) {
        set.include.push(native);
    }
}

/// True when either pattern covers the other (or they are identical).
fn patterns_overlap(a: &str, b: &str) -> bool {
    a == b || covers(a, b) || covers(b, a)
}

/// Domain-superset test: `a` covers `b` iff they are equal, or `a` is
/// `*.`-prefixed and `b`'s bare domain equals `a`'s suffix or ends with it
/// at a dot boundary.
fn covers(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    let (Some(a), Some(b)) = (native_host(a), native_host(b)) else {
        return false;
    };

    let Some(suffix) = a.strip_prefix("*.") else {
        return false;
    };

    let bare = b.strip_prefix("*.").unwrap_or(b);
    bare == suffix || (bare.ends_with(suffix) && bare[..bare.len() - suffix.len()].ends_with('.'))
}

/// Strip the native-pattern scheme and path back off, leaving the
/// (possibly `*.`-prefixed) host part.
fn native_host(pattern: &str) -> Option<&str> {
    pattern.strip_prefix("*://")?.strip_suffix("/*")
}
