//! CSP enforcement
//!
//! Two host flavors exist: ones where we rewrite the CSP header value in
//! place, and ones where a declarative network rule strips the header
//! outright. Both are driven by the same per-navigation decision: does any
//! stored script that matches the URL ask for CSP to be disabled? Everything
//! fails open; a page load is never blocked on a rewrite.

use log::debug;

use gk_core::csp::CspHeader;
use gk_core::matcher::evaluate;
use gk_core::types::{CspMode, StoredScript};

use crate::error::SyncError;
use crate::host::{NetworkRules, StripHeadersRule, CSP_STRIP_RULE_ID};

/// Response header name this module manipulates.
pub const CSP_HEADER_NAME: &str = "content-security-policy";

/// True when a stored script with `csp: disable` matches the URL.
pub fn wants_inline_csp(stored: &[StoredScript], url: &str) -> bool {
    stored
        .iter()
        .any(|s| s.csp == CspMode::Disable && evaluate(url, &s.patterns))
}

/// Rewrite every CSP header in place so inline script execution is
/// permitted. Non-CSP headers are untouched; malformed values degrade to
/// best-effort token lists and never fail.
pub fn rewrite_csp_headers(headers: &mut [(String, String)]) {
    for (name, value) in headers {
        if name.eq_ignore_ascii_case(CSP_HEADER_NAME) {
            let mut header = CspHeader::parse(value);
            header.allow_inline_scripts();
            *value = header.serialize();
        }
    }
}

/// Declarative-rule variant: (re-)issue the single header-strip rule for the
/// tab when a matching script disables CSP, clear it otherwise. Returns
/// whether enforcement is active for this navigation.
pub async fn enforce<N: NetworkRules>(
    net: &N,
    stored: &[StoredScript],
    url: &str,
    tab_id: i32,
) -> Result<bool, SyncError> {
    if wants_inline_csp(stored, url) {
        debug!("stripping CSP for tab {tab_id} at {url}");
        net.set_strip_rule(StripHeadersRule {
            id: CSP_STRIP_RULE_ID,
            tab_id,
            headers: vec![CSP_HEADER_NAME.to_string()],
        })
        .await?;
        Ok(true)
    } else {
        net.clear_strip_rule().await?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryNetworkRules;
    use gk_core::types::{ExecutionWorld, RunAt, ScriptLanguage};

    fn script(id: &str, patterns: &[&str], csp: CspMode) -> StoredScript {
        StoredScript {
            id: id.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            language: ScriptLanguage::Javascript,
            run_at: RunAt::DocumentIdle,
            world: ExecutionWorld::Isolated,
            csp,
            code: String::new(),
        }
    }

    #[test]
    fn test_wants_inline_csp() {
        let stored = vec![
            script("a", &["example.com"], CspMode::Leave),
            script("b", &["*.example.org"], CspMode::Disable),
        ];

        assert!(!wants_inline_csp(&stored, "https://example.com/"));
        assert!(wants_inline_csp(&stored, "https://example.org/"));
        assert!(!wants_inline_csp(&stored, "https://unrelated.net/"));
    }

    #[test]
    fn test_rewrite_targets_only_csp_headers() {
        let mut headers = vec![
            ("Content-Type".to_string(), "text/html".to_string()),
            (
                "Content-Security-Policy".to_string(),
                "script-src 'self' 'nonce-x'".to_string(),
            ),
        ];

        rewrite_csp_headers(&mut headers);
        assert_eq!(headers[0].1, "text/html");
        assert_eq!(
            headers[1].1,
            "script-src 'self' 'nonce-x'; script-src-elem 'self' 'unsafe-inline'"
        );
    }

    #[tokio::test]
    async fn test_enforce_sets_and_clears_rule() {
        let net = MemoryNetworkRules::new();
        let stored = vec![script("a", &["example.com"], CspMode::Disable)];

        let active = enforce(&net, &stored, "https://example.com/", 7).await.unwrap();
        assert!(active);
        let rule = net.active().unwrap();
        assert_eq!(rule.id, CSP_STRIP_RULE_ID);
        assert_eq!(rule.tab_id, 7);
        assert_eq!(rule.headers, vec![CSP_HEADER_NAME]);

        let active = enforce(&net, &stored, "https://other.com/", 7).await.unwrap();
        assert!(!active);
        assert!(net.active().is_none());
    }
}
