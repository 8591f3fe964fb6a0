//! Guard-code generator
//!
//! The domain-pattern compiler is deliberately over-broad, so every injected
//! script carries a prologue that re-checks the precise match condition
//! against the live page URL. The rule list is folded right-to-left into
//! nested ternaries: at runtime the last rule is tested first, so the last
//! matching rule's polarity wins, exactly like the native evaluator.

use gk_core::pattern::{self, ParsedPattern, PatternKind};

/// Emit the guard prologue for a raw pattern list. The final statement makes
/// the surrounding function return immediately when no rule admits the page.
/// Rules that fail to parse contribute nothing; an empty effective list
/// yields a guard that always exits.
pub fn guard_code<S: AsRef<str>>(patterns: &[S]) -> String {
    let mut expr = String::from("false");

    for raw in patterns {
        let Some(parsed) = pattern::parse(raw.as_ref()) else {
            continue;
        };
        // A body the engine rejects is skipped by the evaluator too, so
        // skipping it here preserves parity.
        if parsed.to_regex().is_none() {
            continue;
        }

        let test = rule_test(&parsed);
        let polarity = if parsed.negated { "false" } else { "true" };
        expr = format!("{test} ? {polarity} : {expr}");
    }

    format!(
        "const gkHref = location.href, gkHost = location.hostname;\nif (!({expr})) return;"
    )
}

/// Assemble the final executable body: guard prologue plus compiled code,
/// wrapped so the guard's `return` ends the whole script.
pub fn wrap_user_script(guard: &str, body: &str) -> String {
    format!("(function () {{\n{guard}\n{body}\n}})();")
}

fn rule_test(parsed: &ParsedPattern) -> String {
    match parsed.kind {
        PatternKind::Regex => format!(
            "/{}/{}.test(gkHref)",
            escape_literal_body(&parsed.source),
            parsed.js_flags()
        ),
        PatternKind::Domain => format!("/^(?:{})$/.test(gkHost)", parsed.source),
    }
}

/// Escape bare `/` so the body survives as a JS regex literal.
fn escape_literal_body(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut escaped = false;

    for ch in source.chars() {
        if ch == '/' && !escaped {
            out.push('\\');
        }
        out.push(ch);
        escaped = ch == '\\' && !escaped;
    }

    out
}
