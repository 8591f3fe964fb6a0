//! Shared data model for the user-script manager
//!
//! `StoredScript` is what the storage collaborator persists and the editor
//! mutates; `RegisteredScript` is the host runtime's record, created and
//! removed only by the synchronization engine.

use serde::{Deserialize, Serialize};

/// Source language of a stored script. Transpilation of anything but plain
/// JavaScript is delegated to an external compiler collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    #[default]
    Javascript,
    Typescript,
}

/// Execution timing class, mirroring the host API's `run_at` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunAt {
    DocumentStart,
    DocumentEnd,
    #[default]
    DocumentIdle,
}

/// JavaScript execution context a script runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionWorld {
    /// Isolated content-script world
    #[default]
    Isolated,
    /// Page-shared main world
    Main,
}

/// Per-script CSP handling choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CspMode {
    /// Leave response headers untouched
    #[default]
    Leave,
    /// Rewrite CSP headers so the injected script may run inline
    Disable,
}

/// A user-authored script as stored by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredScript {
    /// Unique, stable identity.
    pub id: String,
    /// Raw match patterns, in author order. Order is load-bearing: the
    /// matcher's last-match-wins semantics depend on it.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub language: ScriptLanguage,
    #[serde(default)]
    pub run_at: RunAt,
    #[serde(default)]
    pub world: ExecutionWorld,
    #[serde(default)]
    pub csp: CspMode,
    /// Source text, opaque to this core.
    #[serde(default)]
    pub code: String,
}

/// Host-native include/exclude match-pattern sets for one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DomainPatternSet {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl DomainPatternSet {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// The host runtime's record for a registered script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredScript {
    pub id: String,
    /// Final wrapped executable body: guard prologue + compiled code.
    pub js: String,
    /// Host-native include patterns; the host API forbids this being empty.
    pub matches: Vec<String>,
    #[serde(default)]
    pub exclude_matches: Vec<String>,
    #[serde(default)]
    pub run_at: RunAt,
    #[serde(default)]
    pub world: ExecutionWorld,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_at_serde_form() {
        let json = serde_json::to_string(&RunAt::DocumentStart).unwrap();
        assert_eq!(json, "\"document-start\"");
    }

    #[test]
    fn test_stored_script_defaults() {
        let script: StoredScript = serde_json::from_str(r#"{"id":"a"}"#).unwrap();
        assert_eq!(script.language, ScriptLanguage::Javascript);
        assert_eq!(script.run_at, RunAt::DocumentIdle);
        assert_eq!(script.world, ExecutionWorld::Isolated);
        assert_eq!(script.csp, CspMode::Leave);
        assert!(script.patterns.is_empty());
    }
}
