//! External collaborator interfaces
//!
//! The engine never talks to the browser directly; it is handed
//! implementations of these traits. That keeps the core free of hidden
//! singletons and makes every code path testable against [`MemoryHost`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use gk_core::types::{RegisteredScript, ScriptLanguage};

use crate::error::SyncError;

/// Fixed id of the single active CSP header-strip rule. Re-issuing the rule
/// replaces the previous one.
pub const CSP_STRIP_RULE_ID: u32 = 1;

// =============================================================================
// Traits
// =============================================================================

/// The browser's script-registration facility.
#[allow(async_fn_in_trait)]
pub trait HostScripting {
    /// List registered scripts, optionally restricted to the given ids.
    async fn list(&self, ids: Option<&[String]>) -> Result<Vec<RegisteredScript>, SyncError>;
    async fn register(&self, entries: Vec<RegisteredScript>) -> Result<(), SyncError>;
    async fn update(&self, entries: Vec<RegisteredScript>) -> Result<(), SyncError>;
    async fn unregister(&self, ids: &[String]) -> Result<(), SyncError>;
    /// Cheap probe verifying the scripting capability is granted.
    async fn execute_probe(&self) -> Result<(), SyncError>;
}

/// A declarative header-strip rule for one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripHeadersRule {
    pub id: u32,
    pub tab_id: i32,
    /// Response header names to strip, lowercased.
    pub headers: Vec<String>,
}

/// The browser's declarative network-rule store.
#[allow(async_fn_in_trait)]
pub trait NetworkRules {
    async fn set_strip_rule(&self, rule: StripHeadersRule) -> Result<(), SyncError>;
    async fn clear_strip_rule(&self) -> Result<(), SyncError>;
}

/// External code-generation collaborator for script language variants.
/// Returns the compiled JavaScript body, or a reason string on failure.
pub trait CodeCompiler {
    fn compile(&self, language: ScriptLanguage, code: &str) -> Result<String, String>;
}

/// Ships JavaScript unchanged; anything needing transpilation is rejected
/// so the caller knows to wire a real compiler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl CodeCompiler for Passthrough {
    fn compile(&self, language: ScriptLanguage, code: &str) -> Result<String, String> {
        match language {
            ScriptLanguage::Javascript => Ok(code.to_string()),
            ScriptLanguage::Typescript => Err("no TypeScript compiler configured".to_string()),
        }
    }
}

// =============================================================================
// In-memory host
// =============================================================================

/// In-memory [`HostScripting`] implementation backing the CLI dry-run
/// harness and the engine tests. Mirrors the browser API's strictness:
/// registering an existing id or updating/unregistering a missing one is an
/// error, so ordering bugs surface instead of being papered over.
#[derive(Default)]
pub struct MemoryHost {
    scripts: Mutex<BTreeMap<String, RegisteredScript>>,
    ops: Mutex<Vec<String>>,
    capability_error: Mutex<Option<String>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registered set directly, bypassing the op log.
    pub fn seed(&self, entries: Vec<RegisteredScript>) {
        let mut scripts = self.scripts.lock().unwrap();
        for entry in entries {
            scripts.insert(entry.id.clone(), entry);
        }
    }

    /// Make `execute_probe` fail with the given reason.
    pub fn deny_capability(&self, reason: &str) {
        *self.capability_error.lock().unwrap() = Some(reason.to_string());
    }

    /// Undo [`MemoryHost::deny_capability`].
    pub fn allow_capability(&self) {
        *self.capability_error.lock().unwrap() = None;
    }

    /// Snapshot of the registered set, id-ordered.
    pub fn registered(&self) -> Vec<RegisteredScript> {
        self.scripts.lock().unwrap().values().cloned().collect()
    }

    /// Host calls observed so far, in order.
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: &str) {
        self.ops.lock().unwrap().push(op.to_string());
    }
}

impl HostScripting for MemoryHost {
    async fn list(&self, ids: Option<&[String]>) -> Result<Vec<RegisteredScript>, SyncError> {
        let scripts = self.scripts.lock().unwrap();
        Ok(match ids {
            Some(ids) => ids.iter().filter_map(|id| scripts.get(id).cloned()).collect(),
            None => scripts.values().cloned().collect(),
        })
    }

    async fn register(&self, entries: Vec<RegisteredScript>) -> Result<(), SyncError> {
        self.record("register");
        let mut scripts = self.scripts.lock().unwrap();
        for entry in &entries {
            if scripts.contains_key(&entry.id) {
                return Err(SyncError::Host(format!("duplicate script id {:?}", entry.id)));
            }
        }
        for entry in entries {
            scripts.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    async fn update(&self, entries: Vec<RegisteredScript>) -> Result<(), SyncError> {
        self.record("update");
        let mut scripts = self.scripts.lock().unwrap();
        for entry in &entries {
            if !scripts.contains_key(&entry.id) {
                return Err(SyncError::Host(format!("unknown script id {:?}", entry.id)));
            }
        }
        for entry in entries {
            scripts.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    async fn unregister(&self, ids: &[String]) -> Result<(), SyncError> {
        self.record("unregister");
        let mut scripts = self.scripts.lock().unwrap();
        for id in ids {
            if scripts.remove(id).is_none() {
                return Err(SyncError::Host(format!("unknown script id {id:?}")));
            }
        }
        Ok(())
    }

    async fn execute_probe(&self) -> Result<(), SyncError> {
        match self.capability_error.lock().unwrap().clone() {
            Some(reason) => Err(SyncError::Capability(reason)),
            None => Ok(()),
        }
    }
}

/// In-memory [`NetworkRules`] double recording the active rule.
#[derive(Default)]
pub struct MemoryNetworkRules {
    active: Mutex<Option<StripHeadersRule>>,
}

impl MemoryNetworkRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<StripHeadersRule> {
        self.active.lock().unwrap().clone()
    }
}

impl NetworkRules for MemoryNetworkRules {
    async fn set_strip_rule(&self, rule: StripHeadersRule) -> Result<(), SyncError> {
        *self.active.lock().unwrap() = Some(rule);
        Ok(())
    }

    async fn clear_strip_rule(&self) -> Result<(), SyncError> {
        *self.active.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_compiler() {
        let compiler = Passthrough;
        assert_eq!(
            compiler.compile(ScriptLanguage::Javascript, "x()"),
            Ok("x()".to_string())
        );
        assert!(compiler.compile(ScriptLanguage::Typescript, "x()").is_err());
    }

    #[tokio::test]
    async fn test_memory_host_strictness() {
        let host = MemoryHost::new();
        let entry = RegisteredScript {
            id: "a".into(),
            js: String::new(),
            matches: vec!["*://example.com/*".into()],
            exclude_matches: Vec::new(),
            run_at: Default::default(),
            world: Default::default(),
        };

        host.register(vec![entry.clone()]).await.unwrap();
        assert!(host.register(vec![entry.clone()]).await.is_err());
        assert!(host.update(vec![RegisteredScript { id: "b".into(), ..entry.clone() }])
            .await
            .is_err());
        assert!(host.unregister(&["b".into()]).await.is_err());
        host.unregister(&["a".into()]).await.unwrap();
        assert!(host.registered().is_empty());
    }

    #[tokio::test]
    async fn test_memory_host_filtered_list() {
        let host = MemoryHost::new();
        host.seed(vec![
            RegisteredScript {
                id: "a".into(),
                js: String::new(),
                matches: Vec::new(),
                exclude_matches: Vec::new(),
                run_at: Default::default(),
                world: Default::default(),
            },
            RegisteredScript {
                id: "b".into(),
                js: String::new(),
                matches: Vec::new(),
                exclude_matches: Vec::new(),
                run_at: Default::default(),
                world: Default::default(),
            },
        ]);

        let hit = host.list(Some(&["b".into(), "missing".into()])).await.unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].id, "b");
        assert_eq!(host.list(None).await.unwrap().len(), 2);
    }
}
