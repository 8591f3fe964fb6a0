//! Script synchronization engine
//!
//! Reconciles the stored script list against the scripts the host runtime
//! already has registered. Each stored script is compiled (guard prologue +
//! transpiled body + host-native match-pattern set) and the diff is applied
//! as three batched host calls: removals first, then updates, then
//! additions. Removing stale ids before updating prevents id collisions
//! when a script's world or timing changed.

use std::collections::BTreeSet;

use log::{debug, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use gk_compiler::{compile, guard_code, wrap_user_script, UNREACHABLE_MATCH};
use gk_core::types::{RegisteredScript, StoredScript};

use crate::error::SyncError;
use crate::gate::{Admission, CoalescePolicy, TaskGate};
use crate::host::{CodeCompiler, HostScripting};

// =============================================================================
// Compilation
// =============================================================================

/// Compile one stored script into the host runtime's registration record.
pub fn compile_script<C: CodeCompiler>(
    compiler: &C,
    script: &StoredScript,
) -> Result<RegisteredScript, SyncError> {
    let guard = guard_code(&script.patterns);
    let body = compiler
        .compile(script.language, &script.code)
        .map_err(|reason| SyncError::Compile {
            id: script.id.clone(),
            reason,
        })?;

    let mut set = compile(&script.patterns);
    if set.include.is_empty() {
        // The host API rejects an empty match list, and omitting it would
        // register the script unrestricted. Pin it to an unreachable host;
        // the guard still decides the real condition.
        set.include.push(UNREACHABLE_MATCH.to_string());
    }

    Ok(RegisteredScript {
        id: script.id.clone(),
        js: wrap_user_script(&guard, &body),
        matches: set.include,
        exclude_matches: set.exclude,
        run_at: script.run_at,
        world: script.world,
    })
}

// =============================================================================
// Planning
// =============================================================================

/// The diff between stored and registered state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SyncPlan {
    pub to_remove: Vec<String>,
    pub to_update: Vec<RegisteredScript>,
    pub to_add: Vec<RegisteredScript>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_update.is_empty() && self.to_add.is_empty()
    }
}

/// Compute the pure diff: registered ids absent from storage are removed,
/// stored scripts are compiled and scheduled as update or add depending on
/// whether the host already knows their id.
pub fn plan<C: CodeCompiler>(
    compiler: &C,
    stored: &[StoredScript],
    registered: &[RegisteredScript],
) -> Result<SyncPlan, SyncError> {
    let stored_ids: BTreeSet<&str> = stored.iter().map(|s| s.id.as_str()).collect();
    let registered_ids: BTreeSet<&str> = registered.iter().map(|r| r.id.as_str()).collect();

    let mut plan = SyncPlan::default();

    for entry in registered {
        if !stored_ids.contains(entry.id.as_str()) {
            plan.to_remove.push(entry.id.clone());
        }
    }

    for script in stored {
        let compiled = compile_script(compiler, script)?;
        if registered_ids.contains(script.id.as_str()) {
            plan.to_update.push(compiled);
        } else {
            plan.to_add.push(compiled);
        }
    }

    Ok(plan)
}

// =============================================================================
// Engine
// =============================================================================

/// Applies sync plans against an injected host, with at-most-one full
/// resynchronization in flight. Overlapping triggers coalesce to the most
/// recently requested stored state.
pub struct SyncEngine<H, C> {
    host: H,
    compiler: C,
    gate: Mutex<TaskGate<Vec<StoredScript>>>,
}

impl<H: HostScripting, C: CodeCompiler> SyncEngine<H, C> {
    pub fn new(host: H, compiler: C) -> Self {
        Self {
            host,
            compiler,
            gate: Mutex::new(TaskGate::new(CoalescePolicy::Last)),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Full resynchronization of the stored list against the host.
    ///
    /// If a run is already in flight the call coalesces: the given state is
    /// stashed (replacing any earlier stash) and applied by the owning run
    /// before it releases the gate, so no caller observes a half-applied
    /// intermediate state. A host rejection is surfaced, drops any stashed
    /// state, and leaves prior host state as the transaction boundary.
    pub async fn resynchronize(&self, stored: Vec<StoredScript>) -> Result<(), SyncError> {
        let admission = self.gate.lock().await.offer(stored);
        let Admission::Run(mut current) = admission else {
            debug!("resynchronize coalesced into in-flight run");
            return Ok(());
        };

        loop {
            match self.resync_once(&current).await {
                Ok(()) => match self.gate.lock().await.on_complete() {
                    Some(next) => current = next,
                    None => return Ok(()),
                },
                Err(e) => {
                    warn!("resynchronize failed: {e}");
                    self.gate.lock().await.reset();
                    return Err(e);
                }
            }
        }
    }

    /// Resynchronize a single script after an edit, probing just its id
    /// instead of refetching the full registered list.
    ///
    /// Not serialized against the full resynchronization: a concurrent full
    /// run over the same id is last-writer-wins.
    pub async fn resynchronize_one(&self, script: &StoredScript) -> Result<(), SyncError> {
        let compiled = compile_script(&self.compiler, script)?;
        let ids = [script.id.clone()];
        let present = !self.host.list(Some(&ids)).await?.is_empty();

        if present {
            self.host.update(vec![compiled]).await
        } else {
            self.host.register(vec![compiled]).await
        }
    }

    async fn resync_once(&self, stored: &[StoredScript]) -> Result<(), SyncError> {
        self.host.execute_probe().await?;

        let registered = self.host.list(None).await?;
        let plan = plan(&self.compiler, stored, &registered)?;
        debug!(
            "sync plan: remove={} update={} add={}",
            plan.to_remove.len(),
            plan.to_update.len(),
            plan.to_add.len()
        );

        if !plan.to_remove.is_empty() {
            self.host.unregister(&plan.to_remove).await?;
        }
        if !plan.to_update.is_empty() {
            self.host.update(plan.to_update).await?;
        }
        if !plan.to_add.is_empty() {
            self.host.register(plan.to_add).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Passthrough;
    use gk_core::types::{CspMode, ExecutionWorld, RunAt, ScriptLanguage};

    fn stored(id: &str, patterns: &[&str]) -> StoredScript {
        StoredScript {
            id: id.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            language: ScriptLanguage::Javascript,
            run_at: RunAt::DocumentIdle,
            world: ExecutionWorld::Isolated,
            csp: CspMode::Leave,
            code: format!("console.log({id:?});"),
        }
    }

    #[test]
    fn test_compile_script_wraps_guard_and_body() {
        let script = stored("a", &["example.com"]);
        let compiled = compile_script(&Passthrough, &script).unwrap();
        assert_eq!(compiled.id, "a");
        assert!(compiled.js.starts_with("(function () {"));
        assert!(compiled.js.contains("gkHost"));
        assert!(compiled.js.contains("console.log(\"a\");"));
        assert_eq!(compiled.matches, vec!["*://example.com/*"]);
    }

    #[test]
    fn test_compile_script_empty_include_gets_placeholder() {
        let script = stored("a", &["-ads.example.com"]);
        let compiled = compile_script(&Passthrough, &script).unwrap();
        assert_eq!(compiled.matches, vec![UNREACHABLE_MATCH]);
        assert_eq!(compiled.exclude_matches, vec!["*://ads.example.com/*"]);
    }

    #[test]
    fn test_compile_script_no_patterns_gets_placeholder() {
        let compiled = compile_script(&Passthrough, &stored("a", &[])).unwrap();
        assert_eq!(compiled.matches, vec![UNREACHABLE_MATCH]);
    }

    #[test]
    fn test_compile_script_surfaces_compiler_rejection() {
        let mut script = stored("a", &["example.com"]);
        script.language = ScriptLanguage::Typescript;
        let err = compile_script(&Passthrough, &script).unwrap_err();
        assert!(matches!(err, SyncError::Compile { ref id, .. } if id == "a"));
    }

    #[test]
    fn test_plan_diff() {
        let stored_list = vec![stored("a", &["example.com"]), stored("b", &["example.org"])];
        let registered = vec![
            compile_script(&Passthrough, &stored("b", &["old.example.org"])).unwrap(),
            compile_script(&Passthrough, &stored("c", &["gone.example.com"])).unwrap(),
        ];

        let plan = plan(&Passthrough, &stored_list, &registered).unwrap();
        assert_eq!(plan.to_remove, vec!["c"]);
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].id, "b");
        assert_eq!(plan.to_update[0].matches, vec!["*://example.org/*"]);
        assert_eq!(plan.to_add.len(), 1);
        assert_eq!(plan.to_add[0].id, "a");
    }

    #[test]
    fn test_plan_empty_both_sides() {
        let plan = plan(&Passthrough, &[], &[]).unwrap();
        assert!(plan.is_empty());
    }
}
