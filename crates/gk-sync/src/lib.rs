//! GreaseKit Synchronization Layer
//!
//! Everything that talks to (or stands in for) the browser: the diff-based
//! script synchronization engine, the CSP enforcement decisions, the
//! collaborator traits the engine is handed, and the task-coalescing gate
//! that keeps full resynchronizations from overlapping.
//!
//! # Modules
//!
//! - `engine`: compile + diff + batched apply of stored scripts
//! - `enforce`: per-navigation CSP decisions and header rewriting
//! - `host`: collaborator traits and in-memory doubles
//! - `gate`: Idle/Running/RunningWithPending coalescing state machine
//! - `error`: the `SyncError` taxonomy

pub mod enforce;
pub mod engine;
pub mod error;
pub mod gate;
pub mod host;

pub use enforce::{enforce, rewrite_csp_headers, wants_inline_csp};
pub use engine::{compile_script, plan, SyncEngine, SyncPlan};
pub use error::SyncError;
pub use gate::{Admission, CoalescePolicy, TaskGate};
pub use host::{
    CodeCompiler, HostScripting, MemoryHost, MemoryNetworkRules, NetworkRules, Passthrough,
    StripHeadersRule, CSP_STRIP_RULE_ID,
};
