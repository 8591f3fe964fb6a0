//! GreaseKit Core Library
//!
//! Pure building blocks for the GreaseKit user-script manager: the match
//! pattern mini-language, its ordered evaluator, the CSP header object
//! model, and the shared script data types. Everything here is synchronous
//! and side-effect free; user-authored text never causes an error, only a
//! skipped rule.
//!
//! # Modules
//!
//! - `pattern`: raw pattern grammar and parser
//! - `matcher`: last-match-wins evaluation of a pattern list against a URL
//! - `csp`: Content-Security-Policy parse/rewrite model
//! - `types`: stored/registered script records and match-pattern sets

pub mod csp;
pub mod matcher;
pub mod pattern;
pub mod types;

// Re-export commonly used items
pub use csp::CspHeader;
pub use matcher::{evaluate, hostname};
pub use pattern::{parse, MatchTarget, ParsedPattern, PatternKind};
pub use types::{
    CspMode, DomainPatternSet, ExecutionWorld, RegisteredScript, RunAt, ScriptLanguage,
    StoredScript,
};
