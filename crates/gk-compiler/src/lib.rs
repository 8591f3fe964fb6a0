//! GreaseKit Pattern Compiler
//!
//! Compiles user-authored match pattern lists into the two artifacts the
//! host runtime needs: a host-native include/exclude match-pattern set
//! (coarse, conservatively broad) and a JavaScript guard prologue that
//! re-checks the precise condition at injection time.

pub mod domains;
pub mod guard;

pub use domains::{compile, MATCH_ALL_HTTP, MATCH_ALL_URLS, UNREACHABLE_MATCH};
pub use guard::{guard_code, wrap_user_script};
