//! circled - a small backend for invite-gated social groups.
//!
//! Users join groups with human-typable invite codes, post and comment
//! inside them, and hold roles that gate administrative actions. The
//! interesting part lives in [`groups`]: the membership ledger, the
//! authorization checks, and the kick/ban state machine with lazy
//! reinstatement. Everything else (HTTP, sessions, storage) is plumbing
//! around that core.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod groups;
pub mod http;
pub mod posts;

pub use config::Config;
pub use db::Database;
pub use error::CoreError;
