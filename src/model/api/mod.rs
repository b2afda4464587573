//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as decimal strings.
//! - Credential hashes are never included.

pub mod auth;
pub mod session;
pub mod user;
