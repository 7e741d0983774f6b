//! # tessera_core
//!
//! Core domain logic for Tessera: credential verification, identity
//! assembly, token issuance/validation, and refresh-token rotation.

pub mod auth;
pub mod db;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
