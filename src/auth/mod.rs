//! # Auth Module
//!
//! Single admin API key, stored as an Argon2id hash and checked on every
//! protected request.

pub mod crypto;
pub mod errors;
pub mod gatekeeper;

pub use errors::{AuthError, AuthResult};
pub use gatekeeper::{AuthGatekeeper, DEFAULT_API_KEY_HEADER};
