//! Keychain module - Credential save/load/delete facade
//!
//! Provides the simple key/value calls and their raw attribute-map
//! counterparts on top of any [`SecureStorage`](crate::store::SecureStorage):
//! - OS credential store (via the keyring crate)
//! - In-process memory store

mod facade;

pub use facade::{Keychain, RawResult};
