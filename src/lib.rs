//! keychain-kit - Save, load and delete credentials in the platform store
//!
//! A thin wrapper over the operating system's secure credential store,
//! modelled on the native keychain's attribute-dictionary interface.
//!
//! ## Features
//!
//! - Simple `save` / `load` / `delete` of string values keyed by account
//! - Raw attribute-map variants that return the native status code
//! - Secure credential storage (macOS Keychain, Windows Credential Manager, Linux keyutils)
//! - In-memory store for tests and embedding
//!
//! ## Architecture
//!
//! - **Keychain**: the facade translating keys and values into store queries
//! - **Store**: native add / copy-matching / update / delete primitives
//! - **Security**: zeroizing secret buffers and log sanitization
//! - **Config**: default service namespace and log filter

pub mod config;
pub mod keychain;
pub mod security;
pub mod store;

pub use config::KeychainConfig;
pub use keychain::{Keychain, RawResult};
pub use store::{Attributes, SecureStorage, Status};

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence; otherwise `fallback` directives apply.
pub fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
