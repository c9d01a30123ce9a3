//! Security module - Secret buffers and log sanitization
//!
//! This module provides security primitives for:
//! - Holding credential bytes with zeroization on drop
//! - Rendering attribute maps for logs without leaking secrets

mod sanitizer;
mod secret_data;

pub use sanitizer::Sanitizer;
pub use secret_data::SecretData;
