//! Secret byte buffers with automatic memory zeroization
//!
//! Value data read from or written to the credential store travels in a
//! [`SecretData`], which zeroes its memory when dropped and never prints its
//! contents through `Debug`.

use std::fmt;
use std::ops::Deref;
use zeroize::Zeroize;

/// Opaque credential bytes that are securely cleared when dropped
///
/// # Example
///
/// ```
/// use keychain_kit::security::SecretData;
///
/// let secret = SecretData::from("hunter2");
/// assert_eq!(secret.as_bytes(), b"hunter2");
/// assert_eq!(secret.to_utf8().as_deref(), Some("hunter2"));
/// assert_eq!(format!("{:?}", secret), "SecretData(<7 bytes redacted>)");
/// ```
#[derive(Clone, Default)]
pub struct SecretData {
    inner: Vec<u8>,
}

impl SecretData {
    /// Wraps an owned byte vector
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { inner: bytes }
    }

    /// Copies a byte slice into a new buffer
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            inner: bytes.to_vec(),
        }
    }

    /// Returns the bytes as a slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Returns the length in bytes
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Decodes the bytes as UTF-8, returning `None` if they are not valid text
    ///
    /// The returned `String` is a copy and is not zeroed on drop.
    pub fn to_utf8(&self) -> Option<String> {
        std::str::from_utf8(&self.inner).ok().map(str::to_owned)
    }
}

impl Drop for SecretData {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl Zeroize for SecretData {
    fn zeroize(&mut self) {
        self.inner.zeroize();
    }
}

impl Deref for SecretData {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl AsRef<[u8]> for SecretData {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<Vec<u8>> for SecretData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for SecretData {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl From<&str> for SecretData {
    fn from(s: &str) -> Self {
        Self::from_slice(s.as_bytes())
    }
}

impl From<String> for SecretData {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl fmt::Debug for SecretData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretData(<{} bytes redacted>)", self.inner.len())
    }
}

impl PartialEq for SecretData {
    fn eq(&self, other: &Self) -> bool {
        bytes_match(&self.inner, &other.inner)
    }
}

impl Eq for SecretData {}

/// Compares equal-length buffers without stopping at the first difference
fn bytes_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}
