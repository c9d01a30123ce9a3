//! Native status codes
//!
//! Every store primitive reports a signed 32-bit status, with the same values
//! the platform keychain uses for its `OSStatus` results.

use std::fmt;

/// A native credential-store status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    /// The operation completed
    pub const SUCCESS: Self = Self(0);
    /// The store does not implement the requested item class or operation
    pub const UNIMPLEMENTED: Self = Self(-4);
    /// One or more parameters were invalid
    pub const PARAM: Self = Self(-50);
    /// The store is not available
    pub const NOT_AVAILABLE: Self = Self(-25291);
    /// Authorization or authentication failed
    pub const AUTH_FAILED: Self = Self(-25293);
    /// The item already exists
    pub const DUPLICATE_ITEM: Self = Self(-25299);
    /// No item matched the query
    pub const ITEM_NOT_FOUND: Self = Self(-25300);
    /// The store requires user interaction that is not allowed right now
    pub const INTERACTION_NOT_ALLOWED: Self = Self(-25308);
    /// Stored data could not be decoded
    pub const DECODE: Self = Self(-26275);
    /// An internal component of the store failed
    pub const INTERNAL_COMPONENT: Self = Self(-2070);

    /// Returns the raw code
    pub fn code(self) -> i32 {
        self.0
    }

    /// Returns true for [`Status::SUCCESS`]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Converts a primitive's result into its status
    pub fn of<T>(result: &Result<T, Status>) -> Self {
        match result {
            Ok(_) => Self::SUCCESS,
            Err(status) => *status,
        }
    }

    /// Short description of the well-known codes
    pub fn message(self) -> &'static str {
        match self {
            Self::SUCCESS => "success",
            Self::UNIMPLEMENTED => "function or operation not implemented",
            Self::PARAM => "invalid parameter",
            Self::NOT_AVAILABLE => "credential store not available",
            Self::AUTH_FAILED => "authorization failed",
            Self::DUPLICATE_ITEM => "item already exists",
            Self::ITEM_NOT_FOUND => "item not found",
            Self::INTERACTION_NOT_ALLOWED => "user interaction not allowed",
            Self::DECODE => "unable to decode data",
            Self::INTERNAL_COMPONENT => "internal component failure",
            _ => "unknown status",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.0)
    }
}

impl std::error::Error for Status {}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert!(Status::SUCCESS.is_success());
        assert!(!Status::ITEM_NOT_FOUND.is_success());
        assert_eq!(Status::default(), Status::SUCCESS);
    }

    #[test]
    fn test_native_values() {
        assert_eq!(Status::DUPLICATE_ITEM.code(), -25299);
        assert_eq!(Status::ITEM_NOT_FOUND.code(), -25300);
        assert_eq!(Status::PARAM.code(), -50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::ITEM_NOT_FOUND.to_string(), "item not found (-25300)");
        assert_eq!(Status(12345).to_string(), "unknown status (12345)");
    }

    #[test]
    fn test_of_result() {
        assert_eq!(Status::of(&Ok::<(), Status>(())), Status::SUCCESS);
        assert_eq!(Status::of::<()>(&Err(Status::DECODE)), Status::DECODE);
    }
}
