//! Native credential-store primitives
//!
//! A store exposes four calls, each taking an attribute dictionary and
//! reporting a native [`Status`]:
//! - [`SecureStorage::add`]
//! - [`SecureStorage::copy_matching`]
//! - [`SecureStorage::update`]
//! - [`SecureStorage::delete`]
//!
//! [`KeyringStore`] reaches the operating system's credential store;
//! [`MemoryStore`] keeps items in process.

mod attributes;
mod keyring_store;
mod memory;
mod status;

pub use attributes::{
    data_to_json, is_control_key, keys, AttributeError, AttributeValue, Attributes, MatchLimit,
    CLASS_GENERIC_PASSWORD, MATCH_LIMIT_ALL, MATCH_LIMIT_ONE,
};
pub use keyring_store::KeyringStore;
pub use memory::MemoryStore;
pub use status::Status;

use std::sync::Arc;

use serde_json::Value;

use crate::security::SecretData;

/// What a copy-matching call hands back when a return flag is set
#[derive(Debug, Clone, PartialEq)]
pub enum CopyResult {
    /// Value data of a single item
    Data(SecretData),
    /// Attributes of a single item, including `v_Data` if data was requested
    Item(Attributes),
    /// One entry per match when the match limit allows several
    Items(Vec<Attributes>),
}

impl CopyResult {
    /// Returns the value data if this result carries exactly one item's data
    pub fn data(&self) -> Option<&SecretData> {
        match self {
            Self::Data(data) => Some(data),
            Self::Item(attributes) => attributes.value_data(),
            Self::Items(_) => None,
        }
    }

    /// Renders the result as JSON
    pub fn to_json(&self) -> Value {
        match self {
            Self::Data(data) => data_to_json(data),
            Self::Item(attributes) => attributes.to_json(),
            Self::Items(items) => Value::Array(items.iter().map(Attributes::to_json).collect()),
        }
    }
}

/// The native add / copy-matching / update / delete interface
///
/// Every call is a single synchronous round-trip. `Err` always carries a
/// non-success status.
#[cfg_attr(test, mockall::automock)]
pub trait SecureStorage {
    /// Adds the item described by `attributes`
    fn add(&self, attributes: &Attributes) -> Result<(), Status>;

    /// Finds items matching `query`
    ///
    /// Returns `Ok(None)` when a match exists but the query set no return flag.
    fn copy_matching(&self, query: &Attributes) -> Result<Option<CopyResult>, Status>;

    /// Applies `attributes` to every item matching `query`
    fn update(&self, query: &Attributes, attributes: &Attributes) -> Result<(), Status>;

    /// Removes every item matching `query`
    fn delete(&self, query: &Attributes) -> Result<(), Status>;
}

impl<T: SecureStorage + ?Sized> SecureStorage for &T {
    fn add(&self, attributes: &Attributes) -> Result<(), Status> {
        (**self).add(attributes)
    }

    fn copy_matching(&self, query: &Attributes) -> Result<Option<CopyResult>, Status> {
        (**self).copy_matching(query)
    }

    fn update(&self, query: &Attributes, attributes: &Attributes) -> Result<(), Status> {
        (**self).update(query, attributes)
    }

    fn delete(&self, query: &Attributes) -> Result<(), Status> {
        (**self).delete(query)
    }
}

impl<T: SecureStorage + ?Sized> SecureStorage for Arc<T> {
    fn add(&self, attributes: &Attributes) -> Result<(), Status> {
        (**self).add(attributes)
    }

    fn copy_matching(&self, query: &Attributes) -> Result<Option<CopyResult>, Status> {
        (**self).copy_matching(query)
    }

    fn update(&self, query: &Attributes, attributes: &Attributes) -> Result<(), Status> {
        (**self).update(query, attributes)
    }

    fn delete(&self, query: &Attributes) -> Result<(), Status> {
        (**self).delete(query)
    }
}

/// Checks the class shared by every primitive
///
/// A missing class is [`Status::PARAM`]; only generic passwords are
/// implemented.
pub(crate) fn check_class(attributes: &Attributes) -> Result<(), Status> {
    match attributes.get(keys::CLASS) {
        None => Err(Status::PARAM),
        Some(value) if value.as_str() == Some(CLASS_GENERIC_PASSWORD) => Ok(()),
        Some(_) => Err(Status::UNIMPLEMENTED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_class() {
        assert_eq!(check_class(&Attributes::generic_password()), Ok(()));
        assert_eq!(check_class(&Attributes::new()), Err(Status::PARAM));
        assert_eq!(
            check_class(&Attributes::new().with(keys::CLASS, "inet")),
            Err(Status::UNIMPLEMENTED)
        );
    }

    #[test]
    fn test_copy_result_data() {
        let data = CopyResult::Data(SecretData::from("pw"));
        assert_eq!(data.data().unwrap().as_bytes(), b"pw");

        let item = CopyResult::Item(
            Attributes::generic_password().with(keys::VALUE_DATA, SecretData::from("x")),
        );
        assert_eq!(item.data().unwrap().as_bytes(), b"x");

        assert!(CopyResult::Items(vec![]).data().is_none());
    }
}
