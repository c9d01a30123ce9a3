//! In-process credential store
//!
//! Keeps generic-password items as attribute maps behind a single lock.
//! Matching follows the native rules: every identifying attribute in the
//! query must equal the item's.

use std::sync::{PoisonError, RwLock};

use super::attributes::{keys, Attributes};
use super::status::Status;
use super::{check_class, CopyResult, SecureStorage};
use crate::security::Sanitizer;

/// A non-persistent [`SecureStorage`]
///
/// # Example
///
/// ```
/// use keychain_kit::store::{keys, Attributes, MemoryStore, SecureStorage, Status};
///
/// let store = MemoryStore::new();
/// let item = Attributes::generic_password()
///     .with(keys::SERVICE, "svc")
///     .with(keys::ACCOUNT, "alice")
///     .with(keys::VALUE_DATA, &b"pw"[..]);
///
/// assert_eq!(store.add(&item), Ok(()));
/// assert_eq!(store.add(&item), Err(Status::DUPLICATE_ITEM));
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<Vec<Attributes>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    ///
    /// A lock poisoned by a panicking writer still reports what it holds.
    pub fn len(&self) -> usize {
        let items = self.items.read().unwrap_or_else(|poison| {
            tracing::warn!("Memory store lock poisoned; reading recovered items");
            poison.into_inner()
        });
        items.len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Class, account and service together identify a generic password
fn same_identity(a: &Attributes, b: &Attributes) -> bool {
    a.class() == b.class()
        && a.account().unwrap_or_default() == b.account().unwrap_or_default()
        && a.service().unwrap_or_default() == b.service().unwrap_or_default()
}

fn matches(item: &Attributes, filter: &Attributes) -> bool {
    filter.iter().all(|(key, value)| item.get(key) == Some(value))
}

/// Shapes one matched item according to the return flags
fn render(item: &Attributes, with_attributes: bool, with_data: bool) -> Attributes {
    item.iter()
        .filter(|(key, _)| {
            let is_data = key.as_str() == keys::VALUE_DATA;
            if is_data {
                with_data
            } else {
                with_attributes
            }
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn poisoned<T>(_: PoisonError<T>) -> Status {
    Status::INTERNAL_COMPONENT
}

impl SecureStorage for MemoryStore {
    fn add(&self, attributes: &Attributes) -> Result<(), Status> {
        check_class(attributes)?;
        if attributes.has_controls() {
            return Err(Status::PARAM);
        }

        let mut items = self.items.write().map_err(poisoned)?;
        if items.iter().any(|item| same_identity(item, attributes)) {
            tracing::trace!(item = %Sanitizer::describe(attributes), "Memory add: duplicate");
            return Err(Status::DUPLICATE_ITEM);
        }

        items.push(attributes.clone());
        tracing::trace!(item = %Sanitizer::describe(attributes), "Memory add");
        Ok(())
    }

    fn copy_matching(&self, query: &Attributes) -> Result<Option<CopyResult>, Status> {
        check_class(query)?;
        let limit = query.match_limit()?;
        let filter = query.search_filter();

        let items = self.items.read().map_err(poisoned)?;
        let found: Vec<&Attributes> = items
            .iter()
            .filter(|item| matches(item, &filter))
            .take(limit.bound())
            .collect();

        tracing::trace!(query = %Sanitizer::describe(query), matches = found.len(), "Memory copy");

        let first = found.first().ok_or(Status::ITEM_NOT_FOUND)?;
        let (with_attributes, with_data) = (query.wants_attributes(), query.wants_data());

        let result = match (with_attributes, with_data) {
            (false, false) => None,
            _ if limit.is_multiple() => Some(CopyResult::Items(
                found
                    .iter()
                    .map(|item| render(item, with_attributes, with_data))
                    .collect(),
            )),
            (false, true) => Some(CopyResult::Data(
                first.value_data().cloned().unwrap_or_default(),
            )),
            (true, _) => Some(CopyResult::Item(render(first, true, with_data))),
        };

        Ok(result)
    }

    fn update(&self, query: &Attributes, attributes: &Attributes) -> Result<(), Status> {
        check_class(query)?;
        if attributes.has_controls() || attributes.contains_key(keys::CLASS) {
            return Err(Status::PARAM);
        }
        let filter = query.search_filter();

        let mut items = self.items.write().map_err(poisoned)?;
        let targets: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches(item, &filter))
            .map(|(index, _)| index)
            .collect();

        if targets.is_empty() {
            return Err(Status::ITEM_NOT_FOUND);
        }

        let updated: Vec<(usize, Attributes)> = targets
            .iter()
            .map(|&index| {
                let mut item = items[index].clone();
                for (key, value) in attributes {
                    item.insert(key.clone(), value.clone());
                }
                (index, item)
            })
            .collect();

        // Every item must keep a distinct identity once the update lands
        for (position, (index, item)) in updated.iter().enumerate() {
            let clashes_untouched = items
                .iter()
                .enumerate()
                .any(|(other, existing)| !targets.contains(&other) && same_identity(existing, item));
            let clashes_updated = updated[position + 1..]
                .iter()
                .any(|(_, other)| same_identity(other, item));

            if clashes_untouched || clashes_updated {
                tracing::trace!(index, "Memory update: duplicate");
                return Err(Status::DUPLICATE_ITEM);
            }
        }

        for (index, item) in updated {
            items[index] = item;
        }

        tracing::trace!(query = %Sanitizer::describe(query), updated = targets.len(), "Memory update");
        Ok(())
    }

    fn delete(&self, query: &Attributes) -> Result<(), Status> {
        check_class(query)?;
        let filter = query.search_filter();

        let mut items = self.items.write().map_err(poisoned)?;
        let before = items.len();
        items.retain(|item| !matches(item, &filter));

        let removed = before - items.len();
        tracing::trace!(query = %Sanitizer::describe(query), removed, "Memory delete");

        if removed == 0 {
            Err(Status::ITEM_NOT_FOUND)
        } else {
            Ok(())
        }
    }
}
