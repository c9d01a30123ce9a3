//! Simple and raw-attribute credential operations
//!
//! [`Keychain`] turns `(key, value)` pairs into generic-password queries for
//! a [`SecureStorage`], and passes caller-built attribute maps straight
//! through for advanced use.

use serde_json::{json, Value};

use crate::config::{default_service, KeychainConfig};
use crate::security::{Sanitizer, SecretData};
use crate::store::{
    keys, Attributes, CopyResult, KeyringStore, SecureStorage, Status, MATCH_LIMIT_ONE,
};

/// Outcome of a raw-attribute call
///
/// `success` is true exactly when `status` is [`Status::SUCCESS`]. `data`
/// is only ever set by [`Keychain::load_query`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    /// Whether the native call succeeded
    pub success: bool,
    /// The native status code
    pub status: Status,
    /// Fetched data or attributes
    pub data: Option<CopyResult>,
}

impl RawResult {
    fn from_status(result: Result<(), Status>) -> Self {
        let status = Status::of(&result);
        Self {
            success: status.is_success(),
            status,
            data: None,
        }
    }

    fn from_copy(result: Result<Option<CopyResult>, Status>) -> Self {
        let status = Status::of(&result);
        Self {
            success: status.is_success(),
            status,
            data: result.ok().flatten(),
        }
    }

    /// Renders the outcome as JSON
    pub fn to_json(&self) -> Value {
        json!({
            "success": self.success,
            "status": self.status.code(),
            "message": self.status.message(),
            "data": self.data.as_ref().map(CopyResult::to_json),
        })
    }
}

/// Credential facade over a native store
///
/// Simple calls address generic-password items by account key inside this
/// facade's service namespace. Raw calls take full attribute maps.
///
/// # Example
///
/// ```
/// use keychain_kit::keychain::Keychain;
/// use keychain_kit::store::MemoryStore;
///
/// let keychain = Keychain::with_store(MemoryStore::new(), "com.example.app");
///
/// assert!(keychain.save("my-token", "api-token"));
/// assert_eq!(keychain.load("api-token"), Some("my-token".to_string()));
///
/// assert!(keychain.delete("api-token"));
/// assert_eq!(keychain.load("api-token"), None);
/// ```
#[derive(Debug)]
pub struct Keychain<S = KeyringStore> {
    store: S,
    service: String,
}

impl Keychain<KeyringStore> {
    /// Creates a keychain on the OS store with the application's default service
    pub fn new() -> Self {
        Self::with_store(KeyringStore::new(), default_service())
    }

    /// Creates a keychain on the OS store with a custom service name
    ///
    /// Useful for testing or separating different credential sets.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self::with_store(KeyringStore::new(), service)
    }

    /// Creates a keychain on the OS store using the configured service
    pub fn from_config(config: &KeychainConfig) -> Self {
        Self::with_store(KeyringStore::new(), config.resolve_service())
    }
}

impl Default for Keychain<KeyringStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SecureStorage> Keychain<S> {
    /// Creates a keychain over any store
    pub fn with_store(store: S, service: impl Into<String>) -> Self {
        Self {
            store,
            service: service.into(),
        }
    }

    /// Returns the service name used for simple calls
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generic-password query for `key` in this service
    fn item_query(&self, key: &str) -> Attributes {
        Attributes::generic_password()
            .with(keys::SERVICE, self.service.as_str())
            .with(keys::ACCOUNT, key)
    }

    /// Stores a string value under `key`, replacing any existing value
    ///
    /// Returns true iff the store accepted the new item.
    pub fn save(&self, value: &str, key: &str) -> bool {
        self.save_data(value.as_bytes(), key)
    }

    /// Stores opaque bytes under `key`, replacing any existing value
    pub fn save_data(&self, value: &[u8], key: &str) -> bool {
        let query = self.item_query(key);
        // A missing item is the common case here
        let _ = self.store.delete(&query);

        let item = query.with(keys::VALUE_DATA, value);
        match self.store.add(&item) {
            Ok(()) => true,
            Err(status) => {
                tracing::debug!(account = %Sanitizer::mask_account(key), %status, "Save failed");
                false
            }
        }
    }

    /// Retrieves the string stored under `key`
    ///
    /// Returns `None` if nothing is stored or the bytes are not valid UTF-8.
    pub fn load(&self, key: &str) -> Option<String> {
        self.load_data(key)?.to_utf8()
    }

    /// Retrieves the bytes stored under `key`
    pub fn load_data(&self, key: &str) -> Option<SecretData> {
        let query = self
            .item_query(key)
            .with(keys::MATCH_LIMIT, MATCH_LIMIT_ONE)
            .with(keys::RETURN_DATA, true);

        match self.store.copy_matching(&query) {
            Ok(result) => result.as_ref().and_then(CopyResult::data).cloned(),
            Err(status) => {
                tracing::trace!(account = %Sanitizer::mask_account(key), %status, "Load found nothing");
                None
            }
        }
    }

    /// Deletes the value stored under `key`
    ///
    /// Returns true iff the store removed an item.
    pub fn delete(&self, key: &str) -> bool {
        let query = self.item_query(key);
        match self.store.delete(&query) {
            Ok(()) => true,
            Err(status) => {
                tracing::debug!(account = %Sanitizer::mask_account(key), %status, "Delete failed");
                false
            }
        }
    }

    /// Checks if a value is stored under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.store.copy_matching(&self.item_query(key)).is_ok()
    }

    /// Adds a caller-described item, first deleting whatever it would replace
    ///
    /// The delete uses the identifying attributes of `attributes` (no value
    /// data, no match or return keys). The result reflects the add.
    pub fn save_attributes(&self, attributes: &Attributes) -> RawResult {
        let _ = self.store.delete(&attributes.search_filter());
        let result = RawResult::from_status(self.store.add(attributes));
        tracing::debug!(item = %Sanitizer::describe(attributes), status = %result.status, "Raw save");
        result
    }

    /// Runs a copy-matching query, returning whatever the store hands back
    pub fn load_query(&self, query: &Attributes) -> RawResult {
        let result = RawResult::from_copy(self.store.copy_matching(query));
        tracing::debug!(query = %Sanitizer::describe(query), status = %result.status, "Raw load");
        result
    }

    /// Applies `attributes` to the items matching `query`
    pub fn update(&self, query: &Attributes, attributes: &Attributes) -> RawResult {
        let result = RawResult::from_status(self.store.update(query, attributes));
        tracing::debug!(query = %Sanitizer::describe(query), status = %result.status, "Raw update");
        result
    }

    /// Deletes the items matching `query`
    pub fn delete_query(&self, query: &Attributes) -> RawResult {
        let result = RawResult::from_status(self.store.delete(query));
        tracing::debug!(query = %Sanitizer::describe(query), status = %result.status, "Raw delete");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MockSecureStorage, MATCH_LIMIT_ALL};
    use mockall::Sequence;

    fn test_keychain() -> Keychain<MemoryStore> {
        Keychain::with_store(MemoryStore::new(), "keychain-kit-test")
    }

    #[test]
    fn test_keychain_creation() {
        let keychain = Keychain::with_service("Custom");
        assert_eq!(keychain.service(), "Custom");

        let configured = Keychain::from_config(&KeychainConfig {
            service: Some("from-config".to_string()),
            log_filter: None,
        });
        assert_eq!(configured.service(), "from-config");

        assert!(!Keychain::new().service().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let keychain = test_keychain();
        assert!(keychain.save("super-secret-value", "test-token-1"));
        assert_eq!(
            keychain.load("test-token-1"),
            Some("super-secret-value".to_string())
        );
    }

    #[test]
    fn test_load_nonexistent() {
        let keychain = test_keychain();
        assert_eq!(keychain.load("nonexistent-key-12345"), None);
    }

    #[test]
    fn test_delete() {
        let keychain = test_keychain();
        keychain.save("value", "test-delete");

        assert!(keychain.delete("test-delete"));
        assert_eq!(keychain.load("test-delete"), None);
        assert!(!keychain.delete("test-delete"));
    }

    #[test]
    fn test_overwrite() {
        let keychain = test_keychain();
        assert!(keychain.save("first", "test-overwrite"));
        assert!(keychain.save("second", "test-overwrite"));

        assert_eq!(keychain.load("test-overwrite"), Some("second".to_string()));
        assert_eq!(keychain.store().len(), 1);
    }

    #[test]
    fn test_contains() {
        let keychain = test_keychain();
        assert!(!keychain.contains("test-contains"));
        keychain.save("value", "test-contains");
        assert!(keychain.contains("test-contains"));
    }

    #[test]
    fn test_services_are_separate() {
        let store = MemoryStore::new();
        let first = Keychain::with_store(&store, "first");
        let second = Keychain::with_store(&store, "second");

        first.save("one", "shared-key");
        second.save("two", "shared-key");

        assert_eq!(first.load("shared-key"), Some("one".to_string()));
        assert_eq!(second.load("shared-key"), Some("two".to_string()));

        first.delete("shared-key");
        assert_eq!(second.load("shared-key"), Some("two".to_string()));
    }

    #[test]
    fn test_binary_data() {
        let keychain = test_keychain();
        let bytes = [0xff, 0x00, 0xfe];
        assert!(keychain.save_data(&bytes, "test-binary"));

        assert_eq!(keychain.load("test-binary"), None);
        assert_eq!(keychain.load_data("test-binary").unwrap().as_bytes(), &bytes);
    }

    #[test]
    fn test_save_deletes_then_adds() {
        let mut store = MockSecureStorage::new();
        let mut seq = Sequence::new();

        store
            .expect_delete()
            .withf(|query| query.account() == Some("k") && query.value_data().is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Status::ITEM_NOT_FOUND));
        store
            .expect_add()
            .withf(|item| {
                item.service() == Some("svc")
                    && item.value_data().map(|d| d.as_bytes()) == Some(&b"v"[..])
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let keychain = Keychain::with_store(store, "svc");
        assert!(keychain.save("v", "k"));
    }

    #[test]
    fn test_save_reports_add_failure() {
        let mut store = MockSecureStorage::new();
        store.expect_delete().returning(|_| Ok(()));
        store
            .expect_add()
            .returning(|_| Err(Status::INTERACTION_NOT_ALLOWED));

        let keychain = Keychain::with_store(store, "svc");
        assert!(!keychain.save("v", "k"));
    }

    #[test]
    fn test_load_queries_single_item_data() {
        let mut store = MockSecureStorage::new();
        store
            .expect_copy_matching()
            .withf(|query| {
                query.wants_data()
                    && query.get_str(keys::MATCH_LIMIT) == Some(MATCH_LIMIT_ONE)
                    && query.account() == Some("k")
            })
            .returning(|_| Ok(Some(CopyResult::Data(SecretData::from("v")))));

        let keychain = Keychain::with_store(store, "svc");
        assert_eq!(keychain.load("k"), Some("v".to_string()));
    }

    #[test]
    fn test_raw_save_and_load() {
        let keychain = test_keychain();
        let item = Attributes::generic_password()
            .with(keys::SERVICE, "raw-service")
            .with(keys::ACCOUNT, "raw-account")
            .with(keys::LABEL, "Raw")
            .with(keys::VALUE_DATA, SecretData::from("raw-value"));

        let saved = keychain.save_attributes(&item);
        assert!(saved.success);
        assert_eq!(saved.status, Status::SUCCESS);
        assert!(saved.data.is_none());

        // Saving again replaces rather than failing with a duplicate
        assert!(keychain.save_attributes(&item).success);
        assert_eq!(keychain.store().len(), 1);

        let query = Attributes::generic_password()
            .with(keys::SERVICE, "raw-service")
            .with(keys::ACCOUNT, "raw-account")
            .with(keys::RETURN_DATA, true)
            .with(keys::RETURN_ATTRIBUTES, true);
        let loaded = keychain.load_query(&query);
        assert!(loaded.success);
        let data = loaded.data.unwrap();
        assert_eq!(data.data().unwrap().as_bytes(), b"raw-value");
        let CopyResult::Item(attrs) = data else {
            panic!("expected a single item with attributes");
        };
        assert_eq!(attrs.get_str(keys::LABEL), Some("Raw"));
    }

    #[test]
    fn test_raw_load_not_found() {
        let keychain = test_keychain();
        let query = Attributes::generic_password()
            .with(keys::ACCOUNT, "missing")
            .with(keys::RETURN_DATA, true);

        let loaded = keychain.load_query(&query);
        assert!(!loaded.success);
        assert_eq!(loaded.status, Status::ITEM_NOT_FOUND);
        assert!(loaded.data.is_none());
    }

    #[test]
    fn test_raw_update() {
        let keychain = test_keychain();
        keychain.save("old", "test-update");

        let query = Attributes::generic_password()
            .with(keys::SERVICE, keychain.service())
            .with(keys::ACCOUNT, "test-update");
        let changes = Attributes::new().with(keys::VALUE_DATA, SecretData::from("new"));

        let updated = keychain.update(&query, &changes);
        assert!(updated.success);
        assert_eq!(keychain.load("test-update"), Some("new".to_string()));
    }

    #[test]
    fn test_raw_update_nonexistent() {
        let keychain = test_keychain();
        let query = Attributes::generic_password()
            .with(keys::SERVICE, keychain.service())
            .with(keys::ACCOUNT, "never-saved");
        let changes = Attributes::new().with(keys::VALUE_DATA, SecretData::from("x"));

        let updated = keychain.update(&query, &changes);
        assert!(!updated.success);
        assert_eq!(updated.status, Status::ITEM_NOT_FOUND);
    }

    #[test]
    fn test_raw_delete() {
        let keychain = test_keychain();
        keychain.save("a", "one");
        keychain.save("b", "two");

        let everything = Attributes::generic_password().with(keys::SERVICE, keychain.service());
        let listed = keychain.load_query(
            &everything
                .clone()
                .with(keys::MATCH_LIMIT, MATCH_LIMIT_ALL)
                .with(keys::RETURN_ATTRIBUTES, true),
        );
        assert!(matches!(listed.data, Some(CopyResult::Items(ref items)) if items.len() == 2));

        let deleted = keychain.delete_query(&everything);
        assert!(deleted.success);
        assert!(keychain.store().is_empty());

        let again = keychain.delete_query(&everything);
        assert_eq!(again.status, Status::ITEM_NOT_FOUND);
    }

    #[test]
    fn test_raw_missing_class() {
        let keychain = test_keychain();
        let result = keychain.save_attributes(&Attributes::new().with(keys::ACCOUNT, "x"));
        assert!(!result.success);
        assert_eq!(result.status, Status::PARAM);
    }

    #[test]
    fn test_raw_result_json() {
        let result = RawResult {
            success: false,
            status: Status::ITEM_NOT_FOUND,
            data: None,
        };
        assert_eq!(
            result.to_json(),
            json!({
                "success": false,
                "status": -25300,
                "message": "item not found",
                "data": null
            })
        );
    }
}
