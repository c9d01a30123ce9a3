//! Operating-system credential store
//!
//! Uses the `keyring` crate to reach the platform keychain (macOS/iOS
//! Keychain, Windows Credential Manager, Linux keyutils). Generic passwords
//! are addressed by service and account; value bytes go through the
//! keyring secret, other string attributes through the platform's
//! attribute map where the platform has one.

use std::collections::HashMap;

use keyring::Entry;

use super::attributes::{keys, AttributeValue, Attributes};
use super::status::Status;
use super::{check_class, CopyResult, SecureStorage};
use crate::security::{Sanitizer, SecretData};

/// [`SecureStorage`] backed by the operating system's credential store
///
/// Every call opens a fresh keyring entry, so the store itself holds no
/// state and can be shared freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringStore;

impl KeyringStore {
    /// Creates a handle to the platform store
    pub fn new() -> Self {
        Self
    }

    /// Opens the keyring entry for a service and account
    fn entry(service: &str, account: &str) -> Result<Entry, Status> {
        Entry::new(service, account).map_err(map_error)
    }

    /// Reads the secret of an entry that must exist
    fn read_secret(entry: &Entry) -> Result<SecretData, Status> {
        entry.get_secret().map(SecretData::new).map_err(map_error)
    }

    /// Checks that no credential exists yet at `entry`
    fn ensure_vacant(entry: &Entry) -> Result<(), Status> {
        match entry.get_secret() {
            Ok(_) => Err(Status::DUPLICATE_ITEM),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_error(e)),
        }
    }

    /// Compares the query's extra string attributes with the entry's
    fn filters_match(entry: &Entry, query: &Attributes) -> Result<bool, Status> {
        let filter = query.search_filter();
        let wanted = platform_attributes(&filter)?;
        if wanted.is_empty() {
            return Ok(true);
        }

        let stored = entry.get_attributes().map_err(map_error)?;
        Ok(attributes_agree(&wanted, &stored))
    }

    /// Removes a credential written earlier in a call that then failed
    fn roll_back(written: &Entry, status: Status) -> Status {
        if let Err(e) = written.delete_credential() {
            tracing::warn!("Keyring rollback failed: {}", e);
        }
        status
    }

    fn apply_attributes(entry: &Entry, extras: &HashMap<&str, &str>) -> Result<(), Status> {
        if extras.is_empty() {
            return Ok(());
        }
        entry.update_attributes(extras).map_err(map_error)
    }
}

/// Service and account are both required to address a keyring entry
fn locate(attributes: &Attributes) -> Result<(&str, &str), Status> {
    match (attributes.service(), attributes.account()) {
        (Some(service), Some(account)) => Ok((service, account)),
        _ => Err(Status::PARAM),
    }
}

/// String attributes other than class, account, service and value data
///
/// The keyring can only carry text attributes, so any other value type is
/// [`Status::PARAM`].
fn platform_attributes(attributes: &Attributes) -> Result<HashMap<&str, &str>, Status> {
    let mut extras = HashMap::new();
    for (key, value) in attributes {
        match key.as_str() {
            keys::CLASS | keys::ACCOUNT | keys::SERVICE | keys::VALUE_DATA => continue,
            _ => match value {
                AttributeValue::String(s) => {
                    extras.insert(key.as_str(), s.as_str());
                }
                _ => return Err(Status::PARAM),
            },
        }
    }
    Ok(extras)
}

/// Compares wanted attributes with those the platform reports for an entry
///
/// Keychain and keyutils keep no extra attributes, so a key the platform
/// does not report never rules an entry out.
fn attributes_agree(wanted: &HashMap<&str, &str>, stored: &HashMap<String, String>) -> bool {
    wanted
        .iter()
        .all(|(key, value)| stored.get(*key).map_or(true, |kept| kept.as_str() == *value))
}

/// Maps keyring failures onto native status codes
pub(crate) fn map_error(error: keyring::Error) -> Status {
    match error {
        keyring::Error::NoEntry => Status::ITEM_NOT_FOUND,
        keyring::Error::BadEncoding(_) => Status::DECODE,
        keyring::Error::TooLong(_, _) | keyring::Error::Invalid(_, _) => Status::PARAM,
        keyring::Error::Ambiguous(_) => Status::DUPLICATE_ITEM,
        keyring::Error::NoStorageAccess(platform_err) => {
            classify_platform_message(&platform_err.to_string()).unwrap_or(Status::NOT_AVAILABLE)
        }
        keyring::Error::PlatformFailure(platform_err) => {
            let message = platform_err.to_string();
            classify_platform_message(&message).unwrap_or_else(|| {
                tracing::warn!("Keyring platform failure: {}", message);
                Status::INTERNAL_COMPONENT
            })
        }
        other => {
            tracing::warn!("Unexpected keyring error: {}", other);
            Status::INTERNAL_COMPONENT
        }
    }
}

/// Recognizes locked-store and authorization failures in platform messages
fn classify_platform_message(message: &str) -> Option<Status> {
    let message = message.to_lowercase();
    if message.contains("interaction") || message.contains("-25308") {
        Some(Status::INTERACTION_NOT_ALLOWED)
    } else if message.contains("-25293")
        || message.contains("authorization")
        || message.contains("denied")
    {
        Some(Status::AUTH_FAILED)
    } else {
        None
    }
}

impl SecureStorage for KeyringStore {
    fn add(&self, attributes: &Attributes) -> Result<(), Status> {
        check_class(attributes)?;
        if attributes.has_controls() {
            return Err(Status::PARAM);
        }
        let (service, account) = locate(attributes)?;
        let extras = platform_attributes(attributes)?;

        let entry = Self::entry(service, account)?;
        Self::ensure_vacant(&entry)?;

        let data = attributes.value_data().map(|d| d.as_bytes()).unwrap_or_default();
        entry.set_secret(data).map_err(map_error)?;
        if let Err(status) = Self::apply_attributes(&entry, &extras) {
            return Err(Self::roll_back(&entry, status));
        }

        tracing::debug!(item = %Sanitizer::describe(attributes), "Keyring add");
        Ok(())
    }

    fn copy_matching(&self, query: &Attributes) -> Result<Option<CopyResult>, Status> {
        check_class(query)?;
        let limit = query.match_limit()?;
        let (service, account) = locate(query)?;

        let entry = Self::entry(service, account)?;
        let secret = Self::read_secret(&entry)?;
        if !Self::filters_match(&entry, query)? {
            return Err(Status::ITEM_NOT_FOUND);
        }
        tracing::debug!(query = %Sanitizer::describe(query), "Keyring copy");

        let (with_attributes, with_data) = (query.wants_attributes(), query.wants_data());
        if !with_attributes && !with_data {
            return Ok(None);
        }

        let mut item = Attributes::new();
        if with_attributes {
            for (key, value) in entry.get_attributes().map_err(map_error)? {
                item.insert(key, value);
            }
            item = item
                .with(keys::CLASS, super::CLASS_GENERIC_PASSWORD)
                .with(keys::SERVICE, service)
                .with(keys::ACCOUNT, account);
        }

        let result = if limit.is_multiple() {
            if with_data {
                item.insert(keys::VALUE_DATA, secret);
            }
            CopyResult::Items(vec![item])
        } else if with_attributes {
            if with_data {
                item.insert(keys::VALUE_DATA, secret);
            }
            CopyResult::Item(item)
        } else {
            CopyResult::Data(secret)
        };

        Ok(Some(result))
    }

    fn update(&self, query: &Attributes, attributes: &Attributes) -> Result<(), Status> {
        check_class(query)?;
        if attributes.has_controls() || attributes.contains_key(keys::CLASS) {
            return Err(Status::PARAM);
        }
        let (service, account) = locate(query)?;
        let extras = platform_attributes(attributes)?;

        let new_service = match attributes.get(keys::SERVICE) {
            None => service,
            Some(value) => value.as_str().ok_or(Status::PARAM)?,
        };
        let new_account = match attributes.get(keys::ACCOUNT) {
            None => account,
            Some(value) => value.as_str().ok_or(Status::PARAM)?,
        };

        let entry = Self::entry(service, account)?;
        let current = Self::read_secret(&entry)?;
        if !Self::filters_match(&entry, query)? {
            return Err(Status::ITEM_NOT_FOUND);
        }

        let data = attributes.value_data().unwrap_or(&current);

        if (new_service, new_account) != (service, account) {
            let target = Self::entry(new_service, new_account)?;
            Self::ensure_vacant(&target)?;
            target.set_secret(data.as_bytes()).map_err(map_error)?;
            // The old credential goes only once the new one is complete
            if let Err(status) = Self::apply_attributes(&target, &extras)
                .and_then(|()| entry.delete_credential().map_err(map_error))
            {
                return Err(Self::roll_back(&target, status));
            }
        } else {
            if attributes.value_data().is_some() {
                entry.set_secret(data.as_bytes()).map_err(map_error)?;
            }
            Self::apply_attributes(&entry, &extras)?;
        }

        tracing::debug!(
            query = %Sanitizer::describe(query),
            changes = %Sanitizer::describe(attributes),
            "Keyring update"
        );
        Ok(())
    }

    fn delete(&self, query: &Attributes) -> Result<(), Status> {
        check_class(query)?;
        let (service, account) = locate(query)?;

        let entry = Self::entry(service, account)?;
        if !Self::filters_match(&entry, query)? {
            return Err(Status::ITEM_NOT_FOUND);
        }
        entry.delete_credential().map_err(map_error)?;

        tracing::debug!(query = %Sanitizer::describe(query), "Keyring delete");
        Ok(())
    }
}
