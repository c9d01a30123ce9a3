//! Attribute dictionaries
//!
//! Queries and item descriptions share one shape: a map from the store's raw
//! attribute names to typed values. The names below are the ones the
//! platform keychain uses for generic-password items.

use std::collections::btree_map::{self, BTreeMap};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

use super::status::Status;
use crate::security::SecretData;

/// Raw attribute names recognized by the stores
pub mod keys {
    /// Item class
    pub const CLASS: &str = "class";
    /// Account identifier
    pub const ACCOUNT: &str = "acct";
    /// Service namespace
    pub const SERVICE: &str = "svce";
    /// Opaque value bytes
    pub const VALUE_DATA: &str = "v_Data";
    /// Maximum number of matches to return
    pub const MATCH_LIMIT: &str = "m_Limit";
    /// Return the item's value data
    pub const RETURN_DATA: &str = "r_Data";
    /// Return the item's attributes
    pub const RETURN_ATTRIBUTES: &str = "r_Attributes";
    /// User-visible label
    pub const LABEL: &str = "labl";
    /// Free-form comment
    pub const COMMENT: &str = "icmt";
    /// Kind description
    pub const DESCRIPTION: &str = "desc";
    /// Application-defined attribute
    pub const GENERIC: &str = "gena";
}

/// Class value for generic-password items
pub const CLASS_GENERIC_PASSWORD: &str = "genp";
/// Match-limit value asking for a single match
pub const MATCH_LIMIT_ONE: &str = "m_LimitOne";
/// Match-limit value asking for every match
pub const MATCH_LIMIT_ALL: &str = "m_LimitAll";

/// How many matches a copy-matching query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLimit {
    /// First match only (the default)
    One,
    /// Every match
    All,
    /// At most this many matches
    Count(usize),
}

impl MatchLimit {
    /// Returns true if more than one item may be returned
    pub fn is_multiple(self) -> bool {
        !matches!(self, Self::One | Self::Count(1))
    }

    /// Upper bound on the number of results
    pub fn bound(self) -> usize {
        match self {
            Self::One => 1,
            Self::All => usize::MAX,
            Self::Count(n) => n,
        }
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Text attribute
    String(String),
    /// Opaque bytes
    Data(SecretData),
    /// Flag
    Bool(bool),
    /// Integer
    Number(i64),
}

impl AttributeValue {
    /// Returns the text if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the flag if this is a bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the bytes if this is a data value
    pub fn as_data(&self) -> Option<&SecretData> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<SecretData> for AttributeValue {
    fn from(d: SecretData) -> Self {
        Self::Data(d)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Data(SecretData::from_slice(bytes))
    }
}

/// Errors raised when parsing an attribute map from JSON
#[derive(Debug, Error, PartialEq)]
pub enum AttributeError {
    /// The document is not a JSON object
    #[error("Attribute map must be a JSON object")]
    NotAnObject,

    /// A value has a type with no attribute counterpart
    #[error("Unsupported value for attribute '{0}'")]
    UnsupportedValue(String),

    /// A `{"base64": ...}` value did not decode
    #[error("Invalid base64 data for attribute '{0}'")]
    InvalidBase64(String),
}

/// An attribute dictionary used both as a query and as an item description
///
/// # Example
///
/// ```
/// use keychain_kit::store::{keys, Attributes};
///
/// let query = Attributes::generic_password()
///     .with(keys::SERVICE, "com.example.app")
///     .with(keys::ACCOUNT, "alice")
///     .with(keys::RETURN_DATA, true);
///
/// assert_eq!(query.account(), Some("alice"));
/// assert!(query.wants_data());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    map: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map whose class is generic password
    pub fn generic_password() -> Self {
        Self::new().with(keys::CLASS, CLASS_GENERIC_PASSWORD)
    }

    /// Adds an attribute and returns the map
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts an attribute, returning the previous value
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.map.insert(key.into(), value.into())
    }

    /// Looks up an attribute
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.map.get(key)
    }

    /// Removes an attribute
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.map.remove(key)
    }

    /// Returns true if the attribute is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Iterates over attributes in name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
        self.map.iter()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns a string attribute
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_str)
    }

    /// Item class
    pub fn class(&self) -> Option<&str> {
        self.get_str(keys::CLASS)
    }

    /// Account identifier
    pub fn account(&self) -> Option<&str> {
        self.get_str(keys::ACCOUNT)
    }

    /// Service namespace
    pub fn service(&self) -> Option<&str> {
        self.get_str(keys::SERVICE)
    }

    /// Value bytes
    pub fn value_data(&self) -> Option<&SecretData> {
        self.get(keys::VALUE_DATA).and_then(AttributeValue::as_data)
    }

    /// Whether the query asks for value data back
    pub fn wants_data(&self) -> bool {
        self.flag(keys::RETURN_DATA)
    }

    /// Whether the query asks for attributes back
    pub fn wants_attributes(&self) -> bool {
        self.flag(keys::RETURN_ATTRIBUTES)
    }

    fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(AttributeValue::Bool(b)) => *b,
            Some(AttributeValue::Number(n)) => *n != 0,
            _ => false,
        }
    }

    /// Parses the match limit, defaulting to one
    ///
    /// Returns [`Status::PARAM`] for values that are neither a known
    /// match-limit string nor a positive number.
    pub fn match_limit(&self) -> Result<MatchLimit, Status> {
        match self.get(keys::MATCH_LIMIT) {
            None => Ok(MatchLimit::One),
            Some(AttributeValue::String(s)) if s == MATCH_LIMIT_ONE => Ok(MatchLimit::One),
            Some(AttributeValue::String(s)) if s == MATCH_LIMIT_ALL => Ok(MatchLimit::All),
            Some(AttributeValue::Number(n)) if *n > 0 => usize::try_from(*n)
                .map(MatchLimit::Count)
                .map_err(|_| Status::PARAM),
            Some(_) => Err(Status::PARAM),
        }
    }

    /// Returns true if any match or return control key is present
    pub fn has_controls(&self) -> bool {
        self.map.keys().any(|k| is_control_key(k))
    }

    /// Copy of this map without control keys or value data
    ///
    /// What remains is the set of attributes that identify an item.
    pub fn search_filter(&self) -> Self {
        self.iter()
            .filter(|(k, _)| !is_control_key(k) && k.as_str() != keys::VALUE_DATA)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Parses a JSON object into an attribute map
    ///
    /// Strings, booleans and integers map to the matching value types.
    /// `{"base64": "..."}` is data, and a plain string under `v_Data` is
    /// taken as UTF-8 data.
    pub fn from_json(value: &Value) -> Result<Self, AttributeError> {
        let object = value.as_object().ok_or(AttributeError::NotAnObject)?;
        let mut attributes = Self::new();

        for (key, value) in object {
            let parsed = match value {
                Value::String(s) if key == keys::VALUE_DATA => {
                    AttributeValue::Data(SecretData::from(s.as_str()))
                }
                Value::String(s) => AttributeValue::String(s.clone()),
                Value::Bool(b) => AttributeValue::Bool(*b),
                Value::Number(n) => n
                    .as_i64()
                    .map(AttributeValue::Number)
                    .ok_or_else(|| AttributeError::UnsupportedValue(key.clone()))?,
                Value::Object(inner) => match inner.get("base64") {
                    Some(Value::String(encoded)) if inner.len() == 1 => BASE64
                        .decode(encoded)
                        .map(|bytes| AttributeValue::Data(SecretData::new(bytes)))
                        .map_err(|_| AttributeError::InvalidBase64(key.clone()))?,
                    _ => return Err(AttributeError::UnsupportedValue(key.clone())),
                },
                Value::Null | Value::Array(_) => {
                    return Err(AttributeError::UnsupportedValue(key.clone()))
                }
            };
            attributes.insert(key.clone(), parsed);
        }

        Ok(attributes)
    }

    /// Renders the map as JSON, with data as `{"base64": "..."}`
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    AttributeValue::String(s) => Value::String(s.clone()),
                    AttributeValue::Bool(b) => Value::Bool(*b),
                    AttributeValue::Number(n) => Value::from(*n),
                    AttributeValue::Data(d) => data_to_json(d),
                };
                (k.clone(), value)
            })
            .collect();
        Value::Object(object)
    }
}

/// Renders bytes as `{"base64": "..."}`
pub fn data_to_json(data: &SecretData) -> Value {
    let mut object = Map::new();
    object.insert("base64".to_string(), Value::String(BASE64.encode(data.as_bytes())));
    Value::Object(object)
}

/// Match (`m_`) and return (`r_`) keys steer a query rather than describe an item
pub fn is_control_key(key: &str) -> bool {
    key.starts_with("m_") || key.starts_with("r_")
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Attributes {
    type Item = (String, AttributeValue);
    type IntoIter = btree_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
