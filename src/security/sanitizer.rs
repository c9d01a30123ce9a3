//! Log-safe rendering of store queries
//!
//! Attribute maps carry secrets (value data) and identifying account names.
//! Everything that reaches a log line goes through [`Sanitizer`] first.

use crate::store::{keys, AttributeValue, Attributes};

/// Sanitizer for attribute maps and account identifiers
///
/// Provides static methods that strip sensitive data before logging.
pub struct Sanitizer;

impl Sanitizer {
    /// Masks a string, showing only the first and last `visible_chars` characters
    ///
    /// # Examples
    ///
    /// ```
    /// use keychain_kit::security::Sanitizer;
    ///
    /// assert_eq!(Sanitizer::mask_string("abcdefghij", 2), "ab...ij");
    /// assert_eq!(Sanitizer::mask_string("tiny", 3), "****");
    /// ```
    pub fn mask_string(s: &str, visible_chars: usize) -> String {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() <= visible_chars * 2 {
            "****".to_string()
        } else {
            let head: String = chars[..visible_chars].iter().collect();
            let tail: String = chars[chars.len() - visible_chars..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }

    /// Masks an account identifier for safe logging
    ///
    /// # Examples
    ///
    /// ```
    /// use keychain_kit::security::Sanitizer;
    ///
    /// assert_eq!(Sanitizer::mask_account("alice@example.com"), "al...om");
    /// assert_eq!(Sanitizer::mask_account("bob"), "****");
    /// ```
    pub fn mask_account(account: &str) -> String {
        Self::mask_string(account, 2)
    }

    /// Renders an attribute map for logs
    ///
    /// Data values show only their length and the account is masked. Other
    /// attributes are printed as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// use keychain_kit::security::{Sanitizer, SecretData};
    /// use keychain_kit::store::{keys, Attributes};
    ///
    /// let attrs = Attributes::generic_password()
    ///     .with(keys::ACCOUNT, "alice@example.com")
    ///     .with(keys::VALUE_DATA, SecretData::from("hunter2"));
    ///
    /// assert_eq!(
    ///     Sanitizer::describe(&attrs),
    ///     "{acct: al...om, class: genp, v_Data: <7 bytes>}"
    /// );
    /// ```
    pub fn describe(attributes: &Attributes) -> String {
        let fields: Vec<String> = attributes
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    AttributeValue::Data(data) => format!("<{} bytes>", data.len()),
                    AttributeValue::String(s) if key == keys::ACCOUNT => Self::mask_account(s),
                    AttributeValue::String(s) => s.clone(),
                    AttributeValue::Bool(b) => b.to_string(),
                    AttributeValue::Number(n) => n.to_string(),
                };
                format!("{}: {}", key, rendered)
            })
            .collect();
        format!("{{{}}}", fields.join(", "))
    }
}
