//! Secrets read from the settings file.
//!
//! `RedactedString` prints and serializes as a placeholder and wipes its
//! buffer when dropped.

use bon::Builder;
use getset::Getters;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::result;
use validator::Validate;
use zeroize::Zeroize;

pub static REDACTED_PLACEHOLDER: &str = "###REDACTED###";

#[derive(Validate, Clone, Builder, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RedactedString {
    #[validate(length(min = 8))]
    #[builder(into)]
    inner: String,
}

impl Debug for RedactedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(REDACTED_PLACEHOLDER)
    }
}

impl Serialize for RedactedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED_PLACEHOLDER)
    }
}

impl<'de> Deserialize<'de> for RedactedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(|inner| Self { inner })
    }
}

impl Drop for RedactedString {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_string_validation() {
        let valid = RedactedString::builder().inner("valid_password").build();
        assert!(valid.validate().is_ok());

        let invalid = RedactedString::builder().inner("short").build();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_redacted_in_debug_and_serialization() {
        let secret = RedactedString::builder().inner("p4ssw0rd!").build();
        assert_eq!(format!("{secret:?}"), REDACTED_PLACEHOLDER);
        assert_eq!(
            serde_json::to_string(&secret).unwrap(),
            format!("\"{REDACTED_PLACEHOLDER}\"")
        );
    }

    #[test]
    fn test_deserialize_keeps_value() {
        let secret: RedactedString = serde_yml::from_str("\"p4ssw0rd!\"").unwrap();
        assert_eq!(secret.inner(), "p4ssw0rd!");
    }
}
