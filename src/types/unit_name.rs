// ABOUTME: Validated systemd unit name for services managed inside a container.
// ABOUTME: Guarantees the name can be passed to systemctl as a plain argument.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitNameError {
    #[error("unit name cannot be empty")]
    Empty,

    #[error("unit name exceeds maximum length of 255 characters")]
    TooLong,

    #[error("unit name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("invalid character in unit name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitName(String);

impl UnitName {
    pub fn new(value: &str) -> Result<Self, UnitNameError> {
        if value.is_empty() {
            return Err(UnitNameError::Empty);
        }

        if value.len() > 255 {
            return Err(UnitNameError::TooLong);
        }

        // A leading hyphen would be parsed as an option.
        if value.starts_with('-') {
            return Err(UnitNameError::StartsWithHyphen);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '@' | '_' | '.' | ':' | '-' | '\\') {
                return Err(UnitNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The unit name without its `.service` suffix.
    pub fn stem(&self) -> &str {
        self.0.strip_suffix(".service").unwrap_or(&self.0)
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UnitName {
    type Err = UnitNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for UnitName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
