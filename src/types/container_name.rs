// ABOUTME: Validated container name used for runtime names, log dirs and route paths.
// ABOUTME: Rejects anything that could escape a directory or break a URL path.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerNameError {
    #[error("container name cannot be empty")]
    Empty,

    #[error("container name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("container name must start with a letter or digit")]
    BadFirstChar,

    #[error("invalid character in container name: '{0}'")]
    InvalidChar(char),
}

/// A container name that is safe to use as a path segment.
///
/// Follows the runtime's own naming rule (`[a-zA-Z0-9][a-zA-Z0-9_.-]*`),
/// which also rules out `/`, `..` as a whole name, and whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn new(value: &str) -> Result<Self, ContainerNameError> {
        // Runtimes report names with a leading slash.
        let value = value.strip_prefix('/').unwrap_or(value);

        let mut chars = value.chars();
        let first = chars.next().ok_or(ContainerNameError::Empty)?;

        if value.len() > MAX_LEN {
            return Err(ContainerNameError::TooLong);
        }

        if !first.is_ascii_alphanumeric() {
            return Err(ContainerNameError::BadFirstChar);
        }

        if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
        {
            return Err(ContainerNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContainerName {
    type Err = ContainerNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ContainerName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContainerName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}
