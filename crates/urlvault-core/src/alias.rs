use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

const MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid alias: {0}")]
pub struct InvalidAlias(String);

/// The short key a caller chooses to look up a target URL.
///
/// Stores never validate aliases; uniqueness is the engine's job. Callers that
/// accept aliases from users go through [`Alias::new`], which only admits
/// 1-64 characters of `[a-zA-Z0-9_-]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alias(String);

impl Alias {
    /// Creates a new `Alias` after validating the input.
    pub fn new(alias: impl Into<String>) -> std::result::Result<Self, InvalidAlias> {
        let alias = alias.into();
        Self::validate(&alias)?;
        Ok(Self(alias))
    }

    /// Creates an `Alias` without validation.
    pub fn new_unchecked(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(alias: &str) -> std::result::Result<(), InvalidAlias> {
        if alias.is_empty() || alias.len() > MAX_LENGTH {
            return Err(InvalidAlias(format!(
                "length must be between 1 and {}, got {}",
                MAX_LENGTH,
                alias.len()
            )));
        }

        if !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidAlias(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                alias
            )));
        }

        Ok(())
    }
}

impl Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Alias {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
