//! Core identifier types.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::path::PathBuf;

/// Errors produced when validating a [`PackageName`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PackageNameError {
    /// The name is empty (or whitespace only).
    #[error("Empty package name")]
    Empty,

    /// One dot-separated segment is not a valid Java identifier.
    #[error("Invalid segment '{segment}' in package name '{name}'")]
    InvalidSegment {
        /// The full name being validated.
        name: String,
        /// The offending segment.
        segment: String,
    },
}

/// An Android package (namespace) name, e.g. `com.example.widget`.
///
/// Unlike most identifiers in this workspace, package names are
/// case-sensitive and are never normalized: `com.Example` and `com.example`
/// generate different symbol classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a package name without validation (for trusted input).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Create a validated package name.
    ///
    /// Each dot-separated segment must start with an ASCII letter, `_` or `$`
    /// and continue with ASCII alphanumerics, `_` or `$`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageNameError::Empty`] for an empty name and
    /// [`PackageNameError::InvalidSegment`] for the first bad segment.
    pub fn validated(name: &str) -> Result<Self, PackageNameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PackageNameError::Empty);
        }

        for segment in name.split('.') {
            let mut chars = segment.chars();
            let valid = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
            if !valid {
                return Err(PackageNameError::InvalidSegment {
                    name: name.to_string(),
                    segment: segment.to_string(),
                });
            }
        }

        Ok(Self(name.to_string()))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative directory for Java sources of this package
    /// (`com.example.x` -> `com/example/x`).
    pub fn to_source_dir(&self) -> PathBuf {
        self.0.split('.').collect()
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::validated(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_accepts_dotted_identifiers() {
        let name = PackageName::validated("com.example.widget_2").unwrap();
        assert_eq!(name.as_str(), "com.example.widget_2");
    }

    #[test]
    fn test_validated_preserves_case() {
        let name = PackageName::validated("com.Example.Widget").unwrap();
        assert_eq!(name, "com.Example.Widget");
    }

    #[test]
    fn test_validated_rejects_bad_segments() {
        assert_eq!(PackageName::validated("  "), Err(PackageNameError::Empty));
        assert!(matches!(
            PackageName::validated("com..example"),
            Err(PackageNameError::InvalidSegment { segment, .. }) if segment.is_empty()
        ));
        assert!(matches!(
            PackageName::validated("com.1example"),
            Err(PackageNameError::InvalidSegment { segment, .. }) if segment == "1example"
        ));
        assert!(PackageName::validated("com.exa-mple").is_err());
    }

    #[test]
    fn test_source_dir() {
        let name = PackageName::new("com.example.x");
        assert_eq!(name.to_source_dir(), PathBuf::from("com/example/x"));
    }
}
