/*!
Collection descriptors and the record type fetched from the remote store.
*/

use crate::{Result, SnapvaultError};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// One row of a remote collection.
///
/// The engine never interprets the fields; it only counts and bundles records.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Collections snapshotted when no explicit list is configured.
pub const DEFAULT_COLLECTIONS: &[&str] = &["weeks", "week_reviews", "user_settings"];

/// Identifies one remote collection to snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CollectionDescriptor {
    name: String,
}

impl CollectionDescriptor {
    /// Create a descriptor, rejecting names that cannot be embedded in a request path
    ///
    /// # Example
    /// ```rust
    /// use snapvault_core::CollectionDescriptor;
    ///
    /// let weeks = CollectionDescriptor::new("weeks")?;
    /// assert_eq!(weeks.name(), "weeks");
    /// assert!(CollectionDescriptor::new("weeks?select=id").is_err());
    /// # Ok::<(), snapvault_core::SnapvaultError>(())
    /// ```
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SnapvaultError::configuration(
                "collection name cannot be empty",
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SnapvaultError::configuration(format!(
                "invalid collection name '{name}': only letters, digits and '_' are allowed"
            )));
        }
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The built-in collection set
    pub fn defaults() -> Vec<Self> {
        DEFAULT_COLLECTIONS
            .iter()
            .map(|name| Self {
                name: (*name).to_string(),
            })
            .collect()
    }

    /// Parse a comma-separated list such as `weeks,user_settings`
    ///
    /// Surrounding whitespace and empty segments are ignored.
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        let descriptors = list
            .split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(Self::new)
            .collect::<Result<Vec<_>>>()?;

        ensure_unique(&descriptors)?;
        Ok(descriptors)
    }
}

impl fmt::Display for CollectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Fail if the same collection is named twice
pub fn ensure_unique(descriptors: &[CollectionDescriptor]) -> Result<()> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if !seen.insert(descriptor.name()) {
            return Err(SnapvaultError::configuration(format!(
                "collection '{descriptor}' is configured more than once"
            )));
        }
    }
    Ok(())
}
