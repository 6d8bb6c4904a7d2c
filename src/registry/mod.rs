//! In-memory registries of sites, mangas and chapters.
//!
//! Each registry is a cache of the authoritative rows in a [`TrackerStore`]:
//!
//! - `list` replaces the cache wholesale with what the store returns
//! - `create` prepends the stored row to the cache
//! - toggles look the row up in the cache, write through to the store and
//!   replace the cached row with the store's copy
//! - `remove` drops the row from the cache once the store confirms
//!
//! A failed store call never changes the cache. Writes made elsewhere are not
//! observed until the next `list`; nothing polls.
//!
//! [`TrackerStore`]: crate::store::TrackerStore

mod chapters;
mod mangas;
mod sites;
mod tracker;

pub use chapters::ChapterRegistry;
pub use mangas::MangaRegistry;
pub use sites::SiteRegistry;
pub use tracker::{Tracker, TrackerStats};

use thiserror::Error;

/// Failures of registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("You need to be signed in")]
    Unauthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Storage(String),
}

/// Log a failed store call and turn it into a [`RegistryError::Storage`].
fn store_failed(action: &str, e: anyhow::Error) -> RegistryError {
    tracing::warn!("Failed to {}: {:#}", action, e);
    RegistryError::Storage(format!("{:#}", e))
}

/// Outcome of a toggle on a cached row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome<T> {
    /// The store accepted the write; holds the updated row.
    Updated(T),
    /// The id is not in the local cache. Nothing was sent to the store.
    NotFound,
}

impl<T> ToggleOutcome<T> {
    pub fn updated(self) -> Option<T> {
        match self {
            Self::Updated(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Trim a required field, rejecting it if nothing is left.
fn required(value: &str, message: &str) -> Result<String, RegistryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional field. Blank values count as absent.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("  Alpha ", "Name is required").unwrap(), "Alpha");
        let err = required("   ", "Name is required").unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
    }

    #[test]
    fn blank_optional_is_absent() {
        assert_eq!(optional(Some("  ".to_string())), None);
        assert_eq!(optional(Some(" text ".to_string())), Some("text".to_string()));
        assert_eq!(optional(None), None);
    }
}
