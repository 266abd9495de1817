//! Structural validation of resource mutations.
//!
//! Every rule runs and all failures are reported together, keyed by field.

use std::pin::pin;

use futures::TryStreamExt;

use super::repository::{ResourceRepository, ROOT_NAME};
use super::tree::{ancestors_from, SEPARATOR};
use super::types::Resource;
use crate::error::FieldErrors;
use crate::Result;

/// Maximum resource name length (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Name is empty or contains the separator.
pub const INVALID_NAME: &str = "Enter a valid value.";
/// Name exceeds [`MAX_NAME_LENGTH`].
pub const NAME_TOO_LONG: &str = "Ensure this field has no more than 255 characters.";
/// A sibling already has the name.
pub const NAME_TAKEN: &str = "A resource with this name already exists in the parent.";
/// Parent is a file.
pub const PARENT_NOT_COLLECTION: &str = "Parent must be a collection";
/// Move would put a resource below itself.
pub const PARENT_OF_ITSELF: &str = "Resource is a parent of itself";
/// `is_collection` differs from the stored type.
pub const TYPE_CHANGED: &str = "Resource type cannot be changed after creation";
/// Required field missing from the request.
pub const FIELD_REQUIRED: &str = "This field is required.";
/// Explicit `null` on a field that needs a value.
pub const FIELD_NOT_NULL: &str = "This field may not be null.";
/// Negative file size.
pub const SIZE_NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

/// Message for a parent id that matches no resource.
pub fn unknown_parent(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// A resource state about to be persisted.
#[derive(Debug, Clone)]
pub struct Candidate<'c> {
    /// Stored ID, `None` for a resource being created.
    pub id: Option<i64>,
    /// Proposed name.
    pub name: &'c str,
    /// Proposed parent (`None` only for the root).
    pub parent: Option<&'c Resource>,
    /// Proposed `is_collection` value.
    pub is_collection: bool,
    /// `is_collection` as currently stored, for existing resources.
    pub stored_is_collection: Option<bool>,
}

/// Check a name against the naming rules.
///
/// Names must be non-empty, must not contain the separator and must fit
/// in [`MAX_NAME_LENGTH`] characters.
pub fn check_name(name: &str) -> Option<&'static str> {
    if name.is_empty() || name.contains(SEPARATOR) {
        Some(INVALID_NAME)
    } else if name.chars().count() > MAX_NAME_LENGTH {
        Some(NAME_TOO_LONG)
    } else {
        None
    }
}

/// Validates candidates against the tree invariants.
pub struct Validator<'a> {
    repo: ResourceRepository<'a>,
}

impl<'a> Validator<'a> {
    /// Create a validator over the given repository.
    pub fn new(repo: ResourceRepository<'a>) -> Self {
        Self { repo }
    }

    /// Run every rule and collect the failures.
    ///
    /// An empty result means the candidate is acceptable.
    pub async fn validate(&self, candidate: &Candidate<'_>) -> Result<FieldErrors> {
        let mut errors = FieldErrors::new();

        // The root keeps its reserved name.
        let name_error = if candidate.parent.is_none() && candidate.name == ROOT_NAME {
            None
        } else {
            check_name(candidate.name)
        };
        if let Some(message) = name_error {
            errors.add("name", message);
        }

        if let Some(parent) = candidate.parent {
            if !parent.is_collection() {
                errors.add("parent", PARENT_NOT_COLLECTION);
            }

            if let Some(id) = candidate.id {
                if self.is_own_ancestor(id, parent).await? {
                    errors.add("parent", PARENT_OF_ITSELF);
                }
            }

            if name_error.is_none()
                && self
                    .repo
                    .name_taken(parent.id, candidate.name, candidate.id)
                    .await?
            {
                errors.add("name", NAME_TAKEN);
            }
        }

        if let Some(stored) = candidate.stored_is_collection {
            if stored != candidate.is_collection {
                errors.add("is_collection", TYPE_CHANGED);
            }
        }

        Ok(errors)
    }

    /// Whether `id` appears in the chain starting at `parent`.
    async fn is_own_ancestor(&self, id: i64, parent: &Resource) -> Result<bool> {
        let mut chain = pin!(ancestors_from(&self.repo, Some(parent.id)));
        while let Some(ancestor) = chain.try_next().await? {
            if ancestor.id == id {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
