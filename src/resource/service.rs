//! Resource service for FCI.
//!
//! High-level operations on the tree. Every mutation is validated in full
//! before anything is written, then the resource row and its metadata are
//! written in a single transaction.

use serde_json::Value;
use tracing::{info, warn};

use super::metadata::{decode_metadata, MetadataStore};
use super::repository::{ResourceRepository, NOT_EMPTY};
use super::resolver::PathResolver;
use super::tree::{self, child_path};
use super::types::{Metadata, NewResource, Resource, ResourceKind, ResourceNode};
use super::validator::{
    unknown_parent, Candidate, Validator, FIELD_NOT_NULL, FIELD_REQUIRED, SIZE_NEGATIVE,
};
use crate::datetime;
use crate::db::Database;
use crate::error::FieldErrors;
use crate::{FciError, Result};

/// A resource together with its derived path and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    /// The resource.
    pub resource: Resource,
    /// Path from the root (`""` for the root).
    pub path: String,
    /// Stored metadata, `{}` if none.
    pub metadata: Metadata,
}

/// A resource with its immediate children.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDetail {
    /// The addressed resource.
    pub node: ResourceView,
    /// Direct children in listing order; `None` for files.
    pub descendants: Option<Vec<ResourceView>>,
}

/// Request to create a resource under a parent.
#[derive(Debug, Clone)]
pub struct CreateResource {
    /// Name of the new resource.
    pub name: String,
    /// Whether to create a directory.
    pub is_collection: bool,
    /// File size; ignored for directories.
    pub size: i64,
    /// Initial metadata (object, encoded JSON string or null).
    pub metadata: Option<Value>,
    /// Errors found while decoding the request, reported with the rest.
    pub input_errors: FieldErrors,
}

impl CreateResource {
    /// Create a request for a directory.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_collection: true,
            size: 0,
            metadata: None,
            input_errors: FieldErrors::new(),
        }
    }

    /// Create a request for an empty file.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_collection: false,
            size: 0,
            metadata: None,
            input_errors: FieldErrors::new(),
        }
    }

    /// Set the file size.
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    /// Set the initial metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach errors found while decoding the request.
    pub fn with_input_errors(mut self, errors: FieldErrors) -> Self {
        self.input_errors = errors;
        self
    }
}

/// Changes to apply to an existing resource. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ResourceChanges {
    /// New name.
    pub name: Option<String>,
    /// New parent id; `Some(None)` is an explicit null.
    pub parent: Option<Option<i64>>,
    /// New file size; ignored for directories.
    pub size: Option<i64>,
    /// Requested `is_collection`; must match the stored type.
    pub is_collection: Option<bool>,
    /// Replacement metadata.
    pub metadata: Option<Value>,
    /// Errors found while decoding the request, reported with the rest.
    pub input_errors: FieldErrors,
}

impl ResourceChanges {
    /// Attach errors found while decoding the request.
    pub fn with_input_errors(mut self, errors: FieldErrors) -> Self {
        self.input_errors = errors;
        self
    }
}

/// Service for resource tree operations.
pub struct ResourceService<'a> {
    db: &'a Database,
}

impl<'a> ResourceService<'a> {
    /// Create a new ResourceService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn repo(&self) -> ResourceRepository<'a> {
        ResourceRepository::new(self.db.pool())
    }

    async fn resolve(&self, path: &str) -> Result<Resource> {
        PathResolver::new(self.repo()).resolve(path).await
    }

    /// Fetch a resource by path, with its children if it is a directory.
    pub async fn retrieve(&self, path: &str) -> Result<ResourceDetail> {
        let resource = self.resolve(path).await?;
        self.detail(ResourceNode::new(resource)).await
    }

    /// Create a resource under the directory at `parent_path`.
    pub async fn create(
        &self,
        parent_path: &str,
        mut request: CreateResource,
    ) -> Result<ResourceDetail> {
        let parent = self.resolve(parent_path).await?;
        let mut errors = std::mem::take(&mut request.input_errors);
        let mut rules = FieldErrors::new();

        if request.size < 0 && !request.is_collection {
            rules.add("size", SIZE_NEGATIVE);
        }
        let metadata = decode_field(request.metadata.as_ref(), &mut rules);

        let candidate = Candidate {
            id: None,
            name: &request.name,
            parent: Some(&parent),
            is_collection: request.is_collection,
            stored_is_collection: None,
        };
        rules.merge(Validator::new(self.repo()).validate(&candidate).await?);
        errors.merge_unreported(rules);
        reject_invalid("create", &request.name, errors)?;

        let new = NewResource {
            name: request.name,
            kind: ResourceKind::from_is_collection(request.is_collection, request.size),
            parent_id: Some(parent.id),
            created: datetime::now(),
        };

        let mut tx = self.db.pool().begin().await?;
        let resource = ResourceRepository::insert(&mut *tx, &new).await?;
        let mut node = ResourceNode::new(resource);
        node.assign_metadata(metadata.unwrap_or_default());
        MetadataStore::flush(&mut *tx, &mut node).await?;
        tx.commit().await?;

        info!(
            id = node.resource.id,
            parent_id = parent.id,
            kind = node.resource.kind.type_name(),
            "Created resource {}",
            node.resource.name
        );
        self.detail(node).await
    }

    /// Apply a partial update to the resource at `path`.
    pub async fn update(&self, path: &str, changes: ResourceChanges) -> Result<ResourceDetail> {
        let mut resource = self.resolve(path).await?;
        let repo = self.repo();
        let mut errors = changes.input_errors;
        let mut rules = FieldErrors::new();

        let current_parent = match resource.parent_id {
            Some(id) => repo.get_by_id(id).await?,
            None => None,
        };
        let (parent, parent_id) = match changes.parent {
            None => (current_parent, resource.parent_id),
            Some(None) if resource.is_root() => (None, None),
            Some(None) => {
                rules.add("parent", FIELD_NOT_NULL);
                (current_parent, resource.parent_id)
            }
            Some(Some(id)) => match repo.get_by_id(id).await? {
                Some(found) => (Some(found), Some(id)),
                None => {
                    rules.add("parent", unknown_parent(id));
                    (current_parent, resource.parent_id)
                }
            },
        };

        if matches!(changes.size, Some(size) if size < 0) && !resource.is_collection() {
            rules.add("size", SIZE_NEGATIVE);
        }
        let metadata = decode_field(changes.metadata.as_ref(), &mut rules);

        let name = changes.name.unwrap_or_else(|| resource.name.clone());
        let candidate = Candidate {
            id: Some(resource.id),
            name: &name,
            parent: parent.as_ref(),
            is_collection: changes.is_collection.unwrap_or(resource.is_collection()),
            stored_is_collection: Some(resource.is_collection()),
        };
        rules.merge(Validator::new(self.repo()).validate(&candidate).await?);
        errors.merge_unreported(rules);
        reject_invalid("update", &resource.name, errors)?;

        resource.name = name;
        resource.parent_id = parent_id;
        if let (ResourceKind::File { size }, Some(new_size)) = (&mut resource.kind, changes.size) {
            *size = new_size;
        }
        resource.modified = datetime::touch(&resource.modified);

        let mut node = ResourceNode::new(resource);
        if let Some(metadata) = metadata {
            node.assign_metadata(metadata);
        }

        let mut tx = self.db.pool().begin().await?;
        if !ResourceRepository::update(&mut *tx, &node.resource).await? {
            return Err(FciError::NotFound("resource".to_string()));
        }
        MetadataStore::flush(&mut *tx, &mut node).await?;
        tx.commit().await?;

        info!(
            id = node.resource.id,
            parent_id = node.resource.parent_id,
            "Updated resource {}",
            node.resource.name
        );
        self.detail(node).await
    }

    /// Full update: `name` is required and omitted metadata clears it.
    pub async fn replace(
        &self,
        path: &str,
        mut changes: ResourceChanges,
    ) -> Result<ResourceDetail> {
        if changes.name.is_none() && changes.input_errors.get("name").is_none() {
            changes.input_errors.add("name", FIELD_REQUIRED);
        }
        changes
            .metadata
            .get_or_insert_with(|| Value::Object(Metadata::new()));
        self.update(path, changes).await
    }

    /// Replace only the metadata of the resource at `path`.
    pub async fn update_metadata(&self, path: &str, metadata: Value) -> Result<ResourceDetail> {
        let changes = ResourceChanges {
            metadata: Some(metadata),
            ..Default::default()
        };
        self.update(path, changes).await
    }

    /// Delete a file or an empty directory, with its metadata.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let resource = self.resolve(path).await?;

        if resource.is_root() {
            return Err(FciError::Conflict(
                "the root directory cannot be deleted".to_string(),
            ));
        }
        if resource.is_collection() && self.repo().has_children(resource.id).await? {
            warn!(id = resource.id, "Refusing to delete non-empty directory");
            return Err(FciError::Conflict(NOT_EMPTY.to_string()));
        }

        let mut tx = self.db.pool().begin().await?;
        MetadataStore::delete_for(&mut *tx, &resource).await?;
        if !ResourceRepository::delete(&mut *tx, resource.id).await? {
            return Err(FciError::NotFound("resource".to_string()));
        }
        tx.commit().await?;

        info!(id = resource.id, "Deleted resource {}", resource.name);
        Ok(())
    }

    async fn view(&self, mut node: ResourceNode, path: String) -> Result<ResourceView> {
        let metadata = MetadataStore::new(self.db.pool())
            .load(&mut node)
            .await?
            .clone();
        Ok(ResourceView {
            resource: node.resource,
            path,
            metadata,
        })
    }

    async fn detail(&self, node: ResourceNode) -> Result<ResourceDetail> {
        let repo = self.repo();
        let path = tree::path(&repo, &node.resource).await?;

        let descendants = if node.resource.is_collection() {
            let mut views = Vec::new();
            for child in repo.children(node.resource.id).await? {
                let child_path = child_path(&path, &child.name);
                views.push(self.view(ResourceNode::new(child), child_path).await?);
            }
            Some(views)
        } else {
            None
        };

        Ok(ResourceDetail {
            node: self.view(node, path).await?,
            descendants,
        })
    }
}

/// Decode an optional metadata field, recording failures on `metadata`.
fn decode_field(value: Option<&Value>, errors: &mut FieldErrors) -> Option<Metadata> {
    match value.map(decode_metadata)? {
        Ok(metadata) => Some(metadata),
        Err(message) => {
            errors.add("metadata", message);
            None
        }
    }
}

fn reject_invalid(operation: &str, name: &str, errors: FieldErrors) -> Result<()> {
    if !errors.is_empty() {
        warn!(operation, name, errors = %errors, "Rejected resource mutation");
    }
    errors.into_result()
}
