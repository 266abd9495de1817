//! Resource types for the FCI tree.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::datetime::parse_timestamp;
use crate::{FciError, Result};

/// Arbitrary key-value metadata attached to a resource.
pub type Metadata = Map<String, Value>;

/// Concrete resource type together with its type-specific fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A collection that may contain children.
    Directory,
    /// A leaf with an informational size.
    File {
        /// Size in bytes.
        size: i64,
    },
}

impl ResourceKind {
    /// Build a kind from the `is_collection` flag.
    pub fn from_is_collection(is_collection: bool, size: i64) -> Self {
        if is_collection {
            ResourceKind::Directory
        } else {
            ResourceKind::File { size }
        }
    }

    /// Whether this kind can contain children.
    pub fn is_collection(&self) -> bool {
        matches!(self, ResourceKind::Directory)
    }

    /// Stored type name, also used to key metadata records.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Directory => "directory",
            ResourceKind::File { .. } => "file",
        }
    }

    /// File size, `None` for directories.
    pub fn size(&self) -> Option<i64> {
        match self {
            ResourceKind::Directory => None,
            ResourceKind::File { size } => Some(*size),
        }
    }
}

/// A persisted node in the resource tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Unique resource ID.
    pub id: i64,
    /// Name, unique among siblings.
    pub name: String,
    /// Concrete type. Never changes after creation.
    pub kind: ResourceKind,
    /// Parent ID (None only for the root).
    pub parent_id: Option<i64>,
    /// When the resource was created.
    pub created: DateTime<Utc>,
    /// When the resource was last modified.
    pub modified: DateTime<Utc>,
}

impl Resource {
    /// Whether this resource can contain children.
    pub fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }

    /// Whether this resource is the tree root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Row shape of the `resources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ResourceRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub size: i64,
    pub parent_id: Option<i64>,
    pub created: String,
    pub modified: String,
}

impl TryFrom<ResourceRow> for Resource {
    type Error = FciError;

    fn try_from(row: ResourceRow) -> Result<Self> {
        let kind = match row.kind.as_str() {
            "directory" => ResourceKind::Directory,
            "file" => ResourceKind::File { size: row.size },
            other => {
                return Err(FciError::Integrity(format!(
                    "resource {} has unknown kind {:?}",
                    row.id, other
                )))
            }
        };

        Ok(Resource {
            id: row.id,
            name: row.name,
            kind,
            parent_id: row.parent_id,
            created: parse_timestamp(&row.created)?,
            modified: parse_timestamp(&row.modified)?,
        })
    }
}

/// Data for creating a new resource.
#[derive(Debug, Clone)]
pub struct NewResource {
    /// Resource name.
    pub name: String,
    /// Concrete type.
    pub kind: ResourceKind,
    /// Parent ID (None only for the root).
    pub parent_id: Option<i64>,
    /// Creation time; also the initial modification time.
    pub created: DateTime<Utc>,
}

impl NewResource {
    /// Create a new directory under a parent.
    pub fn directory(name: impl Into<String>, parent_id: i64) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::Directory,
            parent_id: Some(parent_id),
            created: crate::datetime::now(),
        }
    }

    /// Create a new empty file under a parent.
    pub fn file(name: impl Into<String>, parent_id: i64) -> Self {
        Self {
            name: name.into(),
            kind: ResourceKind::File { size: 0 },
            parent_id: Some(parent_id),
            created: crate::datetime::now(),
        }
    }

    /// Set the file size. No effect on directories.
    pub fn with_size(mut self, size: i64) -> Self {
        if let ResourceKind::File { .. } = self.kind {
            self.kind = ResourceKind::File { size };
        }
        self
    }

    /// Set the creation time.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }
}

/// Metadata cache state of a loaded node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MetadataState {
    /// Not read from the store yet.
    #[default]
    Unloaded,
    /// Read from the store; matches what is persisted.
    Loaded(Metadata),
    /// Assigned during this operation and not yet flushed.
    Dirty(Metadata),
}

impl MetadataState {
    /// The cached value, if any.
    pub fn value(&self) -> Option<&Metadata> {
        match self {
            MetadataState::Unloaded => None,
            MetadataState::Loaded(m) | MetadataState::Dirty(m) => Some(m),
        }
    }

    /// Whether a flush is pending.
    pub fn is_dirty(&self) -> bool {
        matches!(self, MetadataState::Dirty(_))
    }

    /// Record that a pending value has been persisted.
    pub fn mark_clean(&mut self) {
        *self = match std::mem::take(self) {
            MetadataState::Dirty(m) => MetadataState::Loaded(m),
            other => other,
        };
    }
}

/// A resource loaded for one request, with its metadata cache.
///
/// Handles are created fresh per request and never shared, so the cache
/// cannot leak between requests.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    /// The resource row.
    pub resource: Resource,
    /// Metadata cache.
    pub metadata: MetadataState,
}

impl ResourceNode {
    /// Wrap a resource with an empty cache.
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            metadata: MetadataState::Unloaded,
        }
    }

    /// Replace the metadata. Written on the next save.
    pub fn assign_metadata(&mut self, metadata: Metadata) {
        self.metadata = MetadataState::Dirty(metadata);
    }
}

/// Ordering used wherever children are listed.
///
/// Most recently modified first, then most recently created; ties keep
/// insertion order (ascending id).
pub fn children_order(a: &Resource, b: &Resource) -> Ordering {
    b.modified
        .cmp(&a.modified)
        .then_with(|| b.created.cmp(&a.created))
        .then_with(|| a.id.cmp(&b.id))
}
