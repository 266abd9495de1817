//! Response DTOs for Web API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::datetime::format_timestamp;
use crate::resource::{Metadata, ResourceDetail, ResourceKind, ResourceView};

/// Self link of the resource at `path` under the API mount point.
pub fn resource_url(prefix: &str, path: &str) -> String {
    let encoded: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/resources/{}", prefix, encoded.join("/"))
}

/// Type-dependent wire fields: `(is_collection, size)`.
///
/// `size` is only present for files.
pub fn kind_fields(kind: &ResourceKind) -> (bool, Option<i64>) {
    match kind {
        ResourceKind::Directory => (true, None),
        ResourceKind::File { size } => (false, Some(*size)),
    }
}

/// A resource in responses, without children.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceSummary {
    /// Resource ID.
    pub id: i64,
    /// Resource name.
    pub name: String,
    /// Parent ID (null for the root).
    pub parent: Option<i64>,
    /// Creation time (ISO 8601).
    pub created: String,
    /// Last modification time (ISO 8601).
    pub modified: String,
    /// Self link.
    pub url: String,
    /// Whether this is a directory.
    pub is_collection: bool,
    /// File size (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Metadata object (`{}` if none).
    #[schema(value_type = Object)]
    pub metadata: Metadata,
}

impl ResourceSummary {
    /// Build from a resource view.
    pub fn from_view(view: ResourceView, url_prefix: &str) -> Self {
        let (is_collection, size) = kind_fields(&view.resource.kind);
        Self {
            id: view.resource.id,
            url: resource_url(url_prefix, &view.path),
            name: view.resource.name,
            parent: view.resource.parent_id,
            created: format_timestamp(&view.resource.created),
            modified: format_timestamp(&view.resource.modified),
            is_collection,
            size,
            metadata: view.metadata,
        }
    }
}

/// A resource with its direct children (directories only).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceResponse {
    /// The resource.
    #[serde(flatten)]
    pub resource: ResourceSummary,
    /// Direct children, most recently modified first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descendants: Option<Vec<ResourceSummary>>,
}

impl ResourceResponse {
    /// Build from a service result.
    pub fn from_detail(detail: ResourceDetail, url_prefix: &str) -> Self {
        Self {
            resource: ResourceSummary::from_view(detail.node, url_prefix),
            descendants: detail.descendants.map(|children| {
                children
                    .into_iter()
                    .map(|child| ResourceSummary::from_view(child, url_prefix))
                    .collect()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::parse_timestamp;
    use crate::resource::Resource;
    use serde_json::{json, Value};

    fn view(kind: ResourceKind, path: &str) -> ResourceView {
        let ts = parse_timestamp("2024-01-01T00:00:00.000000Z").unwrap();
        ResourceView {
            resource: Resource {
                id: 2,
                name: path.rsplit('/').next().unwrap_or_default().to_string(),
                kind,
                parent_id: Some(1),
                created: ts,
                modified: ts,
            },
            path: path.to_string(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_resource_url() {
        assert_eq!(resource_url("/fci", ""), "/fci/resources/");
        assert_eq!(resource_url("/fci", "dir/file.txt"), "/fci/resources/dir/file.txt");
        assert_eq!(resource_url("", "a b/c?d"), "/resources/a%20b/c%3Fd");
    }

    #[test]
    fn test_kind_fields() {
        assert_eq!(kind_fields(&ResourceKind::Directory), (true, None));
        assert_eq!(kind_fields(&ResourceKind::File { size: 9 }), (false, Some(9)));
    }

    #[test]
    fn test_file_representation() {
        let file = view(ResourceKind::File { size: 5 }, "dir/f");
        let summary = ResourceSummary::from_view(file, "/fci");
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 2,
                "name": "f",
                "parent": 1,
                "created": "2024-01-01T00:00:00.000000Z",
                "modified": "2024-01-01T00:00:00.000000Z",
                "url": "/fci/resources/dir/f",
                "is_collection": false,
                "size": 5,
                "metadata": {}
            })
        );
    }

    #[test]
    fn test_directory_representation_has_descendants() {
        let detail = ResourceDetail {
            node: view(ResourceKind::Directory, "dir"),
            descendants: Some(vec![view(ResourceKind::File { size: 0 }, "dir/f")]),
        };
        let value = serde_json::to_value(ResourceResponse::from_detail(detail, "/fci")).unwrap();

        assert_eq!(value["is_collection"], json!(true));
        assert!(value.get("size").is_none());
        assert_eq!(value["descendants"][0]["url"], json!("/fci/resources/dir/f"));
        assert!(value["descendants"][0].get("descendants").is_none());
    }

    #[test]
    fn test_file_response_has_no_descendants() {
        let detail = ResourceDetail {
            node: view(ResourceKind::File { size: 0 }, "f"),
            descendants: None,
        };
        let value = serde_json::to_value(ResourceResponse::from_detail(detail, "")).unwrap();
        assert_eq!(value.get("descendants"), None::<&Value>);
    }
}
