//! Metadata side store.
//!
//! Records are keyed by `(type name, id)` rather than a foreign key. An empty
//! map is never stored: a missing record reads as `{}` and assigning `{}`
//! removes the record.

use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::debug;

use super::types::{Metadata, MetadataState, Resource, ResourceNode};
use crate::db::DbPool;
use crate::{FciError, Result};

/// Message for an encoded string that is not JSON.
pub const METADATA_INVALID_JSON: &str = "Value must be valid JSON.";
/// Message for metadata that is not an object.
pub const METADATA_NOT_OBJECT: &str = "Expected a JSON object.";

/// Decode a metadata value from the wire.
///
/// Accepts an object, `null` (empty), or a string holding the encoding of
/// either. Errors are user-facing messages.
pub fn decode_metadata(value: &Value) -> std::result::Result<Metadata, &'static str> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Metadata::new()),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Ok(Metadata::new()),
            Ok(_) => Err(METADATA_NOT_OBJECT),
            Err(_) => Err(METADATA_INVALID_JSON),
        },
        _ => Err(METADATA_NOT_OBJECT),
    }
}

/// Reads and writes metadata records.
pub struct MetadataStore<'a> {
    pool: &'a DbPool,
}

impl<'a> MetadataStore<'a> {
    /// Create a new MetadataStore with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Metadata of a node, read from the store only on first access.
    pub async fn load<'n>(&self, node: &'n mut ResourceNode) -> Result<&'n Metadata> {
        if matches!(node.metadata, MetadataState::Unloaded) {
            let data = self.fetch(&node.resource).await?;
            node.metadata = MetadataState::Loaded(data);
        }

        node.metadata
            .value()
            .ok_or_else(|| FciError::Integrity("metadata cache left unloaded".to_string()))
    }

    async fn fetch(&self, resource: &Resource) -> Result<Metadata> {
        let data: Option<String> = sqlx::query_scalar(
            "SELECT data FROM metadata WHERE resource_type = ? AND object_id = ?",
        )
        .bind(resource.kind.type_name())
        .bind(resource.id)
        .fetch_optional(self.pool)
        .await?;

        match data {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Ok(Metadata::new()),
        }
    }

    /// Persist a pending assignment.
    ///
    /// Does nothing unless the node's metadata is dirty. A non-empty map is
    /// upserted; an empty one deletes the record.
    pub async fn flush(conn: &mut SqliteConnection, node: &mut ResourceNode) -> Result<()> {
        let MetadataState::Dirty(data) = &node.metadata else {
            return Ok(());
        };
        let resource = &node.resource;

        if data.is_empty() {
            Self::delete_for(&mut *conn, resource).await?;
        } else {
            sqlx::query(
                "INSERT INTO metadata (resource_type, object_id, data) VALUES (?, ?, ?)
                 ON CONFLICT(resource_type, object_id) DO UPDATE SET data = excluded.data",
            )
            .bind(resource.kind.type_name())
            .bind(resource.id)
            .bind(serde_json::to_string(data)?)
            .execute(&mut *conn)
            .await?;
            debug!(id = resource.id, keys = data.len(), "Stored metadata");
        }

        node.metadata.mark_clean();
        Ok(())
    }

    /// Remove the record of a resource, if any.
    pub async fn delete_for(conn: &mut SqliteConnection, resource: &Resource) -> Result<bool> {
        let result = sqlx::query("DELETE FROM metadata WHERE resource_type = ? AND object_id = ?")
            .bind(resource.kind.type_name())
            .bind(resource.id)
            .execute(&mut *conn)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!(id = resource.id, "Deleted metadata");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::repository::ResourceRepository;
    use crate::resource::types::NewResource;
    use crate::Database;
    use serde_json::json;

    async fn setup() -> (Database, ResourceNode) {
        let db = Database::open_in_memory().await.unwrap();
        let root = ResourceRepository::new(db.pool()).ensure_root().await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let file = ResourceRepository::insert(&mut conn, &NewResource::file("a", root.id))
            .await
            .unwrap();
        drop(conn);
        (db, ResourceNode::new(file))
    }

    fn map(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    async fn record_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM metadata")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn assign_and_flush(db: &Database, node: &mut ResourceNode, data: Metadata) {
        node.assign_metadata(data);
        let mut conn = db.pool().acquire().await.unwrap();
        MetadataStore::flush(&mut conn, node).await.unwrap();
    }

    #[test]
    fn test_decode_metadata() {
        assert_eq!(decode_metadata(&json!({"a": "b"})), Ok(map(json!({"a": "b"}))));
        assert_eq!(decode_metadata(&json!("{\"a\": \"b\"}")), Ok(map(json!({"a": "b"}))));
        assert_eq!(decode_metadata(&Value::Null), Ok(Metadata::new()));
        assert_eq!(decode_metadata(&json!("null")), Ok(Metadata::new()));
        assert_eq!(decode_metadata(&json!("{not json")), Err(METADATA_INVALID_JSON));
        assert_eq!(decode_metadata(&json!("[1, 2]")), Err(METADATA_NOT_OBJECT));
        assert_eq!(decode_metadata(&json!(42)), Err(METADATA_NOT_OBJECT));
    }

    #[tokio::test]
    async fn test_load_absent_is_empty() {
        let (db, mut node) = setup().await;
        let store = MetadataStore::new(db.pool());

        assert!(store.load(&mut node).await.unwrap().is_empty());
        assert_eq!(node.metadata, MetadataState::Loaded(Metadata::new()));
        assert_eq!(record_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_create_then_update_in_place() {
        let (db, mut node) = setup().await;

        assign_and_flush(&db, &mut node, map(json!({"a": "b"}))).await;
        assert!(!node.metadata.is_dirty());
        assert_eq!(record_count(&db).await, 1);

        assign_and_flush(&db, &mut node, map(json!({"a": "c", "n": 1}))).await;
        assert_eq!(record_count(&db).await, 1);

        let mut fresh = ResourceNode::new(node.resource.clone());
        let loaded = MetadataStore::new(db.pool()).load(&mut fresh).await.unwrap();
        assert_eq!(loaded, &map(json!({"a": "c", "n": 1})));
    }

    #[tokio::test]
    async fn test_empty_assignment_deletes_record() {
        let (db, mut node) = setup().await;
        assign_and_flush(&db, &mut node, map(json!({"a": "b"}))).await;

        assign_and_flush(&db, &mut node, Metadata::new()).await;
        assert_eq!(record_count(&db).await, 0);

        let mut fresh = ResourceNode::new(node.resource.clone());
        let loaded = MetadataStore::new(db.pool()).load(&mut fresh).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_empty_assignment_without_record() {
        let (db, mut node) = setup().await;
        assign_and_flush(&db, &mut node, Metadata::new()).await;
        assert_eq!(record_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_flush_skips_clean_node() {
        let (db, mut node) = setup().await;
        node.metadata = MetadataState::Loaded(map(json!({"a": "b"})));

        let mut conn = db.pool().acquire().await.unwrap();
        MetadataStore::flush(&mut conn, &mut node).await.unwrap();
        drop(conn);
        assert_eq!(record_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_load_uses_cache() {
        let (db, mut node) = setup().await;
        assign_and_flush(&db, &mut node, map(json!({"a": "b"}))).await;

        sqlx::query("DELETE FROM metadata").execute(db.pool()).await.unwrap();

        let store = MetadataStore::new(db.pool());
        assert_eq!(store.load(&mut node).await.unwrap(), &map(json!({"a": "b"})));
    }

    #[tokio::test]
    async fn test_records_keyed_by_type() {
        let (db, mut file) = setup().await;
        assign_and_flush(&db, &mut file, map(json!({"kind": "file"}))).await;

        // A directory sharing the file's id must not see its metadata.
        let mut dir = ResourceNode::new(Resource {
            kind: crate::resource::types::ResourceKind::Directory,
            ..file.resource.clone()
        });
        let loaded = MetadataStore::new(db.pool()).load(&mut dir).await.unwrap();
        assert!(loaded.is_empty());
    }
}
