//! Resource repository for FCI.
//!
//! Reads go through the shared pool. Writes take a connection so the caller
//! can group them with metadata writes in one transaction.

use sqlx::SqliteConnection;
use tracing::info;

use super::types::{children_order, NewResource, Resource, ResourceKind, ResourceRow};
use super::validator::NAME_TAKEN;
use crate::datetime::{format_timestamp, now};
use crate::db::DbPool;
use crate::error::FieldErrors;
use crate::{FciError, Result};

/// Name given to the root directory.
pub const ROOT_NAME: &str = "/";

/// Conflict message for deleting a directory that has children.
pub const NOT_EMPTY: &str = "directory is not empty";

/// Map a `(name, parent_id)` uniqueness violation to a validation error.
fn map_write_error(e: sqlx::Error) -> FciError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return FciError::Validation(FieldErrors::single("name", NAME_TAKEN));
        }
    }
    FciError::from(e)
}

/// Repository for resource tree operations.
pub struct ResourceRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ResourceRepository<'a> {
    /// Create a new ResourceRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a resource by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Resource>> {
        let row = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, name, kind, size, parent_id, created, modified
             FROM resources WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Resource::try_from).transpose()
    }

    /// Get the root resource.
    pub async fn root(&self) -> Result<Option<Resource>> {
        let row = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, name, kind, size, parent_id, created, modified
             FROM resources WHERE parent_id IS NULL",
        )
        .fetch_optional(self.pool)
        .await?;

        row.map(Resource::try_from).transpose()
    }

    /// Get the root resource, creating it on first use.
    pub async fn ensure_root(&self) -> Result<Resource> {
        if let Some(root) = self.root().await? {
            return Ok(root);
        }

        let created = format_timestamp(&now());
        let inserted = sqlx::query(
            "INSERT INTO resources (name, kind, size, parent_id, created, modified)
             VALUES (?, 'directory', 0, NULL, ?, ?)",
        )
        .bind(ROOT_NAME)
        .bind(&created)
        .bind(&created)
        .execute(self.pool)
        .await;

        match inserted {
            Ok(_) => info!("Created root directory"),
            // Another caller created it first.
            Err(sqlx::Error::Database(ref e)) if e.is_unique_violation() => {}
            Err(e) => return Err(e.into()),
        }

        self.root()
            .await?
            .ok_or_else(|| FciError::Integrity("root directory missing".to_string()))
    }

    /// Find a child of the given type by name.
    pub async fn find_child(
        &self,
        parent_id: i64,
        name: &str,
        kind: &str,
    ) -> Result<Option<Resource>> {
        let row = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, name, kind, size, parent_id, created, modified
             FROM resources WHERE parent_id = ? AND name = ? AND kind = ?",
        )
        .bind(parent_id)
        .bind(name)
        .bind(kind)
        .fetch_optional(self.pool)
        .await?;

        row.map(Resource::try_from).transpose()
    }

    /// List the direct children of a resource, ordered by [`children_order`].
    pub async fn children(&self, parent_id: i64) -> Result<Vec<Resource>> {
        let rows = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, name, kind, size, parent_id, created, modified
             FROM resources WHERE parent_id = ?",
        )
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;

        let mut children = rows
            .into_iter()
            .map(Resource::try_from)
            .collect::<Result<Vec<_>>>()?;
        children.sort_by(children_order);
        Ok(children)
    }

    /// Check whether a resource has any children.
    pub async fn has_children(&self, id: i64) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE parent_id = ?")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Check whether a sibling other than `exclude_id` already uses `name`.
    pub async fn name_taken(
        &self,
        parent_id: i64,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM resources WHERE parent_id = ? AND name = ? AND id != ?",
        )
        .bind(parent_id)
        .bind(name)
        .bind(exclude_id.unwrap_or(-1))
        .fetch_one(self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Insert a new resource.
    ///
    /// A sibling name collision is reported as a validation error on `name`.
    pub async fn insert(conn: &mut SqliteConnection, new: &NewResource) -> Result<Resource> {
        let created = format_timestamp(&new.created);
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO resources (name, kind, size, parent_id, created, modified)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&new.name)
        .bind(new.kind.type_name())
        .bind(new.kind.size().unwrap_or(0))
        .bind(new.parent_id)
        .bind(&created)
        .bind(&created)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_write_error)?;

        Ok(Resource {
            id,
            name: new.name.clone(),
            kind: new.kind,
            parent_id: new.parent_id,
            created: new.created,
            modified: new.created,
        })
    }

    /// Write the mutable fields of a resource back to the store.
    ///
    /// The stored kind is never touched. Returns false if the row is gone.
    pub async fn update(conn: &mut SqliteConnection, resource: &Resource) -> Result<bool> {
        let size = match resource.kind {
            ResourceKind::File { size } => size,
            ResourceKind::Directory => 0,
        };

        let result = sqlx::query(
            "UPDATE resources SET name = ?, parent_id = ?, size = ?, modified = ? WHERE id = ?",
        )
        .bind(&resource.name)
        .bind(resource.parent_id)
        .bind(size)
        .bind(format_timestamp(&resource.modified))
        .bind(resource.id)
        .execute(&mut *conn)
        .await
        .map_err(map_write_error)?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a resource row. Returns false if it did not exist.
    ///
    /// A row that still has children is refused with a conflict.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    FciError::Conflict(NOT_EMPTY.to_string())
                }
                e => FciError::from(e),
            })?;
        Ok(result.rows_affected() > 0)
    }
}
