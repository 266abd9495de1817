//! Structural navigation over the resource tree.

use std::collections::HashSet;
use std::pin::pin;

use futures::stream::{self, Stream, TryStreamExt};

use super::repository::ResourceRepository;
use super::types::Resource;
use crate::{FciError, Result};

/// Path separator.
pub const SEPARATOR: char = '/';

/// Lazily yield the ancestors of `resource`, from its parent up to the root.
///
/// The root itself has no ancestors. A revisited node or a dangling parent
/// reference ends the stream with an integrity error.
pub fn ancestors<'a>(
    repo: &'a ResourceRepository<'a>,
    resource: &Resource,
) -> impl Stream<Item = Result<Resource>> + 'a {
    ancestors_from(repo, resource.parent_id)
}

/// Like [`ancestors`], but starting at an arbitrary parent id.
///
/// The first item is the resource with id `first` itself. Used to check a
/// candidate parent that is not stored on the node yet.
pub fn ancestors_from<'a>(
    repo: &'a ResourceRepository<'a>,
    first: Option<i64>,
) -> impl Stream<Item = Result<Resource>> + 'a {
    stream::try_unfold((first, HashSet::new()), move |(next, mut seen)| async move {
        let Some(id) = next else {
            return Ok(None);
        };
        if !seen.insert(id) {
            return Err(FciError::Integrity(format!(
                "parent chain revisits resource {id}"
            )));
        }

        let resource = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| FciError::Integrity(format!("parent {id} does not exist")))?;
        let parent_id = resource.parent_id;
        Ok(Some((resource, (parent_id, seen))))
    })
}

/// Slash-joined names from the root to `resource`; the root maps to `""`.
pub async fn path(repo: &ResourceRepository<'_>, resource: &Resource) -> Result<String> {
    if resource.is_root() {
        return Ok(String::new());
    }

    let mut names = vec![resource.name.clone()];
    let mut chain = pin!(ancestors(repo, resource));
    while let Some(ancestor) = chain.try_next().await? {
        if !ancestor.is_root() {
            names.push(ancestor.name);
        }
    }

    names.reverse();
    Ok(names.join("/"))
}

/// Path of a child, given its parent's path.
pub fn child_path(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{parent_path}{SEPARATOR}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::types::NewResource;
    use crate::Database;

    async fn insert(db: &Database, new: NewResource) -> Resource {
        let mut conn = db.pool().acquire().await.unwrap();
        ResourceRepository::insert(&mut conn, &new).await.unwrap()
    }

    #[tokio::test]
    async fn test_path_of_nested_resource() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = ResourceRepository::new(db.pool());
        let root = repo.ensure_root().await.unwrap();

        let a = insert(&db, NewResource::directory("a", root.id)).await;
        let b = insert(&db, NewResource::directory("b", a.id)).await;
        let c = insert(&db, NewResource::file("c", b.id)).await;

        assert_eq!(path(&repo, &root).await.unwrap(), "");
        assert_eq!(path(&repo, &a).await.unwrap(), "a");
        assert_eq!(path(&repo, &c).await.unwrap(), "a/b/c");

        let parent_path = path(&repo, &b).await.unwrap();
        assert_eq!(child_path(&parent_path, &c.name), "a/b/c");
    }

    #[tokio::test]
    async fn test_ancestors_parent_to_root() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = ResourceRepository::new(db.pool());
        let root = repo.ensure_root().await.unwrap();

        let a = insert(&db, NewResource::directory("a", root.id)).await;
        let b = insert(&db, NewResource::directory("b", a.id)).await;

        let chain: Vec<Resource> = ancestors(&repo, &b).try_collect().await.unwrap();
        let ids: Vec<i64> = chain.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, root.id]);

        let none: Vec<Resource> = ancestors(&repo, &root).try_collect().await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_ancestors_detects_cycle() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = ResourceRepository::new(db.pool());
        let root = repo.ensure_root().await.unwrap();

        let a = insert(&db, NewResource::directory("a", root.id)).await;
        let b = insert(&db, NewResource::directory("b", a.id)).await;
        sqlx::query("UPDATE resources SET parent_id = ? WHERE id = ?")
            .bind(b.id)
            .bind(a.id)
            .execute(db.pool())
            .await
            .unwrap();

        let result: Result<Vec<Resource>> = ancestors(&repo, &b).try_collect().await;
        assert!(matches!(result, Err(FciError::Integrity(_))));
    }

    #[test]
    fn test_child_path_of_root() {
        assert_eq!(child_path("", "dir"), "dir");
        assert_eq!(child_path("dir", "file.txt"), "dir/file.txt");
    }
}
