//! Path resolution: map a slash-delimited path to a resource.

use tracing::debug;

use super::repository::ResourceRepository;
use super::tree::SEPARATOR;
use super::types::{Resource, ResourceKind};
use crate::{FciError, Result};

/// Outcome of a path lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The path addresses this resource.
    Found(Resource),
    /// A segment before the last one matched no directory.
    MissingIntermediate(String),
    /// All directories resolved but the last segment matched nothing.
    MissingLeaf(String),
}

/// Split a path into its segments.
///
/// Leading and trailing separators are ignored; an empty path has no
/// segments and addresses the root.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split(SEPARATOR).collect()
    }
}

/// Resolves paths by walking the tree one segment at a time.
pub struct PathResolver<'a> {
    repo: ResourceRepository<'a>,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver over the given repository.
    pub fn new(repo: ResourceRepository<'a>) -> Self {
        Self { repo }
    }

    /// Look up a path, classifying any failure.
    pub async fn lookup(&self, path: &str) -> Result<Lookup> {
        let segments = split_path(path);
        let root = self
            .repo
            .root()
            .await?
            .ok_or_else(|| FciError::Integrity("root directory missing".to_string()))?;

        let Some((leaf, intermediate)) = segments.split_last() else {
            return Ok(Lookup::Found(root));
        };

        let mut current = root;
        for segment in intermediate {
            match self.find(&current, segment, ResourceKind::Directory).await? {
                Some(dir) => current = dir,
                None => {
                    debug!(path, segment, "Intermediate path segment not found");
                    return Ok(Lookup::MissingIntermediate((*segment).to_string()));
                }
            }
        }

        if let Some(dir) = self.find(&current, leaf, ResourceKind::Directory).await? {
            return Ok(Lookup::Found(dir));
        }
        if let Some(file) = self.find(&current, leaf, ResourceKind::File { size: 0 }).await? {
            return Ok(Lookup::Found(file));
        }

        debug!(path, segment = leaf, "Leaf path segment not found");
        Ok(Lookup::MissingLeaf((*leaf).to_string()))
    }

    /// Resolve a path to a resource, or fail with `NotFound`.
    pub async fn resolve(&self, path: &str) -> Result<Resource> {
        match self.lookup(path).await? {
            Lookup::Found(resource) => Ok(resource),
            Lookup::MissingIntermediate(_) | Lookup::MissingLeaf(_) => {
                Err(FciError::NotFound("resource".to_string()))
            }
        }
    }

    async fn find(
        &self,
        parent: &Resource,
        name: &str,
        kind: ResourceKind,
    ) -> Result<Option<Resource>> {
        self.repo.find_child(parent.id, name, kind.type_name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tree;
    use crate::resource::types::NewResource;
    use crate::Database;

    struct Fixture {
        db: Database,
        root: Resource,
        dir: Resource,
        nested: Resource,
        file: Resource,
    }

    async fn insert(db: &Database, new: NewResource) -> Resource {
        let mut conn = db.pool().acquire().await.unwrap();
        ResourceRepository::insert(&mut conn, &new).await.unwrap()
    }

    /// root/{dir/{nested/, file.txt}}
    async fn fixture() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let root = ResourceRepository::new(db.pool()).ensure_root().await.unwrap();
        let dir = insert(&db, NewResource::directory("dir", root.id)).await;
        let nested = insert(&db, NewResource::directory("nested", dir.id)).await;
        let file = insert(&db, NewResource::file("file.txt", dir.id)).await;
        Fixture {
            db,
            root,
            dir,
            nested,
            file,
        }
    }

    #[test]
    fn test_split_path() {
        assert!(split_path("").is_empty());
        assert!(split_path("/").is_empty());
        assert_eq!(split_path("a"), vec!["a"]);
        assert_eq!(split_path("/a/b/"), vec!["a", "b"]);
        assert_eq!(split_path("a//b"), vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn test_resolve_root() {
        let f = fixture().await;
        let resolver = PathResolver::new(ResourceRepository::new(f.db.pool()));

        assert_eq!(resolver.resolve("").await.unwrap().id, f.root.id);
        assert_eq!(resolver.resolve("/").await.unwrap().id, f.root.id);
    }

    #[tokio::test]
    async fn test_resolve_directories_and_files() {
        let f = fixture().await;
        let resolver = PathResolver::new(ResourceRepository::new(f.db.pool()));

        assert_eq!(resolver.resolve("dir").await.unwrap().id, f.dir.id);
        assert_eq!(resolver.resolve("/dir/").await.unwrap().id, f.dir.id);
        assert_eq!(resolver.resolve("dir/nested").await.unwrap().id, f.nested.id);
        assert_eq!(resolver.resolve("dir/file.txt").await.unwrap().id, f.file.id);
    }

    #[tokio::test]
    async fn test_resolve_own_path_roundtrip() {
        let f = fixture().await;
        let repo = ResourceRepository::new(f.db.pool());
        let resolver = PathResolver::new(ResourceRepository::new(f.db.pool()));

        for resource in [&f.root, &f.dir, &f.nested, &f.file] {
            let path = tree::path(&repo, resource).await.unwrap();
            assert_eq!(resolver.resolve(&path).await.unwrap().id, resource.id);
        }
    }

    #[tokio::test]
    async fn test_missing_leaf() {
        let f = fixture().await;
        let resolver = PathResolver::new(ResourceRepository::new(f.db.pool()));

        assert_eq!(
            resolver.lookup("dir/missing").await.unwrap(),
            Lookup::MissingLeaf("missing".to_string())
        );
        assert!(matches!(
            resolver.resolve("dir/missing").await,
            Err(FciError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_intermediate() {
        let f = fixture().await;
        let resolver = PathResolver::new(ResourceRepository::new(f.db.pool()));

        assert_eq!(
            resolver.lookup("nope/nested").await.unwrap(),
            Lookup::MissingIntermediate("nope".to_string())
        );
    }

    #[tokio::test]
    async fn test_file_as_intermediate_segment() {
        let f = fixture().await;
        let resolver = PathResolver::new(ResourceRepository::new(f.db.pool()));

        assert_eq!(
            resolver.lookup("dir/file.txt/child").await.unwrap(),
            Lookup::MissingIntermediate("file.txt".to_string())
        );
    }

    #[tokio::test]
    async fn test_directory_preferred_over_file() {
        let f = fixture().await;
        // A root-level file sharing a name with a nested directory.
        insert(&f.db, NewResource::file("nested", f.root.id)).await;
        let resolver = PathResolver::new(ResourceRepository::new(f.db.pool()));

        let found = resolver.resolve("nested").await.unwrap();
        assert!(!found.is_collection());
        assert_eq!(found.parent_id, Some(f.root.id));

        let found = resolver.resolve("dir/nested").await.unwrap();
        assert_eq!(found.id, f.nested.id);
    }
}
