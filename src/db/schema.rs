//! Database schema and migrations for FCI.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: resource tree
    r#"
CREATE TABLE resources (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL CHECK (kind IN ('directory', 'file')),
    size        INTEGER NOT NULL DEFAULT 0 CHECK (size >= 0),
    parent_id   INTEGER REFERENCES resources(id),
    created     TEXT NOT NULL,
    modified    TEXT NOT NULL,
    UNIQUE(name, parent_id)
);

CREATE INDEX idx_resources_parent_id ON resources(parent_id);

-- NULL parents never collide under UNIQUE(name, parent_id), so the single
-- root is enforced separately.
CREATE UNIQUE INDEX idx_resources_single_root
    ON resources(IFNULL(parent_id, 0)) WHERE parent_id IS NULL;
"#,
    // v2: metadata side table, keyed by concrete resource type and id
    r#"
CREATE TABLE metadata (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_type   TEXT NOT NULL,
    object_id       INTEGER NOT NULL,
    data            TEXT NOT NULL,
    UNIQUE(resource_type, object_id)
);
"#,
];
