//! Resource tree engine for FCI.
//!
//! A single-rooted tree of directories and files addressed by slash paths.
//! Each resource may carry a JSON object of metadata kept in a side table.
//!
//! - [`types`]: the node model and the children ordering
//! - [`repository`]: row-level reads and writes
//! - [`tree`]: path derivation and ancestor traversal
//! - [`resolver`]: path to resource lookup
//! - [`validator`]: structural rules checked before every write
//! - [`metadata`]: the metadata side store
//! - [`service`]: the operations exposed over HTTP

pub mod metadata;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod tree;
pub mod types;
pub mod validator;

pub use metadata::{decode_metadata, MetadataStore};
pub use repository::{ResourceRepository, ROOT_NAME};
pub use resolver::{split_path, Lookup, PathResolver};
pub use service::{
    CreateResource, ResourceChanges, ResourceDetail, ResourceService, ResourceView,
};
pub use tree::{ancestors, child_path, path};
pub use types::{
    children_order, Metadata, MetadataState, NewResource, Resource, ResourceKind, ResourceNode,
};
pub use validator::{Candidate, Validator, MAX_NAME_LENGTH};
