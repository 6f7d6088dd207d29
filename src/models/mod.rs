//! Core data model for SAF export.
//!
//! Items, collections, bundles and bitstreams all wrap a
//! [`RepositoryEntity`](entity::RepositoryEntity) that carries identity,
//! ordered metadata and statistics. Bundles own their content files; a
//! content file only refers back to its bundle by name.

pub mod bitstream;
pub mod bundle;
pub mod collection;
pub mod entity;
pub mod item;
pub mod metadata;
pub mod relation;
