//! In-memory model of repository items, collections, bundles and bitstreams,
//! rendered into the Simple Archive Format (SAF) text an importer consumes.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;

#[cfg(test)]
mod testing;

pub use config::SafConfig;
pub use errors::{ErrorClass, ModelError, ModelResult};
pub use models::{
    bitstream::{ContentFile, ContentVariant, Permission, PermissionKind},
    bundle::Bundle,
    collection::{Collection, Community},
    entity::{EntityKind, ReportValue, RepositoryEntity, StatisticReport},
    item::{ContentRequest, IiifRequest, Item},
    metadata::{FieldId, MetadataStore, MetadataValue},
    relation::Relation,
};
pub use services::{
    Collaborators,
    byte_source::{ByteSource, ByteSourceError, StdByteSource},
    image_transform::{ImageTransform, ImageTransformError, RasterTransform},
};
