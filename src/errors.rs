//! Error types shared by the entity model and its collaborators.

use crate::services::{byte_source::ByteSourceError, image_transform::ImageTransformError};
use std::path::PathBuf;
use thiserror::Error;

/// Broad failure classes. Callers decide what to do by class:
/// validation errors need new input, state errors are contract violations,
/// resource errors come from the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    State,
    Resource,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("metadata field `{0}` must use the format <schema>.<element>[.<qualifier>]")]
    InvalidFieldFormat(String),
    #[error("bundle name `{0}` invalid: expected a non-empty name or a uuid")]
    InvalidBundleName(String),
    #[error("permission kind `{0}` invalid: expected `r`/`read` or `w`/`write`")]
    InvalidPermissionKind(String),
    #[error("position {position} of `{field}` is out of range ({len} values)")]
    PositionOutOfRange {
        field: String,
        position: usize,
        len: usize,
    },
    #[error("target position {position} of `{field}` is out of range ({len} values)")]
    InvalidTargetPosition {
        field: String,
        position: isize,
        len: usize,
    },
    #[error("relations can only be added to entity items (missing `dspace.entity.type`)")]
    NotAnEntity,
    #[error("cannot compare objects without a uuid or handle")]
    IncomparableEntities,
    #[error("cannot compare a {left} content file with a {right} content file")]
    IncomparableVariants {
        left: &'static str,
        right: &'static str,
    },
    #[error("`{0}` is not an image content file")]
    NotImageContent(String),
    #[error("bitstream `{0}` not found in bundle")]
    BitstreamNotFound(String),
    #[error("file `{}` already exists", .0.display())]
    FileAlreadyExists(PathBuf),
    #[error("size of `{0}` is unavailable")]
    SizeUnavailable(String),
    #[error(transparent)]
    ByteSource(#[from] ByteSourceError),
    #[error(transparent)]
    ImageTransform(#[from] ImageTransformError),
}

impl ModelError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ModelError::InvalidFieldFormat(_)
            | ModelError::InvalidBundleName(_)
            | ModelError::InvalidPermissionKind(_) => ErrorClass::Validation,
            ModelError::PositionOutOfRange { .. }
            | ModelError::InvalidTargetPosition { .. }
            | ModelError::NotAnEntity
            | ModelError::IncomparableEntities
            | ModelError::IncomparableVariants { .. }
            | ModelError::NotImageContent(_)
            | ModelError::BitstreamNotFound(_) => ErrorClass::State,
            ModelError::FileAlreadyExists(_)
            | ModelError::SizeUnavailable(_)
            | ModelError::ByteSource(_)
            | ModelError::ImageTransform(_) => ErrorClass::Resource,
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
