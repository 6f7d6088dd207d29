//! External collaborators the model delegates to: byte storage/transport and
//! image measurement/reduction.

pub mod byte_source;
pub mod image_transform;

use crate::config::SafConfig;
use byte_source::ByteSource;
use image_transform::ImageTransform;
use std::time::Duration;

/// The collaborators an operation may need, plus the fetch timeout that is
/// passed through to the byte source untouched.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub bytes: &'a dyn ByteSource,
    pub images: &'a dyn ImageTransform,
    pub timeout: Duration,
}

impl<'a> Collaborators<'a> {
    pub fn new(bytes: &'a dyn ByteSource, images: &'a dyn ImageTransform, cfg: &SafConfig) -> Self {
        Self {
            bytes,
            images,
            timeout: cfg.fetch_timeout,
        }
    }
}
