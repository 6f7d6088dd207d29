//! Content files (bitstreams) and their SAF `contents` description lines.
//!
//! A content file is either `Plain` or an `ImageDerivative` carrying IIIF
//! viewer information. The derivative attributes live in the metadata store
//! under the `iiif.*` fields so they travel with the generic export.

use crate::{
    errors::{ModelError, ModelResult},
    models::{
        entity::{EntityKind, RepositoryEntity},
        metadata::{FieldId, MetadataValue},
    },
    services::{
        Collaborators,
        byte_source::{ByteSource, ByteSourceError},
    },
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::{debug, info, warn};

pub const TITLE_FIELD: &str = "dc.title";
pub const DESCRIPTION_FIELD: &str = "dc.description";
pub const IIIF_LABEL_FIELD: &str = "iiif.label";
pub const IIIF_TOC_FIELD: &str = "iiif.toc";
pub const IIIF_WIDTH_FIELD: &str = "iiif.image.width";
pub const IIIF_HEIGHT_FIELD: &str = "iiif.image.height";

const CHECKSUM_ALGORITHM: &str = "MD5";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Read,
    Write,
}

impl FromStr for PermissionKind {
    type Err = ModelError;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "r" | "read" => Ok(PermissionKind::Read),
            "w" | "write" => Ok(PermissionKind::Write),
            other => Err(ModelError::InvalidPermissionKind(other.to_string())),
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermissionKind::Read => "r",
            PermissionKind::Write => "w",
        })
    }
}

/// Access granted to a group on one content file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Permission {
    pub kind: PermissionKind,
    pub group: String,
}

/// Non-owning reference to the bundle that holds a content file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleRef {
    pub name: String,
    pub uuid: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checksum {
    pub value: String,
    pub algorithm: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentVariant {
    Plain,
    /// `applied_factor` is set once the in-memory bytes were reduced.
    ImageDerivative { applied_factor: Option<u32> },
}

impl ContentVariant {
    fn label(&self) -> &'static str {
        match self {
            ContentVariant::Plain => "plain",
            ContentVariant::ImageDerivative { .. } => "image",
        }
    }
}

/// Where the bytes of a content file live.
#[derive(Debug, PartialEq, Eq)]
pub enum Locator<'a> {
    Remote(&'a str),
    Local(PathBuf),
}

#[derive(Clone, Debug)]
pub struct ContentFile {
    pub entity: RepositoryEntity,
    file_name: String,
    /// Directory holding the file, or the full URL of a remote file.
    path: String,
    bundle: Option<BundleRef>,
    permissions: Vec<Permission>,
    /// Marks the primary bitstream of an item.
    pub primary: bool,
    /// Whether the file is listed in the item's `contents` file.
    pub show: bool,
    size_bytes: Option<u64>,
    checksum: Option<Checksum>,
    content: Option<Bytes>,
    variant: ContentVariant,
}

impl ContentFile {
    fn with_variant(name: &str, path: &str, variant: ContentVariant) -> Self {
        let mut entity = RepositoryEntity::new("", "", name).with_kind(EntityKind::Bitstream);
        if !name.is_empty() {
            entity.metadata.push(FieldId::dc_title(), MetadataValue::new(name, None));
        }
        Self {
            entity,
            file_name: name.to_string(),
            path: path.to_string(),
            bundle: None,
            permissions: Vec::new(),
            primary: false,
            show: true,
            size_bytes: None,
            checksum: None,
            content: None,
            variant,
        }
    }

    pub fn new(name: &str, path: &str) -> Self {
        Self::with_variant(name, path, ContentVariant::Plain)
    }

    /// An image content file that can carry IIIF derivative information.
    pub fn image(name: &str, path: &str) -> Self {
        Self::with_variant(
            name,
            path,
            ContentVariant::ImageDerivative {
                applied_factor: None,
            },
        )
    }

    pub fn with_uuid(mut self, uuid: &str) -> Self {
        self.entity.uuid = (!uuid.is_empty()).then(|| uuid.to_string());
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// Preload the payload instead of reading it from `path`.
    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_checksum(mut self, value: &str, algorithm: &str) -> Self {
        self.checksum = Some(Checksum {
            value: value.to_string(),
            algorithm: algorithm.to_string(),
        });
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn variant(&self) -> &ContentVariant {
        &self.variant
    }

    pub fn is_image(&self) -> bool {
        matches!(self.variant, ContentVariant::ImageDerivative { .. })
    }

    pub fn bundle(&self) -> Option<&BundleRef> {
        self.bundle.as_ref()
    }

    pub fn bundle_name(&self) -> Option<&str> {
        self.bundle.as_ref().map(|b| b.name.as_str())
    }

    pub(crate) fn set_bundle(&mut self, bundle: BundleRef) {
        self.bundle = Some(bundle);
    }

    pub(crate) fn clear_bundle(&mut self) {
        self.bundle = None;
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    /// Bitstreams are only identified by uuid, never by handle.
    pub fn identifier(&self) -> Option<&str> {
        self.entity.uuid.as_deref()
    }

    pub fn add_description(
        &mut self,
        description: &str,
        language: Option<&str>,
    ) -> ModelResult<()> {
        self.entity.add_metadata(DESCRIPTION_FIELD, description, language)
    }

    pub fn description(&self) -> Option<&str> {
        self.entity.get_first_metadata_value(DESCRIPTION_FIELD)
    }

    /// Grant `kind` (`r`/`read` or `w`/`write`) to `group`.
    pub fn add_permission(&mut self, kind: &str, group: &str) -> ModelResult<()> {
        let kind = kind.parse()?;
        self.permissions.push(Permission {
            kind,
            group: group.to_string(),
        });
        Ok(())
    }

    pub fn is_remote(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }

    pub fn locator(&self) -> Locator<'_> {
        if self.is_remote() {
            Locator::Remote(&self.path)
        } else {
            Locator::Local(Path::new(&self.path).join(&self.file_name))
        }
    }

    /// Current payload: in-memory content if present, else from the source.
    pub fn fetch_bytes(&self, source: &dyn ByteSource, timeout: Duration) -> ModelResult<Bytes> {
        if let Some(content) = &self.content {
            return Ok(content.clone());
        }
        let bytes = match self.locator() {
            Locator::Remote(url) => source.fetch(url, timeout)?,
            Locator::Local(path) => source.read_local(&path)?,
        };
        Ok(bytes)
    }

    /// Write the payload to `directory/<file name>`.
    ///
    /// Checks for an existing file before writing anything; two persists to
    /// the same destination must not run concurrently.
    pub fn persist_to(
        &self,
        directory: &Path,
        source: &dyn ByteSource,
        timeout: Duration,
    ) -> ModelResult<PathBuf> {
        let destination = directory.join(&self.file_name);
        if source.exists(&destination) {
            return Err(ModelError::FileAlreadyExists(destination));
        }
        let bytes = self.fetch_bytes(source, timeout)?;
        source
            .write_local(&destination, &bytes)
            .map_err(|err| match err {
                ByteSourceError::AlreadyExists(path) => ModelError::FileAlreadyExists(path),
                other => ModelError::ByteSource(other),
            })?;
        info!("persisted {} ({} bytes)", destination.display(), bytes.len());
        Ok(destination)
    }

    /// Store `explicit`, or ask the source for the size.
    pub fn compute_size(
        &mut self,
        explicit: Option<u64>,
        source: &dyn ByteSource,
    ) -> ModelResult<u64> {
        let size = match explicit {
            Some(size) => size,
            None => {
                let measured = match self.locator() {
                    Locator::Remote(url) => source.head_size(url),
                    Locator::Local(path) => source.local_size(&path),
                };
                measured.map_err(|err| match err {
                    ByteSourceError::Unavailable(_) | ByteSourceError::NotFound(_) => {
                        ModelError::SizeUnavailable(self.file_name.clone())
                    }
                    other => ModelError::ByteSource(other),
                })?
            }
        };
        debug!("size of {} is {} bytes", self.file_name, size);
        self.size_bytes = Some(size);
        Ok(size)
    }

    /// MD5 of the current payload, stored as the file checksum.
    pub fn compute_checksum(
        &mut self,
        source: &dyn ByteSource,
        timeout: Duration,
    ) -> ModelResult<&Checksum> {
        let bytes = self.fetch_bytes(source, timeout)?;
        let digest = md5::compute(&bytes);
        let checksum = self.checksum.insert(Checksum {
            value: format!("{:x}", digest),
            algorithm: CHECKSUM_ALGORITHM.to_string(),
        });
        Ok(&*checksum)
    }

    /// Measure the image and record IIIF viewer metadata.
    ///
    /// When `target_width` is non-zero and smaller than the natural width the
    /// payload is replaced by a copy reduced by `natural / target` (floored).
    /// The recorded width and height are always the natural ones.
    pub fn add_derivative(
        &mut self,
        label: &str,
        toc: &str,
        target_width: u32,
        collab: Collaborators<'_>,
    ) -> ModelResult<(u32, u32)> {
        if !self.is_image() {
            return Err(ModelError::NotImageContent(self.file_name.clone()));
        }
        let bytes = self.fetch_bytes(collab.bytes, collab.timeout)?;
        let (width, height) = collab.images.dimensions(&bytes)?;

        if target_width != 0 && target_width < width {
            let factor = width / target_width;
            let reduced = collab.images.downscale(&bytes, factor)?;
            info!(
                "reduced {} by factor {} ({} -> {} bytes)",
                self.file_name,
                factor,
                bytes.len(),
                reduced.len()
            );
            self.content = Some(reduced);
            self.variant = ContentVariant::ImageDerivative {
                applied_factor: Some(factor),
            };
        }

        let entity = &mut self.entity;
        entity.replace_metadata(IIIF_LABEL_FIELD, label, None)?;
        entity.replace_metadata(IIIF_TOC_FIELD, toc, None)?;
        entity.replace_metadata(IIIF_WIDTH_FIELD, width.to_string(), None)?;
        entity.replace_metadata(IIIF_HEIGHT_FIELD, height.to_string(), None)?;
        Ok((width, height))
    }

    pub fn has_derivative(&self) -> bool {
        [IIIF_LABEL_FIELD, IIIF_TOC_FIELD, IIIF_WIDTH_FIELD, IIIF_HEIGHT_FIELD]
            .iter()
            .any(|tag| self.entity.has_metadata(tag))
    }

    pub fn iiif_label(&self) -> Option<&str> {
        self.entity.get_first_metadata_value(IIIF_LABEL_FIELD)
    }

    pub fn iiif_toc(&self) -> Option<&str> {
        self.entity.get_first_metadata_value(IIIF_TOC_FIELD)
    }

    /// Natural `(width, height)` once both are recorded.
    pub fn iiif_dimensions(&self) -> Option<(u32, u32)> {
        let width = self.entity.get_first_metadata_value(IIIF_WIDTH_FIELD)?.parse().ok()?;
        let height = self.entity.get_first_metadata_value(IIIF_HEIGHT_FIELD)?.parse().ok()?;
        Some((width, height))
    }

    /// The SAF `contents` line for this file.
    pub fn describe_line(&self) -> String {
        let mut line = self.file_name.clone();
        if let Some(bundle) = &self.bundle {
            line.push_str(&format!("\tbundle:{}", bundle.name));
        }
        if let Some(description) = self.description() {
            line.push_str(&format!("\tdescription:{}", description));
        }
        for p in &self.permissions {
            line.push_str(&format!("\tpermissions:-{} '{}'", p.kind, p.group));
        }
        if self.primary {
            line.push_str("\tprimary:true");
        }
        if self.is_image() {
            if self.has_derivative() {
                let field = |tag: &str| self.entity.get_first_metadata_value(tag).unwrap_or("");
                line.push_str(&format!(
                    "\tiiif-label:{}\tiiif-toc:{}\tiiif-width:{}\tiiif-height:{}",
                    field(IIIF_LABEL_FIELD),
                    field(IIIF_TOC_FIELD),
                    field(IIIF_WIDTH_FIELD),
                    field(IIIF_HEIGHT_FIELD)
                ));
            } else {
                warn!(
                    file = %self.file_name,
                    "describing an image content file without IIIF information"
                );
            }
        }
        line
    }

    /// Same file: equal name and path, and equal uuids when both have one.
    pub fn matches(&self, other: &ContentFile) -> ModelResult<bool> {
        if self.is_image() != other.is_image() {
            return Err(ModelError::IncomparableVariants {
                left: self.variant.label(),
                right: other.variant.label(),
            });
        }
        let uuids_agree = match (&self.entity.uuid, &other.entity.uuid) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        Ok(self.file_name == other.file_name && self.path == other.path && uuids_agree)
    }

    pub fn to_export_record(&self) -> Map<String, Value> {
        let mut record = self.entity.to_export_record();
        if let Some(name) = self.bundle_name().filter(|n| !n.is_empty()) {
            record.insert("bundleName".into(), Value::String(name.to_string()));
        }
        record
    }
}

impl fmt::Display for ContentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe_line())
    }
}
