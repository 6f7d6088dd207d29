//! Represents a bundle: a named, ordered container of content files.

use crate::{
    config::DEFAULT_BUNDLE,
    errors::{ModelError, ModelResult},
    models::{
        bitstream::{BundleRef, ContentFile, DESCRIPTION_FIELD},
        entity::{EntityKind, RepositoryEntity},
        metadata::{FieldId, MetadataValue},
    },
    services::byte_source::ByteSource,
};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

/// A bundle within an item, e.g. `ORIGINAL`, `THUMBNAIL` or `LICENSE`.
///
/// The bundle owns its files; each file points back at the bundle by name.
/// Insertion order is display order.
#[derive(Clone, Debug)]
pub struct Bundle {
    pub entity: RepositoryEntity,
    name: String,
    bitstreams: Vec<ContentFile>,
}

impl Bundle {
    /// Create a bundle. The name may only be blank when a uuid is given.
    pub fn new(name: &str, uuid: Option<&str>) -> ModelResult<Self> {
        let has_uuid = uuid.is_some_and(|u| !u.is_empty());
        if name.trim().is_empty() && !has_uuid {
            return Err(ModelError::InvalidBundleName(name.to_string()));
        }
        Ok(Self::named(name, uuid.unwrap_or("")))
    }

    pub fn original() -> Self {
        Self::named(DEFAULT_BUNDLE, "")
    }

    fn named(name: &str, uuid: &str) -> Self {
        let mut entity = RepositoryEntity::new(uuid, "", name).with_kind(EntityKind::Bundle);
        if !name.is_empty() {
            entity.metadata.push(FieldId::dc_title(), MetadataValue::new(name, None));
        }
        Self {
            entity,
            name: name.to_string(),
            bitstreams: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> ModelResult<Self> {
        if !description.is_empty() {
            self.entity.add_metadata(DESCRIPTION_FIELD, description, None)?;
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.entity.get_first_metadata_value(DESCRIPTION_FIELD)
    }

    fn reference(&self) -> BundleRef {
        BundleRef {
            name: self.name.clone(),
            uuid: self.entity.uuid.clone(),
        }
    }

    /// Take ownership of `file`, pointing its bundle reference here.
    pub fn add_bitstream(&mut self, mut file: ContentFile) {
        file.set_bundle(self.reference());
        self.bitstreams.push(file);
    }

    /// Remove and return the first file matching `file`, detached from
    /// this bundle.
    ///
    /// Files of the other content variant are never candidates.
    pub fn remove_bitstream(&mut self, file: &ContentFile) -> ModelResult<ContentFile> {
        let mut found = None;
        for (idx, candidate) in self.bitstreams.iter().enumerate() {
            if candidate.is_image() != file.is_image() {
                continue;
            }
            if candidate.matches(file)? {
                found = Some(idx);
                break;
            }
        }
        match found {
            Some(idx) => {
                let mut file = self.bitstreams.remove(idx);
                file.clear_bundle();
                Ok(file)
            }
            None => Err(ModelError::BitstreamNotFound(file.file_name().to_string())),
        }
    }

    pub fn bitstreams(&self) -> &[ContentFile] {
        &self.bitstreams
    }

    pub fn bitstreams_where<F>(&self, condition: F) -> Vec<&ContentFile>
    where
        F: Fn(&ContentFile) -> bool,
    {
        self.bitstreams.iter().filter(|b| condition(b)).collect()
    }

    /// Persist every file into `directory` in order. Stops at the first
    /// failure; files written before it stay on disk.
    pub fn persist_bitstreams(
        &self,
        directory: &Path,
        source: &dyn ByteSource,
        timeout: Duration,
    ) -> ModelResult<Vec<PathBuf>> {
        self.bitstreams
            .iter()
            .map(|b| b.persist_to(directory, source, timeout))
            .collect()
    }
}

impl PartialEq for Bundle {
    /// Names decide unless both bundles carry a uuid.
    fn eq(&self, other: &Self) -> bool {
        match (&self.entity.uuid, &other.entity.uuid) {
            (Some(a), Some(b)) => a == b && self.name == other.name,
            _ => self.name == other.name,
        }
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bundle - {}", self.name)?;
        if let Some(uuid) = &self.entity.uuid {
            write!(f, "({})", uuid)?;
        }
        f.write_str(":")?;
        for b in &self.bitstreams {
            write!(f, "\n\t{}", b.describe_line())?;
        }
        Ok(())
    }
}
