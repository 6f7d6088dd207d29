//! Represents an item, the publishable unit of a SAF package.

use crate::{
    errors::{ModelError, ModelResult},
    models::{
        bitstream::{BundleRef, ContentFile},
        bundle::Bundle,
        collection::Collection,
        entity::{EntityKind, RepositoryEntity},
        relation::Relation,
    },
    services::Collaborators,
};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

pub const ENTITY_TYPE_FIELD: &str = "dspace.entity.type";

/// Request IIIF derivative handling for a new content file.
#[derive(Clone, Copy)]
pub struct IiifRequest<'a> {
    /// Reduce the stored image when narrower than the natural width; 0 keeps it.
    pub target_width: u32,
    /// Table-of-contents label; defaults to the file name before its first `.`.
    pub toc: Option<&'a str>,
    pub collab: Collaborators<'a>,
}

/// Optional settings for [`Item::add_content_file`].
#[derive(Clone, Default)]
pub struct ContentRequest<'a> {
    pub description: Option<&'a str>,
    pub bundle: Option<&'a str>,
    /// `(kind, group)` pairs, kind being `r`/`read` or `w`/`write`.
    pub permissions: Vec<(&'a str, &'a str)>,
    pub iiif: Option<IiifRequest<'a>>,
}

#[derive(Clone, Debug)]
pub struct Item {
    pub entity: RepositoryEntity,
    /// The first collection is the owning collection.
    collections: Vec<Collection>,
    relations: Vec<Relation>,
    contents: Vec<ContentFile>,
}

impl Item {
    pub fn new(uuid: &str, handle: &str) -> Self {
        Self {
            entity: RepositoryEntity::new(uuid, handle, "").with_kind(EntityKind::Item),
            collections: Vec::new(),
            relations: Vec::new(),
            contents: Vec::new(),
        }
    }

    pub fn with_collections(mut self, collections: Vec<Collection>) -> Self {
        self.collections = collections;
        self
    }

    /// Append a collection, or make it the owning collection when `primary`.
    pub fn add_collection(&mut self, collection: Collection, primary: bool) {
        if primary {
            self.collections.insert(0, collection);
        } else {
            self.collections.push(collection);
        }
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn owning_collection(&self) -> Option<&Collection> {
        self.collections.first()
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity.get_first_metadata_value(ENTITY_TYPE_FIELD)
    }

    pub fn is_entity(&self) -> bool {
        self.entity_type().is_some_and(|t| !t.is_empty())
    }

    /// Set the entity type. Calling it again replaces the previous type.
    pub fn enable_entity(&mut self, entity_type: &str) -> ModelResult<()> {
        self.entity.replace_metadata(ENTITY_TYPE_FIELD, entity_type, None)
    }

    pub fn add_relation(&mut self, relation_type: &str, identifier: &str) -> ModelResult<()> {
        if !self.is_entity() {
            return Err(ModelError::NotAnEntity);
        }
        self.relations.push(Relation::new(relation_type, identifier));
        Ok(())
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Build a content file from `request` and append it to the item.
    pub fn add_content_file(
        &mut self,
        name: &str,
        path: &str,
        request: ContentRequest<'_>,
    ) -> ModelResult<&ContentFile> {
        let mut file = match request.iiif {
            Some(_) => ContentFile::image(name, path),
            None => ContentFile::new(name, path),
        };
        if let Some(bundle) = request.bundle.filter(|b| !b.is_empty()) {
            file.set_bundle(BundleRef {
                name: bundle.to_string(),
                uuid: None,
            });
        }
        if let Some(description) = request.description.filter(|d| !d.is_empty()) {
            file.add_description(description, None)?;
        }
        for (kind, group) in &request.permissions {
            file.add_permission(kind, group)?;
        }
        if let Some(iiif) = request.iiif {
            let toc = iiif
                .toc
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| name.split('.').next().unwrap_or(name));
            let label = request.description.unwrap_or("");
            file.add_derivative(label, toc, iiif.target_width, iiif.collab)?;
        }
        debug!("added content file {} to item", name);

        let idx = self.contents.len();
        self.contents.push(file);
        Ok(&self.contents[idx])
    }

    pub fn contents(&self) -> &[ContentFile] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut [ContentFile] {
        &mut self.contents
    }

    /// Lines of the SAF `contents` file; hidden files are left out.
    pub fn contents_lines(&self) -> Vec<String> {
        self.contents
            .iter()
            .filter(|c| c.show)
            .map(ContentFile::describe_line)
            .collect()
    }

    /// Lines of the SAF `collections` file, owning collection first.
    pub fn collections_lines(&self) -> Vec<String> {
        self.collections
            .iter()
            .filter_map(|c| c.identifier().map(str::to_string))
            .collect()
    }

    /// Lines of the SAF `relationships` file.
    pub fn relationships_lines(&self) -> Vec<String> {
        self.relations.iter().map(Relation::saf_line).collect()
    }

    /// Group the item's files into bundles in first-seen order. Files
    /// without a bundle land in `default_bundle`.
    pub fn bundles(&self, default_bundle: &str) -> ModelResult<Vec<Bundle>> {
        let mut bundles: Vec<Bundle> = Vec::new();
        for file in &self.contents {
            let (name, uuid) = match file.bundle() {
                Some(b) => (b.name.as_str(), b.uuid.as_deref()),
                None => (default_bundle, None),
            };
            let idx = match bundles.iter().position(|b| b.name() == name) {
                Some(idx) => idx,
                None => {
                    bundles.push(Bundle::new(name, uuid)?);
                    bundles.len() - 1
                }
            };
            bundles[idx].add_bitstream(file.clone());
        }
        Ok(bundles)
    }

    pub fn to_export_record(&self) -> Map<String, Value> {
        self.entity.to_export_record()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity)
    }
}
