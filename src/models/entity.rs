//! Identity, metadata and statistics shared by every repository object.

use crate::{
    errors::{ModelError, ModelResult},
    models::metadata::{MetadataStore, MetadataValue},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fmt};

/// Kind tag used for the `type` entry of export records.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Item,
    Collection,
    Community,
    Bundle,
    Bitstream,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Item => "item",
            EntityKind::Collection => "collection",
            EntityKind::Community => "community",
            EntityKind::Bundle => "bundle",
            EntityKind::Bitstream => "bitstream",
        };
        f.write_str(name)
    }
}

/// A statistics entry. A report arriving under an existing key accumulates
/// into a `ReportList` together with the previous value; anything else
/// arriving under an existing key overwrites it.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ReportValue {
    Scalar(Value),
    Report(Map<String, Value>),
    /// Accumulated values; the first entry may be a scalar that preceded
    /// the reports.
    ReportList(Vec<Value>),
}

impl ReportValue {
    fn merge(self, incoming: ReportValue) -> ReportValue {
        use ReportValue::*;
        match (self, incoming) {
            (ReportList(mut existing), Report(new)) => {
                existing.push(Value::Object(new));
                ReportList(existing)
            }
            (Report(existing), Report(new)) => {
                ReportList(vec![Value::Object(existing), Value::Object(new)])
            }
            (Scalar(existing), Report(new)) => ReportList(vec![existing, Value::Object(new)]),
            (_, incoming) => incoming,
        }
    }
}

/// One keyed report as handed to [`RepositoryEntity::add_statistic_report`].
pub type StatisticReport = BTreeMap<String, ReportValue>;

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// The common core of items, collections, bundles and bitstreams.
///
/// Empty identity strings are stored as `None`.
#[derive(Clone, Debug)]
pub struct RepositoryEntity {
    kind: Option<EntityKind>,
    pub uuid: Option<String>,
    pub handle: Option<String>,
    pub name: Option<String>,
    pub metadata: MetadataStore,
    statistics: BTreeMap<String, ReportValue>,
}

impl RepositoryEntity {
    pub fn new(uuid: &str, handle: &str, name: &str) -> Self {
        Self {
            kind: None,
            uuid: non_empty(uuid),
            handle: non_empty(handle),
            name: non_empty(name),
            metadata: MetadataStore::new(),
            statistics: BTreeMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn kind(&self) -> Option<EntityKind> {
        self.kind
    }

    pub fn add_metadata(
        &mut self,
        tag: &str,
        value: impl Into<String>,
        language: Option<&str>,
    ) -> ModelResult<()> {
        self.metadata.set(tag, value, language)
    }

    pub fn remove_metadata(&mut self, tag: &str, value: Option<&str>) -> ModelResult<usize> {
        self.metadata.remove(tag, value)
    }

    pub fn replace_metadata(
        &mut self,
        tag: &str,
        value: impl Into<String>,
        language: Option<&str>,
    ) -> ModelResult<()> {
        self.metadata.replace(tag, value, language)
    }

    pub fn move_metadata(&mut self, tag: &str, from: usize, to: isize) -> ModelResult<()> {
        self.metadata.move_value(tag, from, to)
    }

    pub fn get_metadata(&self, tag: &str) -> Vec<MetadataValue> {
        self.metadata.get(tag)
    }

    pub fn get_metadata_values(&self, tag: &str) -> Option<Vec<String>> {
        self.metadata.values(tag)
    }

    pub fn get_first_metadata(&self, tag: &str) -> Option<&MetadataValue> {
        self.metadata.first(tag)
    }

    pub fn get_first_metadata_value(&self, tag: &str) -> Option<&str> {
        self.metadata.first_value(tag)
    }

    pub fn has_metadata(&self, tag: &str) -> bool {
        self.metadata.has(tag)
    }

    /// Merge reports into the statistics mapping, key by key.
    pub fn add_statistic_report(&mut self, reports: impl IntoIterator<Item = StatisticReport>) {
        for report in reports {
            for (key, incoming) in report {
                let merged = match self.statistics.remove(&key) {
                    Some(existing) => existing.merge(incoming),
                    None => incoming,
                };
                self.statistics.insert(key, merged);
            }
        }
    }

    pub fn statistics(&self) -> &BTreeMap<String, ReportValue> {
        &self.statistics
    }

    pub fn has_statistics(&self) -> bool {
        !self.statistics.is_empty()
    }

    /// uuid if present, else handle.
    pub fn identifier(&self) -> Option<&str> {
        self.uuid.as_deref().or(self.handle.as_deref())
    }

    /// Identity comparison; both sides need a uuid or handle.
    pub fn same_identity(&self, other: &RepositoryEntity) -> ModelResult<bool> {
        if self.identifier().is_none() || other.identifier().is_none() {
            return Err(ModelError::IncomparableEntities);
        }
        Ok(match &self.uuid {
            Some(uuid) => other.uuid.as_ref() == Some(uuid),
            None => self.handle == other.handle,
        })
    }

    /// Ordered record with the present identity fields, the kind and all metadata.
    pub fn to_export_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        let identity = [("uuid", &self.uuid), ("handle", &self.handle), ("name", &self.name)];
        for (key, value) in identity {
            if let Some(value) = value {
                record.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if let Some(kind) = self.kind {
            record.insert("type".into(), Value::String(kind.to_string()));
        }
        record.insert("metadata".into(), Value::Object(self.metadata.to_json()));
        record
    }
}

impl fmt::Display for RepositoryEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "repository object {}",
            self.identifier().unwrap_or("<unidentified>")
        )?;
        for line in self.metadata.export_lines() {
            write!(f, "\n\t{}", line)?;
        }
        Ok(())
    }
}
